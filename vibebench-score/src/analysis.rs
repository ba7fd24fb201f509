//! Heuristic static analysis of target directories.
//!
//! Analysis is deliberately collaborator-shaped: the scorer consumes the
//! [`DesignAnalyzer`] and [`CleanCodeAnalyzer`] traits and never cares how
//! the reports were produced. [`HeuristicAnalyzer`] is the built-in
//! implementation, a regex pass over the source files a tool wrote.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Dominant structural style of a target's source tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Architecture {
    #[serde(rename = "OOP")]
    Oop,
    Functional,
    Scripting,
    #[serde(rename = "N/A")]
    NotApplicable,
}

impl Architecture {
    /// Base architecture score used by the scorer.
    pub fn base_score(self) -> f64 {
        match self {
            Architecture::Oop => 80.0,
            Architecture::Functional => 60.0,
            Architecture::Scripting => 30.0,
            Architecture::NotApplicable => 0.0,
        }
    }
}

impl std::fmt::Display for Architecture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Architecture::Oop => "OOP",
            Architecture::Functional => "Functional",
            Architecture::Scripting => "Scripting",
            Architecture::NotApplicable => "N/A",
        };
        f.write_str(label)
    }
}

impl Default for Architecture {
    fn default() -> Self {
        Architecture::NotApplicable
    }
}

/// Aggregated structural analysis of one target directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DesignReport {
    pub all_imports: Vec<String>,
    pub architecture: Architecture,
    pub total_functions: usize,
    pub total_classes: usize,
    pub max_loop_depth: usize,
    /// Mean per-file structure score in [0, 100].
    pub avg_complexity: f64,
}

/// Code-quality heuristics: branching density, line style, risky calls.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleanCodeReport {
    /// Approximate mean cyclomatic complexity per function.
    pub avg_complexity: f64,
    /// Lines exceeding the style length limit.
    pub style_errors: usize,
    /// Percentage of lines within the style limit.
    pub style_compliance: f64,
    /// Matches against the risky-call pattern list.
    pub security_count: usize,
    /// Blended quality score in [0, 100].
    pub clean_code_score: f64,
}

/// Structural analysis collaborator contract.
pub trait DesignAnalyzer {
    fn analyze_design(&self, dir: &Path) -> DesignReport;
}

/// Code-quality collaborator contract.
pub trait CleanCodeAnalyzer {
    fn analyze_clean_code(&self, dir: &Path) -> CleanCodeReport;
}

/// Everything the scorer needs to know about one target directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetAnalysis {
    pub design: DesignReport,
    pub clean_code: CleanCodeReport,
    pub line_count: usize,
    pub file_size_bytes: u64,
}

const STYLE_LINE_LIMIT: usize = 120;

struct FileDesign {
    imports: Vec<String>,
    num_functions: usize,
    num_classes: usize,
    max_loop_depth: usize,
    complexity_score: f64,
}

/// Regex-based analyzer for the language families tools actually emit.
///
/// Python and the JS family get real structural passes; other watched
/// extensions still count toward lines and size but contribute no design
/// signal, the same as an unparseable file.
pub struct HeuristicAnalyzer {
    extensions: BTreeSet<String>,
    py_import: Regex,
    py_from: Regex,
    py_def: Regex,
    py_class: Regex,
    js_import: Regex,
    js_function: Regex,
    js_class: Regex,
    branch: Regex,
    risky: Vec<(Regex, &'static str)>,
}

impl HeuristicAnalyzer {
    /// Build the analyzer for the given lowercase, dot-free extension set.
    pub fn new(extensions: BTreeSet<String>) -> Self {
        let rx = |pattern: &str| Regex::new(pattern).expect("static pattern");
        Self {
            extensions,
            py_import: rx(r"(?m)^\s*import\s+([A-Za-z_][\w.]*)"),
            py_from: rx(r"(?m)^\s*from\s+([A-Za-z_][\w.]*)\s+import"),
            py_def: rx(r"(?m)^\s*(?:async\s+)?def\s+\w+"),
            py_class: rx(r"(?m)^\s*class\s+\w+"),
            js_import: rx(
                r#"(?:import\s+[^;]*?from\s+["']([^"']+)["']|require\s*\(\s*["']([^"']+)["']\s*\))"#,
            ),
            js_function: rx(
                r"(?:function\s+\w+|(?:const|let|var)\s+\w+\s*=\s*(?:async\s+)?(?:\([^)]*\)|[A-Za-z_]\w*)\s*=>)",
            ),
            js_class: rx(r"\bclass\s+\w+"),
            branch: rx(r"\b(?:if|elif|for|while|case|catch|except)\b"),
            risky: vec![
                (rx(r"\beval\s*\("), "eval()"),
                (rx(r"\bexec\s*\("), "exec()"),
                (rx(r"\bos\.system\s*\("), "os.system()"),
                (rx(r"shell\s*=\s*True"), "subprocess with shell=True"),
                (rx(r"\bpickle\.loads?\s*\("), "pickle deserialization"),
                (rx(r"\b__import__\s*\("), "dynamic __import__()"),
            ],
        }
    }

    /// Run both passes plus the size helpers over one directory.
    pub fn analyze_target(&self, dir: &Path) -> TargetAnalysis {
        TargetAnalysis {
            design: self.analyze_design(dir),
            clean_code: self.analyze_clean_code(dir),
            line_count: self.line_count(dir),
            file_size_bytes: self.total_file_size(dir),
        }
    }

    /// Total source lines across all qualifying files.
    pub fn line_count(&self, dir: &Path) -> usize {
        self.source_files(dir)
            .iter()
            .filter_map(|f| fs::read_to_string(f).ok())
            .map(|s| s.lines().count())
            .sum()
    }

    /// Total size in bytes across all qualifying files.
    pub fn total_file_size(&self, dir: &Path) -> u64 {
        self.source_files(dir)
            .iter()
            .filter_map(|f| fs::metadata(f).ok())
            .map(|m| m.len())
            .sum()
    }

    fn source_files(&self, dir: &Path) -> Vec<PathBuf> {
        let mut files = Vec::new();
        collect_files(dir, &self.extensions, &mut files);
        files.sort();
        files
    }

    fn analyze_file(&self, path: &Path) -> Option<FileDesign> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "could not read source file");
                return None;
            }
        };

        let design = match ext.as_str() {
            "py" => self.analyze_python(&source),
            "js" | "ts" | "jsx" | "tsx" => self.analyze_js(&source),
            _ => return None,
        };
        Some(design)
    }

    fn analyze_python(&self, source: &str) -> FileDesign {
        let mut imports = Vec::new();
        for caps in self.py_import.captures_iter(source) {
            push_unique(&mut imports, &caps[1]);
        }
        for caps in self.py_from.captures_iter(source) {
            push_unique(&mut imports, &caps[1]);
        }
        let num_functions = self.py_def.find_iter(source).count();
        let num_classes = self.py_class.find_iter(source).count();
        let max_loop_depth = python_loop_depth(source);
        let complexity_score =
            structure_score(num_functions, num_classes, imports.len(), max_loop_depth);
        FileDesign {
            imports,
            num_functions,
            num_classes,
            max_loop_depth,
            complexity_score,
        }
    }

    fn analyze_js(&self, source: &str) -> FileDesign {
        let mut imports = Vec::new();
        for caps in self.js_import.captures_iter(source) {
            if let Some(m) = caps.get(1).or_else(|| caps.get(2)) {
                push_unique(&mut imports, m.as_str());
            }
        }
        let num_functions = self.js_function.find_iter(source).count();
        let num_classes = self.js_class.find_iter(source).count();
        let max_loop_depth = brace_loop_depth(source);
        let complexity_score =
            structure_score(num_functions, num_classes, imports.len(), max_loop_depth);
        FileDesign {
            imports,
            num_functions,
            num_classes,
            max_loop_depth,
            complexity_score,
        }
    }
}

impl DesignAnalyzer for HeuristicAnalyzer {
    fn analyze_design(&self, dir: &Path) -> DesignReport {
        let mut report = DesignReport::default();
        let mut scores = Vec::new();

        for file in self.source_files(dir) {
            let Some(design) = self.analyze_file(&file) else {
                continue;
            };
            for import in design.imports {
                push_unique(&mut report.all_imports, &import);
            }
            report.total_functions += design.num_functions;
            report.total_classes += design.num_classes;
            report.max_loop_depth = report.max_loop_depth.max(design.max_loop_depth);
            scores.push(design.complexity_score);
        }

        if !scores.is_empty() {
            report.avg_complexity = round1(scores.iter().sum::<f64>() / scores.len() as f64);
            report.architecture = if report.total_classes >= 1 {
                Architecture::Oop
            } else if report.total_functions >= 2 {
                Architecture::Functional
            } else {
                Architecture::Scripting
            };
        }
        report
    }
}

impl CleanCodeAnalyzer for HeuristicAnalyzer {
    fn analyze_clean_code(&self, dir: &Path) -> CleanCodeReport {
        let mut total_lines = 0usize;
        let mut style_errors = 0usize;
        let mut branches = 0usize;
        let mut functions = 0usize;
        let mut security_count = 0usize;

        for file in self.source_files(dir) {
            let Ok(source) = fs::read_to_string(&file) else {
                continue;
            };
            for line in source.lines() {
                total_lines += 1;
                if line.chars().count() > STYLE_LINE_LIMIT {
                    style_errors += 1;
                }
                let trimmed = line.trim_start();
                if trimmed.starts_with('#') || trimmed.starts_with("//") {
                    continue;
                }
                for (pattern, issue) in &self.risky {
                    if pattern.is_match(line) {
                        security_count += 1;
                        tracing::debug!(file = %file.display(), issue, "risky call matched");
                    }
                }
            }
            branches += self.branch.find_iter(&source).count();
            branches += source.matches("&&").count() + source.matches("||").count();
            functions += self.py_def.find_iter(&source).count();
            functions += self.js_function.find_iter(&source).count();
        }

        if total_lines == 0 {
            return CleanCodeReport::default();
        }

        let avg_complexity = round2(1.0 + branches as f64 / functions.max(1) as f64);
        let style_compliance = round1(
            (100.0 - style_errors as f64 / total_lines as f64 * 100.0).max(0.0),
        );

        let complexity_score = (100.0 - (avg_complexity - 3.0).max(0.0) * 10.0).max(0.0);
        let security_score = (100.0 - security_count as f64 * 15.0).max(0.0);
        let clean_code_score = round1(
            (complexity_score * 0.35 + style_compliance * 0.35 + security_score * 0.30).min(100.0),
        );

        CleanCodeReport {
            avg_complexity,
            style_errors,
            style_compliance,
            security_count,
            clean_code_score,
        }
    }
}

fn collect_files(dir: &Path, extensions: &BTreeSet<String>, out: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::warn!(dir = %dir.display(), %err, "could not scan directory");
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, extensions, out);
        } else if path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| extensions.contains(&e.to_ascii_lowercase()))
            .unwrap_or(false)
        {
            out.push(path);
        }
    }
}

/// Per-file structure score: functions and classes help, deep loops hurt.
fn structure_score(functions: usize, classes: usize, imports: usize, depth: usize) -> f64 {
    let func_score = (functions * 10).min(40) as f64;
    let class_score = (classes * 15).min(30) as f64;
    let import_score = (imports * 5).min(20) as f64;
    let depth_penalty = depth.saturating_sub(3) as f64 * 5.0;
    (func_score + class_score + import_score - depth_penalty).clamp(0.0, 100.0)
}

/// Indentation-tracked nesting of `for`/`while` in Python source.
fn python_loop_depth(source: &str) -> usize {
    let mut open: Vec<usize> = Vec::new();
    let mut max = 0;
    for line in source.lines() {
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let indent = line.len() - trimmed.len();
        while open.last().is_some_and(|&top| indent <= top) {
            open.pop();
        }
        if trimmed.starts_with("for ")
            || trimmed.starts_with("while ")
            || trimmed.starts_with("async for ")
        {
            open.push(indent);
            max = max.max(open.len());
        }
    }
    max
}

/// Brace-tracked nesting of `for`/`while` in C-style source.
fn brace_loop_depth(source: &str) -> usize {
    let mut depth = 0i32;
    let mut open: Vec<i32> = Vec::new();
    let mut max = 0;
    for line in source.lines() {
        let trimmed = line.trim_start();
        let is_loop = ["for", "while"].iter().any(|kw| {
            trimmed
                .strip_prefix(kw)
                .map(|rest| rest.trim_start().starts_with('('))
                .unwrap_or(false)
        });
        if is_loop {
            open.push(depth);
            max = max.max(open.len());
        }
        for ch in line.chars() {
            match ch {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    while open.last().is_some_and(|&entry| entry >= depth) {
                        open.pop();
                    }
                }
                _ => {}
            }
        }
    }
    max
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

//! Weighted scoring of watch results.

use crate::{CleanCodeReport, DesignReport, TargetAnalysis};
use serde::Serialize;
use std::collections::BTreeMap;
use vibebench_telemetry::TelemetrySummary;
use vibebench_watch::{CompletionStatus, TargetReport};

/// Convex weights for the four scoring axes. Must sum to 1.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ScoreWeights {
    pub speed: f64,
    pub architecture: f64,
    pub error_ratio: f64,
    pub library: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            speed: 0.30,
            architecture: 0.30,
            error_ratio: 0.25,
            library: 0.15,
        }
    }
}

/// Points subtracted from the error-ratio axis per recorded incident.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ErrorPenalties {
    pub per_retry: f64,
    pub per_error: f64,
}

impl Default for ErrorPenalties {
    fn default() -> Self {
        Self {
            per_retry: 20.0,
            per_error: 25.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ScoreConfig {
    pub weights: ScoreWeights,
    pub penalties: ErrorPenalties,
}

/// Final per-target scoring record, ready for ranking and reporting.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreRecord {
    pub name: String,
    pub status: CompletionStatus,
    pub execution_time: Option<f64>,
    pub line_count: usize,
    pub file_size_bytes: u64,
    pub speed_score: f64,
    pub arch_score: f64,
    pub error_ratio_score: f64,
    pub library_score: f64,
    pub total_score: f64,
    /// 1 = best; dense ranking by `total_score` descending, ties keep input
    /// order.
    pub rank: usize,
    pub design: DesignReport,
    pub pro_analysis: CleanCodeReport,
    pub telemetry: TelemetrySummary,
}

/// Linear speed axis over the pool of finished targets.
///
/// The fastest finite time maps to 100, the slowest to 10, everything in
/// between linearly; a target with no completion time scores 0 and is
/// excluded from the normalization pool. All times equal (including a pool
/// of one) maps to 100.
pub fn speed_score(total_time: Option<f64>, all_times: &[Option<f64>]) -> f64 {
    let Some(time) = total_time else {
        return 0.0;
    };
    let valid: Vec<f64> = all_times.iter().filter_map(|t| *t).collect();
    if valid.is_empty() {
        return 0.0;
    }
    let fastest = valid.iter().cloned().fold(f64::INFINITY, f64::min);
    let slowest = valid.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if fastest == slowest {
        return 100.0;
    }
    round1((100.0 - (time - fastest) / (slowest - fastest) * 90.0).max(0.0))
}

/// Blend of architecture shape (60%) and clean-code quality (40%).
fn architecture_score(design: &DesignReport, pro: &CleanCodeReport) -> f64 {
    let base = design.architecture.base_score();
    let func_bonus = (design.total_functions as f64 * 3.0).min(15.0);
    let class_bonus = (design.total_classes as f64 * 5.0).min(10.0);
    let depth_penalty = design.max_loop_depth.saturating_sub(3) as f64 * 5.0;
    let arch_base = (base + func_bonus + class_bonus - depth_penalty).min(100.0);
    round1((arch_base * 0.6 + pro.clean_code_score * 0.4).min(100.0))
}

/// Error-ratio axis: 100 minus configured penalties per retry and per error,
/// floored at 0. No telemetry at all scores a neutral 50.
pub fn error_ratio_score(telemetry: Option<&TelemetrySummary>, penalties: &ErrorPenalties) -> f64 {
    let Some(telemetry) = telemetry else {
        return 50.0;
    };
    let score = 100.0
        - telemetry.retries as f64 * penalties.per_retry
        - telemetry.errors as f64 * penalties.per_error;
    round1(score.max(0.0))
}

/// Library richness: no imports at all is near-zero, each distinct import
/// adds 12 points up to the cap.
fn library_score(design: &DesignReport) -> f64 {
    let count = design.all_imports.len();
    if count == 0 {
        return 10.0;
    }
    (count as f64 * 12.0).min(100.0)
}

/// Score every target and assign dense ranks.
///
/// Records come back in input order; `rank` reflects descending
/// `total_score` with ties resolved by input order (a stable sort over an
/// already-ordered slice).
pub fn calculate_scores(
    results: &[TargetReport],
    analyses: &BTreeMap<String, TargetAnalysis>,
    config: &ScoreConfig,
) -> Vec<ScoreRecord> {
    let all_times: Vec<Option<f64>> = results.iter().map(|r| r.total_time).collect();
    let default_analysis = TargetAnalysis::default();

    let mut records: Vec<ScoreRecord> = results
        .iter()
        .map(|result| {
            let analysis = analyses.get(&result.name).unwrap_or(&default_analysis);
            let spd = speed_score(result.total_time, &all_times);
            let arch = architecture_score(&analysis.design, &analysis.clean_code);
            let err = error_ratio_score(Some(&result.telemetry), &config.penalties);
            let lib = library_score(&analysis.design);
            let total = round1(
                spd * config.weights.speed
                    + arch * config.weights.architecture
                    + err * config.weights.error_ratio
                    + lib * config.weights.library,
            );
            tracing::debug!(
                tool = %result.name,
                speed = spd,
                architecture = arch,
                error_ratio = err,
                library = lib,
                total,
                "scored"
            );
            ScoreRecord {
                name: result.name.clone(),
                status: result.status,
                execution_time: result.total_time,
                line_count: analysis.line_count,
                file_size_bytes: analysis.file_size_bytes,
                speed_score: spd,
                arch_score: arch,
                error_ratio_score: err,
                library_score: lib,
                total_score: total,
                rank: 0,
                design: analysis.design.clone(),
                pro_analysis: analysis.clean_code.clone(),
                telemetry: result.telemetry.clone(),
            }
        })
        .collect();

    let mut order: Vec<usize> = (0..records.len()).collect();
    order.sort_by(|&a, &b| {
        records[b]
            .total_score
            .partial_cmp(&records[a].total_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    for (rank, index) in order.into_iter().enumerate() {
        records[index].rank = rank + 1;
    }
    records
}

/// The record with rank 1, if any targets were scored.
pub fn winner(records: &[ScoreRecord]) -> Option<&ScoreRecord> {
    records.iter().min_by_key(|r| r.rank)
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

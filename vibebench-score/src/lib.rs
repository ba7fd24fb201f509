//! Static analysis and weighted scoring.
//!
//! [`HeuristicAnalyzer`] inspects a finished target directory and produces a
//! [`DesignReport`] (architecture shape, imports, loop depth) and a
//! [`CleanCodeReport`] (branching density, style, security patterns). The
//! scorer then combines watch results, telemetry and analysis into ranked
//! [`ScoreRecord`]s via a pure function of its inputs — nothing here touches
//! live run state.

mod analysis;
mod scorer;

pub use analysis::{
    Architecture, CleanCodeAnalyzer, CleanCodeReport, DesignAnalyzer, DesignReport,
    HeuristicAnalyzer, TargetAnalysis,
};
pub use scorer::{
    calculate_scores, error_ratio_score, speed_score, winner, ErrorPenalties, ScoreConfig,
    ScoreRecord, ScoreWeights,
};

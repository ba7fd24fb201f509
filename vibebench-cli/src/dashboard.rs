//! Console tables for live progress and final scores.

use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};
use std::sync::Arc;
use vibebench_score::ScoreRecord;
use vibebench_watch::TargetHandler;

/// Live writing-phase estimate from two separate clock reads; the reads are
/// not atomic, so the difference is clamped to never show negative.
fn live_writing_secs(elapsed: f64, thinking: f64) -> f64 {
    (elapsed - thinking).max(0.0)
}

/// Human-readable duration in seconds.
fn fmt_secs(seconds: Option<f64>) -> String {
    match seconds {
        None => "-".to_string(),
        Some(s) if s < 60.0 => format!("{s:.2}s"),
        Some(s) => format!("{}m {:.1}s", (s / 60.0) as u64, s % 60.0),
    }
}

/// Snapshot table of every target's live progress.
pub fn live_table(handlers: &[Arc<TargetHandler>]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Tool").fg(Color::Cyan),
        Cell::new("Signal").fg(Color::Cyan),
        Cell::new("Status").fg(Color::Cyan),
        Cell::new("Thinking").fg(Color::Cyan),
        Cell::new("Writing").fg(Color::Cyan),
        Cell::new("Total").fg(Color::Cyan),
        Cell::new("CPU%").fg(Color::Cyan),
        Cell::new("RAM").fg(Color::Cyan),
        Cell::new("Retries").fg(Color::Cyan),
        Cell::new("Errors").fg(Color::Cyan),
        Cell::new("Files").fg(Color::Cyan),
    ]);

    for handler in handlers {
        let elapsed = handler.elapsed();
        let completed = handler.completed();
        let signal = handler.signal_received();

        let (signal_cell, status) = match (completed, signal) {
            (true, _) => (Cell::new("received").fg(Color::Green), "done"),
            (false, true) => (Cell::new("received").fg(Color::Green), "writing"),
            (false, false) => (Cell::new("waiting").fg(Color::Yellow), "thinking"),
        };

        // Live counters keep ticking until the relevant phase ends.
        let thinking = handler.thinking_time().or(Some(elapsed));
        let writing = if completed {
            handler.writing_time()
        } else if signal {
            handler.thinking_time().map(|t| live_writing_secs(elapsed, t))
        } else {
            None
        };
        let total = handler.total_time().or(Some(elapsed));

        let summary = handler.telemetry().summary();
        let cpu = if summary.resources.avg_cpu > 0.0 {
            format!("{:.0}%", summary.resources.avg_cpu)
        } else {
            "-".to_string()
        };
        let ram = if summary.resources.avg_ram_mb > 0.0 {
            format!("{:.0}MB", summary.resources.avg_ram_mb)
        } else {
            "-".to_string()
        };
        let files = handler.detected_files().join(", ");

        table.add_row(vec![
            Cell::new(handler.name()).fg(Color::Cyan),
            signal_cell,
            Cell::new(status),
            Cell::new(fmt_secs(thinking)),
            Cell::new(fmt_secs(writing)),
            Cell::new(fmt_secs(total)),
            Cell::new(cpu),
            Cell::new(ram),
            Cell::new(summary.retries),
            Cell::new(summary.errors),
            Cell::new(if files.is_empty() { "-".into() } else { files }),
        ]);
    }
    table
}

/// Final ranked score table.
pub fn score_table(records: &[ScoreRecord]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Rank").fg(Color::Cyan),
        Cell::new("Tool").fg(Color::Cyan),
        Cell::new("Total").fg(Color::Cyan),
        Cell::new("Speed").fg(Color::Cyan),
        Cell::new("Architecture").fg(Color::Cyan),
        Cell::new("Errors").fg(Color::Cyan),
        Cell::new("Libraries").fg(Color::Cyan),
        Cell::new("Time").fg(Color::Cyan),
        Cell::new("Lines").fg(Color::Cyan),
        Cell::new("Status").fg(Color::Cyan),
    ]);

    let mut ordered: Vec<&ScoreRecord> = records.iter().collect();
    ordered.sort_by_key(|r| r.rank);

    for record in ordered {
        let total_color = match record.rank {
            1 => Color::Yellow,
            2 => Color::White,
            3 => Color::Red,
            _ => Color::Grey,
        };
        table.add_row(vec![
            Cell::new(record.rank),
            Cell::new(&record.name).fg(Color::Cyan),
            Cell::new(format!("{:.1}", record.total_score)).fg(total_color),
            Cell::new(format!("{:.1}", record.speed_score)),
            Cell::new(format!("{:.1}", record.arch_score)),
            Cell::new(format!("{:.1}", record.error_ratio_score)),
            Cell::new(format!("{:.1}", record.library_score)),
            Cell::new(fmt_secs(record.execution_time)),
            Cell::new(record.line_count),
            Cell::new(record.status.to_string()),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fmt_secs_handles_all_ranges() {
        assert_eq!(fmt_secs(None), "-");
        assert_eq!(fmt_secs(Some(4.2)), "4.20s");
        assert_eq!(fmt_secs(Some(125.0)), "2m 5.0s");
    }

    #[test]
    fn live_writing_estimate_is_never_negative() {
        // Thinking read slightly after elapsed, around the signal moment.
        assert_eq!(live_writing_secs(1.0, 1.002), 0.0);
        assert_eq!(live_writing_secs(2.5, 1.0), 1.5);
    }
}

//! Plain-text rendering of the progress checklist.

use std::fmt::Write as _;

use chrono::SecondsFormat;
use services::ProgressTracker;
use storage::progress_table::ProgressTable;

const BAR_WIDTH: u32 = 20;

pub fn render_tracker(tracker: &ProgressTracker) -> String {
    let summary = tracker.summary();
    let mut out = String::new();

    let _ = writeln!(out, "Your Progress: {}", tracker.outline().tutorial_id());
    let _ = writeln!(out, "{}", progress_bar(summary.percentage));
    let _ = writeln!(
        out,
        "{} of {} steps ({}%)",
        summary.completed, summary.total_steps, summary.percentage
    );
    let _ = writeln!(out);
    for item in tracker.checklist() {
        let mark = if item.completed { 'x' } else { ' ' };
        let _ = writeln!(out, "  [{mark}] Step {}", item.step);
    }
    if summary.is_complete {
        let _ = writeln!(out);
        let _ = writeln!(out, "Tutorial complete!");
    }
    out
}

pub fn render_table(table: &ProgressTable) -> String {
    if table.is_empty() {
        return "No tutorial progress recorded.\n".to_string();
    }
    let mut out = String::new();
    for (id, progress) in table {
        let steps: Vec<String> = progress
            .completed_steps()
            .iter()
            .map(ToString::to_string)
            .collect();
        let _ = writeln!(
            out,
            "{id}: {} completed [{}], last accessed {}",
            progress.completed_count(),
            steps.join(", "),
            progress
                .last_accessed()
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        );
    }
    out
}

fn progress_bar(percentage: u32) -> String {
    let filled = percentage.min(100) * BAR_WIDTH / 100;
    let mut bar = String::with_capacity(BAR_WIDTH as usize + 2);
    bar.push('[');
    for cell in 0..BAR_WIDTH {
        bar.push(if cell < filled { '#' } else { '-' });
    }
    bar.push(']');
    bar
}

//! Plain-text comparison reports.
//!
//! Rendering is a pure function of the context, the decided status and the
//! optional stats and details.

use chrono::NaiveDate;

use crate::reconcile::{ComparisonDiffDetails, ComparisonStats, ComparisonStatus};

const RULE_WIDTH: usize = 64;

/// What was compared, for the report header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportContext {
    /// Comparison mode shown in the title (`sample`, `counts`, ...).
    pub mode: String,
    /// Source description, e.g. `oracle SALES.ORDERS`.
    pub source: String,
    pub target: String,
    pub key_columns: Vec<String>,
    pub tolerance: f64,
    /// Inclusive day range, when the comparison was restricted to one.
    pub date_range: Option<(NaiveDate, NaiveDate)>,
}

struct Lines(Vec<String>);

impl Lines {
    fn push(&mut self, line: impl Into<String>) {
        self.0.push(line.into());
    }

    fn field(&mut self, label: &str, value: impl std::fmt::Display) {
        self.0.push(format!("  {:<22}{}", format!("{label}:"), value));
    }

    fn rule(&mut self, ch: char) {
        self.0.push(ch.to_string().repeat(RULE_WIDTH));
    }

    fn finish(self) -> String {
        let mut out = self.0.join("\n");
        out.push('\n');
        out
    }
}

fn header(ctx: &ReportContext, status: ComparisonStatus) -> Lines {
    let mut lines = Lines(Vec::new());
    lines.rule('=');
    lines.push(format!("DATA COMPARISON REPORT ({})", ctx.mode));
    lines.rule('=');
    lines.field("Source", &ctx.source);
    lines.field("Target", &ctx.target);
    if !ctx.key_columns.is_empty() {
        lines.field("Key", ctx.key_columns.join(", "));
    }
    if let Some((start, end)) = ctx.date_range {
        lines.field("Date range", format!("{start} .. {end}"));
    }
    lines.field("Tolerance", format!("{:.2}%", ctx.tolerance));
    lines.field("Status", status);
    lines.rule('-');
    lines
}

fn scores(lines: &mut Lines, stats: &ComparisonStats) {
    lines.push("SCORE");
    lines.field("Final diff score", format!("{:.4}", stats.final_diff_score));
    lines.field("Final score", format!("{:.4}", stats.final_score));
}

fn mismatch_section(lines: &mut Lines, title: &str, details: &ComparisonDiffDetails) {
    if details.is_empty() {
        return;
    }
    lines.rule('-');
    lines.push(title);
    for (column, count) in &details.mismatches_per_column {
        lines.push(format!("  {column}: {count}"));
        if let Some(examples) = details.discrepancies_per_col_examples.get(column) {
            for ex in examples {
                lines.push(format!(
                    "    key={}  source={}  target={}",
                    ex.key_display(),
                    ex.source,
                    ex.target
                ));
            }
        }
    }
}

fn skipped(mut lines: Lines) -> String {
    lines.push("No rows on either side; comparison skipped.");
    lines.finish()
}

/// Report for keyed (sample, custom query, row set) comparisons.
pub fn render_sample(
    ctx: &ReportContext,
    status: ComparisonStatus,
    stats: Option<&ComparisonStats>,
    details: Option<&ComparisonDiffDetails>,
) -> String {
    let mut lines = header(ctx, status);
    let Some(stats) = stats else {
        return skipped(lines);
    };

    lines.push("ROWS");
    lines.field("Source rows", stats.total_source_rows);
    lines.field("Target rows", stats.total_target_rows);
    lines.field("Common keys", stats.common_pk_rows);
    lines.field("Only in source", stats.only_source_rows);
    lines.field("Only in target", stats.only_target_rows);
    lines.field("Duplicates (source)", stats.dup_source_rows);
    lines.field("Duplicates (target)", stats.dup_target_rows);
    lines.field("Matched rows", stats.total_matched_rows);
    lines.push("PERCENTAGES");
    lines.field("Mismatched", format!("{:.4}%", stats.mismatch_percentage_rows));
    lines.field("Source only", format!("{:.4}%", stats.source_only_percentage_rows));
    lines.field("Target only", format!("{:.4}%", stats.target_only_percentage_rows));
    lines.field("Duplicates (source)", format!("{:.4}%", stats.dup_source_percentage_rows));
    lines.field("Duplicates (target)", format!("{:.4}%", stats.dup_target_percentage_rows));
    scores(&mut lines, stats);

    if let Some(details) = details {
        mismatch_section(&mut lines, "MISMATCHED COLUMNS", details);
    }
    lines.finish()
}

/// Report for per-day count comparisons.
pub fn render_counts(
    ctx: &ReportContext,
    status: ComparisonStatus,
    stats: Option<&ComparisonStats>,
    details: Option<&ComparisonDiffDetails>,
) -> String {
    let mut lines = header(ctx, status);
    let Some(stats) = stats else {
        return skipped(lines);
    };

    lines.push("COUNTS");
    lines.field("Source rows", stats.total_source_rows);
    lines.field("Target rows", stats.total_target_rows);
    lines.field("Common rows", stats.common_pk_rows);
    lines.field("Source surplus", stats.only_source_rows);
    lines.field("Target surplus", stats.only_target_rows);
    lines.push("PERCENTAGES");
    lines.field("Source surplus", format!("{:.4}%", stats.source_only_percentage_rows));
    lines.field("Target surplus", format!("{:.4}%", stats.target_only_percentage_rows));
    scores(&mut lines, stats);

    if let Some(details) = details {
        mismatch_section(&mut lines, "DAYS WITH DIFFERENT COUNTS", details);
    }
    lines.finish()
}

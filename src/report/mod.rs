//! Run summary printed after each invocation.

use std::fmt::Write as _;
use std::path::PathBuf;

use chrono::{DateTime, Local};

use crate::analysis::AnalysisOutput;

/// What one analysis wrote.
#[derive(Debug, Clone)]
pub struct AnalysisSummary {
    pub name: &'static str,
    pub groups: usize,
    pub files: Vec<PathBuf>,
}

impl AnalysisSummary {
    pub fn new(name: &'static str, output: &AnalysisOutput, files: Vec<PathBuf>) -> Self {
        Self {
            name,
            groups: output.group_count(),
            files,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started: DateTime<Local>,
    pub analyses: Vec<AnalysisSummary>,
}

impl RunSummary {
    pub fn start() -> Self {
        Self {
            started: Local::now(),
            analyses: Vec::new(),
        }
    }

    pub fn push(&mut self, summary: AnalysisSummary) {
        self.analyses.push(summary);
    }

    pub fn file_count(&self) -> usize {
        self.analyses.iter().map(|a| a.files.len()).sum()
    }
}

/// Human-readable summary, one block per analysis.
pub fn format_run_summary(summary: &RunSummary, finished: DateTime<Local>) -> String {
    let mut out = String::new();
    out.push_str("=== whdh - indicator pipeline ===\n");
    let _ = writeln!(out, "Started:  {}", summary.started.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(
        out,
        "Elapsed:  {:.1}s",
        (finished - summary.started).num_milliseconds() as f64 / 1000.0
    );

    for analysis in &summary.analyses {
        let _ = writeln!(
            out,
            "\n{} ({} groups, {} files)",
            analysis.name,
            analysis.groups,
            analysis.files.len()
        );
        for file in &analysis.files {
            let _ = writeln!(out, "  {}", file.display());
        }
    }
    let _ = write!(out, "\nTotal files written: {}", summary.file_count());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[test]
    fn summary_lists_every_file() {
        let mut summary = RunSummary::start();
        summary.push(AnalysisSummary {
            name: "vaccine-spend",
            groups: 7,
            files: vec![
                PathBuf::from("whdh_gold/vaccine_spent_region.json"),
                PathBuf::from("whdh_gold/vaccine_spent_country.json"),
            ],
        });
        let text = format_run_summary(&summary, summary.started + TimeDelta::milliseconds(1500));
        assert!(text.contains("vaccine-spend (7 groups, 2 files)"));
        assert!(text.contains("vaccine_spent_country.json"));
        assert!(text.contains("Elapsed:  1.5s"));
        assert!(text.ends_with("Total files written: 2"));
    }
}

//! Human-readable statistics report.

use std::fmt;

use crate::engine::{BatchStatistics, Estimate};

const UNDEFINED: &str = "undefined";

fn value(estimate: Option<Estimate>) -> String {
    estimate
        .map(|e| format!("{:.4}", e.value))
        .unwrap_or_else(|| UNDEFINED.to_string())
}

fn error(estimate: Option<Estimate>) -> String {
    estimate
        .and_then(|e| e.error)
        .map(|e| format!("{:.4}", e))
        .unwrap_or_else(|| UNDEFINED.to_string())
}

fn percent(estimate: Option<Estimate>) -> Option<Estimate> {
    estimate.map(|e| e.as_percentage())
}

impl fmt::Display for BatchStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let found = percent(self.found_rate);
        let stable = percent(self.stability);

        writeln!(
            f,
            "Total: {}, Found: {}, Failed: {}",
            self.total, self.found, self.failed
        )?;
        writeln!(
            f,
            "FoundPercentage: {}%, FoundPercentageError: {}%",
            value(found),
            error(found)
        )?;
        writeln!(
            f,
            "FoundIterationsAverage: {}, FoundIterationsError: {}",
            value(self.path_length),
            error(self.path_length)
        )?;
        writeln!(
            f,
            "AverageSubtopicsPerSearchedTopic: {}, SubtopicsPerSearchedTopicError: {} ({} steps)",
            value(self.branching_factor),
            error(self.branching_factor),
            self.expansion_steps
        )?;
        write!(
            f,
            "StableResultsPercentage: {}%, StableResultsPercentageError: {}% ({} repeats)",
            value(stable),
            error(stable),
            self.stability_tests
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::compute_statistics;
    use crate::outcome::SearchOutcome;

    #[test]
    fn test_report_marks_undefined() {
        let batch = vec![SearchOutcome {
            keyword: "zzznomatch".to_string(),
            found: false,
            failed: false,
            path: vec!["physics".to_string(), "optics".to_string()],
            steps: vec![vec!["optics".to_string()]],
        }];
        let report = compute_statistics(&batch).to_string();

        assert!(report.contains("Total: 1, Found: 0, Failed: 0"));
        assert!(report.contains("FoundPercentage: 0.0000%, FoundPercentageError: 0.0000%"));
        assert!(report.contains("FoundIterationsAverage: undefined"));
        assert!(report.contains("AverageSubtopicsPerSearchedTopic: 1.0000, SubtopicsPerSearchedTopicError: undefined"));
        assert!(report.contains("StableResultsPercentage: undefined%"));
    }
}

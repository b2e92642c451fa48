use super::types::{Category, LineRange, Severity};
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};

/// Rule id carried by the synthetic finding emitted when a detector fails.
pub const DETECTOR_ERROR: &str = "detector-error";
/// Rule id carried by the synthetic finding emitted when a detector times out.
pub const DETECTOR_TIMEOUT: &str = "detector-timeout";

/// A single reported issue instance.
///
/// Findings are immutable once a detector produced them; the aggregator only
/// annotates the surviving copy of a duplicate with the ids of the detectors
/// whose copies were dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Finding {
    pub category: Category,
    pub severity: Severity,
    /// Path relative to the scan root, `/`-separated
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_range: Option<LineRange>,
    pub message: String,
    pub detector: String,
    pub rule: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suppressed_detectors: Vec<String>,
}

impl Finding {
    pub fn new(
        detector: impl Into<String>,
        rule: impl Into<String>,
        category: Category,
        severity: Severity,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            severity,
            path: path.into(),
            line_range: None,
            message: message.into(),
            detector: detector.into(),
            rule: rule.into(),
            suppressed_detectors: Vec::new(),
        }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line_range = Some(LineRange::line(line));
        self
    }

    pub fn spanning(mut self, start: usize, end: usize) -> Self {
        self.line_range = Some(LineRange::new(start, end));
        self
    }

    /// Synthetic finding for a detector that returned an error or panicked.
    pub fn detector_error(
        detector: &str,
        category: Category,
        path: &str,
        reason: impl std::fmt::Display,
    ) -> Self {
        Self::new(
            detector,
            DETECTOR_ERROR,
            category,
            Severity::Info,
            path,
            format!("Detector '{}' failed on {}: {}", detector, path, reason),
        )
    }

    /// Synthetic finding for a detector that exceeded its time allowance.
    pub fn detector_timeout(
        detector: &str,
        category: Category,
        path: &str,
        timeout: std::time::Duration,
    ) -> Self {
        Self::new(
            detector,
            DETECTOR_TIMEOUT,
            category,
            Severity::Info,
            path,
            format!(
                "Detector '{}' timed out on {} after {:.1}s",
                detector,
                path,
                timeout.as_secs_f64()
            ),
        )
    }

    /// True for `detector-error` and `detector-timeout` findings.
    pub fn is_diagnostic(&self) -> bool {
        self.rule == DETECTOR_ERROR || self.rule == DETECTOR_TIMEOUT
    }

    pub fn start_line(&self) -> Option<usize> {
        self.line_range.map(|r| r.start)
    }

    /// Report order: most severe first, then by location and origin.
    pub fn report_order(&self, other: &Self) -> Ordering {
        (
            Reverse(self.severity),
            self.category,
            &self.path,
            self.line_range,
            &self.detector,
            &self.rule,
            &self.message,
            &self.suppressed_detectors,
        )
            .cmp(&(
                Reverse(other.severity),
                other.category,
                &other.path,
                other.line_range,
                &other.detector,
                &other.rule,
                &other.message,
                &other.suppressed_detectors,
            ))
    }
}

impl PartialOrd for Finding {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Finding {
    fn cmp(&self, other: &Self) -> Ordering {
        self.report_order(other)
    }
}

//! Runs a detector registry against one file with failure isolation.
//!
//! Every detector gets its own thread. Results come back over a channel and
//! are collected until the per-detector deadline. A detector that returns an
//! error or panics yields one `detector-error` finding; one that misses the
//! deadline yields one `detector-timeout` finding and its thread is left to
//! finish on its own.
//!
//! Findings always name the analyzed file and the category and id of the
//! detector that produced them, whatever the detector put there.

use super::{Detector, DetectorRegistry};
use crate::core::{FileMetadata, Finding};
use crossbeam::channel;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

pub const DEFAULT_DETECTOR_TIMEOUT: Duration = Duration::from_secs(10);

enum Outcome {
    Findings(Vec<Finding>),
    Failed(String),
}

pub struct DetectorRunner {
    registry: DetectorRegistry,
    timeout: Duration,
}

impl DetectorRunner {
    pub fn new(registry: DetectorRegistry) -> Self {
        Self {
            registry,
            timeout: DEFAULT_DETECTOR_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn registry(&self) -> &DetectorRegistry {
        &self.registry
    }

    /// Run every registered detector on `content`, sorted in report order.
    pub fn run(&self, content: &str, meta: &FileMetadata) -> Vec<Finding> {
        let _span = tracing::debug_span!("detect", path = %meta.path).entered();
        let detectors: Vec<Arc<dyn Detector>> = self.registry.iter().cloned().collect();
        if detectors.is_empty() {
            return Vec::new();
        }

        let content: Arc<str> = Arc::from(content);
        let shared_meta = Arc::new(meta.clone());
        let (tx, rx) = channel::unbounded::<(usize, Outcome)>();
        let mut pending = vec![true; detectors.len()];
        let mut findings = Vec::new();

        for (index, detector) in detectors.iter().enumerate() {
            let tx = tx.clone();
            let detector = Arc::clone(detector);
            let content = Arc::clone(&content);
            let file_meta = Arc::clone(&shared_meta);
            let spawned = thread::Builder::new()
                .name(format!("detector-{}", detector.id()))
                .spawn(move || {
                    let outcome = execute(detector.as_ref(), &content, &file_meta);
                    // The receiver is gone once the deadline passed
                    let _ = tx.send((index, outcome));
                });
            if let Err(e) = spawned {
                pending[index] = false;
                findings.push(Finding::detector_error(
                    detectors[index].id(),
                    detectors[index].category(),
                    &shared_meta.path,
                    format!("could not start detector thread: {}", e),
                ));
            }
        }
        drop(tx);

        let deadline = Instant::now() + self.timeout;
        while pending.iter().any(|p| *p) {
            match rx.recv_deadline(deadline) {
                Ok((index, outcome)) => {
                    pending[index] = false;
                    let detector = &detectors[index];
                    match outcome {
                        Outcome::Findings(found) => findings.extend(
                            found
                                .into_iter()
                                .map(|finding| attribute(finding, detector.as_ref(), &meta.path)),
                        ),
                        Outcome::Failed(reason) => {
                            tracing::warn!(
                                detector = detector.id(),
                                path = %meta.path,
                                "Detector failed: {}",
                                reason
                            );
                            findings.push(Finding::detector_error(
                                detector.id(),
                                detector.category(),
                                &meta.path,
                                reason,
                            ));
                        }
                    }
                }
                Err(_) => break,
            }
        }

        for (index, still_running) in pending.iter().enumerate() {
            if *still_running {
                let detector = &detectors[index];
                tracing::warn!(
                    detector = detector.id(),
                    path = %meta.path,
                    timeout_secs = self.timeout.as_secs_f64(),
                    "Detector timed out"
                );
                findings.push(Finding::detector_timeout(
                    detector.id(),
                    detector.category(),
                    &meta.path,
                    self.timeout,
                ));
            }
        }

        findings.sort();
        findings
    }
}

// Pure function: pin a finding to the analyzed file and its detector
fn attribute(mut finding: Finding, detector: &dyn Detector, path: &str) -> Finding {
    if finding.path != path
        || finding.category != detector.category()
        || finding.detector != detector.id()
    {
        tracing::debug!(
            detector = detector.id(),
            reported_path = %finding.path,
            reported_category = %finding.category,
            "Reattributing detector finding to {}",
            path
        );
        finding.path = path.to_string();
        finding.category = detector.category();
        finding.detector = detector.id().to_string();
    }
    finding
}

fn execute(detector: &dyn Detector, content: &str, meta: &FileMetadata) -> Outcome {
    match panic::catch_unwind(AssertUnwindSafe(|| detector.analyze(content, meta))) {
        Ok(Ok(findings)) => Outcome::Findings(findings),
        Ok(Err(failure)) => Outcome::Failed(failure.to_string()),
        Err(payload) => Outcome::Failed(format!("panicked: {}", panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::security::DynamicEvalDetector;
    use crate::detectors::DetectorFailure;
    use crate::core::{Category, Language, Severity, DETECTOR_ERROR, DETECTOR_TIMEOUT};

    struct Failing;
    impl Detector for Failing {
        fn id(&self) -> &str {
            "always-fails"
        }
        fn category(&self) -> Category {
            Category::Maintainability
        }
        fn analyze(&self, _: &str, _: &FileMetadata) -> Result<Vec<Finding>, DetectorFailure> {
            Err(DetectorFailure::Failed("boom".into()))
        }
    }

    struct Panicking;
    impl Detector for Panicking {
        fn id(&self) -> &str {
            "panics"
        }
        fn category(&self) -> Category {
            Category::Performance
        }
        fn analyze(&self, _: &str, _: &FileMetadata) -> Result<Vec<Finding>, DetectorFailure> {
            panic!("detector bug")
        }
    }

    struct Slow;
    impl Detector for Slow {
        fn id(&self) -> &str {
            "slow"
        }
        fn category(&self) -> Category {
            Category::Security
        }
        fn analyze(&self, _: &str, _: &FileMetadata) -> Result<Vec<Finding>, DetectorFailure> {
            thread::sleep(Duration::from_secs(5));
            Ok(Vec::new())
        }
    }

    fn meta() -> FileMetadata {
        FileMetadata {
            path: "app.py".into(),
            language: Language::Python,
            size: 0,
        }
    }

    #[test]
    fn test_failures_become_diagnostic_findings() {
        let registry = DetectorRegistry::empty()
            .register(Arc::new(Failing))
            .register(Arc::new(Panicking))
            .register(Arc::new(DynamicEvalDetector));
        let findings = DetectorRunner::new(registry).run("eval(x)\n", &meta());

        assert_eq!(findings.len(), 3);
        assert_eq!(findings[0].rule, "dynamic-eval");
        assert_eq!(findings[0].severity, Severity::High);
        let diagnostics: Vec<_> = findings.iter().filter(|f| f.is_diagnostic()).collect();
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics.iter().all(|f| f.rule == DETECTOR_ERROR));
        assert!(diagnostics.iter().any(|f| f.message.contains("detector bug")));
    }

    #[test]
    fn test_timeout_does_not_block_other_detectors() {
        let registry = DetectorRegistry::empty()
            .register(Arc::new(Slow))
            .register(Arc::new(DynamicEvalDetector));
        let started = Instant::now();
        let findings = DetectorRunner::new(registry)
            .with_timeout(Duration::from_millis(200))
            .run("eval(x)\n", &meta());

        assert!(started.elapsed() < Duration::from_secs(4));
        assert_eq!(findings.len(), 2);
        let timeout = findings.iter().find(|f| f.rule == DETECTOR_TIMEOUT).unwrap();
        assert_eq!(timeout.detector, "slow");
        assert_eq!(timeout.category, Category::Security);
    }

    struct Misattributing;
    impl Detector for Misattributing {
        fn id(&self) -> &str {
            "custom-audit"
        }
        fn category(&self) -> Category {
            Category::Security
        }
        fn analyze(&self, _: &str, _: &FileMetadata) -> Result<Vec<Finding>, DetectorFailure> {
            Ok(vec![Finding::new(
                "someone-else",
                "audit",
                Category::Performance,
                Severity::Medium,
                "not/walked.py",
                "suspicious call",
            )
            .at_line(2)])
        }
    }

    #[test]
    fn test_findings_are_pinned_to_file_and_detector() {
        let registry = DetectorRegistry::empty().register(Arc::new(Misattributing));
        let findings = DetectorRunner::new(registry).run("x = 1\n", &meta());

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].path, "app.py");
        assert_eq!(findings[0].category, Category::Security);
        assert_eq!(findings[0].detector, "custom-audit");
        assert_eq!(findings[0].rule, "audit");
        assert_eq!(findings[0].start_line(), Some(2));
    }

    #[test]
    fn test_output_is_sorted() {
        let source = "password = \"hunter22\"\nfor i in range(len(x)):\n    eval(y)\n";
        let findings = DetectorRunner::new(DetectorRegistry::builtin()).run(source, &meta());
        let mut sorted = findings.clone();
        sorted.sort();
        assert_eq!(findings, sorted);
        assert_eq!(findings[0].severity, Severity::Critical);
    }
}

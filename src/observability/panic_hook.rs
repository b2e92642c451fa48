//! Panic hook printing a crash report with the analysis context.
//!
//! Detector threads are excluded: their panics are caught by the runner and
//! reported as `detector-error` findings, so only a one-line note is printed.

use super::context::{get_current_context, get_progress, AnalysisContext};
use std::panic::PanicHookInfo;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const DETECTOR_THREAD_PREFIX: &str = "detector-";

pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let thread = std::thread::current();
        match thread.name() {
            Some(name) if name.starts_with(DETECTOR_THREAD_PREFIX) => {
                tracing::debug!(
                    thread = name,
                    "Detector panicked: {}",
                    extract_panic_message(info)
                );
            }
            _ => print_crash_report(info),
        }
    }));
}

fn print_crash_report(info: &PanicHookInfo<'_>) {
    let context = get_current_context();
    let (processed, total) = get_progress();

    eprintln!();
    eprintln!("==== codetriage crash report ====");
    eprintln!("version:  {}", VERSION);
    eprintln!("platform: {}", std::env::consts::OS);
    eprintln!("time:     {}", chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC"));
    eprintln!("panic:    {}", truncate(&extract_panic_message(info), 200));
    if let Some(location) = info.location() {
        eprintln!(
            "location: {}:{}:{}",
            location.file(),
            location.line(),
            location.column()
        );
    }
    for line in context_lines(&context, processed, total) {
        eprintln!("{}", line);
    }
    if std::env::var("RUST_BACKTRACE").is_ok() {
        eprintln!("{}", std::backtrace::Backtrace::capture());
    } else {
        eprintln!("Run with RUST_BACKTRACE=1 for a stack trace");
    }
}

// Pure function: context section of the crash report
fn context_lines(context: &AnalysisContext, processed: usize, total: usize) -> Vec<String> {
    let mut lines = vec![match &context.phase {
        Some(phase) => format!("phase:    {}", phase),
        None => "phase:    (before analysis started)".to_string(),
    }];
    if let Some(file) = &context.current_file {
        lines.push(format!("file:     {}", file));
    }
    if total > 0 {
        lines.push(format!(
            "progress: {} / {} files ({}%)",
            processed,
            total,
            processed * 100 / total
        ));
    }
    lines
}

fn extract_panic_message(info: &PanicHookInfo<'_>) -> String {
    if let Some(s) = info.payload().downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = info.payload().downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::AnalysisPhase;

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ééééé", 4), "é...");
    }

    #[test]
    fn test_context_lines() {
        let context = AnalysisContext {
            phase: Some(AnalysisPhase::Detect),
            current_file: Some("src/db.py".into()),
        };
        let lines = context_lines(&context, 5, 10);
        assert_eq!(
            lines,
            vec![
                "phase:    detect".to_string(),
                "file:     src/db.py".to_string(),
                "progress: 5 / 10 files (50%)".to_string(),
            ]
        );
    }
}

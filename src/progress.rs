//! Progress bars for analysis runs.
//!
//! Bars are drawn on stderr only when it is a terminal and quiet mode is
//! off (`--quiet` or the `CODETRIAGE_QUIET` environment variable). In every
//! other case a hidden bar is returned so callers never branch on it.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub const TEMPLATE_FILE_ANALYSIS: &str = "{msg} {pos}/{len} files ({percent}%) - {eta}";
pub const TEMPLATE_SPINNER: &str = "{spinner} {msg} {pos}";

#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressConfig {
    pub quiet_mode: bool,
}

impl ProgressConfig {
    pub fn from_env(quiet: bool) -> Self {
        Self {
            quiet_mode: quiet || std::env::var_os("CODETRIAGE_QUIET").is_some(),
        }
    }

    pub fn hidden() -> Self {
        Self { quiet_mode: true }
    }

    pub fn should_show_progress(&self) -> bool {
        if self.quiet_mode {
            return false;
        }
        use std::io::IsTerminal;
        std::io::stderr().is_terminal()
    }

    /// Bar over a known number of files.
    pub fn file_bar(&self, len: u64, message: &str) -> ProgressBar {
        if !self.should_show_progress() {
            return ProgressBar::hidden();
        }
        let style = ProgressStyle::default_bar()
            .template(TEMPLATE_FILE_ANALYSIS)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        let bar = ProgressBar::new(len).with_style(style);
        bar.set_message(message.to_string());
        bar
    }

    /// Counter for work of unknown size, such as the walk.
    pub fn spinner(&self, message: &str) -> ProgressBar {
        if !self.should_show_progress() {
            return ProgressBar::hidden();
        }
        let style = ProgressStyle::default_spinner()
            .template(TEMPLATE_SPINNER)
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        let bar = ProgressBar::new_spinner().with_style(style);
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_mode_hides_bars() {
        let config = ProgressConfig::hidden();
        assert!(!config.should_show_progress());
        assert!(config.file_bar(10, "Analyzing").is_hidden());
    }
}

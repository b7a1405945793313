//! Waiting indicator for streamed replies

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner shown between a send and the first fragment of its reply
pub struct ReplySpinner {
    bar: Option<ProgressBar>,
}

impl ReplySpinner {
    /// Start spinning, unless `enabled` is false.
    pub fn start(enabled: bool, label: &str) -> Self {
        if !enabled {
            return Self { bar: None };
        }
        let bar = ProgressBar::new_spinner();
        bar.set_style(Self::spinner_style());
        bar.set_message(format!("{} is thinking", label));
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar: Some(bar) }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    pub fn is_spinning(&self) -> bool {
        self.bar.is_some()
    }

    /// Clear the spinner; later calls do nothing.
    pub fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

impl Drop for ReplySpinner {
    fn drop(&mut self) {
        self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_spinner_never_spins() {
        let spinner = ReplySpinner::start(false, "gpt-4o");
        assert!(!spinner.is_spinning());
    }

    #[test]
    fn test_finish_is_idempotent() {
        let mut spinner = ReplySpinner::start(true, "gpt-4o");
        assert!(spinner.is_spinning());
        spinner.finish();
        spinner.finish();
        assert!(!spinner.is_spinning());
    }
}

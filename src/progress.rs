// src/progress.rs

//! Download progress display
//!
//! [`TransferProgress`] turns the `(filename, transferred, total)` callbacks
//! emitted by [`crate::repository::SyncHandle`] into indicatif progress bars,
//! one per file. It is only installed when stdout is a terminal; piped
//! output gets a single "downloading" line per repository instead.

use indicatif::{ProgressBar, ProgressStyle};
use std::cell::RefCell;

const BAR_TEMPLATE: &str =
    "  {msg:<40} {bytes:>10}/{total_bytes:<10} [{bar:30.green/dim}] {percent:>3}%";
const SPINNER_TEMPLATE: &str = "  {msg:<40} {bytes:>10} {spinner:.cyan}";

/// Progress bars for sequential file downloads
#[derive(Default)]
pub struct TransferProgress {
    current: RefCell<Option<(String, ProgressBar)>>,
}

impl TransferProgress {
    pub fn new() -> Self {
        Self::default()
    }

    fn new_bar(filename: &str, total: u64) -> ProgressBar {
        let (bar, template) = if total > 0 {
            (ProgressBar::new(total), BAR_TEMPLATE)
        } else {
            (ProgressBar::new_spinner(), SPINNER_TEMPLATE)
        };
        let style = ProgressStyle::default_bar()
            .template(template)
            .map(|s| s.progress_chars("##-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        bar.set_message(filename.to_string());
        bar
    }

    /// Record `xfer` of `total` bytes for `filename`
    ///
    /// A new filename, or a transfer restarting at zero (the next mirror),
    /// abandons the previous bar and starts another.
    pub fn update(&self, filename: &str, xfer: u64, total: u64) {
        let mut current = self.current.borrow_mut();

        let same_file = matches!(current.as_ref(), Some((name, _)) if name == filename);
        if !same_file || xfer == 0 {
            if let Some((_, bar)) = current.take() {
                bar.abandon();
            }
            *current = Some((filename.to_string(), Self::new_bar(filename, total)));
        }

        if let Some((_, bar)) = current.as_ref() {
            bar.set_position(xfer);
            if total > 0 && xfer >= total {
                bar.finish();
            }
        }
    }

    /// Name of the file currently being displayed
    pub fn current_file(&self) -> Option<String> {
        self.current.borrow().as_ref().map(|(name, _)| name.clone())
    }
}

impl Drop for TransferProgress {
    fn drop(&mut self) {
        if let Some((_, bar)) = self.current.get_mut().take() {
            if !bar.is_finished() {
                bar.abandon();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_switches_bar_per_file() {
        let progress = TransferProgress::new();
        assert_eq!(progress.current_file(), None);

        progress.update("core.files", 0, 100);
        progress.update("core.files", 50, 100);
        assert_eq!(progress.current_file().as_deref(), Some("core.files"));

        progress.update("extra.files", 0, 0);
        assert_eq!(progress.current_file().as_deref(), Some("extra.files"));
    }

    #[test]
    fn test_restart_from_next_mirror_resets_bar() {
        let progress = TransferProgress::new();
        progress.update("core.files", 0, 100);
        progress.update("core.files", 40, 100);

        // Next mirror serves the same file without a length
        progress.update("core.files", 0, 0);

        let current = progress.current.borrow();
        let (_, bar) = current.as_ref().unwrap();
        assert_eq!(bar.length(), None);
        assert_eq!(bar.position(), 0);
        assert!(!bar.is_finished());
    }

    #[test]
    fn test_finishes_at_total() {
        let progress = TransferProgress::new();
        progress.update("core.files", 100, 100);

        let current = progress.current.borrow();
        let (_, bar) = current.as_ref().unwrap();
        assert!(bar.is_finished());
    }
}

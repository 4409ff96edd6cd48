//! Progress bar display for downloads

use std::io::Read;

use indicatif::{ProgressBar, ProgressBarIter, ProgressStyle};

/// Progress display for a single download
///
/// Draws to stderr and stays hidden when stderr is not a terminal.
pub struct DownloadProgress {
    pb: ProgressBar,
}

impl DownloadProgress {
    /// Bar when the size is known, spinner otherwise
    pub fn new(total_bytes: Option<u64>, name: &str) -> Self {
        let pb = match total_bytes {
            Some(total) => {
                let style = ProgressStyle::default_bar()
                    .template("[{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-");
                let pb = ProgressBar::new(total);
                pb.set_style(style);
                pb
            }
            None => {
                let style = ProgressStyle::default_spinner()
                    .template("{spinner:.green} {bytes} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner());
                let pb = ProgressBar::new_spinner();
                pb.set_style(style);
                pb
            }
        };
        pb.set_message(name.to_string());
        Self { pb }
    }

    /// Wrap a reader so every read advances the bar
    pub fn wrap<R: Read>(&self, reader: R) -> ProgressBarIter<R> {
        self.pb.wrap_read(reader)
    }

    /// Clear the bar after a complete download
    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }

    /// Leave the bar where it stopped
    pub fn abandon(&self) {
        self.pb.abandon();
    }
}

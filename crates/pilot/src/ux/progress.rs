use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner shown while a completion request is in flight.
#[derive(Debug)]
pub struct GenerationSpinner {
    spinner: ProgressBar,
}

impl GenerationSpinner {
    pub fn new(msg: String) -> Self {
        let style = ProgressStyle::with_template("{spinner:.blue} {msg}")
            .unwrap()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ");
        let spinner = ProgressBar::new_spinner().with_style(style).with_message(msg);
        spinner.enable_steady_tick(Duration::from_millis(100));

        Self { spinner }
    }

    pub fn clear(&self) {
        self.spinner.finish_and_clear();
    }
}

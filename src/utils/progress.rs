//! Progress indicators for in-flight API requests

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::IsTerminal;
use std::time::Duration;

/// Create a spinner for indeterminate operations.
/// Hidden when stderr is not a terminal so piped output stays clean.
pub fn create_spinner(message: &str) -> ProgressBar {
    if !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Spinner that clears itself when dropped, including on the error path
pub struct RequestProgress {
    pb: ProgressBar,
}

impl RequestProgress {
    pub fn new(message: &str) -> Self {
        Self {
            pb: create_spinner(message),
        }
    }
}

impl Drop for RequestProgress {
    fn drop(&mut self) {
        self.pb.finish_and_clear();
    }
}

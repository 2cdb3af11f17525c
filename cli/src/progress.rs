use indicatif::{ProgressBar, ProgressStyle};
use pixfix::{BatchOutcome, BatchProgress};

/// A progress bar over the images of a batch
pub struct BatchBar {
    pb: ProgressBar,
}

impl BatchBar {
    pub fn new(total: usize) -> Self {
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
                .progress_chars("##-"),
        );

        Self { pb }
    }
}

impl Drop for BatchBar {
    fn drop(&mut self) {
        self.pb.finish();
    }
}

impl BatchProgress for BatchBar {
    fn job_done(&self, outcome: &BatchOutcome, completed: usize, _total: usize) {
        let name = outcome
            .job
            .input
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        if let Err(ref err) = outcome.result {
            self.pb.println(format!("skipped {}: {}", name, err));
        }

        self.pb.set_message(&name);
        self.pb.set_position(completed as u64);
    }
}

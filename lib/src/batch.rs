use crate::{is_supported_image, Error, ImageSource, InpaintStats, Session};
use log::{info, warn};
use std::path::{Path, PathBuf};

/// A single image to treat, and where to save the result
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchJob {
    pub input: PathBuf,
    pub output: PathBuf,
}

impl BatchJob {
    /// A job saving `input` under the same file name in `out_dir`
    pub fn in_dir(input: PathBuf, out_dir: &Path) -> Self {
        let output = match input.file_name() {
            Some(name) => out_dir.join(name),
            None => out_dir.to_owned(),
        };

        Self { input, output }
    }
}

/// The result of a `BatchJob`. A failed job doesn't stop the batch.
#[derive(Debug)]
pub struct BatchOutcome {
    pub job: BatchJob,
    pub result: Result<InpaintStats, Error>,
}

/// Notified after every completed job, from whichever worker completed it
pub trait BatchProgress: Sync {
    fn job_done(&self, outcome: &BatchOutcome, completed: usize, total: usize);
}

impl<F> BatchProgress for F
where
    F: Fn(&BatchOutcome, usize, usize) + Sync,
{
    fn job_done(&self, outcome: &BatchOutcome, completed: usize, total: usize) {
        self(outcome, completed, total)
    }
}

fn sorted_files(dir: &Path) -> Result<Vec<PathBuf>, Error> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }

    files.sort();
    Ok(files)
}

/// Finds the reference image of a directory, the first file whose name
/// starts with `ref.`, ignoring case.
pub fn find_reference(dir: &Path) -> Result<PathBuf, Error> {
    sorted_files(dir)?
        .into_iter()
        .find(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .map_or(false, |name| name.to_ascii_lowercase().starts_with("ref."))
        })
        .ok_or_else(|| Error::MissingReference(dir.to_owned()))
}

/// Every supported image in `dir` apart from `reference`, sorted by name
pub fn collect_targets(dir: &Path, reference: &Path) -> Result<Vec<PathBuf>, Error> {
    let reference_name = reference.file_name();

    Ok(sorted_files(dir)?
        .into_iter()
        .filter(|path| path.file_name() != reference_name)
        .filter(|path| is_supported_image(path))
        .collect())
}

impl Session {
    /// Treats and saves every job, running up to `max_thread_count` jobs at
    /// a time. Outcomes are returned in the order of `jobs`.
    ///
    /// Only a panicking worker fails the whole batch, an image that can't be
    /// read, treated or saved is reported in its outcome.
    pub fn treat_batch(
        &self,
        jobs: &[BatchJob],
        progress: Option<&dyn BatchProgress>,
    ) -> Result<Vec<BatchOutcome>, Error> {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let total = jobs.len();
        let n_workers = self.thread_count().min(total).max(1);

        // Keep track of which job to hand out next, and how many are done
        let next_job = AtomicUsize::new(0);
        let completed = AtomicUsize::new(0);

        let worker_fn = || {
            let mut mine = Vec::new();

            loop {
                let i = next_job.fetch_add(1, Ordering::Relaxed);
                if i >= total {
                    break;
                }

                let job = &jobs[i];
                let outcome = BatchOutcome {
                    job: job.clone(),
                    result: self.run_job(job),
                };

                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                if let Some(progress) = progress {
                    progress.job_done(&outcome, done, total);
                }

                mine.push((i, outcome));
            }

            mine
        };

        // for WASM we do not have threads, so run everything on this one
        #[cfg(target_arch = "wasm32")]
        let per_worker = vec![(worker_fn)()];

        #[cfg(not(target_arch = "wasm32"))]
        let per_worker = crossbeam_utils::thread::scope(|scope| {
            let handles: Vec<_> = (0..n_workers)
                .map(|_| scope.spawn(|_| (worker_fn)()))
                .collect();

            handles
                .into_iter()
                .map(|handle| handle.join())
                .collect::<Result<Vec<_>, _>>()
        })
        .map_err(|_| Error::WorkerPanicked)?
        .map_err(|_| Error::WorkerPanicked)?;

        let mut outcomes: Vec<_> = per_worker.into_iter().flatten().collect();
        outcomes.sort_by_key(|(i, _)| *i);

        let failed = outcomes.iter().filter(|(_, o)| o.result.is_err()).count();
        info!(
            "treated {} of {} images with {} workers",
            total - failed,
            total,
            n_workers
        );

        Ok(outcomes.into_iter().map(|(_, outcome)| outcome).collect())
    }

    fn run_job(&self, job: &BatchJob) -> Result<InpaintStats, Error> {
        let result = self
            .treat(ImageSource::from_path(&job.input))
            .and_then(|treated| {
                treated.save(&job.output)?;
                Ok(*treated.stats())
            });

        match &result {
            Ok(stats) => info!(
                "saved treated image to {} ({} pixels, {} passes)",
                job.output.display(),
                stats.initial,
                stats.passes
            ),
            Err(err) => warn!("could not treat {}: {}", job.input.display(), err),
        }

        result
    }
}

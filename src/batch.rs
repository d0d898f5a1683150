//! Parallel execution of independent load requests on a rayon thread pool.

use std::path::PathBuf;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::{IngestionError, IngestionResult};
use crate::ingestion::{Decoded, IngestionOptions, IngestionRequest};
use crate::pipeline::{profile_request, TableReport};

/// Configuration for the [`BatchRunner`].
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Number of worker threads.
    ///
    /// If `None`, uses the platform's available parallelism.
    pub num_threads: Option<usize>,
}

/// Result of one request in a batch.
#[derive(Debug)]
pub struct BatchOutcome<T> {
    /// Location of the request, for labeling.
    pub location: String,
    pub result: IngestionResult<T>,
}

/// Runs independent requests concurrently. Requests share no mutable state; each failure
/// stays with its own request.
pub struct BatchRunner {
    pool: ThreadPool,
}

impl BatchRunner {
    pub fn new(opts: BatchOptions) -> IngestionResult<Self> {
        let n_threads = opts
            .num_threads
            .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
            .max(1);

        let pool = ThreadPoolBuilder::new()
            .num_threads(n_threads)
            .thread_name(|i| format!("tabular-intake-{i}"))
            .build()
            .map_err(|e| IngestionError::DataLoading {
                message: format!("failed to build thread pool: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self { pool })
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Load every request; outcomes are in request order.
    pub fn load_all(&self, requests: &[IngestionRequest]) -> Vec<BatchOutcome<Decoded>> {
        self.run(requests, IngestionRequest::run)
    }

    /// Load and profile every request; outcomes are in request order.
    pub fn profile_all(&self, requests: &[IngestionRequest]) -> Vec<BatchOutcome<Vec<TableReport>>> {
        self.run(requests, profile_request)
    }

    fn run<T, F>(&self, requests: &[IngestionRequest], job: F) -> Vec<BatchOutcome<T>>
    where
        T: Send,
        F: Fn(&IngestionRequest) -> IngestionResult<T> + Send + Sync,
    {
        tracing::info!(requests = requests.len(), threads = self.num_threads(), "starting batch");
        self.pool.install(|| {
            requests
                .par_iter()
                .map(|req| BatchOutcome {
                    location: req.location().to_string(),
                    result: job(req),
                })
                .collect()
        })
    }
}

/// One local-file request per regular file matching `pattern`, in path order.
pub fn requests_from_glob(
    pattern: &str,
    options: &IngestionOptions,
) -> IngestionResult<Vec<IngestionRequest>> {
    let paths = glob::glob(pattern).map_err(|e| IngestionError::DataLoading {
        message: format!("invalid glob pattern '{pattern}': {e}"),
        source: Some(Box::new(e)),
    })?;

    let mut files: Vec<PathBuf> = Vec::new();
    for entry in paths {
        let path = entry.map_err(|e| IngestionError::from(std::io::Error::from(e)))?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    Ok(files
        .into_iter()
        .map(|p| IngestionRequest::local(p).with_options(options.clone()))
        .collect())
}

//! Batch relocation: one independent relocation per id, in order.
//! A failing item is recorded and the batch moves on; only a shutdown request stops it early.

use tracing::{debug, warn};

use crate::errors::DatumError;
use crate::model::LogicalPath;
use crate::relocate::{DocumentRelocator, RelocateOptions, Relocation};
use crate::shutdown;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    pub id: String,
    pub code: u16,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub succeeded: Vec<Relocation>,
    pub failed: Vec<BatchFailure>,
    /// Ids not attempted because a shutdown was requested.
    pub skipped: Vec<String>,
    pub interrupted: bool,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len() + self.skipped.len()
    }

    pub fn all_ok(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }
}

/// Relocate every id from `source` to `destination`, collecting per-item outcomes.
pub async fn relocate_many<I, S>(
    relocator: &DocumentRelocator,
    source: &LogicalPath,
    destination: &LogicalPath,
    ids: I,
    options: RelocateOptions,
) -> BatchReport
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut report = BatchReport::default();
    for id in ids {
        let id = id.as_ref();
        if shutdown::is_requested() {
            report.interrupted = true;
            report.skipped.push(id.to_string());
            continue;
        }
        match relocator.relocate(source, destination, id, options).await {
            Ok(done) => {
                debug!(id, to = %done.to, "batch item relocated");
                report.succeeded.push(done);
            }
            Err(e) => {
                warn!(id, code = e.code(), kind = e.kind(), error = %e, "batch item failed");
                report.failed.push(failure(id, &e));
            }
        }
    }
    report
}

fn failure(id: &str, e: &DatumError) -> BatchFailure {
    BatchFailure {
        id: id.to_string(),
        code: e.code(),
        message: e.to_string(),
    }
}

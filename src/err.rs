//! Error type and helper functions.

use nix::errno::Errno;
use thiserror::Error;

use crate::stage::Stage;

/// The only way the launcher fails: some stage of the pipeline was
/// rejected by the system.  Every instance is fatal.
#[derive(Debug, Error)]
#[error("{stage}: {detail}: {cause}")]
pub struct LaunchError {
    pub stage: Stage,
    pub detail: String,
    #[source]
    pub cause: Errno,
}

impl LaunchError {
    pub fn new(stage: Stage, detail: String, cause: Errno) -> LaunchError {
        LaunchError { stage: stage, detail: detail, cause: cause }
    }
}

pub fn map_nix_err(stage: Stage, cause: Errno, detail: String) -> LaunchError {
    LaunchError::new(stage, detail, cause)
}

/// A name lookup that completed but found nothing.
pub fn map_not_found(stage: Stage, detail: String) -> LaunchError {
    LaunchError::new(stage, detail, Errno::ENOENT)
}

/// A string that cannot be handed to the C library (interior NUL).
pub fn map_nul_err(stage: Stage, detail: String) -> LaunchError {
    LaunchError::new(stage, detail, Errno::EINVAL)
}

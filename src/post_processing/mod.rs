//! Final stages of a collection run
//!
//! 1. Compress - bundle the output directory into `chaos_data_<timestamp>.tar.gz`
//! 2. Cleanup - remove the working directory (downloads and extracted trees)

mod cleanup;
mod compress;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use cleanup::cleanup_work_dir;
pub use compress::{BUNDLE_PREFIX, bundle_candidates, bundle_name, compress_output};

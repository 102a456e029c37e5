#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! File acquisition for plaudit
//!
//! Builds the installed manifest from the registry snapshot and fetches
//! each plugin's `package.json`/`package-lock.json` through the
//! conditional fetch cache.

mod acquirer;
mod registry;

pub use acquirer::{AcquireStatus, ManifestAcquirer};
pub use registry::{build_records, load_registry};

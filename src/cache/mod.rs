//! Change tracking across runs: fingerprints, their persisted index, and
//! where that index lives.

pub mod atomic_io;
pub mod cache_location;
pub mod fingerprint;
pub mod tracker;

pub use cache_location::{CacheLocation, CacheStrategy};
pub use fingerprint::Fingerprint;
pub use tracker::{ChangeTracker, PreCheck, TrackedEntry};

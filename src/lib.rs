//! gcpsweep sweeps a Google Cloud project clean: it discovers the project's
//! environment, lists every registered resource type in dependency order,
//! and deletes what it finds (after a dry run by default).
//!
//! The library surface exists for the `gcpsweep` binary and for integration
//! tests; [`resources::builtin_registry`] plus [`sweep::Sweeper`] is the
//! whole engine.

pub mod config;
pub mod gcp;
pub mod resources;
pub mod sweep;

/// Version injected at compile time via GCPSWEEP_VERSION env var (set by
/// CI/CD), or the crate version for local builds.
pub const VERSION: &str = match option_env!("GCPSWEEP_VERSION") {
    Some(v) => v,
    None => env!("CARGO_PKG_VERSION"),
};

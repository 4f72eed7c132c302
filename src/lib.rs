//! phase-times - binned compiler phase timing profiles
//!
//! Reads a build log produced with per-phase SSA timing enabled, groups the
//! timings by configuration (the toolchain root each build ran under) and by
//! compilation, ranks compilations by total time, and writes one normalized
//! report per configuration so phases that scale badly with compilation size
//! stand out.

pub mod aggregate;
pub mod analyzer;
pub mod binning;
pub mod cli;
pub mod config;
pub mod error;
pub mod intern;
pub mod parser;
pub mod phase_index;
pub mod report;
pub mod summary;

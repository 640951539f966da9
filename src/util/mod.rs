//! Utility modules: atomic file persistence.

pub mod fs;

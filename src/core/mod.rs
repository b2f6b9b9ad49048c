//! Core engine: config, asset resolution, hashing orchestration and
//! manifest assembly.

pub mod assemble;
pub mod config;
pub mod error;
pub mod format;
pub mod index;
pub mod manifest;
pub mod matcher;
pub mod provider;

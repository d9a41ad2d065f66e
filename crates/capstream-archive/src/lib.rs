#![warn(missing_docs)]

//! CapStream archive subsystem: assembles a multi-entry zip archive by
//! streaming decompressed content from compressed sources, with per-entry
//! failure isolation and a partial-success report.

pub mod assembler;
pub mod error;

pub use assembler::{
    ArchiveAssembler, ArchiveEntry, ArchiveReport, AssembleConfig, EntryFailure, EntrySource,
};
pub use error::{ArchiveError, Result};

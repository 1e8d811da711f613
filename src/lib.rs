//! Decoder for JVM heap dumps in the binary HPROF format.
//!
//! A dump is decoded in a single pass into a [`Snapshot`]: classes, heap objects, GC roots and
//! allocation stack traces, cross-referenced by heap id. Instance fields and array elements are
//! only located during the pass and decoded on demand through [`LoadedDump`].

pub mod args;
pub mod errors;
pub mod model;
pub mod options;
pub mod parser;
pub mod slurp;
pub mod snapshot;
pub mod utils;

pub use crate::errors::HprofGraphError;
pub use crate::options::DecodeOptions;
pub use crate::parser::record_parser::{decode, DecodeOutcome};
pub use crate::slurp::{slurp_bytes, slurp_file, LoadedDump};
pub use crate::snapshot::Snapshot;

//! Output table generation.

pub mod emitter;
pub mod writer;

pub use emitter::emit_table;
pub use writer::{generate_csv, generate_json, save};

//! Sparse export decoding.
//!
//! Turns one raw query response into a year axis, a month dictionary and
//! a column-keyed entity table.

pub mod axis;
pub mod numeric;
pub mod path;
pub mod rows;

pub use rows::decode_document;

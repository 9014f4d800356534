//! Sensitive-Word Dictionary Compiler
//!
//! This crate turns word-list text into a ready-to-query filter.

pub mod parser;
pub mod optimizer;
pub mod builder;

pub use builder::{build_filter, Variant};
pub use optimizer::{optimize_words, OptimizeStats};
pub use parser::parse_dictionary;

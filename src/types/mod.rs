// Type definitions for the document fraud-scoring pipeline

pub mod check;
pub mod common;
pub mod document;
pub mod report;

pub use check::*;
pub use common::*;
pub use document::*;
pub use report::*;

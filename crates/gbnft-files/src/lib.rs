//! File-side plumbing around the transfer engines: loading the files to
//! send, the reference catalog on the receiving side, and the result log
//! that records which catalog entry each delivered file matched.

pub mod catalog;
pub mod matcher;

pub use catalog::{Catalog, FileBlob, compare, read_names_from_file};
pub use matcher::{CatalogMatcher, MatchLog};

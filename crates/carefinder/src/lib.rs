//! CareFinder: retrieval-augmented question answering over Ghanaian
//! healthcare facility records.

pub mod config;
pub mod server;

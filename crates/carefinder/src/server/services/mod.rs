pub mod context;
pub mod deserts;
pub mod embeddings;
pub mod generation;
pub mod index;
pub mod observer;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod planning;
pub mod retrieval;
pub mod store;
pub mod text_query;

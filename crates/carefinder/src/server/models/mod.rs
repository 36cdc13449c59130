pub mod conversation;
pub mod facility;
pub mod plan;

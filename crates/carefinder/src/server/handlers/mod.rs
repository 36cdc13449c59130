pub mod analysis;
pub mod chat;
pub mod experiments;
pub mod facilities;
pub mod logs;
pub mod plans;
pub mod query;
pub mod status;

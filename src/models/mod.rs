pub mod error;
pub mod message;
pub mod state;
pub mod task;

pub mod launcher;
pub mod process;
pub mod relay;
pub mod worker;

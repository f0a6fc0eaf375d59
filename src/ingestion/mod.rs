pub mod collector;
pub mod error;

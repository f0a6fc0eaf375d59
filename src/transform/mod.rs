pub mod cleaning;
pub mod curated;
pub mod engine;
pub mod error;
pub mod raw_loader;

pub mod auth;
pub mod bigquery;
pub mod client;
pub mod error;
#[cfg(test)]
pub(crate) mod fake;
pub mod loader;

pub mod admin;
pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod session;
pub mod types;

pub use error::ClientError;

#[cfg(test)]
pub mod testing;

#![warn(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious
)]

mod schema;

pub use schema::{AssistantConfig, Config, DatabaseConfig, MemoryConfig};

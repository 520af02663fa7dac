#![warn(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation
)]

mod dedup;
mod memory;
mod registry;
mod store;

pub use dedup::DuplicateGuard;
pub use gyanika_core::ConversationStore;
pub use memory::{AppendOutcome, MemoryError, MemoryOptions, SessionMemory};
pub use registry::MemoryRegistry;
pub use store::PostgresStore;

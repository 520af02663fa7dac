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

//! sea-orm entity definitions for the conversation store schema.

pub mod conversations;
pub mod messages;
pub mod users;

//! HTTP request handlers.

pub mod health;
pub mod search;
pub mod wallet;

pub use health::{health, root};

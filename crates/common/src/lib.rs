//! Shared identifiers and error helpers used across all lcbot crates.

pub mod error;
pub mod types;

pub use {
    error::FromMessage,
    types::{AgentId, ChatId, LicenseId, SubscriptionId},
};

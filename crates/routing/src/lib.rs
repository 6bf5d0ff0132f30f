//! Agent routing and chat assignment for installed licenses.
//!
//! Each installed license owns an [`AgentRegistry`] of bot agents; each agent
//! tracks the chats it currently owns. Inbound pushes flow through the
//! [`Router`]:
//! 1. Resolve the license
//! 2. Look up the agent owning the chat
//! 3. On a miss, pick an agent not yet in the chat and transfer the chat to it
//! 4. Record ownership and reply as the owning agent
//!
//! [`BotManager`] drives the install/uninstall lifecycle around it.

pub mod agent;
pub mod error;
pub mod license;
pub mod manager;
pub mod provisioner;
pub mod registry;
pub mod reply;
pub mod router;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_support;

pub use {
    agent::AgentRecord,
    error::{Error, Result},
    license::{LicenseEntry, LicenseRegistry},
    manager::{BotManager, ManagerConfig},
    provisioner::Provisioner,
    registry::AgentRegistry,
    router::Router,
};

//! Gateway: the inbound HTTP surface of the bot.
//!
//! Lifecycle:
//! 1. Bind the listener
//! 2. Serve install callbacks, OAuth callbacks and platform pushes
//! 3. On Ctrl-C/SIGTERM arm the force-exit watchdog, uninstall every
//!    license, then drain in-flight requests
//!
//! Routing and license state live in `lcbot-routing`; handlers here only
//! decode requests and map results to HTTP responses.

pub mod error;
pub mod server;
pub mod shutdown;

pub use {
    error::ApiError,
    server::{AppState, build_app, serve, start_gateway},
};

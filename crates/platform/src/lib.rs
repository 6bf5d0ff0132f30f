//! Client side of the chat platform: the API surface the bot calls, the
//! OAuth token it calls with, and the push payloads the platform sends back.

pub mod api;
pub mod auth;
pub mod client;
pub mod error;
pub mod http;
pub mod push;

pub use {
    auth::{OAuthClient, TokenStore},
    client::{PlatformClient, RoutingStatus, WebhookRegistration, WebhookScope},
    error::{Error, Result},
    http::HttpPlatformClient,
    push::{ChatEvent, ChatUser, LifecycleAction, LifecycleEvent, Push, PushEvent},
};

use std::time::Duration;

use {
    async_trait::async_trait,
    lcbot_common::{AgentId, ChatId, SubscriptionId},
    reqwest::header::ACCEPT,
    secrecy::ExposeSecret,
    serde::{
        Serialize,
        de::{DeserializeOwned, IgnoredAny},
    },
    tracing::{debug, warn},
};

use crate::{
    api::{self, ErrorEnvelope},
    auth::TokenStore,
    client::{PlatformClient, RoutingStatus, WebhookRegistration},
    error::{Context, Error, Result},
};

/// [`PlatformClient`] over the platform's HTTPS APIs.
pub struct HttpPlatformClient {
    http: reqwest::Client,
    api_url: String,
    client_id: String,
    tokens: TokenStore,
}

impl HttpPlatformClient {
    /// Build a client whose every call is bounded by `timeout`.
    pub fn new(
        api_url: impl Into<String>,
        client_id: impl Into<String>,
        timeout: Duration,
        tokens: TokenStore,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("lcbot/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_http(http, api_url, client_id, tokens))
    }

    pub fn with_http(
        http: reqwest::Client,
        api_url: impl Into<String>,
        client_id: impl Into<String>,
        tokens: TokenStore,
    ) -> Self {
        Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            client_id: client_id.into(),
            tokens,
        }
    }

    /// Shared HTTP client, reused for the OAuth exchange.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    async fn call<B, R>(&self, endpoint: &str, body: &B, author: Option<&AgentId>) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let token = self.tokens.current().ok_or(Error::Unauthorized)?;
        let url = format!("{}{endpoint}", self.api_url);

        let mut req = self
            .http
            .post(&url)
            .bearer_auth(token.expose_secret())
            .header(ACCEPT, "application/json")
            .json(body);
        if let Some(author) = author {
            req = req.header(api::AUTHOR_HEADER, author.as_str());
        }

        debug!(endpoint, author = ?author.map(AgentId::as_str), "platform call");
        let resp = req.send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;

        if !status.is_success() {
            let err = decode_error(status.as_u16(), &bytes);
            warn!(endpoint, status = status.as_u16(), error = %err, "platform call failed");
            return Err(err);
        }

        let bytes: &[u8] = if bytes.is_empty() {
            b"null"
        } else {
            &bytes
        };
        serde_json::from_slice(bytes).with_context(|| format!("decode {endpoint} response"))
    }
}

fn decode_error(status: u16, body: &[u8]) -> Error {
    match serde_json::from_slice::<ErrorEnvelope>(body) {
        Ok(envelope) => Error::Api {
            status,
            kind: envelope.error.kind,
            message: envelope.error.message,
        },
        Err(_) => Error::Api {
            status,
            kind: "unknown".into(),
            message: String::from_utf8_lossy(body).trim().to_string(),
        },
    }
}

#[async_trait]
impl PlatformClient for HttpPlatformClient {
    async fn create_bot(&self, name: &str) -> Result<AgentId> {
        let body = api::CreateBotRequest {
            name,
            owner_client_id: &self.client_id,
        };
        let resp: api::IdResponse = self.call(api::CREATE_BOT, &body, None).await?;
        Ok(AgentId::new(resp.id))
    }

    async fn delete_bot(&self, agent: &AgentId) -> Result<()> {
        let body = api::IdRequest {
            id: agent.as_str(),
        };
        let _: IgnoredAny = self.call(api::DELETE_BOT, &body, None).await?;
        Ok(())
    }

    async fn list_bots(&self, all: bool) -> Result<Vec<AgentId>> {
        let bots: Vec<api::BotSummary> = self
            .call(api::LIST_BOTS, &api::ListBotsRequest { all }, None)
            .await?;
        Ok(bots.into_iter().map(|b| AgentId::new(b.id)).collect())
    }

    async fn set_routing_status(&self, agent: &AgentId, status: RoutingStatus) -> Result<()> {
        let body = api::SetRoutingStatusRequest {
            agent_id: agent.as_str(),
            status,
        };
        let _: IgnoredAny = self
            .call(api::SET_ROUTING_STATUS, &body, Some(agent))
            .await?;
        Ok(())
    }

    async fn register_webhook(&self, webhook: &WebhookRegistration) -> Result<SubscriptionId> {
        let body = api::RegisterWebhookRequest {
            action: &webhook.action,
            secret_key: &webhook.secret_key,
            url: &webhook.url,
            scope: webhook.scope,
            owner_client_id: &self.client_id,
        };
        let resp: api::IdResponse = self.call(api::REGISTER_WEBHOOK, &body, None).await?;
        Ok(SubscriptionId::new(resp.id))
    }

    async fn unregister_webhook(&self, id: &SubscriptionId) -> Result<()> {
        let body = api::UnregisterWebhookRequest {
            id: id.as_str(),
            owner_client_id: &self.client_id,
        };
        let _: IgnoredAny = self.call(api::UNREGISTER_WEBHOOK, &body, None).await?;
        Ok(())
    }

    async fn enable_license_webhooks(&self) -> Result<()> {
        let body = api::OwnerRequest {
            owner_client_id: &self.client_id,
        };
        let _: IgnoredAny = self
            .call(api::ENABLE_LICENSE_WEBHOOKS, &body, None)
            .await?;
        Ok(())
    }

    async fn disable_license_webhooks(&self) -> Result<()> {
        let body = api::OwnerRequest {
            owner_client_id: &self.client_id,
        };
        let _: IgnoredAny = self
            .call(api::DISABLE_LICENSE_WEBHOOKS, &body, None)
            .await?;
        Ok(())
    }

    async fn transfer_chat(&self, chat: &ChatId, target: &AgentId, force: bool) -> Result<()> {
        let body = api::TransferChatRequest {
            id: chat.as_str(),
            target: api::TransferTarget {
                kind: "agent",
                ids: [target.as_str()],
            },
            force,
        };
        let _: IgnoredAny = self.call(api::TRANSFER_CHAT, &body, None).await?;
        Ok(())
    }

    async fn send_event(&self, chat: &ChatId, author: &AgentId, text: &str) -> Result<()> {
        let body = api::SendEventRequest {
            chat_id: chat.as_str(),
            event: api::MessageEvent {
                kind: "message",
                text,
                visibility: "all",
            },
        };
        let _: IgnoredAny = self.call(api::SEND_EVENT, &body, Some(author)).await?;
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};

    use {
        axum::{
            Json, Router,
            extract::{Path, State},
            http::{HeaderMap, StatusCode},
            response::IntoResponse,
            routing::post,
        },
        secrecy::Secret,
    };

    #[derive(Debug, Clone)]
    struct Captured {
        path: String,
        authorization: Option<String>,
        author: Option<String>,
        body: serde_json::Value,
    }

    type Log = Arc<Mutex<Vec<Captured>>>;

    async fn record(
        State(log): State<Log>,
        Path((group, action)): Path<(String, String)>,
        headers: HeaderMap,
        Json(body): Json<serde_json::Value>,
    ) -> axum::response::Response {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        log.lock().unwrap().push(Captured {
            path: format!("/{group}/action/{action}"),
            authorization: header("authorization"),
            author: header("x-author-id"),
            body: body.clone(),
        });

        match action.as_str() {
            "create_bot" => Json(serde_json::json!({"id": "bot-new"})).into_response(),
            "register_webhook" => Json(serde_json::json!({"id": "wh-1"})).into_response(),
            "list_bots" => Json(serde_json::json!([
                {"id": "bot-a", "name": "A"},
                {"id": "bot-b"}
            ]))
            .into_response(),
            "transfer_chat" if body["id"] == "busy" => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(serde_json::json!({"error": {
                    "type": "validation",
                    "message": "One or more of requested agents are already present in the chat"
                }})),
            )
                .into_response(),
            "delete_bot" => StatusCode::OK.into_response(),
            "send_event" if body["chat_id"] == "broken" => {
                (StatusCode::BAD_GATEWAY, "upstream exploded").into_response()
            },
            _ => Json(serde_json::json!({})).into_response(),
        }
    }

    async fn start_mock() -> (String, Log) {
        let log: Log = Arc::default();
        let app = Router::new()
            .route("/{group}/action/{action}", post(record))
            .with_state(Arc::clone(&log));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), log)
    }

    fn client(base: &str) -> HttpPlatformClient {
        HttpPlatformClient::new(
            base,
            "client-1",
            Duration::from_secs(5),
            TokenStore::with_token(Secret::new("tok".into())),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn create_bot_sends_owner_and_bearer() {
        let (base, log) = start_mock().await;
        let id = client(&base).create_bot("Helper").await.unwrap();
        assert_eq!(id.as_str(), "bot-new");

        let calls = log.lock().unwrap().clone();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].path, api::CREATE_BOT);
        assert_eq!(calls[0].authorization.as_deref(), Some("Bearer tok"));
        assert_eq!(calls[0].body["name"], "Helper");
        assert_eq!(calls[0].body["owner_client_id"], "client-1");
    }

    #[tokio::test]
    async fn list_bots_returns_ids_in_order() {
        let (base, log) = start_mock().await;
        let bots = client(&base).list_bots(true).await.unwrap();
        assert_eq!(bots, vec![AgentId::from("bot-a"), AgentId::from("bot-b")]);
        assert_eq!(log.lock().unwrap()[0].body["all"], true);
    }

    #[tokio::test]
    async fn send_event_sets_author_header() {
        let (base, log) = start_mock().await;
        client(&base)
            .send_event(&ChatId::from("c1"), &AgentId::from("bot-a"), "World!")
            .await
            .unwrap();

        let calls = log.lock().unwrap().clone();
        assert_eq!(calls[0].path, api::SEND_EVENT);
        assert_eq!(calls[0].author.as_deref(), Some("bot-a"));
        assert_eq!(calls[0].body["event"]["text"], "World!");
        assert_eq!(calls[0].body["event"]["type"], "message");
    }

    #[tokio::test]
    async fn empty_success_body_is_accepted() {
        let (base, _log) = start_mock().await;
        client(&base)
            .delete_bot(&AgentId::from("bot-a"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn structured_error_is_decoded() {
        let (base, _log) = start_mock().await;
        let err = client(&base)
            .transfer_chat(&ChatId::from("busy"), &AgentId::from("bot-a"), true)
            .await
            .unwrap_err();
        assert!(err.is_agent_already_present());
        assert!(matches!(err, Error::Api { status: 422, .. }));
    }

    #[tokio::test]
    async fn unstructured_error_keeps_body() {
        let (base, _log) = start_mock().await;
        let err = client(&base)
            .send_event(&ChatId::from("broken"), &AgentId::from("bot-a"), "hi")
            .await
            .unwrap_err();
        match err {
            Error::Api {
                status,
                kind,
                message,
            } => {
                assert_eq!(status, 502);
                assert_eq!(kind, "unknown");
                assert_eq!(message, "upstream exploded");
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_token_fails_before_sending() {
        let (base, log) = start_mock().await;
        let client = HttpPlatformClient::new(
            base.as_str(),
            "client-1",
            Duration::from_secs(5),
            TokenStore::new(),
        )
        .unwrap();
        let err = client.enable_license_webhooks().await.unwrap_err();
        assert!(matches!(err, Error::Unauthorized));
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn register_webhook_returns_subscription() {
        let (base, log) = start_mock().await;
        let id = client(&base)
            .register_webhook(&WebhookRegistration {
                action: "incoming_chat".into(),
                url: "https://bot.example.com/webhooks/incoming_chat".into(),
                secret_key: "hook".into(),
                scope: crate::client::WebhookScope::License,
            })
            .await
            .unwrap();
        assert_eq!(id.as_str(), "wh-1");
        let calls = log.lock().unwrap().clone();
        assert_eq!(calls[0].body["type"], "license");
        assert_eq!(calls[0].body["secret_key"], "hook");
    }
}

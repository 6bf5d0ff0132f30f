use std::sync::Arc;

use {
    lcbot_common::{AgentId, ChatId, LicenseId},
    lcbot_platform::{ChatEvent, ChatUser, PlatformClient, Push, PushEvent},
    tracing::{debug, info, warn},
};

use crate::{
    error::{Error, Result},
    license::{LicenseEntry, LicenseRegistry},
    reply::reply_for,
};

/// Dispatches inbound pushes to the agents of their license.
pub struct Router {
    licenses: Arc<LicenseRegistry>,
    platform: Arc<dyn PlatformClient>,
    author_id: String,
}

impl Router {
    /// `author_id` is the account the bot itself posts as; events it
    /// authored are never answered.
    pub fn new(
        licenses: Arc<LicenseRegistry>,
        platform: Arc<dyn PlatformClient>,
        author_id: impl Into<String>,
    ) -> Self {
        Self {
            licenses,
            platform,
            author_id: author_id.into(),
        }
    }

    pub async fn dispatch(&self, push: &Push) -> Result<()> {
        let license_id = push.license_id;
        debug!(%license_id, action = push.event.action(), "dispatching push");

        match &push.event {
            PushEvent::IncomingChat { chat_id } => {
                self.transfer_chat(license_id, chat_id).await.map(|_| ())
            },
            PushEvent::IncomingEvent { chat_id, event, .. } => {
                self.incoming_event(license_id, chat_id, event).await
            },
            PushEvent::UserAddedToChat { chat_id, user } => {
                self.user_added_to_chat(license_id, chat_id, user)
            },
            PushEvent::Unknown { action } => Err(Error::UnknownPushType {
                action: action.clone(),
            }),
        }
    }

    /// Hand `chat` to the first agent of the license not already in it and
    /// record that agent as the owner.
    pub async fn transfer_chat(&self, license_id: LicenseId, chat: &ChatId) -> Result<AgentId> {
        let entry = self.licenses.find(license_id)?;
        self.transfer_in(&entry, chat).await
    }

    async fn transfer_in(&self, entry: &LicenseEntry, chat: &ChatId) -> Result<AgentId> {
        let license_id = entry.license_id();
        let agent = entry.agents().find_by_chat_exclude(chat)?;
        let agent_id = agent.id().clone();

        match self.platform.transfer_chat(chat, &agent_id, true).await {
            Ok(()) => {},
            Err(e) if e.is_agent_already_present() => {
                debug!(%license_id, chat_id = %chat, agent_id = %agent_id, "agent already in chat");
            },
            Err(e) => return Err(e.into()),
        }

        if entry.agents().claim_chat(&agent_id, chat) {
            info!(%license_id, chat_id = %chat, agent_id = %agent_id, "chat assigned");
        } else {
            warn!(
                %license_id,
                chat_id = %chat,
                agent_id = %agent_id,
                "agent was removed during transfer, chat left unassigned"
            );
        }
        Ok(agent_id)
    }

    /// Answer a chat event as the agent owning the chat, transferring the
    /// chat first if nobody owns it yet.
    pub async fn incoming_event(
        &self,
        license_id: LicenseId,
        chat: &ChatId,
        event: &ChatEvent,
    ) -> Result<()> {
        if !event.is_message() {
            debug!(%license_id, chat_id = %chat, kind = %event.kind, "ignoring non-message event");
            return Ok(());
        }
        if event.author_id == self.author_id {
            debug!(%license_id, chat_id = %chat, "ignoring own message");
            return Ok(());
        }

        let entry = self.licenses.find(license_id)?;
        if entry.agents().contains(&AgentId::from(event.author_id.as_str())) {
            debug!(%license_id, chat_id = %chat, author_id = %event.author_id, "ignoring message from own agent");
            return Ok(());
        }

        // At most one transfer per event; a second miss means the assignment
        // was lost again in between.
        let mut transferred = false;
        let agent = loop {
            match entry.agents().find_by_chat(chat) {
                Ok(agent) => break agent,
                Err(Error::AgentNotFound { .. }) if !transferred => {
                    self.transfer_in(&entry, chat).await?;
                    transferred = true;
                },
                Err(Error::AgentNotFound { .. }) => {
                    return Err(Error::AssignmentRaceDetected {
                        chat_id: chat.clone(),
                    });
                },
                Err(e) => return Err(e),
            }
        };

        let text = reply_for(event.text.as_deref().unwrap_or_default());
        self.platform.send_event(chat, agent.id(), text).await?;
        debug!(%license_id, chat_id = %chat, agent_id = %agent.id(), "reply sent");
        Ok(())
    }

    /// A human agent joined: the bot no longer owns the chat.
    ///
    /// Customers joining and this license's own bots joining (which the
    /// platform reports after every transfer) are ignored.
    pub fn user_added_to_chat(
        &self,
        license_id: LicenseId,
        chat: &ChatId,
        user: &ChatUser,
    ) -> Result<()> {
        if !user.is_agent() {
            return Ok(());
        }
        let entry = self.licenses.find(license_id)?;
        if let Some(user_id) = user.id.as_deref()
            && entry.agents().contains(&AgentId::from(user_id))
        {
            return Ok(());
        }

        match entry.agents().release_chat(chat) {
            Some(agent_id) => {
                info!(%license_id, chat_id = %chat, agent_id = %agent_id, "chat released to human agent");
            },
            None => debug!(%license_id, chat_id = %chat, "no bot owned chat"),
        }
        Ok(())
    }
}

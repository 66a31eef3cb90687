//! REST gateway adapter
//!
//! One struct, one HTTP client. Rate limits are retried with bounded
//! backoff inside `dispatch`; every other failure status maps onto
//! `PlatformError` immediately.

use async_trait::async_trait;
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, instrument, warn};

use modmail_common::PlatformConfig;
use modmail_core::{
    ChannelCapability, GatewayResult, OutboundMessage, PlatformError, PlatformGateway,
    SentMessage, Snowflake, WebhookIdentity,
};

use crate::backoff::{retry_delay, MAX_RETRIES};
use crate::wire;

/// REST implementation of the platform gateway
pub struct RestGateway {
    client: reqwest::Client,
    api_base: String,
    token: String,
}

impl RestGateway {
    /// Build the gateway from platform configuration
    pub fn new(config: &PlatformConfig) -> GatewayResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| PlatformError::Http(e.to_string()))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: config.bot_token.clone(),
        })
    }

    /// Send one request, retrying on 429 up to the retry cap. Returns the
    /// final response whatever its status; `check_status` does the mapping.
    async fn dispatch(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> GatewayResult<Response> {
        let url = format!("{}{path}", self.api_base);

        for attempt in 0..=MAX_RETRIES {
            let mut request = self
                .client
                .request(method.clone(), &url)
                .header("Authorization", format!("Bot {}", self.token));
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request
                .send()
                .await
                .map_err(|e| PlatformError::Http(e.to_string()))?;

            if response.status() != StatusCode::TOO_MANY_REQUESTS {
                return Ok(response);
            }

            let retry_after_ms = response
                .json::<wire::RateLimitPayload>()
                .await
                .ok()
                .map(|p| (p.retry_after * 1000.0) as u64);

            if attempt == MAX_RETRIES {
                return Err(PlatformError::RateLimited {
                    retry_after_ms: retry_after_ms.unwrap_or(0),
                });
            }

            let delay = retry_delay(attempt, retry_after_ms);
            debug!(path, attempt, delay_ms = delay.as_millis() as u64, "rate limited, backing off");
            tokio::time::sleep(delay).await;
        }

        Err(PlatformError::Http(format!("retry loop exhausted for {path}")))
    }

    /// Map a non-success status onto the error taxonomy
    async fn check_status(response: Response) -> GatewayResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let path = response.url().path().to_string();
        let detail = response.text().await.unwrap_or_default();

        match status {
            StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => Err(PlatformError::Unavailable(
                format!("{status} on {path}"),
            )),
            _ => Err(PlatformError::Http(format!("{status} on {path}: {detail}"))),
        }
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> GatewayResult<Response> {
        let response = self.dispatch(method, path, body).await?;
        Self::check_status(response).await
    }

    async fn execute_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> GatewayResult<T> {
        self.execute(method, path, body)
            .await?
            .json::<T>()
            .await
            .map_err(|e| PlatformError::Http(format!("decode failed for {path}: {e}")))
    }

    /// Percent-encode an emoji for use in a reaction route
    fn encode_emoji(emoji: &str) -> String {
        emoji.bytes().map(|b| format!("%{b:02X}")).collect()
    }
}

#[async_trait]
impl PlatformGateway for RestGateway {
    #[instrument(skip(self))]
    async fn create_dm_channel(&self, user_id: Snowflake) -> GatewayResult<Snowflake> {
        let body = json!({ "recipient_id": user_id.to_string() });
        let channel: wire::ChannelPayload = self
            .execute_json(Method::POST, "/users/@me/channels", Some(&body))
            .await?;
        Ok(channel.id)
    }

    #[instrument(skip(self, message))]
    async fn send_message(
        &self,
        channel_id: Snowflake,
        message: &OutboundMessage,
    ) -> GatewayResult<SentMessage> {
        let body = wire::message_body(message);
        let sent: wire::MessagePayload = self
            .execute_json(
                Method::POST,
                &format!("/channels/{channel_id}/messages"),
                Some(&body),
            )
            .await?;
        Ok(SentMessage {
            id: sent.id,
            channel_id: sent.channel_id,
            url: None,
        })
    }

    #[instrument(skip(self, content))]
    async fn edit_message(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
        content: &str,
    ) -> GatewayResult<()> {
        let body = json!({ "content": content });
        self.execute(
            Method::PATCH,
            &format!("/channels/{channel_id}/messages/{message_id}"),
            Some(&body),
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn fetch_message_content(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
    ) -> GatewayResult<String> {
        let message: wire::MessagePayload = self
            .execute_json(
                Method::GET,
                &format!("/channels/{channel_id}/messages/{message_id}"),
                None,
            )
            .await?;
        Ok(message.content)
    }

    #[instrument(skip(self))]
    async fn add_reaction(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
        emoji: &str,
    ) -> GatewayResult<()> {
        let encoded = Self::encode_emoji(emoji);
        self.execute(
            Method::PUT,
            &format!("/channels/{channel_id}/messages/{message_id}/reactions/{encoded}/@me"),
            None,
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self, initial_message))]
    async fn create_thread(
        &self,
        forum_channel_id: Snowflake,
        name: &str,
        initial_message: &OutboundMessage,
    ) -> GatewayResult<SentMessage> {
        let body = json!({
            "name": name,
            "message": wire::message_body(initial_message),
        });
        let thread: wire::ThreadPayload = self
            .execute_json(
                Method::POST,
                &format!("/channels/{forum_channel_id}/threads"),
                Some(&body),
            )
            .await?;
        // A forum post's starter message shares the thread's id
        let message_id = thread.message.map_or(thread.id, |m| m.id);
        Ok(SentMessage {
            id: message_id,
            channel_id: thread.id,
            url: None,
        })
    }

    #[instrument(skip(self))]
    async fn rename_thread(&self, thread_id: Snowflake, name: &str) -> GatewayResult<()> {
        let body = json!({ "name": name });
        self.execute(Method::PATCH, &format!("/channels/{thread_id}"), Some(&body))
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn archive_thread(&self, thread_id: Snowflake, locked: bool) -> GatewayResult<()> {
        let body = json!({ "archived": true, "locked": locked });
        let response = self
            .dispatch(Method::PATCH, &format!("/channels/{thread_id}"), Some(&body))
            .await?;

        // Patching an already-archived thread is rejected; the thread is in
        // the state we wanted, so swallow it.
        if response.status() == StatusCode::BAD_REQUEST {
            warn!(%thread_id, "thread already archived");
            return Ok(());
        }

        Self::check_status(response).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn create_webhook(
        &self,
        channel_id: Snowflake,
        name: &str,
    ) -> GatewayResult<(Snowflake, String)> {
        let body = json!({ "name": name });
        let webhook: wire::WebhookPayload = self
            .execute_json(
                Method::POST,
                &format!("/channels/{channel_id}/webhooks"),
                Some(&body),
            )
            .await?;
        Ok((webhook.id, webhook.token))
    }

    #[instrument(skip(self, webhook_token, identity, message))]
    async fn post_as_webhook(
        &self,
        webhook_id: Snowflake,
        webhook_token: &str,
        thread_id: Snowflake,
        identity: &WebhookIdentity,
        message: &OutboundMessage,
    ) -> GatewayResult<SentMessage> {
        let mut body = wire::message_body(message);
        body["username"] = json!(identity.username);
        if let Some(avatar) = &identity.avatar_url {
            body["avatar_url"] = json!(avatar);
        }

        let path = format!("/webhooks/{webhook_id}/{webhook_token}?wait=true&thread_id={thread_id}");
        let sent: wire::MessagePayload =
            self.execute_json(Method::POST, &path, Some(&body)).await?;
        Ok(SentMessage {
            id: sent.id,
            channel_id: sent.channel_id,
            url: None,
        })
    }

    #[instrument(skip(self, webhook_token, content))]
    async fn edit_webhook_message(
        &self,
        webhook_id: Snowflake,
        webhook_token: &str,
        thread_id: Snowflake,
        message_id: Snowflake,
        content: &str,
    ) -> GatewayResult<()> {
        let body = json!({ "content": content });
        let path = format!(
            "/webhooks/{webhook_id}/{webhook_token}/messages/{message_id}?thread_id={thread_id}"
        );
        self.execute(Method::PATCH, &path, Some(&body)).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn channel_capability(&self, channel_id: Snowflake) -> GatewayResult<ChannelCapability> {
        let channel: wire::ChannelPayload = self
            .execute_json(Method::GET, &format!("/channels/{channel_id}"), None)
            .await?;
        Ok(ChannelCapability::from_platform_type(channel.channel_type))
    }

    #[instrument(skip(self))]
    async fn fetch_user_display(
        &self,
        user_id: Snowflake,
    ) -> GatewayResult<(String, Option<String>)> {
        let user: wire::UserPayload = self
            .execute_json(Method::GET, &format!("/users/{user_id}"), None)
            .await?;
        Ok(user.display())
    }

    #[instrument(skip(self))]
    async fn shared_guilds(&self, user_id: Snowflake) -> GatewayResult<Vec<Snowflake>> {
        let guilds: Vec<wire::GuildPayload> = self
            .execute_json(Method::GET, "/users/@me/guilds", None)
            .await?;

        let mut shared = Vec::new();
        for guild in guilds {
            let path = format!("/guilds/{}/members/{user_id}", guild.id);
            match self.execute(Method::GET, &path, None).await {
                Ok(_) => shared.push(guild.id),
                Err(PlatformError::Unavailable(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(shared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RestGateway>();
    }

    #[test]
    fn test_encode_emoji() {
        assert_eq!(RestGateway::encode_emoji("✅"), "%E2%9C%85");
    }
}

//! Wire payloads for the platform REST API

use serde::Deserialize;
use serde_json::{json, Value};

use modmail_core::{OutboundMessage, Snowflake};

/// Message object as the platform returns it
#[derive(Debug, Deserialize)]
pub struct MessagePayload {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(default)]
    pub content: String,
}

/// DM channel object
#[derive(Debug, Deserialize)]
pub struct ChannelPayload {
    pub id: Snowflake,
    #[serde(rename = "type")]
    pub channel_type: u8,
}

/// Thread creation response (forum threads carry their starter message)
#[derive(Debug, Deserialize)]
pub struct ThreadPayload {
    pub id: Snowflake,
    #[serde(default)]
    pub message: Option<MessagePayload>,
}

/// Webhook creation response
#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    pub id: Snowflake,
    pub token: String,
}

/// User object
#[derive(Debug, Deserialize)]
pub struct UserPayload {
    pub id: Snowflake,
    pub username: String,
    #[serde(default)]
    pub global_name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl UserPayload {
    /// Display name with avatar CDN URL
    pub fn display(&self) -> (String, Option<String>) {
        let name = self.global_name.clone().unwrap_or_else(|| self.username.clone());
        let avatar = self.avatar.as_ref().map(|hash| {
            format!("https://cdn.discordapp.com/avatars/{}/{hash}.png", self.id)
        });
        (name, avatar)
    }
}

/// Partial guild object from the bot's guild list
#[derive(Debug, Deserialize)]
pub struct GuildPayload {
    pub id: Snowflake,
}

/// Rate-limit body
#[derive(Debug, Deserialize)]
pub struct RateLimitPayload {
    #[serde(default)]
    pub retry_after: f64,
}

/// Serialize an outbound message into the platform's create-message body
pub fn message_body(message: &OutboundMessage) -> Value {
    let mut body = json!({});

    if let Some(content) = &message.content {
        body["content"] = json!(content);
    }

    if let Some(embed) = &message.embed {
        let mut e = json!({ "description": embed.description });
        if let Some(author) = &embed.author_name {
            e["author"] = json!({ "name": author });
        }
        if let Some(footer) = &embed.footer {
            e["footer"] = json!({ "text": footer });
        }
        body["embeds"] = json!([e]);
    }

    if !message.buttons.is_empty() {
        let buttons: Vec<Value> = message
            .buttons
            .iter()
            .map(|b| {
                json!({
                    "type": 2,
                    "style": 2,
                    "label": b.label,
                    "custom_id": b.custom_id,
                })
            })
            .collect();
        body["components"] = json!([{ "type": 1, "components": buttons }]);
    }

    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use modmail_core::OutboundEmbed;

    #[test]
    fn test_message_body_with_buttons() {
        let msg = OutboundMessage::text("hi").with_button("modmail_close_now", "Close now");
        let body = message_body(&msg);
        assert_eq!(body["content"], "hi");
        assert_eq!(
            body["components"][0]["components"][0]["custom_id"],
            "modmail_close_now"
        );
    }

    #[test]
    fn test_message_body_with_embed() {
        let msg = OutboundMessage::embed(OutboundEmbed {
            author_name: Some("staff".to_string()),
            description: "reply".to_string(),
            footer: Some("close with /close".to_string()),
        });
        let body = message_body(&msg);
        assert_eq!(body["embeds"][0]["description"], "reply");
        assert_eq!(body["embeds"][0]["author"]["name"], "staff");
        assert!(body.get("content").is_none());
    }

    #[test]
    fn test_user_display_falls_back_to_username() {
        let user = UserPayload {
            id: Snowflake::new(1),
            username: "alice".to_string(),
            global_name: None,
            avatar: None,
        };
        assert_eq!(user.display(), ("alice".to_string(), None));
    }
}

use axum::{async_trait, body::Bytes};
use derive_more::Constructor;
use reqwest::{Client, header::CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use log::debug;

use super::upstream_error::{ensure_success, Result, UpstreamError};

const TEXT_WEBHOOK_PATH: &str = "/webhooks/rest/webhook";
const VOICE_WEBHOOK_PATH: &str = "/webhooks/voice/webhook";

#[derive(Debug, Serialize)]
struct NluRequest<'a> {
    sender: &'a str,
    message: &'a str,
}

///
/// One bot utterance returned by the NLU backend's REST channel
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NluMessage {
    #[serde(default)]
    pub recipient_id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct VoiceReply {
    pub content_type: Option<String>,
    pub body: Bytes,
}

///
/// Client for the conversational NLU backend
///
#[async_trait]
pub trait NluService : Send + Sync {
    ///
    /// Sends `message` on behalf of `sender` and returns the bot's replies
    ///
    async fn send_text(&self, sender: &str, message: &str) -> Result<Vec<NluMessage>>;
    ///
    /// Same as `send_text`, but the backend answers with synthesized audio
    ///
    async fn send_voice(&self, sender: &str, message: &str) -> Result<VoiceReply>;
}

#[derive(Clone, Constructor)]
pub struct RasaNluService {
    client: Client,
    base_url: String,
}

impl RasaNluService {
    async fn post(&self, path: &str, sender: &str, message: &str) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        debug!("Forwarding message from {sender} to NLU backend at {url}");

        let res = self.client.post(url)
            .json(&NluRequest { sender, message })
            .send().await?;
        ensure_success(res).await
    }
}

#[async_trait]
impl NluService for RasaNluService {
    async fn send_text(&self, sender: &str, message: &str) -> Result<Vec<NluMessage>> {
        let res = self.post(TEXT_WEBHOOK_PATH, sender, message).await?;
        res.json::<Vec<NluMessage>>().await
            .map_err(|e| UpstreamError::Malformed(e.to_string()))
    }

    async fn send_voice(&self, sender: &str, message: &str) -> Result<VoiceReply> {
        let res = self.post(VOICE_WEBHOOK_PATH, sender, message).await?;
        let content_type = res.headers().get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Ok(VoiceReply { content_type, body: res.bytes().await? })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_send_text_forwards_sender_and_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TEXT_WEBHOOK_PATH))
            .and(body_json(json!({ "sender": "test-user", "message": "hello" })))
            .respond_with(ResponseTemplate::new(200)
                .set_body_json(json!([{ "recipient_id": "test-user", "text": "Hi! How can I help?" }])))
            .expect(1)
            .mount(&server)
            .await;

        let svc = RasaNluService::new(Client::new(), server.uri());
        let replies = svc.send_text("test-user", "hello").await.unwrap();

        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].text.as_deref(), Some("Hi! How can I help?"));
    }

    #[tokio::test]
    async fn test_send_voice_returns_raw_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(VOICE_WEBHOOK_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_raw(b"RIFF0000".to_vec(), "audio/wav"))
            .mount(&server)
            .await;

        let svc = RasaNluService::new(Client::new(), server.uri());
        let reply = svc.send_voice("test-user", "hello").await.unwrap();

        assert_eq!(reply.content_type.as_deref(), Some("audio/wav"));
        assert_eq!(&reply.body[..], b"RIFF0000");
    }

    #[tokio::test]
    async fn test_upstream_status_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TEXT_WEBHOOK_PATH))
            .respond_with(ResponseTemplate::new(503).set_body_string("down"))
            .mount(&server)
            .await;

        let svc = RasaNluService::new(Client::new(), server.uri());
        let res = svc.send_text("test-user", "hello").await;

        assert!(matches!(res, Err(UpstreamError::Status { status: 503, .. })));
    }
}

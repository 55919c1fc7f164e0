use axum::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use log::debug;

use super::upstream_error::{ensure_success, Result, UpstreamError};

const COMPLETION_MODEL: &str = "gpt-3.5-turbo";
const IMAGE_SIZE: &str = "256x256";

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<CompletionMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct CompletionMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionReply,
}

#[derive(Debug, Deserialize)]
struct CompletionReply {
    content: String,
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    prompt: &'a str,
    n: u32,
    size: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: String,
}

///
/// Client for the text-completion and image-generation APIs
///
#[async_trait]
pub trait OpenAiService : Send + Sync {
    ///
    /// Returns the model's reply to `prompt`
    ///
    async fn complete(&self, prompt: &str) -> Result<String>;
    ///
    /// Generates one image for `prompt` and returns the URL it is hosted at
    ///
    async fn generate_image(&self, prompt: &str) -> Result<String>;
    ///
    /// Starts downloading a generated image. The body is left unread so it
    /// can be streamed to the client.
    ///
    async fn download_image(&self, url: &str) -> Result<reqwest::Response>;
}

#[derive(Clone)]
pub struct CoreOpenAiService {
    client: Client,
    api_key: String,
    base_url: String,
}

impl CoreOpenAiService {
    pub fn new(client: Client, api_key: String, base_url: String) -> Self {
        Self { client, api_key, base_url: base_url.trim_end_matches('/').to_string() }
    }
}

#[async_trait]
impl OpenAiService for CoreOpenAiService {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = CompletionRequest {
            model: COMPLETION_MODEL,
            messages: vec![CompletionMessage { role: "user", content: prompt }],
        };

        debug!("Sending completion request");
        let res = self.client.post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send().await?;
        let res: CompletionResponse = ensure_success(res).await?.json().await
            .map_err(|e| UpstreamError::Malformed(e.to_string()))?;

        res.choices.into_iter().next()
            .map(|c| c.message.content)
            .ok_or_else(|| UpstreamError::Malformed("completion without choices".to_string()))
    }

    async fn generate_image(&self, prompt: &str) -> Result<String> {
        let request = ImageRequest { prompt, n: 1, size: IMAGE_SIZE };

        debug!("Sending image generation request");
        let res = self.client.post(format!("{}/v1/images/generations", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send().await?;
        let res: ImageResponse = ensure_success(res).await?.json().await
            .map_err(|e| UpstreamError::Malformed(e.to_string()))?;

        res.data.into_iter().next()
            .map(|d| d.url)
            .ok_or_else(|| UpstreamError::Malformed("image response without data".to_string()))
    }

    async fn download_image(&self, url: &str) -> Result<reqwest::Response> {
        let res = self.client.get(url).send().await?;
        ensure_success(res).await
    }
}

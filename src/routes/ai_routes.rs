use std::sync::Arc;

use axum::{
    Router, Json,
    routing::{get, post}, extract::{FromRef, State},
    body::StreamBody, http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
};
use log::info;
use serde_json::{json, Value};

use crate::{
    models::ai_models::{CompletionModel, ImagePromptModel, PromptModel, UtteranceModel},
    services::{
        chat_service::ChatService, nlu_service::{NluMessage, NluService},
        openai_service::OpenAiService, upstream_error::Result,
    },
};

const DEFAULT_AUDIO_TYPE: &str = "application/octet-stream";

#[derive(Clone, FromRef)]
pub struct AiRoutesState {
    nlu_service: Arc<dyn NluService>,
    openai_service: Arc<dyn OpenAiService>,
    chat_service: Arc<dyn ChatService>,
}

pub fn routes(
    nlu_service: Arc<dyn NluService>,
    openai_service: Arc<dyn OpenAiService>,
    chat_service: Arc<dyn ChatService>
) -> Router {
    Router::new()
        // Routes
        .route("/rasatext", post(rasa_text))
        .route("/rasavoice", post(rasa_voice))
        .route("/gpttext", post(gpt_text))
        .route("/dalleimggen", get(image_hint).post(generate_image))
        // State
        .with_state(AiRoutesState { nlu_service, openai_service, chat_service })
}

async fn rasa_text(
    State(nlu_service): State<Arc<dyn NluService>>,
    Json(msg): Json<UtteranceModel>,
) -> Result<Json<Vec<NluMessage>>> {
    Ok(Json(nlu_service.send_text(&msg.username, &msg.text).await?))
}

async fn rasa_voice(
    State(nlu_service): State<Arc<dyn NluService>>,
    Json(msg): Json<UtteranceModel>,
) -> Result<Response> {
    let reply = nlu_service.send_voice(&msg.username, &msg.text).await?;
    let content_type = reply.content_type.unwrap_or_else(|| DEFAULT_AUDIO_TYPE.to_string());
    Ok(([(CONTENT_TYPE, content_type)], reply.body).into_response())
}

async fn gpt_text(
    State(openai_service): State<Arc<dyn OpenAiService>>,
    Json(prompt): Json<PromptModel>,
) -> Result<Json<CompletionModel>> {
    let text = openai_service.complete(&prompt.text).await?;
    Ok(Json(CompletionModel { text }))
}

async fn image_hint() -> Json<Value> {
    Json(json!({ "message": "Response DALLE IMAGE post a text" }))
}

///
/// Generates an image for the prompt, records the prompt as a chat message
/// and streams the generated PNG straight through to the client
///
async fn generate_image(
    State(openai_service): State<Arc<dyn OpenAiService>>,
    State(chat_service): State<Arc<dyn ChatService>>,
    Json(prompt): Json<ImagePromptModel>,
) -> std::result::Result<Response, Response> {
    let url = openai_service.generate_image(&prompt.text).await
        .map_err(IntoResponse::into_response)?;

    chat_service.create_chat(&prompt.text, &prompt.username).await
        .map_err(IntoResponse::into_response)?;

    let image = openai_service.download_image(&url).await
        .map_err(IntoResponse::into_response)?;
    info!("Streaming generated image for {}", prompt.username);

    Ok(([(CONTENT_TYPE, "image/png")], StreamBody::new(image.bytes_stream())).into_response())
}

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct UtteranceModel {
    pub username: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct PromptModel {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct CompletionModel {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct ImagePromptModel {
    pub text: String,
    pub username: String,
}

use crate::data_uri::ImageInput;
use crate::flows::EmbeddingVector;
use serde::{Deserialize, Serialize};

/// A request carrying a photo as a data URI
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoRequest {
    pub photo_data_uri: ImageInput,
}

#[derive(Debug, Deserialize)]
pub struct TextRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct EmbeddingResponse {
    pub embedding: EmbeddingVector,
}

#[derive(Debug, Deserialize)]
pub struct ProxyQuery {
    pub url: Option<String>,
}

/// The body of every failed request
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub title: &'static str,
    pub kind: &'static str,
    pub errors: Vec<String>,
}

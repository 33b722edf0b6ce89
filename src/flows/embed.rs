use crate::data_uri::ImageInput;
use crate::error::{Error, Result};
use crate::model::{EmbedContent, ModelClient};

/// A vector whose dimensionality is decided by the remote model
pub type EmbeddingVector = Vec<f32>;

/// Embed an image
pub async fn embed_image(client: &ModelClient, image: &ImageInput) -> Result<EmbeddingVector> {
    client.embed(EmbedContent::Image(image)).await
}

/// Embed a text into the same vector space as images. Blank text is
/// rejected before any request is made.
pub async fn embed_text(client: &ModelClient, text: &str) -> Result<EmbeddingVector> {
    if text.trim().is_empty() {
        return Err(Error::MalformedInput("text to embed is empty".into()));
    }
    client.embed(EmbedContent::Text(text)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::test::{png_input, settings};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_embed_image_and_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/text-embedding-004:embedContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "embedding": { "values": [0.1, 0.2, 0.3, 0.4] }
            })))
            .expect(2)
            .mount(&server)
            .await;

        let client = ModelClient::new(&settings(&server.uri())).unwrap();
        let image = embed_image(&client, &png_input()).await.unwrap();
        let text = embed_text(&client, "a black puppy").await.unwrap();
        assert_eq!(image.len(), 4);
        assert_eq!(image, text);
    }

    #[tokio::test]
    async fn test_embed_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "code": 400, "message": "API key not valid" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ModelClient::new(&settings(&server.uri())).unwrap();
        let err = embed_image(&client, &png_input()).await.unwrap_err();
        match err {
            Error::Remote(message) => assert!(message.contains("API key not valid")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_embed_blank_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = ModelClient::new(&settings(&server.uri())).unwrap();
        for text in ["", "  \n\t"] {
            let err = embed_text(&client, text).await.unwrap_err();
            assert!(matches!(err, Error::MalformedInput(_)), "{err:?}");
        }
    }
}

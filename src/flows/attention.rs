use super::Confidence;
use crate::data_uri::ImageInput;
use crate::error::Result;
use crate::model::{ModelClient, Prompt};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

const PROMPT: Prompt<'static> = Prompt {
    name: "attentionMapPrompt",
    template: r#"You are an AI model that classifies images of cats and dogs and generates an attention map highlighting the areas the AI focuses on to make its decision.

Analyze the image provided and:

1. Predict whether the image is a "Cat" or a "Dog". Return the prediction in the 'predictedLabel' field.
2. Provide a confidence score (0-1) for your prediction in the 'confidence' field.
3. Generate an attention map as a data URI (data:<mimetype>;base64,<encoded_data>), highlighting the areas of the image that were most influential in your classification decision. Return it in the 'overlayImage' field. The attention map should be a heatmap overlaid on the original image, clearly showing the areas of focus.

Here is the image:
{{media}}

Return ONLY the JSON object. Do not wrap the JSON in markdown backticks."#,
};

/// A heat-map overlay of what the model looked at, with its prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AttentionResult {
    #[serde(alias = "attentionMapDataUri")]
    pub overlay_image: ImageInput,
    #[serde(alias = "prediction")]
    pub predicted_label: String,
    pub confidence: Confidence,
}

static SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "OBJECT",
        "properties": {
            "overlayImage": {
                "type": "STRING",
                "description": "The attention map as a data URI (e.g., data:image/png;base64,...).",
            },
            "predictedLabel": {
                "type": "STRING",
                "description": "The predicted class (Dog or Cat).",
            },
            "confidence": {
                "type": "NUMBER",
                "minimum": 0,
                "maximum": 1,
                "description": "The confidence score of the prediction (0-1).",
            },
        },
        "required": ["overlayImage", "predictedLabel", "confidence"],
        "propertyOrdering": ["predictedLabel", "confidence", "overlayImage"],
    })
});

/// Ask the model for its prediction and an attention overlay of `image`
pub async fn attention_map(client: &ModelClient, image: &ImageInput) -> Result<AttentionResult> {
    let result: AttentionResult = client.invoke(&PROMPT, image, &SCHEMA).await?;
    info!(
        "generated {} attention map for {} ({})",
        result.overlay_image.mime_type(),
        result.predicted_label,
        result.confidence
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::util::test::{gemini_reply, png_input, settings, PNG_URI};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn attention_reply(reply: &str) -> Result<AttentionResult> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply(reply)))
            .expect(1)
            .mount(&server)
            .await;

        let client = ModelClient::new(&settings(&server.uri())).unwrap();
        attention_map(&client, &png_input()).await
    }

    #[tokio::test]
    async fn test_attention_map() {
        let reply = json!({
            "overlayImage": PNG_URI,
            "predictedLabel": "Cat",
            "confidence": 0.93,
        })
        .to_string();
        let result = attention_reply(&reply).await.unwrap();

        assert_eq!(result.overlay_image.as_str(), PNG_URI);
        assert_eq!(result.predicted_label, "Cat");
        assert_eq!(result.confidence.percent(), 93);
    }

    #[tokio::test]
    async fn test_attention_map_legacy_fields() {
        let reply = json!({
            "attentionMapDataUri": PNG_URI,
            "prediction": "dog",
            "confidence": 0.5,
        })
        .to_string();
        let result = attention_reply(&reply).await.unwrap();
        assert_eq!(result.predicted_label, "dog");
    }

    #[tokio::test]
    async fn test_attention_map_rejects_bad_overlay() {
        let reply = json!({
            "overlayImage": "https://example.com/heatmap.png",
            "predictedLabel": "Cat",
            "confidence": 0.93,
        })
        .to_string();
        let err = attention_reply(&reply).await.unwrap_err();
        assert!(matches!(err, Error::Remote(_)));
    }
}

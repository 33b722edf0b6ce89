use super::{Confidence, Label};
use crate::data_uri::ImageInput;
use crate::error::Result;
use crate::model::{ModelClient, Prompt};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

const PROMPT: Prompt<'static> = Prompt {
    name: "predictImageClassPrompt",
    template: r#"You are an AI image classification model specializing in identifying cats and dogs.
Given an image, you will predict whether it is a "Cat" or a "Dog", and provide a confidence score (0-1).
Return the prediction in the 'predictedLabel' field and the score in the 'confidence' field.

Analyze the following image:
{{media}}

Return ONLY the JSON object. Do not wrap the JSON in markdown backticks."#,
};

/// Whether the photo shows a cat or a dog
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ClassificationResult {
    #[serde(alias = "prediction")]
    pub predicted_label: Label,
    pub confidence: Confidence,
}

static SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "OBJECT",
        "properties": {
            "predictedLabel": {
                "type": "STRING",
                "enum": Label::ALL.map(|l| l.as_str()),
                "description": "The predicted class of the image.",
            },
            "confidence": {
                "type": "NUMBER",
                "minimum": 0,
                "maximum": 1,
                "description": "The confidence score of the prediction (0-1).",
            },
        },
        "required": ["predictedLabel", "confidence"],
        "propertyOrdering": ["predictedLabel", "confidence"],
    })
});

/// Classify `image` as a cat or a dog
pub async fn classify(client: &ModelClient, image: &ImageInput) -> Result<ClassificationResult> {
    let result: ClassificationResult = client.invoke(&PROMPT, image, &SCHEMA).await?;
    info!(
        "classified image as {} ({})",
        result.predicted_label, result.confidence
    );
    Ok(result)
}

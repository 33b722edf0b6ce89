use super::{Confidence, Label};
use crate::data_uri::ImageInput;
use crate::error::Result;
use crate::model::{ModelClient, Prompt};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use tracing::info;

const PROMPT: Prompt<'static> = Prompt {
    name: "objectDetectionPrompt",
    template: r#"You are an AI model that performs object detection on images. You can identify "Cat" and "Dog" objects.

Analyze the image provided and identify all instances of cats and dogs. For each object you find, provide:
1. The 'label' ("Cat" or "Dog").
2. A 'confidence' score for the detection (a number between 0 and 1).
3. A 'boundingBox' around the object. The box is an array of four numbers: [x_min, y_min, x_max, y_max]. These coordinates must be normalized, meaning they are floats between 0 and 1 relative to the image dimensions.

Here is the image:
{{media}}

Return ONLY the JSON object with the key "objects". Do not add any commentary or markdown formatting."#,
};

/// An axis-aligned box in normalized image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    x_min: f64,
    y_min: f64,
    x_max: f64,
    y_max: f64,
}

impl BoundingBox {
    pub fn x_min(&self) -> f64 {
        self.x_min
    }

    pub fn y_min(&self) -> f64 {
        self.y_min
    }

    pub fn x_max(&self) -> f64 {
        self.x_max
    }

    pub fn y_max(&self) -> f64 {
        self.y_max
    }
}

impl TryFrom<[f64; 4]> for BoundingBox {
    type Error = String;

    fn try_from([x_min, y_min, x_max, y_max]: [f64; 4]) -> std::result::Result<Self, String> {
        if ![x_min, y_min, x_max, y_max]
            .iter()
            .all(|c| (0.0..=1.0).contains(c))
        {
            return Err(format!(
                "box [{x_min}, {y_min}, {x_max}, {y_max}] is not normalized to [0, 1]"
            ));
        }
        if x_min > x_max || y_min > y_max {
            return Err(format!(
                "box [{x_min}, {y_min}, {x_max}, {y_max}] has inverted coordinates"
            ));
        }
        Ok(BoundingBox {
            x_min,
            y_min,
            x_max,
            y_max,
        })
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(b: BoundingBox) -> [f64; 4] {
        [b.x_min, b.y_min, b.x_max, b.y_max]
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.3}, {:.3}, {:.3}, {:.3}]",
            self.x_min, self.y_min, self.x_max, self.y_max
        )
    }
}

/// A cat or dog found in the image
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DetectedObject {
    pub label: Label,
    pub confidence: Confidence,
    #[serde(alias = "box")]
    pub bounding_box: BoundingBox,
}

/// Every detected object, in the order the model listed them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DetectionResult {
    pub objects: Vec<DetectedObject>,
}

static SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "OBJECT",
        "properties": {
            "objects": {
                "type": "ARRAY",
                "description": "A list of detected objects.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "label": {
                            "type": "STRING",
                            "enum": Label::ALL.map(|l| l.as_str()),
                            "description": "The label of the detected object.",
                        },
                        "confidence": {
                            "type": "NUMBER",
                            "minimum": 0,
                            "maximum": 1,
                            "description": "The confidence score of the detection (0-1).",
                        },
                        "boundingBox": {
                            "type": "ARRAY",
                            "items": { "type": "NUMBER", "minimum": 0, "maximum": 1 },
                            "minItems": 4,
                            "maxItems": 4,
                            "description": "[x_min, y_min, x_max, y_max], normalized between 0 and 1.",
                        },
                    },
                    "required": ["label", "confidence", "boundingBox"],
                    "propertyOrdering": ["label", "confidence", "boundingBox"],
                },
            },
        },
        "required": ["objects"],
    })
});

/// Find the cats and dogs in `image`
pub async fn detect(client: &ModelClient, image: &ImageInput) -> Result<DetectionResult> {
    let result: DetectionResult = client.invoke(&PROMPT, image, &SCHEMA).await?;
    info!("detected {} objects", result.objects.len());
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::util::test::{gemini_reply, png_input, settings};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn detect_reply(reply: &str) -> Result<DetectionResult> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply(reply)))
            .expect(1)
            .mount(&server)
            .await;

        let client = ModelClient::new(&settings(&server.uri())).unwrap();
        detect(&client, &png_input()).await
    }

    #[test]
    fn test_bounding_box() {
        let b = BoundingBox::try_from([0.1, 0.2, 0.5, 0.9]).unwrap();
        assert_eq!((b.x_min(), b.y_min(), b.x_max(), b.y_max()), (0.1, 0.2, 0.5, 0.9));
        assert_eq!(b.to_string(), "[0.100, 0.200, 0.500, 0.900]");

        // degenerate boxes are allowed
        assert!(BoundingBox::try_from([0.5, 0.5, 0.5, 0.5]).is_ok());
        assert!(BoundingBox::try_from([0.6, 0.2, 0.5, 0.9]).is_err());
        assert!(BoundingBox::try_from([0.1, 0.9, 0.5, 0.2]).is_err());
        assert!(BoundingBox::try_from([0.1, 0.2, 1.5, 0.9]).is_err());
        assert!(serde_json::from_str::<BoundingBox>("[0.1, 0.2, 0.5]").is_err());
    }

    #[tokio::test]
    async fn test_detect() {
        let result = detect_reply(
            r#"{"objects":[
                {"label":"Dog","confidence":0.95,"boundingBox":[0.1,0.2,0.5,0.9]},
                {"label":"Cat","confidence":0.7,"box":[0.55,0.3,0.95,0.8]}
            ]}"#,
        )
        .await
        .unwrap();

        assert_eq!(result.objects.len(), 2);
        assert_eq!(result.objects[0].label, Label::Dog);
        assert_eq!(result.objects[1].label, Label::Cat);
        assert_eq!(result.objects[1].bounding_box.x_min(), 0.55);
    }

    #[tokio::test]
    async fn test_detect_nothing() {
        let result = detect_reply(r#"{"objects":[]}"#).await.unwrap();
        assert!(result.objects.is_empty());
    }

    #[tokio::test]
    async fn test_detect_rejects_inverted_box() {
        let err = detect_reply(
            r#"{"objects":[{"label":"Cat","confidence":0.8,"boundingBox":[0.9,0.1,0.2,0.5]}]}"#,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Remote(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_detect_rejects_unknown_label() {
        let err = detect_reply(
            r#"{"objects":[{"label":"Person","confidence":0.8,"boundingBox":[0.1,0.1,0.2,0.5]}]}"#,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Remote(_)));
    }
}

//! The analyses a user can run on an image. Every flow is one call to the
//! model client; the output types below reject anything outside their
//! contract when the model's answer is deserialized.

use crate::data_uri::ImageInput;
use crate::error::{Error, Result};
use crate::model::ModelClient;
use serde::{Deserialize, Serialize};
use std::fmt;

mod attention;
mod classify;
mod detect;
mod embed;

pub use attention::{attention_map, AttentionResult};
pub use classify::{classify, ClassificationResult};
pub use detect::{detect, BoundingBox, DetectedObject, DetectionResult};
pub use embed::{embed_image, embed_text, EmbeddingVector};

/// The classes the demo knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    Cat,
    Dog,
}

impl Label {
    pub const ALL: [Label; 2] = [Label::Cat, Label::Dog];

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Cat => "Cat",
            Label::Dog => "Dog",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A probability in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Confidence(f64);

impl Confidence {
    pub fn value(&self) -> f64 {
        self.0
    }

    /// Rounded percentage, as shown to the user
    pub fn percent(&self) -> u8 {
        (self.0 * 100.0).round() as u8
    }
}

impl TryFrom<f64> for Confidence {
    type Error = String;

    fn try_from(value: f64) -> std::result::Result<Self, String> {
        if (0.0..=1.0).contains(&value) {
            Ok(Confidence(value))
        } else {
            Err(format!("confidence {value} is outside [0, 1]"))
        }
    }
}

impl From<Confidence> for f64 {
    fn from(confidence: Confidence) -> f64 {
        confidence.0
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.percent())
    }
}

/// The type of analysis to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Analysis {
    /// `InputData::Image` to `Inference::Classification`
    Classify,

    /// `InputData::Image` to `Inference::Detection`
    Detect,

    /// `InputData::Image` to `Inference::Attention`
    AttentionMap,

    /// `InputData::Image` to `Inference::Embedding`
    EmbedImage,

    /// `InputData::Text` to `Inference::Embedding`
    EmbedText,
}

/// Input data an analysis can be run on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InputData {
    Image(ImageInput),
    Text(String),
}

/// The output of an analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Inference {
    Classification(ClassificationResult),
    Detection(DetectionResult),
    Attention(AttentionResult),
    Embedding(EmbeddingVector),
}

/// Run `analysis` on `data`
pub async fn run(client: &ModelClient, analysis: Analysis, data: &InputData) -> Result<Inference> {
    match (analysis, data) {
        (Analysis::Classify, InputData::Image(image)) => {
            Ok(Inference::Classification(classify(client, image).await?))
        }
        (Analysis::Detect, InputData::Image(image)) => {
            Ok(Inference::Detection(detect(client, image).await?))
        }
        (Analysis::AttentionMap, InputData::Image(image)) => {
            Ok(Inference::Attention(attention_map(client, image).await?))
        }
        (Analysis::EmbedImage, InputData::Image(image)) => {
            Ok(Inference::Embedding(embed_image(client, image).await?))
        }
        (Analysis::EmbedText, InputData::Text(text)) => {
            Ok(Inference::Embedding(embed_text(client, text).await?))
        }
        (analysis, _) => Err(Error::MalformedInput(format!(
            "invalid input type for {analysis:?}"
        ))),
    }
}

//! Presentation of an analysis. Each user interaction owns an
//! [`Interaction`], which only moves idle → loading → ready/failed, so a
//! second request can't start while one is in flight.

use crate::error::Error;
use crate::flows::{
    Analysis, AttentionResult, ClassificationResult, DetectionResult, EmbeddingVector, Inference,
};
use tracing::{error, warn};

/// Title of every failure notification
pub const FAILURE_TITLE: &str = "Analysis Failed";

/// Returned when an interaction is asked to start while it is still loading
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("an analysis is already running")]
pub struct Busy;

/// The state of one user interaction
#[derive(Debug, Clone, PartialEq)]
pub enum Interaction<T> {
    Idle,
    Loading,
    Ready(T),
    Failed(String),
}

impl<T> Default for Interaction<T> {
    fn default() -> Self {
        Interaction::Idle
    }
}

impl<T> Interaction<T> {
    /// Start a request. Any previous result is dropped.
    pub fn begin(&mut self) -> Result<(), Busy> {
        if self.is_loading() {
            return Err(Busy);
        }
        *self = Interaction::Loading;
        Ok(())
    }

    /// Record the outcome of the request started by [`Interaction::begin`].
    /// Results that arrive after a reset are ignored; returns whether the
    /// outcome was applied.
    pub fn finish(&mut self, outcome: crate::Result<T>) -> bool {
        if !self.is_loading() {
            warn!("ignoring the result of a request that is no longer pending");
            return false;
        }
        *self = match outcome {
            Ok(value) => Interaction::Ready(value),
            Err(err) => {
                error!("{FAILURE_TITLE} ({}): {err}", err.kind());
                Interaction::Failed(err.to_string())
            }
        };
        true
    }

    pub fn reset(&mut self) {
        *self = Interaction::Idle;
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Interaction::Loading)
    }

    pub fn result(&self) -> Option<&T> {
        match self {
            Interaction::Ready(value) => Some(value),
            _ => None,
        }
    }
}

/// The messages a view shows outside of a result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewText {
    pub idle: &'static str,
    pub loading: &'static str,
    pub failure: &'static str,
}

impl ViewText {
    pub fn for_analysis(analysis: Analysis) -> Self {
        match analysis {
            Analysis::Classify => ViewText {
                idle: "Awaiting Image: your prediction results will appear here.",
                loading: "Analyzing Image... Our AI is taking a close look.",
                failure: "Something went wrong. Please try again.",
            },
            Analysis::Detect => ViewText {
                idle: "Awaiting Image: detected cats and dogs will appear here.",
                loading: "Detecting objects...",
                failure: "Could not detect objects in the image. Please try another one.",
            },
            Analysis::AttentionMap => ViewText {
                idle: "Awaiting Image: the attention map will appear here.",
                loading: "Generating attention map...",
                failure: "Could not generate an attention map. Please try another image.",
            },
            Analysis::EmbedImage | Analysis::EmbedText => ViewText {
                idle: "Select an image to see its embedding vector.",
                loading: "Generating embedding...",
                failure: "Could not generate an embedding. Please try another one.",
            },
        }
    }
}

/// Text rendering of a result
pub trait Render {
    fn render(&self) -> String;
}

impl Render for ClassificationResult {
    fn render(&self) -> String {
        format!(
            "Prediction: {}\nConfidence: {}",
            self.predicted_label, self.confidence
        )
    }
}

impl Render for DetectionResult {
    fn render(&self) -> String {
        if self.objects.is_empty() {
            return "No cats or dogs found.".to_string();
        }
        let mut out = format!("Found {} object(s):", self.objects.len());
        for (i, object) in self.objects.iter().enumerate() {
            out.push_str(&format!(
                "\n  {}. {} {} box {}",
                i + 1,
                object.label,
                object.confidence,
                object.bounding_box
            ));
        }
        out
    }
}

impl Render for AttentionResult {
    fn render(&self) -> String {
        format!(
            "Prediction: {}\nConfidence: {}\nAttention map: {} ({} base64 chars)",
            self.predicted_label,
            self.confidence,
            self.overlay_image.mime_type(),
            self.overlay_image.payload().len()
        )
    }
}

impl Render for EmbeddingVector {
    fn render(&self) -> String {
        let values: Vec<String> = self.iter().map(|v| format!("{v:.4}")).collect();
        format!(
            "[{}]\nThis is a long list of numbers ({} dimensions) that the AI uses to understand the content.",
            values.join(", "),
            self.len()
        )
    }
}

impl Render for Inference {
    fn render(&self) -> String {
        match self {
            Inference::Classification(r) => r.render(),
            Inference::Detection(r) => r.render(),
            Inference::Attention(r) => r.render(),
            Inference::Embedding(r) => r.render(),
        }
    }
}

impl<T: Render> Interaction<T> {
    /// Render the current state with the messages of `text`
    pub fn render(&self, text: &ViewText) -> String {
        match self {
            Interaction::Idle => text.idle.to_string(),
            Interaction::Loading => text.loading.to_string(),
            Interaction::Ready(value) => value.render(),
            Interaction::Failed(_) => format!("{FAILURE_TITLE}: {}", text.failure),
        }
    }
}

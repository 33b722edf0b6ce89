pub mod config;
pub mod data_uri;
pub mod error;
pub mod fetch;
pub mod flows;
pub mod model;
pub mod server;
pub mod view;

pub use error::{Error, Result};

/// Helpers shared by the unit tests
#[cfg(test)]
pub(crate) mod util {
    pub mod test {
        use crate::config::{self, ApiKey, Settings};
        use crate::data_uri::ImageInput;
        use serde_json::{json, Value};
        use url::Url;

        /// The PNG signature, enough for MIME sniffing
        pub const PNG_URI: &str = "data:image/png;base64,iVBORw0KGgo=";

        pub fn png_input() -> ImageInput {
            ImageInput::parse(PNG_URI).unwrap()
        }

        /// Settings pointing the model client at a mock server
        pub fn settings(server_uri: &str) -> Settings {
            Settings {
                api_key: ApiKey::new("test-key"),
                base_url: Url::parse(&format!("{server_uri}/v1beta/")).unwrap(),
                model: config::DEFAULT_MODEL.to_string(),
                embedding_model: config::DEFAULT_EMBEDDING_MODEL.to_string(),
                bind: "127.0.0.1:0".to_string(),
                request_timeout: None,
            }
        }

        /// A `generateContent` response whose only candidate answers `text`
        pub fn gemini_reply(text: &str) -> Value {
            json!({
                "candidates": [{
                    "content": { "role": "model", "parts": [{ "text": text }] },
                    "finishReason": "STOP",
                }],
            })
        }
    }
}

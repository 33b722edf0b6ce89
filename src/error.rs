//! Errors surfaced by the codec, the image fetcher and the model client

/// Every failure an analysis can end in. None of them are retried.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input is not a usable `data:<mime>;base64,<payload>` image
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// A remote image could not be fetched
    #[error("failed to fetch image: {0}")]
    Fetch(String),

    /// The model endpoint failed or answered with something that does not
    /// match the expected output
    #[error("remote model error: {0}")]
    Remote(String),

    /// Missing or invalid settings
    #[error("configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Short, stable name of the error kind, used in logs and error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            Error::MalformedInput(_) => "MalformedInput",
            Error::Fetch(_) => "FetchError",
            Error::Remote(_) => "RemoteError",
            Error::Configuration(_) => "ConfigurationError",
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Remote(err.to_string())
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Configuration(err.to_string())
    }
}

use thiserror::Error;

/// Failure kinds of an analysis pass. A pass either fully succeeds or
/// discards its intermediate results; none of these leave partial state
/// behind.
#[derive(Debug, Error)]
pub enum Error {
    /// Recoverable: the landmark model saw no face. Retry with a new frame.
    #[error("no face detected")]
    NoFace,

    /// Recoverable: the hosted classifier answered with an error status.
    #[error("remote classifier returned HTTP {status}: {body}")]
    RemoteStatus { status: u16, body: String },

    /// Recoverable: the classifier replied, but no usable verdict could be
    /// pulled out of the text.
    #[error("remote classifier reply had no parsable verdict: {0}")]
    MalformedVerdict(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

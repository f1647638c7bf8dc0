//! Maps remote failures onto the user-facing error taxonomy.
//!
//! Classification of server messages is a heuristic: it inspects the `detail` text the
//! service attaches to its error bodies. Only the phrases listed in [`classify_failure`]
//! are recognised; everything else keeps the raw message.

use crate::remote::TransportError;

/// Failure of one submission attempt. Exactly one of these is surfaced per attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionError {
    #[error("provide at least one document, listing URL, or address")]
    Validation,
    #[error("an analysis is already in progress")]
    Busy,
    #[error("the previous analysis has settled; reset or change the input before resubmitting")]
    Settled,
    #[error("the analysis service could not be reached: {0}")]
    Network(String),
    #[error("the analysis service returned status {status}: {message}")]
    Server { status: u16, message: String },
    #[error("the analysis service returned an incomplete result: {0}")]
    MalformedResponse(String),
    #[error("unsupported file format: {0}")]
    UnsupportedFile(String),
    #[error("file is too large: {0}")]
    FileTooLarge(String),
    #[error("document could not be read: {0}")]
    UnreadableDocument(String),
    #[error("analysis failed: {0}")]
    Remote(String),
}

/// Discriminant of [`SubmissionError`] for display layers that only need the category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Busy,
    Settled,
    Network,
    Server,
    MalformedResponse,
    UnsupportedFile,
    FileTooLarge,
    UnreadableDocument,
    Remote,
}

impl SubmissionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SubmissionError::Validation => ErrorKind::Validation,
            SubmissionError::Busy => ErrorKind::Busy,
            SubmissionError::Settled => ErrorKind::Settled,
            SubmissionError::Network(_) => ErrorKind::Network,
            SubmissionError::Server { .. } => ErrorKind::Server,
            SubmissionError::MalformedResponse(_) => ErrorKind::MalformedResponse,
            SubmissionError::UnsupportedFile(_) => ErrorKind::UnsupportedFile,
            SubmissionError::FileTooLarge(_) => ErrorKind::FileTooLarge,
            SubmissionError::UnreadableDocument(_) => ErrorKind::UnreadableDocument,
            SubmissionError::Remote(_) => ErrorKind::Remote,
        }
    }
}

/// Classifies a server supplied failure message.
///
/// Recognised phrases (ASCII case-insensitive):
/// - `exceeds` together with `limit`, or `too large`: [`SubmissionError::FileTooLarge`]
/// - `unsupported file`: [`SubmissionError::UnsupportedFile`]
/// - `could not extract text`, `could not decode`, `corrupted`:
///   [`SubmissionError::UnreadableDocument`]
///
/// Unmatched messages become [`SubmissionError::Server`] when a status is known and
/// [`SubmissionError::Remote`] otherwise.
pub fn classify_failure(status: Option<u16>, message: &str) -> SubmissionError {
    let lowered = message.to_ascii_lowercase();
    let raw = message.to_string();

    if (lowered.contains("exceeds") && lowered.contains("limit")) || lowered.contains("too large")
    {
        return SubmissionError::FileTooLarge(raw);
    }

    if lowered.contains("unsupported file") {
        return SubmissionError::UnsupportedFile(raw);
    }

    if ["could not extract text", "could not decode", "corrupted"]
        .iter()
        .any(|needle| lowered.contains(needle))
    {
        return SubmissionError::UnreadableDocument(raw);
    }

    match status {
        Some(status) => SubmissionError::Server {
            status,
            message: raw,
        },
        None => SubmissionError::Remote(raw),
    }
}

impl From<TransportError> for SubmissionError {
    fn from(value: TransportError) -> Self {
        match value {
            TransportError::Network(message) => SubmissionError::Network(message),
            TransportError::Decode(message) => SubmissionError::MalformedResponse(message),
            TransportError::Status { status, message } => classify_failure(Some(status), &message),
            TransportError::Remote(message) => classify_failure(None, &message),
        }
    }
}

use thiserror::Error;

/// Failures of the raw-ingest normalizers. Decode failures past this point
/// are metrics and log lines, never errors.
#[derive(Debug, Error)]
pub enum RawDecodeError {
    #[error("raw request contains empty body")]
    EmptyBody,

    #[error("failed to decode json from raw body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("raw entry is missing 'contents'")]
    MissingContents,

    #[error("all contents were missing method and/or base64 data")]
    AllContentsMissing,

    #[error("no valid entry in batched entries")]
    NoValidEntry,

    #[error("raw entry is not an object")]
    NotAnObject,
}

impl RawDecodeError {
    /// HTTP status for this error
    pub fn status_code(&self) -> u16 {
        422
    }

    /// Label used on the `raw_requests` metric
    pub fn metric_label(&self) -> &'static str {
        "decode"
    }
}

/// Why a payload could not be turned into a message.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("request proto not available")]
    RequestNotAvailable,

    #[error("failed to base64 decode {which} proto: {source}")]
    Base64 {
        which: &'static str,
        #[source]
        source: base64::DecodeError,
    },

    #[error("{0}")]
    Proto(#[from] prost::DecodeError),
}

impl PayloadError {
    pub fn is_request_not_available(&self) -> bool {
        matches!(self, PayloadError::RequestNotAvailable)
    }
}

/// Why a method handler gave up on a record. Recorded as a metric label and
/// a log line; never surfaced to the submitter.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("request proto not available")]
    RequestNotAvailable,

    #[error("Failed to parse {what}: {source}")]
    Parse {
        what: &'static str,
        #[source]
        source: PayloadError,
    },

    #[error("{0}")]
    NonSuccess(String),

    #[error("No AR quest info")]
    MissingArInfo,

    #[error("{0}")]
    Update(String),
}

impl HandlerError {
    /// Label used on the per-handler decode metric
    pub fn metric_label(&self) -> &'static str {
        match self {
            HandlerError::RequestNotAvailable | HandlerError::Parse { .. } => "parse",
            HandlerError::NonSuccess(_) => "non_success",
            HandlerError::MissingArInfo => "missing_ar_info",
            HandlerError::Update(_) => "update",
        }
    }

    pub(crate) fn non_success(what: &str, value: i32, name: Option<&'static str>) -> Self {
        HandlerError::NonSuccess(format!(
            "{}: Ignored non-success value {}:{}",
            what,
            value,
            name.unwrap_or("UNKNOWN")
        ))
    }
}

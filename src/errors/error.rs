use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::panic::Location;

pub(crate) const MALFORMED_INPUT_MESSAGE: &str =
    "failed to decode PEM block, the submitted data does not seem to be PEM encoded";
pub(crate) const MULTIPLE_BLOCKS_MESSAGE: &str =
    "multiple PEM blocks are not supported, submit a single certificate or certificate request";
pub(crate) const PRIVATE_KEY_MESSAGE: &str = "you have submitted a private key! \neven though we do not store any PEM files, you should consider this private key compromised";
pub(crate) const UNSUPPORTED_TYPE_MESSAGE: &str = "unsupported PEM type";
pub(crate) const RENDER_FAILED_MESSAGE: &str = "failed to render the PEM report";

/// Every way a submission can fail, plus the few failures of the HTTP front end.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
// Kind names are part of the JSON error payload, keep them stable.
#[serde(rename_all = "PascalCase")]
pub enum ErrorKind {
    // Decoder errors
    MalformedInput,
    MultipleBlocksUnsupported,
    SensitiveMaterialSubmitted,
    #[serde(rename = "UnsupportedPEMType")]
    UnsupportedPemType,
    StructureDecodeError,
    RenderError,

    // Front end errors
    PayloadTooLarge,
    BadRequest,
    NotFound,
    MethodNotAllowed,
    IoError,
    JsonError,
}

/// Minimal backtrace information
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorTrace {
    pub source: Option<String>,
    pub cause: Option<String>,
    pub location: Option<String>,
}

/// Error returned by the decoder and the HTTP front end.
///
/// `message` is always safe to show to the person who submitted the input.
/// Diagnostic-only data such as an unsupported label lives in `context`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppError {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<HashMap<String, String>>,
    #[serde(skip_serializing)]
    pub trace: Option<Box<ErrorTrace>>,
    pub timestamp: String,
}

impl AppError {
    /// Create a new error with just kind and message
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: None,
            trace: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Create a new error with contextual metadata
    pub fn with_context(
        kind: ErrorKind,
        message: impl Into<String>,
        context: HashMap<String, String>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            context: Some(context),
            trace: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Add trace information
    pub fn with_trace(
        mut self,
        source: Option<String>,
        cause: Option<String>,
        location: Option<String>,
    ) -> Self {
        self.trace = Some(Box::new(ErrorTrace {
            source,
            cause,
            location,
        }));
        self
    }

    /// Create error from another error with automatic trace
    #[track_caller]
    pub fn from_error<E: std::error::Error>(
        kind: ErrorKind,
        err: E,
        context: Option<HashMap<String, String>>,
        location: &Location,
    ) -> Self {
        let message = err.to_string();
        let source = err.source().map(|s| s.to_string());
        let cause = Some(format!("{err:?}"));

        Self {
            kind,
            message,
            context,
            trace: Some(Box::new(ErrorTrace {
                source,
                cause,
                location: Some(location.to_string()),
            })),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn malformed_input() -> Self {
        Self::new(ErrorKind::MalformedInput, MALFORMED_INPUT_MESSAGE)
    }

    pub fn multiple_blocks() -> Self {
        Self::new(ErrorKind::MultipleBlocksUnsupported, MULTIPLE_BLOCKS_MESSAGE)
    }

    pub fn private_key_submitted() -> Self {
        Self::new(ErrorKind::SensitiveMaterialSubmitted, PRIVATE_KEY_MESSAGE)
    }

    pub fn unsupported_type(label: &str) -> Self {
        let mut context = HashMap::new();
        context.insert("label".to_string(), label.to_string());
        Self::with_context(
            ErrorKind::UnsupportedPemType,
            UNSUPPORTED_TYPE_MESSAGE,
            context,
        )
    }

    /// Value of a context entry, if any.
    pub fn context_value(&self, key: &str) -> Option<&str> {
        self.context
            .as_ref()
            .and_then(|ctx| ctx.get(key))
            .map(String::as_str)
    }

    /// Whether the failure is a property of the submitted input rather than of the server.
    pub fn is_user_error(&self) -> bool {
        !matches!(
            self.kind,
            ErrorKind::RenderError | ErrorKind::IoError | ErrorKind::JsonError
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)
    }
}

impl std::error::Error for AppError {}

/// Macro for creating errors with location information
#[macro_export]
macro_rules! app_error {
    ($kind:expr, $msg:expr) => {
        AppError::new($kind, $msg).with_trace(
            None,
            None,
            Some(format!("{}:{}:{}", file!(), line!(), column!()))
        )
    };
    ($kind:expr, $msg:expr, $($key:expr => $value:expr),*) => {
        {
            let mut context = std::collections::HashMap::new();
            $(context.insert($key.to_string(), $value.to_string());)*
            AppError::with_context($kind, $msg, context).with_trace(
                None,
                None,
                Some(format!("{}:{}:{}", file!(), line!(), column!()))
            )
        }
    };
}

/// Conversion implementations for common error types
impl From<std::io::Error> for AppError {
    #[track_caller]
    fn from(err: std::io::Error) -> Self {
        AppError::from_error(ErrorKind::IoError, err, None, Location::caller())
    }
}

impl From<serde_json::Error> for AppError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        AppError::from_error(ErrorKind::JsonError, err, None, Location::caller())
    }
}

// The decoder's own message replaces base64's so the user sees one wording for bad armor.
impl From<base64::DecodeError> for AppError {
    #[track_caller]
    fn from(err: base64::DecodeError) -> Self {
        let mut error = AppError::from_error(ErrorKind::MalformedInput, err, None, Location::caller());
        error.message = MALFORMED_INPUT_MESSAGE.to_string();
        error
    }
}

impl From<std::fmt::Error> for AppError {
    #[track_caller]
    fn from(err: std::fmt::Error) -> Self {
        let mut error = AppError::from_error(ErrorKind::RenderError, err, None, Location::caller());
        error.message = RENDER_FAILED_MESSAGE.to_string();
        error
    }
}

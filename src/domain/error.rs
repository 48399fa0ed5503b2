//! Domain error types.

/// Failure to parse one raw candle record into a bar.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CandleError {
    #[error("record has {found} fields, need at least {required}")]
    TooFewFields { found: usize, required: usize },

    #[error("invalid timestamp {value:?}")]
    InvalidTimestamp { value: String },

    #[error("timestamp {millis} overflows nanosecond range")]
    TimestampOverflow { millis: u64 },

    #[error("invalid {field} value {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("{field}: {source}")]
    Value {
        field: &'static str,
        #[source]
        source: ValueError,
    },
}

/// Failure to build a fixed-precision value object.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValueError {
    #[error("precision {precision} exceeds maximum {max}")]
    PrecisionTooLarge { precision: u8, max: u8 },

    #[error("value {value} is not representable as a decimal")]
    NotRepresentable { value: f64 },

    #[error("value {value} has too many digits for precision {precision}")]
    PrecisionOverflow { value: String, precision: u8 },

    #[error("quantity must be non-negative, was {value}")]
    NegativeQuantity { value: String },

    #[error("invalid money {input:?}: {reason}")]
    InvalidMoney { input: String, reason: String },
}

/// Failure to parse an identifier or an enumerated config value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid {kind} {input:?}: {reason}")]
pub struct IdentifierError {
    pub kind: &'static str,
    pub input: String,
    pub reason: String,
}

impl IdentifierError {
    pub fn new(kind: &'static str, input: &str, reason: impl Into<String>) -> Self {
        Self {
            kind,
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// Top-level error type for spotrunner.
#[derive(Debug, thiserror::Error)]
pub enum SpotrunnerError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Identifier(#[from] IdentifierError),

    #[error(transparent)]
    Value(#[from] ValueError),

    #[error("exchange request failed: {reason}")]
    Exchange { reason: String },

    #[error("exchange returned HTTP {status}: {body}")]
    ExchangeStatus { status: u16, body: String },

    #[error("unexpected exchange response: {reason}")]
    ExchangeResponse { reason: String },

    #[error("exchange client is not connected")]
    NotConnected,

    #[error("instrument {id} not found in catalog of {count} instruments")]
    InstrumentNotFound { id: String, count: usize },

    #[error("failed to read candle data from {path}: {reason}")]
    DataSource { path: String, reason: String },

    #[error("candle record {index}: {source}")]
    Candle {
        index: usize,
        #[source]
        source: CandleError,
    },

    #[error("cannot {to} while {from}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },

    #[error("engine has been disposed")]
    EngineDisposed,

    #[error("venue {venue} is already registered")]
    DuplicateVenue { venue: String },

    #[error("venue {venue} is not registered")]
    UnknownVenue { venue: String },

    #[error("instrument {id} is not registered")]
    UnknownInstrument { id: String },

    #[error("strategy {strategy} failed: {reason}")]
    Strategy { strategy: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&SpotrunnerError> for std::process::ExitCode {
    fn from(err: &SpotrunnerError) -> Self {
        let code: u8 = match err {
            SpotrunnerError::Io(_) => 1,
            SpotrunnerError::ConfigParse { .. }
            | SpotrunnerError::ConfigMissing { .. }
            | SpotrunnerError::ConfigInvalid { .. }
            | SpotrunnerError::Identifier(_)
            | SpotrunnerError::Value(_) => 2,
            SpotrunnerError::Exchange { .. }
            | SpotrunnerError::ExchangeStatus { .. }
            | SpotrunnerError::ExchangeResponse { .. }
            | SpotrunnerError::NotConnected
            | SpotrunnerError::InstrumentNotFound { .. } => 3,
            SpotrunnerError::DataSource { .. } | SpotrunnerError::Candle { .. } => 4,
            SpotrunnerError::InvalidTransition { .. }
            | SpotrunnerError::EngineDisposed
            | SpotrunnerError::DuplicateVenue { .. }
            | SpotrunnerError::UnknownVenue { .. }
            | SpotrunnerError::UnknownInstrument { .. }
            | SpotrunnerError::Strategy { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

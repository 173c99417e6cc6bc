//! Domain error types.
//!
//! Unit- and instrument-level failures are captured as data by the engine and
//! the batch layer; only configuration errors and adapter errors surface to
//! callers as `Err`.

/// A parse error with position information for rule parsing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    /// Format the error with a caret pointing at the error position in the input.
    pub fn display_with_context(&self, input: &str) -> String {
        let caret = " ".repeat(self.position) + "^";
        format!(
            "{input}\n{caret}\n{err}",
            input = input,
            caret = caret,
            err = self
        )
    }
}

/// Violations of the series contract.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SeriesError {
    #[error("{code}: field '{field}' has {actual} values, expected {expected}")]
    LengthMismatch {
        code: String,
        field: String,
        expected: usize,
        actual: usize,
    },

    #[error("{code}: dates not strictly ascending at index {index}")]
    NotAscending { code: String, index: usize },

    #[error("{code}: non-finite value in '{field}' at index {index}")]
    NonFinite {
        code: String,
        field: String,
        index: usize,
    },

    #[error("{code}: extra field name must not be empty")]
    EmptyFieldName { code: String },
}

/// Failure raised by a single unit invocation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UnitError {
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("missing parameter '{name}'")]
    MissingParameter { name: String },

    #[error("series has no field '{name}'")]
    MissingField { name: String },

    #[error("computation failed: {reason}")]
    Computation { reason: String },

    #[error("unit panicked: {reason}")]
    Panicked { reason: String },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistryError {
    #[error("unit '{name}' is already registered")]
    DuplicateName { name: String },

    #[error("capability '{id}' is already provided by unit '{existing}'")]
    DuplicateCapability { id: String, existing: String },
}

/// Plan construction failures. Raised before any compute call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlanError {
    #[error("unknown capability or unit '{id}'")]
    UnknownCapability { id: String },

    #[error("unit '{unit}' has no parameter '{key}'")]
    UnknownParameter { unit: String, key: String },

    #[error("invalid parameter for '{unit}': {source}")]
    InvalidParameter {
        unit: String,
        #[source]
        source: UnitError,
    },

    #[error("min_strength must be within 0..=100, got {value}")]
    InvalidThreshold { value: f64 },

    #[error("lookback must be at least 1 bar")]
    InvalidLookback,

    #[error("unknown preset '{name}'")]
    UnknownPreset { name: String },

    #[error("unknown priority tier '{name}'")]
    UnknownPriority { name: String },

    #[error("unknown category '{name}'")]
    UnknownCategory { name: String },
}

/// Failure of the engine's own orchestration for one instrument.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("malformed series: {0}")]
    MalformedSeries(#[from] SeriesError),

    #[error("compute panicked for {code}: {reason}")]
    Panicked { code: String, reason: String },
}

/// Top-level error type for quantscan.
#[derive(Debug, thiserror::Error)]
pub enum QuantscanError {
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
    Plan(#[from] PlanError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    RuleParse(#[from] ParseError),

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error(transparent)]
    Series(#[from] SeriesError),

    #[error("output error: {reason}")]
    Output { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&QuantscanError> for std::process::ExitCode {
    fn from(err: &QuantscanError) -> Self {
        let code: u8 = match err {
            QuantscanError::Io(_) | QuantscanError::Output { .. } => 1,
            QuantscanError::ConfigParse { .. }
            | QuantscanError::ConfigMissing { .. }
            | QuantscanError::ConfigInvalid { .. }
            | QuantscanError::Plan(_)
            | QuantscanError::Registry(_) => 2,
            QuantscanError::Data { .. } | QuantscanError::Series(_) => 3,
            QuantscanError::RuleParse(_) => 4,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_context_points_at_position() {
        let err = ParseError {
            message: "expected ')'".into(),
            position: 4,
        };
        let rendered = err.display_with_context("SMA(5");
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "SMA(5");
        assert_eq!(lines[1], "    ^");
        assert!(lines[2].contains("position 4"));
    }

    #[test]
    fn plan_error_wraps_unit_error() {
        let err = PlanError::InvalidParameter {
            unit: "rsi".into(),
            source: UnitError::InvalidParameter {
                name: "period".into(),
                reason: "must be a positive integer".into(),
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("rsi"));
        assert!(msg.contains("period"));
    }

    #[test]
    fn engine_error_from_series_error() {
        let err: EngineError = SeriesError::NotAscending {
            code: "X".into(),
            index: 3,
        }
        .into();
        assert!(matches!(err, EngineError::MalformedSeries(_)));
    }

    #[test]
    fn exit_codes_by_category() {
        use std::process::ExitCode;
        let cfg = QuantscanError::ConfigMissing {
            section: "plan".into(),
            key: "preset".into(),
        };
        assert_eq!(ExitCode::from(&cfg), ExitCode::from(2));
        let data = QuantscanError::Data {
            reason: "missing file".into(),
        };
        assert_eq!(ExitCode::from(&data), ExitCode::from(3));
        let rule = QuantscanError::RuleParse(ParseError {
            message: "x".into(),
            position: 0,
        });
        assert_eq!(ExitCode::from(&rule), ExitCode::from(4));
    }
}

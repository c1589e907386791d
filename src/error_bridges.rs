//! Error bridge implementations for subsystem errors.
//!
//! This module provides `impl From<X> for SelError` conversions from the
//! error types of the core, text and config layers to the unified
//! `SelError` type.

use statesel_core::filter::{ExprError, FilterError, JsonFilterError};
use statesel_core::node::RegistryError;
use statesel_core::state::StateError;
use statesel_text::TextError;

use crate::config::ConfigError;
use crate::error::SelError;

// ============================================================================
// Bridge: RegistryError -> SelError
// ============================================================================

impl From<RegistryError> for SelError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::UnknownType { name } => SelError::UnknownType { name },
            RegistryError::DuplicateType { .. } => SelError::data(err.to_string(), None),
            RegistryError::Io { path, message } => SelError::FileError { path, message },
            RegistryError::Parse { path, message } => SelError::data(message, Some(path)),
        }
    }
}

// ============================================================================
// Bridge: filter errors -> SelError
// ============================================================================

impl From<FilterError> for SelError {
    fn from(err: FilterError) -> Self {
        match err {
            FilterError::InvalidFilter { value } => SelError::InvalidFilter {
                message: format!("unsupported literal {}", value),
            },
            FilterError::Registry(registry_err) => SelError::from(registry_err),
        }
    }
}

impl From<JsonFilterError> for SelError {
    fn from(err: JsonFilterError) -> Self {
        match err {
            JsonFilterError::ParseError(message) => SelError::InvalidFilter { message },
            JsonFilterError::Filter(filter_err) => SelError::from(filter_err),
        }
    }
}

impl From<ExprError> for SelError {
    fn from(err: ExprError) -> Self {
        match err {
            ExprError::InvalidExpression { .. } => SelError::InvalidFilter {
                message: err.to_string(),
            },
            ExprError::Filter(filter_err) => SelError::from(filter_err),
        }
    }
}

// ============================================================================
// Bridge: StateError -> SelError
// ============================================================================

impl From<StateError> for SelError {
    fn from(err: StateError) -> Self {
        match err {
            StateError::ParseError(message) => SelError::data(message, None),
            StateError::InvalidLeaf { .. } => SelError::data(err.to_string(), None),
            StateError::Registry(registry_err) => SelError::from(registry_err),
            StateError::WildcardNotLast { position } => SelError::invalid_args_with_details(
                err.to_string(),
                serde_json::json!({ "position": position }),
            ),
            StateError::NonExhaustive { paths } => SelError::NonExhaustive { paths },
            StateError::KeyCollision { .. } | StateError::LeafWithChildren { .. } => {
                SelError::data(err.to_string(), None)
            }
        }
    }
}

// ============================================================================
// Bridge: TextError -> SelError
// ============================================================================

impl From<TextError> for SelError {
    fn from(err: TextError) -> Self {
        match err {
            TextError::Io { path, message } => SelError::FileError { path, message },
            TextError::MalformedEmbeddings { ref path, .. }
            | TextError::MalformedTsv { ref path, .. } => {
                let path = path.clone();
                SelError::data(err.to_string(), Some(path))
            }
            TextError::MalformedVector { .. }
            | TextError::DuplicateToken { .. }
            | TextError::MissingSpecial { .. }
            | TextError::SizeMismatch { .. } => SelError::data(err.to_string(), None),
            TextError::InvalidBatchSize
            | TextError::InvalidDimension
            | TextError::MissingVectors => {
                SelError::invalid_args(err.to_string())
            }
        }
    }
}

// ============================================================================
// Bridge: ConfigError -> SelError
// ============================================================================

impl From<ConfigError> for SelError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Io { path, message } => SelError::FileError { path, message },
            ConfigError::Parse { .. }
            | ConfigError::InvalidEnv { .. }
            | ConfigError::ZeroSize { .. }
            | ConfigError::InvalidLogLevel { .. } => SelError::invalid_args(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OutputErrorCode;

    #[test]
    fn unknown_type_keeps_name() {
        let err = SelError::from(FilterError::Registry(RegistryError::UnknownType {
            name: "Mystery".to_string(),
        }));
        assert!(matches!(&err, SelError::UnknownType { name } if name == "Mystery"));
        assert_eq!(err.error_code(), OutputErrorCode::ResolutionError);
    }

    #[test]
    fn invalid_filter_is_invalid_arguments() {
        let err = SelError::from(JsonFilterError::Filter(FilterError::InvalidFilter {
            value: "3".to_string(),
        }));
        assert_eq!(err.to_string(), "invalid filter: unsupported literal 3");
        assert_eq!(err.error_code().code(), 2);
    }

    #[test]
    fn state_errors_map_by_kind() {
        let wildcard = SelError::from(StateError::WildcardNotLast { position: 0 });
        assert_eq!(wildcard.error_code().code(), 2);

        let leaf = SelError::from(StateError::InvalidLeaf {
            path: "a".to_string(),
            message: "bad".to_string(),
        });
        assert_eq!(leaf.error_code().code(), 4);

        let collision = SelError::from(StateError::KeyCollision {
            path: "layers".to_string(),
            key: "0".to_string(),
        });
        assert_eq!(collision.error_code().code(), 4);
        assert_eq!(
            collision.to_string(),
            "data error: index 0 and name '0' both appear under 'layers'"
        );
    }

    #[test]
    fn text_errors_map_by_kind() {
        assert_eq!(SelError::from(TextError::MissingVectors).error_code().code(), 2);
        assert_eq!(
            SelError::from(TextError::Io {
                path: "train.tsv".to_string(),
                message: "not found".to_string(),
            })
            .error_code()
            .code(),
            3
        );
        let tsv = SelError::from(TextError::MalformedTsv {
            path: "dev.tsv".to_string(),
            line: 2,
            message: "invalid label '7'".to_string(),
        });
        assert!(matches!(&tsv, SelError::DataError { path: Some(p), .. } if p == "dev.tsv"));
    }
}

//! Filter decoding errors

use thiserror::Error;

/// Raised when a filter cannot be built from its wire form or arguments
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Unknown filter operator: {0}")]
    UnknownOperator(String),

    #[error("Filter on '{column}' with operator '{operator}' requires a value")]
    MissingValue { column: String, operator: String },

    #[error("Invalid operand for '{column}' ({operator}): {reason}")]
    InvalidOperand {
        column: String,
        operator: String,
        reason: String,
    },

    #[error("Filter column must not be empty")]
    EmptyColumn,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_operator_display() {
        let err = DecodeError::UnknownOperator("like".to_string());
        assert_eq!(err.to_string(), "Unknown filter operator: like");
    }

    #[test]
    fn test_invalid_operand_display() {
        let err = DecodeError::InvalidOperand {
            column: "age".to_string(),
            operator: "between".to_string(),
            reason: "expected [min, max]".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid operand for 'age' (between): expected [min, max]"
        );
    }
}

// diag.rs — Error taxonomy and stable diagnostic codes
//
// Every fallible builder or emitter call returns `Result<_, GenError>`. Each
// variant carries a stable code so host programs can match on failures
// without parsing messages.
//
// Preconditions: none (types only).
// Postconditions: none (types only).
// Failure modes: none.
// Side effects: none.

use std::fmt;

// ── Diagnostic code ──────────────────────────────────────────────────────

/// A stable diagnostic code (e.g., `E0100`).
///
/// Codes are `&'static str` constants defined in the `codes` module.
/// Once assigned, a code must never be reassigned to a different meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiagCode(pub &'static str);

impl fmt::Display for DiagCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub mod codes {
    use super::DiagCode;

    /// Operands of incompatible value types, or a non-boolean condition.
    pub const E0100: DiagCode = DiagCode("E0100");
    /// Indexing a node kind that has no addressable structure.
    pub const E0101: DiagCode = DiagCode("E0101");
    /// A bounded or non-positive-step slice.
    pub const E0102: DiagCode = DiagCode("E0102");
    /// A value type with no decode/encode rule where one is required.
    pub const E0103: DiagCode = DiagCode("E0103");
}

// ── Error ────────────────────────────────────────────────────────────────

/// A fatal build or emission error. The builder stays usable afterwards:
/// nodes built before the failing call remain valid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenError {
    #[error("type mismatch in {context}: expected {expected}, found {found}")]
    TypeMismatch {
        context: String,
        expected: String,
        found: String,
    },

    #[error("cannot index '{node}': {reason}")]
    InvalidIndex { node: String, reason: String },

    #[error("unsupported slice: {0}")]
    UnsupportedSlice(String),

    #[error("value type {ty} has no {direction} conversion")]
    UnsupportedConversion {
        ty: String,
        direction: &'static str,
    },
}

impl GenError {
    pub fn type_mismatch(
        context: impl Into<String>,
        expected: impl fmt::Display,
        found: impl fmt::Display,
    ) -> Self {
        GenError::TypeMismatch {
            context: context.into(),
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    pub fn invalid_index(node: impl Into<String>, reason: impl Into<String>) -> Self {
        GenError::InvalidIndex {
            node: node.into(),
            reason: reason.into(),
        }
    }

    /// The stable code for this error.
    pub fn code(&self) -> DiagCode {
        match self {
            GenError::TypeMismatch { .. } => codes::E0100,
            GenError::InvalidIndex { .. } => codes::E0101,
            GenError::UnsupportedSlice(_) => codes::E0102,
            GenError::UnsupportedConversion { .. } => codes::E0103,
        }
    }

    /// Render as `error[CODE]: message`, the form the binary prints.
    pub fn render(&self) -> String {
        format!("error[{}]: {}", self.code(), self)
    }
}

pub type GenResult<T> = Result<T, GenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_type_mismatch() {
        let e = GenError::type_mismatch("add", "Int32", "Bit");
        assert_eq!(
            e.to_string(),
            "type mismatch in add: expected Int32, found Bit"
        );
        assert_eq!(e.code(), codes::E0100);
    }

    #[test]
    fn render_with_code() {
        let e = GenError::UnsupportedSlice("stop bound".into());
        assert_eq!(e.render(), "error[E0102]: unsupported slice: stop bound");
    }

    #[test]
    fn codes_are_distinct() {
        let all = [
            GenError::type_mismatch("c", "a", "b").code(),
            GenError::invalid_index("n", "r").code(),
            GenError::UnsupportedSlice(String::new()).code(),
            GenError::UnsupportedConversion {
                ty: "Vec2".into(),
                direction: "output",
            }
            .code(),
        ];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}

//! Join operators.

use std::fmt;

pub mod nested_loop;

pub use nested_loop::Join;

/// Join condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinHow {
    /// Equality of one column from each side.
    Inner { left_key: String, right_key: String },
    /// Every left row paired with every right row.
    Cross,
}

impl JoinHow {
    pub fn inner(left_key: impl Into<String>, right_key: impl Into<String>) -> Self {
        JoinHow::Inner {
            left_key: left_key.into(),
            right_key: right_key.into(),
        }
    }

    /// Key column this condition reads from the left input, if any.
    pub fn left_key(&self) -> Option<&str> {
        match self {
            JoinHow::Inner { left_key, .. } => Some(left_key),
            JoinHow::Cross => None,
        }
    }

    pub fn right_key(&self) -> Option<&str> {
        match self {
            JoinHow::Inner { right_key, .. } => Some(right_key),
            JoinHow::Cross => None,
        }
    }
}

impl fmt::Display for JoinHow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinHow::Inner {
                left_key,
                right_key,
            } => write!(f, "inner(left.{left_key} = right.{right_key})"),
            JoinHow::Cross => f.write_str("cross"),
        }
    }
}

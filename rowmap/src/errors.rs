use std::fmt;

use thiserror::Error;

/// Top-level error type returned by rowmap.
#[derive(Debug, Error)]
pub enum RowmapError {
    /// The projector was handed something that is neither a record nor a map.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// A child of a condition failed to compile.
    #[error("error compiling {position}: {source}")]
    Compile {
        position: Position,
        #[source]
        source: Box<RowmapError>,
    },

    /// An expression is structurally broken on its own (e.g. a raw fragment whose markers
    /// do not match its arguments).
    #[error("invalid expression: {message}")]
    InvalidExpression { message: String },

    /// Configuration could not be parsed or loaded.
    #[error("invalid config: {message}")]
    Config { message: String },
}

impl RowmapError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn invalid_expression(message: impl Into<String>) -> Self {
        Self::InvalidExpression {
            message: message.into(),
        }
    }

    /// Wraps `self` as the failure of the child at `position`.
    pub fn at(self, position: Position) -> Self {
        Self::Compile {
            position,
            source: Box::new(self),
        }
    }

    /// Walks nested compile errors down to the innermost cause.
    pub fn root_cause(&self) -> &RowmapError {
        match self {
            Self::Compile { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Location of a failing child inside a condition tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Position {
    Left,
    Right,
    Node(usize),
    Argument { function: String, index: usize },
    Subquery,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Left => f.write_str("left side"),
            Position::Right => f.write_str("right side"),
            Position::Node(index) => write!(f, "node {index}"),
            Position::Argument { function, index } => write!(f, "argument {index} of {function}"),
            Position::Subquery => f.write_str("subquery"),
        }
    }
}

pub type Result<T, E = RowmapError> = std::result::Result<T, E>;

//! Route declaration errors.

use thiserror::Error;

/// Errors raised while parsing path patterns or building a route table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// A `{}` placeholder without a name.
    #[error("empty placeholder in pattern '{pattern}'")]
    EmptyPlaceholder {
        /// The offending pattern.
        pattern: String,
    },

    /// A segment mixes literal text with braces, e.g. `item-{id}`.
    #[error("malformed segment '{segment}' in pattern '{pattern}'")]
    MalformedSegment {
        /// The offending pattern.
        pattern: String,
        /// The segment that failed to parse.
        segment: String,
    },

    /// A catch-all segment that is not the last one.
    #[error("catch-all must be the last segment in pattern '{pattern}'")]
    CatchAllNotLast {
        /// The offending pattern.
        pattern: String,
    },

    /// The same placeholder name used twice in one pattern.
    #[error("placeholder '{name}' declared twice in pattern '{pattern}'")]
    DuplicatePlaceholder {
        /// The offending pattern.
        pattern: String,
        /// The repeated name.
        name: String,
    },

    /// A method name that is neither an HTTP method nor `socket`.
    #[error("invalid route method '{0}'")]
    InvalidMethod(String),

    /// A route declared without any method.
    #[error("route '{0}' declares no methods")]
    NoMethods(String),

    /// A route declared without a name.
    #[error("route with path '{0}' has an empty name")]
    EmptyName(String),

    /// Two routes with the same name.
    #[error("route '{0}' is declared more than once")]
    DuplicateName(String),
}

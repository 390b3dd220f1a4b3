//! Error types for template resolution.
//!
//! Resolution errors abort the entire top-level call atomically; no partial
//! output is ever surfaced, and no connection lifecycle state changes. Each
//! variant carries enough context (offset, fragment, field path) to point
//! the user at the offending template text.

use std::fmt;

use crate::render::RenderPurpose;

/// Errors that can occur while resolving a template-bearing structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// Malformed template syntax.
    ///
    /// Contains the offending substring and its byte offset in the source.
    Parse {
        /// The offending substring
        fragment: String,
        /// Byte offset of the fragment in the source string
        offset: usize,
    },

    /// A variable flagged as required was not found in the merged namespace.
    UndefinedVariable {
        /// Name of the missing variable
        name: String,
    },

    /// A variable referenced itself, directly or through other variables.
    CircularReference {
        /// Name at which the reentry was detected
        name: String,
    },

    /// An expression called a function that is not in the capability table.
    UnknownFunction {
        /// Name of the unknown function
        name: String,
    },

    /// An effectful function was invoked outside its allowed purposes.
    PurposeNotAllowed {
        /// Name of the function
        function: String,
        /// The purpose of the current resolution call
        purpose: RenderPurpose,
    },

    /// A function received arguments it cannot interpret.
    InvalidArguments {
        /// Name of the function
        function: String,
        /// What went wrong with the arguments
        message: String,
    },

    /// A resolved URL could not be parsed during request canonicalization.
    InvalidUrl {
        /// The URL text that failed to parse
        url: String,
        /// Parser message
        message: String,
    },

    /// The resolved structure no longer matched the expected request shape.
    InvalidStructure {
        /// What was wrong with the structure
        message: String,
    },

    /// An error that occurred while resolving a specific field of a
    /// structure. Wraps the underlying error with the field path (e.g.
    /// `headers[1].value`).
    Field {
        /// Path of the failing field within the structure
        path: String,
        /// The underlying resolution error
        source: Box<RenderError>,
    },
}

impl RenderError {
    /// Wraps this error with a field path segment.
    ///
    /// If the error is already field-annotated, the new segment is
    /// prepended so the outermost caller sees the full path.
    pub fn in_field(self, segment: impl Into<String>) -> Self {
        let segment = segment.into();
        match self {
            RenderError::Field { path, source } => RenderError::Field {
                path: if path.starts_with('[') {
                    format!("{}{}", segment, path)
                } else {
                    format!("{}.{}", segment, path)
                },
                source,
            },
            other => RenderError::Field {
                path: segment,
                source: Box::new(other),
            },
        }
    }

    /// Returns the innermost error, unwrapping any field annotations.
    pub fn root(&self) -> &RenderError {
        match self {
            RenderError::Field { source, .. } => source.root(),
            other => other,
        }
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Parse { fragment, offset } => {
                write!(
                    f,
                    "Malformed template syntax '{}' at offset {}",
                    fragment, offset
                )
            }
            RenderError::UndefinedVariable { name } => {
                write!(f, "Required variable '{}' is not defined", name)
            }
            RenderError::CircularReference { name } => {
                write!(f, "Circular reference detected for '{}'", name)
            }
            RenderError::UnknownFunction { name } => {
                write!(f, "Unknown template function '{}'", name)
            }
            RenderError::PurposeNotAllowed { function, purpose } => {
                write!(
                    f,
                    "Function '{}' is not allowed during {} rendering",
                    function, purpose
                )
            }
            RenderError::InvalidArguments { function, message } => {
                write!(f, "Invalid arguments for '{}': {}", function, message)
            }
            RenderError::InvalidUrl { url, message } => {
                write!(f, "Invalid URL '{}': {}", url, message)
            }
            RenderError::InvalidStructure { message } => {
                write!(f, "Invalid request structure: {}", message)
            }
            RenderError::Field { path, source } => {
                write!(f, "In field '{}': {}", path, source)
            }
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Field { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

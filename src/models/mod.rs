//! Core data models for connection requests.

pub mod request;

pub use request::{Header, QueryParam, RequestDefinition, ResolvedPair, ResolvedRequest};

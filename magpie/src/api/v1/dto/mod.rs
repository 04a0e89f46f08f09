//! v1 API Data Transfer Objects.
//!
//! These types define the wire format for the v1 REST API. They are kept
//! separate from the internal domain models in `src/models/` and handle
//! serialization, deserialization, and domain-model conversion.

pub mod ask;
pub mod documents;
pub mod imports;
pub mod search;

// Re-export all public types for convenient access via `dto::*`.
pub use ask::*;
pub use documents::*;
pub use imports::*;
pub use search::*;

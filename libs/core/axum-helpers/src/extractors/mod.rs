//! Custom extractors that render failures as [`crate::ErrorResponse`].

pub mod id_path;
pub mod validated_json;

pub use id_path::IdPath;
pub use validated_json::ValidatedJson;

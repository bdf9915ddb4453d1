//! Unified error type for the gateway.
//!
//! Every failure that crosses a component boundary is a [`BifrostError`]:
//! a serializable envelope carrying an [`ErrorKind`] classification that
//! drives dispatch policy (retry within a hop, skip to the next fallback
//! hop, or stop), the upstream HTTP status when one exists, and the
//! provider/model/request-kind the failure was observed on.

mod bifrost_error;
mod kind;

pub use bifrost_error::BifrostError;
pub use bifrost_error::ErrorBody;
pub use bifrost_error::ErrorExtraFields;
pub use bifrost_error::parse_retry_after;
pub use kind::ErrorKind;
pub use kind::ErrorPolicy;

/// Result type alias using BifrostError.
pub type Result<T> = std::result::Result<T, BifrostError>;

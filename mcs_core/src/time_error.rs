//! Maps `Box<dyn Error>` from the `TimeSource` boundary to `FollowError`.
//!
//! Known `TimeSourceError` values keep their numeric status code; anything
//! else is carried as text only.

use mcs_traits::TimeSourceError;

use crate::error::FollowError;

/// Map a time-source error to `FollowError::TimeSource`.
pub fn map_time_error(e: &(dyn std::error::Error + 'static)) -> FollowError {
    if let Some(ts) = e.downcast_ref::<TimeSourceError>() {
        return FollowError::TimeSource {
            code: Some(ts.code),
            message: ts.to_string(),
        };
    }
    FollowError::TimeSource {
        code: None,
        message: e.to_string(),
    }
}

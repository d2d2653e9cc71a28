//! Time helpers.

use chrono::Utc;

/// Current unix time in seconds.
pub fn now_unix() -> i64 {
    Utc::now().timestamp()
}

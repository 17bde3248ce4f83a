//! Wall-clock helper.

use chrono::{DateTime, SubsecRound, Utc};

/// Current UTC time truncated to microseconds.
///
/// PostgreSQL `TIMESTAMPTZ` keeps microseconds, so timestamps produced here
/// survive a storage round trip unchanged.
#[must_use]
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

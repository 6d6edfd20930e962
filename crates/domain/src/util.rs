use std::time::{SystemTime, UNIX_EPOCH};

use uuid::Uuid;

/// Time-ordered id for internal identifiers. Never exposed on the public
/// path; share tokens come from `token::ShareToken` instead.
pub fn uuid_v7_without_dashes() -> String {
    Uuid::now_v7().simple().to_string()
}

pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

//! Wall-clock time source.

use rategate_types::Timestamp;

/// Current Unix time in whole seconds.
pub fn now_secs() -> Timestamp {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

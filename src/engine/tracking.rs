use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;

const SUFFIX_LEN: usize = 4;

/// `PKG-YYYYMMDD-HHMMSS-XXXX`, with an uppercase alphanumeric suffix.
pub fn tracking_code(now: DateTime<Utc>) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(|byte| char::from(byte).to_ascii_uppercase())
        .collect();

    format!("PKG-{}-{suffix}", now.format("%Y%m%d-%H%M%S"))
}

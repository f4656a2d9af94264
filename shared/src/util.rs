use chrono::{DateTime, Utc};

/// Current UTC time.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current UTC timestamp in milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Generate a Snowflake-style i64 for use as resource ID.
///
/// Layout (53 bits, fits in JavaScript's Number.MAX_SAFE_INTEGER):
///   - 41 bits: milliseconds since 2024-01-01 UTC (~69 years)
///   - 12 bits: random (4096 values per ms, collision-free at POS scale)
pub fn snowflake_id() -> i64 {
    use rand::Rng;
    // Custom epoch: 2024-01-01 00:00:00 UTC
    const EPOCH_MS: i64 = 1_704_067_200_000;
    let now = now_millis();
    let ts = (now - EPOCH_MS) & 0x1FF_FFFF_FFFF; // 41 bits
    let rand_bits: i64 = rand::thread_rng().gen_range(0..0x1000); // 12 bits
    (ts << 12) | rand_bits
}

/// Collection-scoped record id. Snowflake rendered as a string so it can
/// double as the cloud document key.
pub fn record_id() -> String {
    snowflake_id().to_string()
}

/// Round a monetary amount half-up to 2 decimals.
///
/// The epsilon nudge compensates for float representation of values like
/// 1.005 that would otherwise round down.
pub fn round_money(value: f64) -> f64 {
    ((value + f64::EPSILON) * 100.0).round() / 100.0
}

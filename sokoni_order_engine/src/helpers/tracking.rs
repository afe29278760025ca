use std::sync::OnceLock;

use chrono::Utc;
use rand::Rng;
use regex::Regex;

const TRACKING_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ0123456789";

fn random_suffix(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len).map(|_| TRACKING_ALPHABET[rng.gen_range(0..TRACKING_ALPHABET.len())] as char).collect()
}

/// Mints a tracking number of the form `SOK-20250114-7GX4QZ`. The date prefix
/// keeps numbers human-shareable and roughly sortable; global uniqueness is
/// enforced by the database, with the caller retrying on the (vanishingly
/// rare) collision.
pub fn new_tracking_number() -> String {
    format!("SOK-{}-{}", Utc::now().format("%Y%m%d"), random_suffix(6))
}

/// Mints a public order id, e.g. `SO-J8K2M4P6QX`.
pub fn new_order_id() -> String {
    format!("SO-{}", random_suffix(10))
}

pub fn is_valid_tracking_number(s: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^SOK-\d{8}-[A-HJ-NP-Z0-9]{6}$").expect("tracking number regex is valid")
    });
    re.is_match(s)
}

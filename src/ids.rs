//! Primary key generation.
//!
//! Every table is keyed by a short random alphanumeric string rather than an
//! auto-increment integer or a UUID. Uniqueness is enforced by the primary key
//! constraint, not by the generator.

use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};

/// Length of every generated primary key.
pub const ID_LENGTH: usize = 8;

/// Generates a new random 8-character `[A-Za-z0-9]` identifier.
pub fn generate_id() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LENGTH)
        .map(char::from)
        .collect()
}

/// Returns true when `value` has the shape of a generated identifier.
pub fn is_valid_id(value: &str) -> bool {
    value.len() == ID_LENGTH && value.bytes().all(|b| b.is_ascii_alphanumeric())
}

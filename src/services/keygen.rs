//! License key generation.

/// Length of a generated key in hex characters.
const KEY_LEN: usize = 30;

/// Generate a random license key: 15 random bytes as 30 uppercase hex
/// characters. Collision probability is negligible within any realistic
/// key space; the unique column on `key_code` still catches the freak case
/// and the caller retries with a fresh value.
#[must_use]
pub fn generate_key() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; KEY_LEN / 2] = rng.random();

    bytes
        .iter()
        .fold(String::with_capacity(KEY_LEN), |mut acc, b| {
            use std::fmt::Write;
            let _ = write!(acc, "{b:02X}");
            acc
        })
}

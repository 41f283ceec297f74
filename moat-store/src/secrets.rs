//! Random secret generation for configuration values.

use rand::Rng;

const HEX_CHARS: &[u8] = b"0123456789abcdef";
const ALNUM_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const SAFE_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// Character set a generated secret is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    /// Lowercase hexadecimal.
    Hex,
    /// Mixed-case letters and digits.
    Alphanumeric,
    /// Alphanumeric plus `-` and `_`; safe to embed in URLs and shell lines.
    Safe,
}

impl Charset {
    fn chars(self) -> &'static [u8] {
        match self {
            Charset::Hex => HEX_CHARS,
            Charset::Alphanumeric => ALNUM_CHARS,
            Charset::Safe => SAFE_CHARS,
        }
    }
}

/// Generate a random secret of `length` characters using the thread-local
/// CSPRNG.
pub fn generate_secret(charset: Charset, length: usize) -> String {
    let chars = charset.chars();
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| chars[rng.gen_range(0..chars.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_secret_length_and_charset() {
        let hex = generate_secret(Charset::Hex, 32);
        assert_eq!(hex.len(), 32);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));

        let alnum = generate_secret(Charset::Alphanumeric, 20);
        assert_eq!(alnum.len(), 20);
        assert!(alnum.chars().all(|c| c.is_ascii_alphanumeric()));

        let safe = generate_secret(Charset::Safe, 64);
        assert_eq!(safe.len(), 64);
        assert!(safe
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_generate_secret_is_random() {
        let a = generate_secret(Charset::Alphanumeric, 32);
        let b = generate_secret(Charset::Alphanumeric, 32);
        assert_ne!(a, b); // Should be different (very high probability)
    }
}

//! Random and clock-derived pieces of generated identifiers

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::time::epoch_millis;

/// `len` uppercase hex characters drawn from v4 UUIDs
pub fn random_hex(len: usize) -> String {
    let mut out = String::with_capacity(len + 32);
    while out.len() < len {
        out.push_str(&Uuid::new_v4().simple().to_string().to_uppercase());
    }
    out.truncate(len);
    out
}

/// `len` decimal digits, zero padded (at most 38)
pub fn random_digits(len: usize) -> String {
    let len = len.min(38);
    let modulus = 10u128.pow(len as u32);
    format!("{:0width$}", Uuid::new_v4().as_u128() % modulus, width = len)
}

/// Last `len` digits of the epoch-millisecond clock at `at`
pub fn clock_digits(at: DateTime<Utc>, len: usize) -> String {
    let millis = epoch_millis(at).unsigned_abs().to_string();
    let start = millis.len().saturating_sub(len);
    format!("{:0>width$}", &millis[start..], width = len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_random_hex_length_and_alphabet() {
        for len in [0, 6, 10, 64] {
            let hex = random_hex(len);
            assert_eq!(hex.len(), len);
            assert!(hex.chars().all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
        }
        assert_ne!(random_hex(32), random_hex(32));
    }

    #[test]
    fn test_random_digits_are_padded() {
        let digits = random_digits(4);
        assert_eq!(digits.len(), 4);
        assert!(digits.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_clock_digits_keep_the_tail() {
        let at = Utc.timestamp_millis_opt(1_760_000_123_456).unwrap();
        assert_eq!(clock_digits(at, 6), "123456");
        assert_eq!(clock_digits(at, 8), "00123456");
        assert_eq!(clock_digits(at, 20), "00000001760000123456");
    }
}

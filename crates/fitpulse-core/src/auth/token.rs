//! Locally generated session tokens.

use chrono::Utc;
use rand::Rng;

/// Number of random characters before the timestamp suffix
const RANDOM_PART_LEN: usize = 16;

const BASE36_DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generate an opaque token: random base-36 characters followed by the
/// current time in milliseconds, also base-36.
pub fn generate_local_token() -> String {
    let mut rng = rand::thread_rng();
    let mut token: String = (0..RANDOM_PART_LEN)
        .map(|_| BASE36_DIGITS[rng.gen_range(0..BASE36_DIGITS.len())] as char)
        .collect();
    token.push_str(&to_base36(Utc::now().timestamp_millis().max(0) as u64));
    token
}

fn to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(BASE36_DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(1295), "zz");
    }

    #[test]
    fn test_generate_local_token_shape() {
        let token = generate_local_token();
        assert!(token.len() > RANDOM_PART_LEN);
        assert!(token.bytes().all(|b| BASE36_DIGITS.contains(&b)));
    }

    #[test]
    fn test_generate_local_token_is_unique() {
        assert_ne!(generate_local_token(), generate_local_token());
    }
}

use rand::Rng;

pub const OMID_LENGTH: usize = 12;
pub const OMID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generates a user-facing identifier (OMID), independent of the MongoDB `_id`.
///
/// Uniqueness is not checked here.
pub fn generate_omid() -> String {
    let mut rng = rand::rng();
    (0..OMID_LENGTH)
        .map(|_| OMID_ALPHABET[rng.random_range(0..OMID_ALPHABET.len())] as char)
        .collect()
}

/// Six-digit one-time code for email verification.
pub fn generate_otp() -> String {
    rand::rng().random_range(100_000..=999_999u32).to_string()
}

pub fn is_valid_omid(value: &str) -> bool {
    value.len() == OMID_LENGTH && value.bytes().all(|b| OMID_ALPHABET.contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_omid_shape() {
        for _ in 0..500 {
            let omid = generate_omid();
            assert_eq!(omid.len(), OMID_LENGTH);
            assert!(is_valid_omid(&omid), "unexpected character in {}", omid);
        }
    }

    #[test]
    fn test_otp_is_six_digits() {
        for _ in 0..500 {
            let otp = generate_otp();
            assert_eq!(otp.len(), 6);
            assert!(otp.chars().all(|c| c.is_ascii_digit()));
            assert_ne!(otp.chars().next(), Some('0'));
        }
    }

    #[test]
    fn test_is_valid_omid_rejects_lowercase_and_length() {
        assert!(!is_valid_omid("abcdefghijkl"));
        assert!(!is_valid_omid("ABC"));
        assert!(is_valid_omid("A1B2C3D4E5F6"));
    }
}

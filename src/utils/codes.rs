// utils/codes.rs
use rand::Rng;

/// Fixed-case alphabet for referral codes. Uppercase only so lookups can be
/// case-normalized without ambiguity (no 'l' vs 'I' style collisions across
/// cases).
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub const CODE_LENGTH: usize = 8;
pub const TOKEN_LENGTH: usize = 32;

/// Generate a short shareable referral code.
///
/// Collisions are possible (36^8 space) and must be handled by the caller
/// with a uniqueness re-check and retry.
pub fn generate_referral_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Generate an attribution token.
///
/// The token doubles as a bearer credential linking a future conversion back
/// to a click, so it must be unguessable. ThreadRng is a CSPRNG; 32
/// alphanumeric chars gives ~190 bits of entropy.
pub fn generate_attribution_token() -> String {
    use rand::distr::Alphanumeric;

    let mut rng = rand::rng();
    (0..TOKEN_LENGTH)
        .map(|_| rng.sample(Alphanumeric) as char)
        .collect()
}

/// Normalize a user-supplied referral code for lookup.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_code_uses_fixed_case_alphabet() {
        for _ in 0..100 {
            let code = generate_referral_code();
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(code
                .bytes()
                .all(|b| CODE_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_tokens_are_distinct() {
        let tokens: HashSet<String> =
            (0..1000).map(|_| generate_attribution_token()).collect();
        assert_eq!(tokens.len(), 1000);
    }

    #[test]
    fn test_token_length() {
        assert_eq!(generate_attribution_token().len(), TOKEN_LENGTH);
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("abc123"), "ABC123");
        assert_eq!(normalize_code("  AbC123 "), "ABC123");
    }
}

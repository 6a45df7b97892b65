use rand::Rng;
use uuid::Uuid;

const ALPHABET: &[u8; 26] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Generate an uppercase alphabetic code of exactly `length` characters.
///
/// A fresh random 128-bit value is written in base 26 over `A..=Z`, least
/// significant digit first, so the leading letters are uniformly distributed.
/// A 128-bit value yields at most 28 letters; longer codes are padded with
/// random letters. Not suitable for secrets.
pub fn generate_id(length: usize) -> String {
    let mut value = Uuid::new_v4().as_u128();
    let mut code = String::with_capacity(length);

    while code.len() < length && value > 0 {
        code.push(ALPHABET[(value % 26) as usize] as char);
        value /= 26;
    }

    let mut rng = rand::thread_rng();
    while code.len() < length {
        code.push(ALPHABET[rng.gen_range(0..ALPHABET.len())] as char);
    }

    code
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_exact_length_and_alphabet() {
        for length in [0, 1, 7, 28, 40] {
            let code = generate_id(length);
            assert_eq!(code.len(), length);
            assert!(code.chars().all(|c| c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn test_successive_codes_differ() {
        let codes: HashSet<String> = (0..1000).map(|_| generate_id(7)).collect();
        // 26^7 possibilities; a handful of collisions would already be suspicious
        assert!(codes.len() >= 998);
    }
}

//! Deterministic fake credentials for tests.
//!
//! Values are assembled at runtime so that no literal token sits in the source
//! tree for a scanner to trip over. Each generator walks its alphabet with a
//! stride coprime to the alphabet length, so the output has no repeated
//! characters and clears every entropy threshold.

const ALNUM: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const ALNUM_UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const BASE64: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
const BASE64_URL: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

fn make_from(alphabet: &[u8], len: usize, seed: usize) -> String {
    let mut output = String::with_capacity(len);
    let mut idx = seed % alphabet.len();

    for _ in 0..len {
        output.push(alphabet[idx] as char);
        idx = (idx + 7) % alphabet.len();
    }

    output
}

pub fn github_pat() -> String {
    format!("ghp_{}", make_from(ALNUM, 36, 1))
}

pub fn github_fine_grained_pat() -> String {
    format!("github_pat_{}", make_from(ALNUM, 82, 2))
}

pub fn openai_key() -> String {
    format!("sk-{}", make_from(ALNUM, 48, 3))
}

pub fn aws_access_key_id() -> String {
    format!("AKIA{}", make_from(ALNUM_UPPER, 16, 14))
}

pub fn aws_secret_assignment() -> String {
    format!("aws_secret_access_key = {}", make_from(BASE64, 40, 15))
}

pub fn gcp_api_key() -> String {
    format!("AIza{}", make_from(BASE64_URL, 35, 19))
}

pub fn bearer_token() -> String {
    format!("Bearer {}", make_from(ALNUM, 32, 25))
}

pub fn jwt_token() -> String {
    format!(
        "eyJ{}.eyJ{}.{}",
        make_from(BASE64_URL, 20, 29),
        make_from(BASE64_URL, 20, 30),
        make_from(BASE64_URL, 20, 31)
    )
}

pub fn password_assignment() -> String {
    format!("password = \"{}\"", make_from(ALNUM, 14, 33))
}

pub fn postgres_url() -> String {
    let user = make_from(ALNUM, 6, 33);
    let pass = make_from(ALNUM, 10, 34);
    let db = make_from(ALNUM, 6, 35);
    let scheme = "postgresql";
    format!("{scheme}://{user}:{pass}@localhost:5432/{db}")
}

pub fn pem_marker(label: &str) -> String {
    format!("-----BEGIN {label}PRIVATE KEY-----")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generators_are_deterministic() {
        assert_eq!(github_pat(), github_pat());
        assert_eq!(github_pat().len(), 40);
        assert_eq!(aws_access_key_id().len(), 20);
        assert!(jwt_token().starts_with("eyJ"));
    }

    #[test]
    fn test_generated_bodies_have_no_repeats() {
        let body = &github_pat()[4..];
        let mut chars: Vec<char> = body.chars().collect();
        chars.sort_unstable();
        chars.dedup();
        assert_eq!(chars.len(), body.len());
    }
}

//! Prompt helpers.

use sha2::{Digest, Sha256};

/// Compute a stable SHA-256 fingerprint for a prompt string.
pub fn hash_prompt(prompt: &str) -> String {
    let digest = Sha256::digest(prompt.as_bytes());
    digest.iter().map(|byte| format!("{:02x}", byte)).collect()
}

/// Append labelled sections to a base system prompt.
///
/// Sections whose body is blank are skipped, so callers can pass optional
/// context without checking it first.
pub fn compose_system_prompt(base: &str, sections: &[(&str, &str)]) -> String {
    let mut prompt = base.trim_end().to_string();
    for (label, body) in sections {
        let body = body.trim();
        if body.is_empty() {
            continue;
        }
        if !prompt.is_empty() {
            prompt.push_str("\n\n");
        }
        prompt.push_str(&format!("[{}]\n{}", label, body));
    }
    prompt
}

//! Utility functions for content hashing and text truncation.

use sha2::{Digest, Sha256};

/// Compute a SHA-256 content hash for duplicate detection.
///
/// Concatenates the speaker role and the utterance text, then returns the
/// hex-encoded digest.
#[must_use]
pub fn content_hash(role: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(role.as_bytes());
    hasher.update(b":");
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Truncate `text` to at most `max_chars` characters, appending `...` when
/// anything was cut. Operates on char boundaries so multi-byte scripts
/// (Devanagari transcripts included) never split mid-character.
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_hash() {
        let h1 = content_hash("user", "what is gravity");
        let h2 = content_hash("user", "what is gravity");
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64); // SHA-256 hex length
    }

    #[test]
    fn different_inputs_different_hashes() {
        let h1 = content_hash("user", "what is gravity");
        let h2 = content_hash("assistant", "what is gravity");
        assert_ne!(h1, h2);
    }

    #[test]
    fn truncate_short_text_unchanged() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 5), "hello");
    }

    #[test]
    fn truncate_long_text() {
        assert_eq!(truncate_chars("hello world", 5), "hello...");
    }

    #[test]
    fn truncate_multibyte_on_char_boundary() {
        let hindi = "नमस्ते दुनिया";
        let out = truncate_chars(hindi, 6);
        assert!(out.ends_with("..."));
        assert_eq!(out.chars().count(), 9); // 6 kept + "..."
    }
}

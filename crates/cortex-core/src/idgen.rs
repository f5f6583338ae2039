//! SHA256 + base36 id generation.
//!
//! Entity ids are content-addressed: hashing (file, kind, name, signature)
//! keeps ids stable across rescans as long as the entity's essential
//! attributes are unchanged. Commit hashes use the same encoding over the
//! commit's parent, message, and timestamp.

use chrono::{DateTime, Utc};
use num_bigint::BigUint;
use num_traits::Zero;
use sha2::{Digest, Sha256};

use crate::enums::EntityKind;

/// Base36 alphabet (0-9, a-z).
const BASE36_ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Number of base36 chars in an entity id hash.
pub const ENTITY_HASH_LEN: usize = 6;

/// Number of base36 chars in a commit hash.
pub const COMMIT_HASH_LEN: usize = 12;

/// Converts a byte slice to a base36 string of the specified length.
pub fn encode_base36(data: &[u8], length: usize) -> String {
    let mut num = BigUint::from_bytes_be(data);
    let base = BigUint::from(36u32);
    let zero = BigUint::zero();

    // Least-significant digit first.
    let mut chars: Vec<u8> = Vec::with_capacity(length);
    while num > zero {
        let rem = &num % &base;
        num /= &base;
        let digits = rem.to_u32_digits();
        let i = if digits.is_empty() { 0 } else { digits[0] as usize };
        chars.push(BASE36_ALPHABET[i]);
    }
    chars.reverse();

    let mut s = String::from_utf8(chars).expect("base36 chars are valid UTF-8");

    if s.len() < length {
        let padding = "0".repeat(length - s.len());
        s = padding + &s;
    }
    // Keep the least significant digits on overflow.
    if s.len() > length {
        s = s[s.len() - length..].to_owned();
    }
    s
}

/// Builds a content-addressed entity id: `sa-<kind2>-<hash>-<Name>`.
///
/// The hash covers (file_path, kind, name, signature); line numbers and
/// visibility are deliberately excluded so that moving a function within a
/// file does not change its id.
pub fn entity_id(kind: EntityKind, file_path: &str, name: &str, signature: &str) -> String {
    let content = format!("{file_path}|{}|{name}|{signature}", kind.as_str());
    let hash = Sha256::digest(content.as_bytes());
    let short = encode_base36(&hash[..4], ENTITY_HASH_LEN);
    format!("sa-{}-{}-{}", kind.short_code(), short, name)
}

/// Builds a commit hash from the parent hash, message, and timestamp.
pub fn commit_hash(parent: &str, message: &str, timestamp: DateTime<Utc>) -> String {
    let content = format!(
        "{parent}|{message}|{}",
        timestamp.timestamp_nanos_opt().unwrap_or(0)
    );
    let hash = Sha256::digest(content.as_bytes());
    encode_base36(&hash[..8], COMMIT_HASH_LEN)
}

/// Returns `true` if the string has the shape of an entity id.
///
/// Entity ids look like `sa-<kind2>-<hash>-<Name>` with a known kind code.
pub fn looks_like_entity_id(s: &str) -> bool {
    let mut parts = s.splitn(4, '-');
    let (Some(prefix), Some(kind), Some(hash), Some(name)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    prefix == "sa"
        && EntityKind::from_short_code(kind).is_some()
        && !hash.is_empty()
        && hash.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
        && !name.is_empty()
}

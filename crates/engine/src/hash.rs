use sha2::{Digest, Sha256};

/// Engine name hash used for resource, variable and message-list ids.
///
/// Letters are case-folded, digits are shifted above the alphabet, and every
/// character toggles one bit chosen by a running 5-bit position.
pub fn name_hash(value: &str) -> u32 {
    let mut hash = 0u32;
    let mut shift = 0u32;
    for byte in value.bytes() {
        let folded = match byte {
            b'a'..=b'z' => byte - 32,
            b'0'..=b'9' => byte + 22,
            _ => byte,
        };
        shift = (shift + u32::from(folded).wrapping_sub(64)) & 31;
        hash ^= 1 << shift;
    }
    hash
}

pub fn format_hash(hash: u32) -> String {
    format!("0x{hash:08X}")
}

/// Parses an authored id: `0x`-prefixed hex, plain decimal, or a name to hash.
pub fn parse_hash_or_name(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        return u32::from_str_radix(hex, 16).ok();
    }
    if trimmed.bytes().all(|byte| byte.is_ascii_digit()) {
        return trimmed.parse::<u32>().ok();
    }
    Some(name_hash(trimmed))
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    to_hex_lower(&hasher.finalize())
}

fn to_hex_lower(bytes: &[u8]) -> String {
    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        use std::fmt::Write as _;
        let _ = write!(&mut output, "{byte:02x}");
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_hash_is_case_insensitive() {
        assert_eq!(name_hash("HitArray"), name_hash("HITARRAY"));
        assert_eq!(name_hash("fxDoorOpen32"), name_hash("FXDOOROPEN32"));
    }

    #[test]
    fn name_hash_single_letters_set_single_bits() {
        assert_eq!(name_hash("A"), 1 << 1);
        assert_eq!(name_hash("B"), 1 << 2);
        assert_eq!(name_hash(""), 0);
    }

    #[test]
    fn repeated_character_toggles_distinct_bits() {
        // "AA": positions 1 then 2.
        assert_eq!(name_hash("AA"), (1 << 1) | (1 << 2));
    }

    #[test]
    fn parse_accepts_hex_decimal_and_names() {
        assert_eq!(parse_hash_or_name("0x004B8E48"), Some(0x004B_8E48));
        assert_eq!(parse_hash_or_name("42"), Some(42));
        assert_eq!(parse_hash_or_name("HitArray"), Some(name_hash("HitArray")));
        assert_eq!(parse_hash_or_name("0xZZ"), None);
        assert_eq!(parse_hash_or_name("  "), None);
    }

    #[test]
    fn sha256_hex_is_lowercase_and_stable() {
        let digest = sha256_hex(b"abc");
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn format_hash_pads_to_eight_digits() {
        assert_eq!(format_hash(0x1A2B), "0x00001A2B");
    }
}

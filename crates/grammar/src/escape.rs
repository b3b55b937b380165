//! `\xHH` escapes used by the magic and mask fields.

/// Returns the numeric value of an ASCII hex digit.
fn hex_value(byte: u8) -> Option<u8> {
	match byte {
		b'0'..=b'9' => Some(byte - b'0'),
		b'a'..=b'f' => Some(byte - b'a' + 10),
		b'A'..=b'F' => Some(byte - b'A' + 10),
		_ => None,
	}
}

/// Decodes every `\xHH` sequence in `raw`; all other bytes are copied verbatim.
///
/// A backslash always pairs with the byte after it: when the pair does not start a `\xHH`
/// escape, both bytes are copied and scanning resumes after them. So `\\x41` stays five
/// bytes long rather than decoding its second half.
pub fn unescape_hex(raw: &[u8]) -> Vec<u8> {
	let mut out = Vec::with_capacity(raw.len());
	let mut i = 0;
	while i < raw.len() {
		if raw[i] == b'\\'
			&& let Some(&next) = raw.get(i + 1)
		{
			if next == b'x'
				&& let (Some(hi), Some(lo)) = (
					raw.get(i + 2).copied().and_then(hex_value),
					raw.get(i + 3).copied().and_then(hex_value),
				) {
				out.push(hi << 4 | lo);
				i += 4;
			} else {
				out.extend_from_slice(&[b'\\', next]);
				i += 2;
			}
			continue;
		}
		out.push(raw[i]);
		i += 1;
	}
	out
}

/// Lowercase hex rendering, two digits per byte.
pub fn to_hex(bytes: &[u8]) -> String {
	const DIGITS: &[u8; 16] = b"0123456789abcdef";
	let mut out = String::with_capacity(bytes.len() * 2);
	for byte in bytes {
		out.push(DIGITS[usize::from(byte >> 4)] as char);
		out.push(DIGITS[usize::from(byte & 0xf)] as char);
	}
	out
}

pub(crate) fn is_hex_digit(byte: u8) -> bool {
	hex_value(byte).is_some()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn decodes_mixed_literal_and_escaped() {
		assert_eq!(unescape_hex(br"\x7fELF"), b"\x7fELF");
		assert_eq!(unescape_hex(br"a\x41\x4a"), b"aAJ");
	}

	#[test]
	fn backslash_without_x_is_literal() {
		assert_eq!(unescape_hex(br"a\b"), br"a\b");
		assert_eq!(unescape_hex(br"\\x41"), br"\\x41");
		assert_eq!(unescape_hex(br"\\\x41"), br"\\A");
		assert_eq!(unescape_hex(br"a\"), br"a\");
	}

	#[test]
	fn hex_rendering_is_lowercase() {
		assert_eq!(to_hex(&[0x7f, 0x45, 0xff, 0x00]), "7f45ff00");
		assert_eq!(to_hex(&[]), "");
	}
}

//! String formatting utilities.
//!
//! Hex prefix management and truncation of hashes for log output.

/// Truncates a hex string for display, keeping the `0x` prefix and the
/// first eight digits.
pub fn truncate_id(id: &str) -> String {
	let digits = without_0x_prefix(id);
	if digits.len() <= 8 {
		with_0x_prefix(digits)
	} else {
		format!("0x{}..", &digits[..8])
	}
}

/// Adds "0x" prefix to a hex string if it doesn't already have one.
pub fn with_0x_prefix(hex_str: &str) -> String {
	if hex_str.to_lowercase().starts_with("0x") {
		hex_str.to_string()
	} else {
		format!("0x{}", hex_str)
	}
}

/// Removes "0x" or "0X" prefix from a hex string if present.
pub fn without_0x_prefix(hex_str: &str) -> &str {
	hex_str
		.strip_prefix("0x")
		.or_else(|| hex_str.strip_prefix("0X"))
		.unwrap_or(hex_str)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_prefix_helpers() {
		assert_eq!(with_0x_prefix("abcd"), "0xabcd");
		assert_eq!(with_0x_prefix("0xabcd"), "0xabcd");
		assert_eq!(without_0x_prefix("0Xabcd"), "abcd");
		assert_eq!(without_0x_prefix("abcd"), "abcd");
	}

	#[test]
	fn test_truncate_id() {
		assert_eq!(truncate_id("0x1234"), "0x1234");
		assert_eq!(
			truncate_id("0xf2cee375fa42b42143804025fc449deafd50cc031ca257e0b194a650a912090f"),
			"0xf2cee375.."
		);
	}
}

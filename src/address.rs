//! Account address parsing and validation.

use alloy_primitives::Address;

/// Check if a given string is a valid Ethereum address.
pub fn is_valid_eth_address(address: &str) -> bool {
    // Must be 42 characters: "0x" + 40 hex digits
    if address.len() != 42 {
        return false;
    }

    // Must start with "0x" or "0X"
    if !address.starts_with("0x") && !address.starts_with("0X") {
        return false;
    }

    address[2..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Mixed-case hex is taken to be EIP-55 checksummed.
fn is_mixed_case(hex: &str) -> bool {
    hex.chars().any(|c| c.is_ascii_lowercase()) && hex.chars().any(|c| c.is_ascii_uppercase())
}

/// Parses a user-supplied account address.
///
/// All-lowercase and all-uppercase addresses are accepted as is; mixed-case
/// addresses must carry a valid EIP-55 checksum.
pub fn parse_account_address(address: &str) -> Result<Address, String> {
    let address = address.trim();
    if !is_valid_eth_address(address) {
        return Err(format!(
            "Invalid address '{}': expected 0x followed by 40 hex digits",
            address
        ));
    }

    let hex = &address[2..];
    if is_mixed_case(hex) {
        return Address::parse_checksummed(format!("0x{}", hex), None)
            .map_err(|_| format!("Invalid address '{}': checksum mismatch", address));
    }
    hex.parse::<Address>()
        .map_err(|e| format!("Invalid address '{}': {}", address, e))
}

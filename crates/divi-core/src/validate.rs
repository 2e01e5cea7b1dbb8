//! Input validation for caller-supplied identifiers
//!
//! Everything here runs before the node is contacted and fails with
//! [`GatewayError::Validation`].

use crate::error::{GatewayError, GatewayResult};

const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

const MIN_ADDRESS_LEN: usize = 25;
const MAX_ADDRESS_LEN: usize = 36;

fn validate_hash(kind: &str, value: &str) -> GatewayResult<()> {
    if value.len() != 64 || hex::decode(value).is_err() {
        return Err(GatewayError::Validation(format!(
            "Invalid {}: expected 64 hex characters, got '{}'",
            kind, value
        )));
    }
    Ok(())
}

/// Transaction id: 64 hex characters
pub fn txid(value: &str) -> GatewayResult<()> {
    validate_hash("transaction id", value)
}

/// Block hash: 64 hex characters
pub fn block_hash(value: &str) -> GatewayResult<()> {
    validate_hash("block hash", value)
}

/// Base58 address or vault owner key
pub fn address(value: &str) -> GatewayResult<()> {
    let len = value.len();
    if !(MIN_ADDRESS_LEN..=MAX_ADDRESS_LEN).contains(&len) {
        return Err(GatewayError::Validation(format!(
            "Invalid address '{}': expected {}-{} characters",
            value, MIN_ADDRESS_LEN, MAX_ADDRESS_LEN
        )));
    }
    if let Some(c) = value.chars().find(|c| !BASE58_ALPHABET.contains(*c)) {
        return Err(GatewayError::Validation(format!(
            "Invalid address '{}': '{}' is not a base58 character",
            value, c
        )));
    }
    Ok(())
}

/// Parse the `isVault` path segment (`true`/`false`, any case)
pub fn vault_flag(value: &str) -> GatewayResult<bool> {
    if value.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if value.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(GatewayError::Validation(format!(
            "Invalid isVault flag '{}': expected true or false",
            value
        )))
    }
}

/// Serialized transaction: non-empty, even-length hex
pub fn raw_transaction(value: &str) -> GatewayResult<()> {
    if value.is_empty() {
        return Err(GatewayError::Validation(
            "Invalid hexstring provided: empty".to_string(),
        ));
    }
    hex::decode(value).map_err(|e| {
        GatewayError::Validation(format!("Invalid hexstring provided: {}", e))
    })?;
    Ok(())
}

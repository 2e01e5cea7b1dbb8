//! Vault classification
//!
//! Which outputs count as "vault" is decided by the node. The gateway
//! only needs two answers: what to pass as the listing parameter, and
//! whether a returned output belongs to the requested class.

use divi_core::{GatewayError, GatewayResult, Utxo};

/// Decides how the vault/standard split is applied to address listings
pub trait VaultClassifier: Send + Sync {
    /// Value sent as the node's `isVault` listing parameter
    fn listing_flag(&self, is_vault: bool) -> bool;

    /// Whether an output returned by the node belongs to the requested class
    fn accepts(&self, utxo: &Utxo, is_vault: bool) -> bool;
}

/// Trusts the node's listing parameter: everything returned is accepted.
#[derive(Debug, Default, Clone, Copy)]
pub struct NodeListingClassifier;

impl VaultClassifier for NodeListingClassifier {
    fn listing_flag(&self, is_vault: bool) -> bool {
        is_vault
    }

    fn accepts(&self, _utxo: &Utxo, _is_vault: bool) -> bool {
        true
    }
}

/// Classifies outputs by a leading byte prefix of their script, on top of
/// the node's listing parameter.
///
/// Only the start of the decoded script is compared, so pushed data inside
/// a standard script (a P2PKH key hash, for one) never matches.
#[derive(Debug, Clone)]
pub struct ScriptTagClassifier {
    prefix: Vec<u8>,
}

impl ScriptTagClassifier {
    /// `marker` is the hex encoding of the script prefix that tags vaults
    pub fn new(marker: &str) -> GatewayResult<Self> {
        let prefix = hex::decode(marker.trim()).map_err(|e| {
            GatewayError::Configuration(format!("Invalid vault script marker '{}': {}", marker, e))
        })?;
        if prefix.is_empty() {
            return Err(GatewayError::Configuration(
                "Vault script marker must not be empty".to_string(),
            ));
        }
        Ok(Self { prefix })
    }

    fn is_tagged(&self, utxo: &Utxo) -> bool {
        utxo.script
            .as_deref()
            .and_then(|s| hex::decode(s).ok())
            .map(|script| script.starts_with(&self.prefix))
            .unwrap_or(false)
    }
}

impl VaultClassifier for ScriptTagClassifier {
    fn listing_flag(&self, is_vault: bool) -> bool {
        is_vault
    }

    fn accepts(&self, utxo: &Utxo, is_vault: bool) -> bool {
        self.is_tagged(utxo) == is_vault
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utxo(script: Option<&str>) -> Utxo {
        Utxo {
            txid: "aa".repeat(32),
            output_index: 0,
            satoshis: 1,
            confirmations: 1,
            height: Some(1),
            address: "DAddr".to_string(),
            script: script.map(str::to_string),
        }
    }

    #[test]
    fn node_listing_accepts_everything() {
        let c = NodeListingClassifier;
        assert!(c.listing_flag(true));
        assert!(!c.listing_flag(false));
        assert!(c.accepts(&utxo(None), true));
    }

    #[test]
    fn script_tag_splits_outputs() {
        let c = ScriptTagClassifier::new("B9").unwrap();
        let vault = utxo(Some("b976a914"));
        let plain = utxo(Some("76a914"));
        assert!(c.accepts(&vault, true));
        assert!(!c.accepts(&vault, false));
        assert!(c.accepts(&plain, false));
        assert!(!c.accepts(&utxo(None), true));
    }

    #[test]
    fn script_tag_ignores_pushed_data() {
        let c = ScriptTagClassifier::new("b9").unwrap();
        // OP_DUP OP_HASH160 <20-byte hash containing 0xb9> OP_EQUALVERIFY OP_CHECKSIG
        let p2pkh = utxo(Some(&format!("76a914{}b9{}88ac", "00".repeat(3), "00".repeat(16))));
        assert!(c.accepts(&p2pkh, false));
        assert!(!c.accepts(&p2pkh, true));

        // "ab9c" holds the text "b9" across a byte boundary
        let straddle = utxo(Some(&format!("76a914ab9c{}88ac", "00".repeat(18))));
        assert!(c.accepts(&straddle, false));
    }

    #[test]
    fn script_tag_rejects_bad_marker() {
        assert!(matches!(
            ScriptTagClassifier::new("xyz"),
            Err(GatewayError::Configuration(_))
        ));
        assert!(ScriptTagClassifier::new("").is_err());
    }

    #[test]
    fn script_tag_treats_undecodable_script_as_standard() {
        let c = ScriptTagClassifier::new("b9").unwrap();
        assert!(c.accepts(&utxo(Some("b9z")), false));
    }
}

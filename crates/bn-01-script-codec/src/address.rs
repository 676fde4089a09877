//! Address parsing for the configured network.

use std::str::FromStr;

use bitcoin::Address;
use shared_types::Network;

use crate::errors::ScriptError;

/// Base chain network used for address encoding.
pub fn to_bitcoin_network(network: Network) -> bitcoin::Network {
    match network {
        Network::Mainnet => bitcoin::Network::Bitcoin,
        Network::Regtest => bitcoin::Network::Regtest,
    }
}

/// Parse a base58 P2PKH address valid on `network`.
pub fn parse_address(s: &str, network: Network) -> Result<Address, ScriptError> {
    let unchecked =
        Address::from_str(s).map_err(|e| ScriptError::InvalidAddress(format!("{s}: {e}")))?;
    let address = unchecked
        .require_network(to_bitcoin_network(network))
        .map_err(|e| ScriptError::InvalidAddress(format!("{s}: {e}")))?;
    if address.pubkey_hash().is_none() {
        return Err(ScriptError::UnsupportedAddress(s.to_string()));
    }
    Ok(address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::hashes::Hash;
    use bitcoin::PubkeyHash;

    #[test]
    fn test_parse_roundtrip_per_network() {
        let pkh = PubkeyHash::from_byte_array([3u8; 20]);
        for network in [Network::Mainnet, Network::Regtest] {
            let address = Address::p2pkh(pkh, to_bitcoin_network(network));
            let parsed = parse_address(&address.to_string(), network).unwrap();
            assert_eq!(parsed, address);
        }
    }

    #[test]
    fn test_rejects_address_of_other_network() {
        let pkh = PubkeyHash::from_byte_array([3u8; 20]);
        let mainnet = Address::p2pkh(pkh, bitcoin::Network::Bitcoin).to_string();
        assert!(matches!(
            parse_address(&mainnet, Network::Regtest),
            Err(ScriptError::InvalidAddress(_))
        ));
        assert!(parse_address("not-an-address", Network::Mainnet).is_err());
    }
}

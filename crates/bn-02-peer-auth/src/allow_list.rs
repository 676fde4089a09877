//! Configured peer public keys.

use std::collections::HashSet;

use shared_crypto::{CryptoError, Secp256k1PublicKey};

/// Set of public keys allowed to connect and call.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    keys: HashSet<Secp256k1PublicKey>,
}

impl AllowList {
    /// Build from parsed keys.
    pub fn new(keys: impl IntoIterator<Item = Secp256k1PublicKey>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
        }
    }

    /// Build from hex-encoded compressed keys.
    pub fn from_hex<'a>(keys: impl IntoIterator<Item = &'a str>) -> Result<Self, CryptoError> {
        let keys = keys
            .into_iter()
            .map(Secp256k1PublicKey::from_hex)
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(Self { keys })
    }

    /// Whether `key` is allowed.
    pub fn contains(&self, key: &Secp256k1PublicKey) -> bool {
        self.keys.contains(key)
    }

    /// Number of allowed keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True when no key is allowed.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_crypto::Secp256k1KeyPair;

    #[test]
    fn test_from_hex() {
        let key = Secp256k1KeyPair::generate().public_key();
        let list = AllowList::from_hex([key.to_hex().as_str()]).unwrap();
        assert!(list.contains(&key));
        assert!(!list.contains(&Secp256k1KeyPair::generate().public_key()));
        assert!(AllowList::from_hex(["02"]).is_err());
    }
}

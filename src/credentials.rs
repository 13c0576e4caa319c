//! Multi-wallet credential registry.
//!
//! Grounded on `original_source/polymarket/auth/key_manager.py`. A registry
//! holds zero or more wallets, each with a signer (always derived from a
//! private key, even for proxy wallets) plus an optional signature-type and
//! funder override, and an optional set of L2 API credentials. Exactly one
//! wallet may be marked default.

use crate::errors::{PolyfillError, Result};
use crate::types::ApiCredentials;
use alloy_primitives::Address;
use alloy_signer_local::PrivateKeySigner;
use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

/// How a signature over an order is attributed on-chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureType {
    /// Plain EOA: signer and funder are the same address.
    Eoa,
    /// Polymarket proxy wallet: signer is the EOA, funder is the proxy (`MAGIC`).
    PolyProxy,
    /// Gnosis Safe wallet: signer is an owner EOA, funder is the safe (`PROXY`).
    PolyGnosisSafe,
}

impl SignatureType {
    pub fn as_u8(self) -> u8 {
        match self {
            SignatureType::Eoa => 0,
            SignatureType::PolyProxy => 1,
            SignatureType::PolyGnosisSafe => 2,
        }
    }
}

/// Opaque identifier for a registered wallet. Wraps the signer's address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WalletId(pub Address);

impl fmt::Display for WalletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub struct Wallet {
    pub signer: PrivateKeySigner,
    pub sig_type: SignatureType,
    /// The address that funds/owns positions: the signer's own address for
    /// an EOA, or the proxy/safe address for `PolyProxy`/`PolyGnosisSafe`.
    pub funder: Address,
    pub api_credentials: Option<ApiCredentials>,
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.signer.address())
            .field("sig_type", &self.sig_type)
            .field("funder", &self.funder)
            .field("api_credentials", &self.api_credentials.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Default)]
struct Registry {
    wallets: HashMap<WalletId, Wallet>,
    default: Option<WalletId>,
}

/// Thread-safe registry of wallets, addressable by [`WalletId`].
pub struct CredentialRegistry {
    inner: RwLock<Registry>,
}

impl Default for CredentialRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Registry::default()),
        }
    }

    /// Register a wallet from its private key. `funder` overrides the
    /// on-chain funding address for proxy/safe signature types; it is
    /// ignored (and must be `None`) for `Eoa`.
    pub fn add_wallet(
        &self,
        private_key: &str,
        sig_type: SignatureType,
        funder: Option<Address>,
    ) -> Result<WalletId> {
        let signer: PrivateKeySigner = private_key
            .parse()
            .map_err(|e| PolyfillError::validation(format!("invalid private key: {e}")))?;

        let resolved_funder = match (sig_type, funder) {
            (SignatureType::Eoa, None) => signer.address(),
            (SignatureType::Eoa, Some(_)) => {
                return Err(PolyfillError::validation(
                    "funder override is not valid for EOA signature type",
                ))
            }
            (_, Some(addr)) => addr,
            (_, None) => {
                return Err(PolyfillError::validation(
                    "proxy/safe signature types require an explicit funder address",
                ))
            }
        };

        let id = WalletId(signer.address());
        let mut registry = self.inner.write().expect("credential registry poisoned");
        let is_first = registry.wallets.is_empty();
        registry.wallets.insert(
            id,
            Wallet {
                signer,
                sig_type,
                funder: resolved_funder,
                api_credentials: None,
            },
        );
        if is_first {
            registry.default = Some(id);
        }
        Ok(id)
    }

    pub fn remove_wallet(&self, id: WalletId) -> Result<()> {
        let mut registry = self.inner.write().expect("credential registry poisoned");
        if registry.wallets.remove(&id).is_none() {
            return Err(PolyfillError::validation(format!("unknown wallet {id}")));
        }
        if registry.default == Some(id) {
            registry.default = registry.wallets.keys().next().copied();
        }
        Ok(())
    }

    pub fn set_default(&self, id: WalletId) -> Result<()> {
        let mut registry = self.inner.write().expect("credential registry poisoned");
        if !registry.wallets.contains_key(&id) {
            return Err(PolyfillError::validation(format!("unknown wallet {id}")));
        }
        registry.default = Some(id);
        Ok(())
    }

    pub fn default_wallet(&self) -> Option<WalletId> {
        self.inner.read().expect("credential registry poisoned").default
    }

    pub fn set_api_credentials(&self, id: WalletId, creds: ApiCredentials) -> Result<()> {
        let mut registry = self.inner.write().expect("credential registry poisoned");
        let wallet = registry
            .wallets
            .get_mut(&id)
            .ok_or_else(|| PolyfillError::validation(format!("unknown wallet {id}")))?;
        wallet.api_credentials = Some(creds);
        Ok(())
    }

    /// Run `f` with a reference to the wallet's signer, funder and sig type,
    /// without exposing the `Wallet` (and thus any credentials) beyond the
    /// closure's scope.
    pub fn with_wallet<R>(
        &self,
        id: WalletId,
        f: impl FnOnce(&PrivateKeySigner, Address, SignatureType, Option<&ApiCredentials>) -> R,
    ) -> Result<R> {
        let registry = self.inner.read().expect("credential registry poisoned");
        let wallet = registry
            .wallets
            .get(&id)
            .ok_or_else(|| PolyfillError::validation(format!("unknown wallet {id}")))?;
        Ok(f(
            &wallet.signer,
            wallet.funder,
            wallet.sig_type,
            wallet.api_credentials.as_ref(),
        ))
    }

    pub fn addresses(&self) -> Vec<WalletId> {
        self.inner
            .read()
            .expect("credential registry poisoned")
            .wallets
            .keys()
            .copied()
            .collect()
    }
}

//! Canonical pool identity.
//!
//! A pool is fingerprinted as `keccak256(abi.encode(currency0, currency1,
//! fee, tickSpacing, hooks))`, where `currency0` is always the asset with
//! the lower address. Callers record the fingerprint they expect and refuse
//! to act when a recomputed one differs.

use alloy_primitives::{keccak256, Address, B256, U256};
use serde::{Deserialize, Serialize};

use crate::error::{LiquidError, Result};

/// 32-byte pool fingerprint.
pub type PoolId = B256;

/// Parameters of a pool other than its two assets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolIdentityInputs {
    /// LP fee in pips (1_000_000 = 100 %).
    pub fee:          u32,
    pub tick_spacing: i32,
    pub hooks:        Address,
}

/// Canonicalised pool parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoolKey {
    pub currency0:    Address,
    pub currency1:    Address,
    pub fee:          u32,
    pub tick_spacing: i32,
    pub hooks:        Address,
}

impl PoolKey {
    /// Build a key from an unordered asset pair.
    pub fn new(token_a: Address, token_b: Address, inputs: PoolIdentityInputs) -> Self {
        let (currency0, currency1) = if token_a <= token_b {
            (token_a, token_b)
        } else {
            (token_b, token_a)
        };
        Self {
            currency0,
            currency1,
            fee: inputs.fee,
            tick_spacing: inputs.tick_spacing,
            hooks: inputs.hooks,
        }
    }

    pub fn inputs(&self) -> PoolIdentityInputs {
        PoolIdentityInputs {
            fee:          self.fee,
            tick_spacing: self.tick_spacing,
            hooks:        self.hooks,
        }
    }

    /// Same assets, new fee tier / tick spacing / hooks.
    pub fn with_inputs(&self, inputs: PoolIdentityInputs) -> Self {
        Self::new(self.currency0, self.currency1, inputs)
    }

    pub fn contains(&self, asset: Address) -> bool {
        asset == self.currency0 || asset == self.currency1
    }

    /// Direction flag for a swap that spends `input`.
    pub fn zero_for_one(&self, input: Address) -> Result<bool> {
        if input == self.currency0 {
            Ok(true)
        } else if input == self.currency1 {
            Ok(false)
        } else {
            Err(LiquidError::AssetNotInPool(input))
        }
    }

    /// ABI encoding of the key: five 32-byte words.
    pub fn abi_encode(&self) -> [u8; 160] {
        let mut out = [0u8; 160];
        out[12..32].copy_from_slice(self.currency0.as_slice());
        out[44..64].copy_from_slice(self.currency1.as_slice());
        out[64..96].copy_from_slice(&U256::from(self.fee).to_be_bytes::<32>());
        // int24 is sign-extended to the full word
        if self.tick_spacing < 0 {
            out[96..128].fill(0xff);
        }
        out[124..128].copy_from_slice(&self.tick_spacing.to_be_bytes());
        out[140..160].copy_from_slice(self.hooks.as_slice());
        out
    }

    pub fn id(&self) -> PoolId {
        keccak256(self.abi_encode())
    }
}

/// Recompute the fingerprint of `key` and compare it with the recorded one.
pub fn verify_pool_id(expected: PoolId, key: &PoolKey) -> Result<()> {
    let computed = key.id();
    if computed != expected {
        return Err(LiquidError::PoolIdMismatch { expected, computed });
    }
    Ok(())
}

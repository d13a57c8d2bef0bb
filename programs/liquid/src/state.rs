use alloy_primitives::U256;
use serde::Serialize;

use crate::error::{LiquidError, Result};

/// Which side of a Liquid token's pool a fee is denominated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    /// ETH, the settlement asset
    Settlement,
    /// The Liquid token itself
    Traded,
}

// ─── PendingRewards ────────────────────────────────────────────────────────
// Harvested but not yet converted / distributed, one balance per asset kind.
// Increased by harvests, decreased only after a successful swap or transfer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PendingRewards {
    pub settlement: U256,
    pub traded:     U256,
}

impl PendingRewards {
    pub fn get(&self, kind: AssetKind) -> U256 {
        match kind {
            AssetKind::Settlement => self.settlement,
            AssetKind::Traded => self.traded,
        }
    }

    fn slot(&mut self, kind: AssetKind) -> &mut U256 {
        match kind {
            AssetKind::Settlement => &mut self.settlement,
            AssetKind::Traded => &mut self.traded,
        }
    }

    pub fn credit(&mut self, kind: AssetKind, amount: U256) -> Result<U256> {
        let slot = self.slot(kind);
        *slot = slot.checked_add(amount).ok_or(LiquidError::MathOverflow)?;
        Ok(*slot)
    }

    pub fn debit(&mut self, kind: AssetKind, amount: U256) -> Result<U256> {
        let slot = self.slot(kind);
        *slot = slot.checked_sub(amount).ok_or(LiquidError::InsufficientPending {
            requested: amount,
            available: *slot,
        })?;
        Ok(*slot)
    }
}

// ─── AccumulatorLedger ─────────────────────────────────────────────────────
// `pending` is what depositors handed in through the accounted path. `held`
// is the raw balance; the gap is excess from unsolicited or forced transfers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AccumulatorLedger {
    pub pending: U256,
    pub held:    U256,
}

impl AccumulatorLedger {
    pub fn excess(&self) -> U256 {
        self.held.saturating_sub(self.pending)
    }

    /// Accounted receipt: raises both balances.
    pub fn account(&mut self, amount: U256) -> Result<U256> {
        let held = self.held.checked_add(amount).ok_or(LiquidError::MathOverflow)?;
        let pending = self.pending.checked_add(amount).ok_or(LiquidError::MathOverflow)?;
        self.held = held;
        self.pending = pending;
        Ok(pending)
    }

    /// Unaccounted receipt: raises only the raw balance.
    pub fn hold(&mut self, amount: U256) -> Result<U256> {
        self.held = self.held.checked_add(amount).ok_or(LiquidError::MathOverflow)?;
        Ok(self.held)
    }

    /// Pending funds leave the accumulator (burn or withdrawal).
    pub fn release_pending(&mut self, amount: U256) -> Result<()> {
        if amount > self.pending {
            return Err(LiquidError::InsufficientPending {
                requested: amount,
                available: self.pending,
            });
        }
        self.pending -= amount;
        self.held = self.held.checked_sub(amount).ok_or(LiquidError::MathOverflow)?;
        Ok(())
    }

    /// Surplus over `pending` leaves the accumulator; `pending` is untouched.
    pub fn release_excess(&mut self) -> Result<U256> {
        let excess = self.excess();
        if excess.is_zero() {
            return Err(LiquidError::NoExcess);
        }
        self.held -= excess;
        Ok(excess)
    }
}

//! Observability signals.
//!
//! Components push events into their [`EventLog`]; every event is also written
//! to the `log` facade so a running node leaves the same trail as the buffer.

use alloy_primitives::{Address, U256};
use serde::Serialize;

use crate::pool_id::PoolId;

/// Why a conversion or burn was postponed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeferReason {
    QuoterUnset,
    QuoterReverted,
    ZeroQuote,
    BoundOverflow,
    SwapReverted,
    PoolIdMismatch,
    ConversionDisabled,
    DistributionFailed,
}

impl DeferReason {
    /// Stable numeric code carried by `BurnFailed`.
    pub fn code(self) -> u8 {
        match self {
            DeferReason::QuoterUnset        => 1,
            DeferReason::QuoterReverted     => 2,
            DeferReason::ZeroQuote          => 3,
            DeferReason::BoundOverflow      => 4,
            DeferReason::SwapReverted       => 5,
            DeferReason::PoolIdMismatch     => 6,
            DeferReason::ConversionDisabled => 7,
            DeferReason::DistributionFailed => 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event")]
pub enum Event {
    SecondaryRewardsSwap {
        amount_in:    U256,
        amount_out:   U256,
        min_out_used: U256,
    },
    SecondaryRewardsDeferred {
        amount_pending:   U256,
        reason:           DeferReason,
        attempted_min_out: U256,
    },
    FeesDistributed {
        amount:   U256,
        protocol: U256,
        creator:  U256,
        referrer: U256,
    },
    Deposited {
        depositor:         Address,
        amount:            U256,
        new_pending_total: U256,
    },
    UnaccountedReceipt {
        sender: Address,
        amount: U256,
    },
    /// Balance raised without any hook running; always excess.
    ForcedReceipt {
        amount: U256,
        held:   U256,
    },
    Burned {
        eth_in:    U256,
        token_out: U256,
    },
    BurnFailed {
        eth_in:      U256,
        reason_code: u8,
        reason:      DeferReason,
    },
    Withdrawn {
        to:     Address,
        amount: U256,
    },
    ExcessSwept {
        to:     Address,
        amount: U256,
    },
    ConfigUpdated {
        enabled:       bool,
        tolerance_bps: u16,
    },
    QuoterUpdated {
        quoter: Option<Address>,
    },
    PoolIdentityUpdated {
        expected_pool_id: PoolId,
    },
    Paused {
        is_paused: bool,
    },
}

/// Buffer of emitted events.
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn emit(&mut self, event: Event) {
        match &event {
            Event::SecondaryRewardsDeferred { .. } | Event::BurnFailed { .. } => {
                log::warn!("{event:?}")
            }
            _ => log::info!("{event:?}"),
        }
        self.events.push(event);
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Hand the buffered events to the caller.
    pub fn take(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}

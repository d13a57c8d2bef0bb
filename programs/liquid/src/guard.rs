use alloy_primitives::Address;

use crate::error::{LiquidError, Result};

/// Single-entry latch around operations that call out before their ledger
/// state is final. Set on entry, cleared on exit, recursive entry rejected.
#[derive(Debug, Default, Clone)]
pub struct ReentrancyLatch {
    busy: bool,
}

impl ReentrancyLatch {
    pub fn enter(&mut self) -> Result<()> {
        if self.busy {
            return Err(LiquidError::Reentrancy);
        }
        self.busy = true;
        Ok(())
    }

    pub fn exit(&mut self) {
        self.busy = false;
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }
}

pub fn only_owner(owner: Address, caller: Address) -> Result<()> {
    if caller != owner {
        return Err(LiquidError::Unauthorized(caller));
    }
    Ok(())
}

pub fn require_nonzero(address: Address, field: &'static str) -> Result<()> {
    if address == Address::ZERO {
        return Err(LiquidError::ZeroAddress(field));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latch_rejects_nested_entry() {
        let mut latch = ReentrancyLatch::default();
        latch.enter().unwrap();
        assert_eq!(latch.enter(), Err(LiquidError::Reentrancy));
        latch.exit();
        assert!(!latch.is_busy());
        assert!(latch.enter().is_ok());
    }

    #[test]
    fn owner_and_address_checks() {
        let owner = Address::repeat_byte(1);
        assert!(only_owner(owner, owner).is_ok());
        assert_eq!(only_owner(owner, Address::repeat_byte(2)), Err(LiquidError::Unauthorized(Address::repeat_byte(2))));
        assert_eq!(require_nonzero(Address::ZERO, "owner"), Err(LiquidError::ZeroAddress("owner")));
    }
}

//! Proxy admin: single owner with upgrade authority over the fund

use basket_common::Address;
use log::warn;

use crate::error::ProxyAdminError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProxyAdmin {
    owner: Address,
}

impl ProxyAdmin {
    pub fn new(owner: Address) -> Result<Self, ProxyAdminError> {
        if owner.is_zero() {
            return Err(ProxyAdminError::InvalidOwner);
        }
        Ok(Self { owner })
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Hand upgrade authority to `new_owner`. Owner only.
    pub fn transfer_ownership(
        &mut self,
        caller: &Address,
        new_owner: Address,
    ) -> Result<(), ProxyAdminError> {
        self.ensure_owner(caller)?;
        if new_owner.is_zero() {
            warn!("Error: proxy admin ownership cannot go to the zero address");
            return Err(ProxyAdminError::InvalidOwner);
        }
        self.owner = new_owner;
        Ok(())
    }

    pub fn ensure_owner(&self, caller: &Address) -> Result<(), ProxyAdminError> {
        if *caller != self.owner {
            warn!("Error: {} is not the proxy admin owner", caller);
            return Err(ProxyAdminError::Unauthorized { caller: *caller });
        }
        Ok(())
    }
}

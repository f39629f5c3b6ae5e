//! Role registry for the fund
//!
//! Role -> insertion-ordered set of members. Every role is administered by
//! `Role::ADMIN`; only admin members may grant or revoke.

use basket_common::{Address, Role};
use log::warn;
use std::collections::BTreeMap;

use crate::error::RoleError;

pub type Result<T> = core::result::Result<T, RoleError>;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoleRegistry {
    members: BTreeMap<Role, Vec<Address>>,
}

impl RoleRegistry {
    /// Registry with a single admin
    pub fn with_admin(admin: Address) -> Result<Self> {
        if admin.is_zero() {
            return Err(RoleError::InvalidMember);
        }
        let mut members = BTreeMap::new();
        members.insert(Role::ADMIN, vec![admin]);
        Ok(Self { members })
    }

    pub fn has_role(&self, role: Role, who: &Address) -> bool {
        self.members
            .get(&role)
            .map_or(false, |set| set.contains(who))
    }

    pub fn member_count(&self, role: Role) -> usize {
        self.members.get(&role).map_or(0, Vec::len)
    }

    /// Member at `index` in grant order
    pub fn member(&self, role: Role, index: usize) -> Option<Address> {
        self.members.get(&role).and_then(|set| set.get(index)).copied()
    }

    /// Snapshot of the role's members in grant order
    pub fn members(&self, role: Role) -> Vec<Address> {
        self.members.get(&role).cloned().unwrap_or_default()
    }

    /// Roles with at least one member
    pub fn roles(&self) -> impl Iterator<Item = Role> + '_ {
        self.members
            .iter()
            .filter(|(_, set)| !set.is_empty())
            .map(|(role, _)| *role)
    }

    /// Grant `role` to `who`
    ///
    /// # Returns
    /// * `Ok(true)` if `who` was added
    /// * `Ok(false)` if `who` already held the role
    ///
    /// # Errors
    /// * Unauthorized - `caller` is not an admin
    /// * InvalidMember - `who` is the zero address
    pub fn grant_role(&mut self, caller: &Address, role: Role, who: Address) -> Result<bool> {
        self.ensure_admin(caller)?;
        if who.is_zero() {
            return Err(RoleError::InvalidMember);
        }

        let set = self.members.entry(role).or_default();
        if set.contains(&who) {
            return Ok(false);
        }
        set.push(who);
        Ok(true)
    }

    /// Revoke `role` from `who`. Admin only.
    pub fn revoke_role(&mut self, caller: &Address, role: Role, who: &Address) -> Result<bool> {
        self.ensure_admin(caller)?;
        self.remove_member(role, who)
    }

    /// Drop the caller's own membership
    pub fn renounce_role(&mut self, caller: &Address, role: Role) -> Result<bool> {
        self.remove_member(role, caller)
    }

    fn remove_member(&mut self, role: Role, who: &Address) -> Result<bool> {
        let Some(set) = self.members.get_mut(&role) else {
            return Ok(false);
        };
        let Some(pos) = set.iter().position(|m| m == who) else {
            return Ok(false);
        };
        if role == Role::ADMIN && set.len() == 1 {
            warn!("Error: refusing to remove the last admin {}", who);
            return Err(RoleError::LastAdmin);
        }
        // Vec::remove keeps the remaining members in grant order
        set.remove(pos);
        Ok(true)
    }

    fn ensure_admin(&self, caller: &Address) -> Result<()> {
        if !self.has_role(Role::ADMIN, caller) {
            warn!("Error: {} is not a fund admin", caller);
            return Err(RoleError::Unauthorized {
                caller: *caller,
                role: Role::ADMIN,
            });
        }
        Ok(())
    }
}

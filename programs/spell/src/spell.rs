//! The migration spell
//!
//! Lifecycle: constructed (no privileges) -> authorized by governance
//! (admin role + proxy ownership granted to the spell) -> cast exactly once
//! -> inert. Casting hands every privilege back to the caller, who must be
//! a fund admin, and leaves that caller as the single admin and proxy owner.

use basket_common::{Address, Role};
use basket_fund::Vault;
use log::{debug, info, warn};

use crate::error::MigrationError;

pub type Result<T> = core::result::Result<T, MigrationError>;

/// Version reached by the default plan
pub const TARGET_VERSION: &str = "3.0.0";

// ============================================================================
// Plan & State
// ============================================================================

/// What a cast does to the fund
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MigrationPlan {
    pub target_version: String,
    /// Role whose members are copied
    pub source_role: Role,
    /// Role the members are granted
    pub destination_role: Role,
}

impl Default for MigrationPlan {
    fn default() -> Self {
        Self {
            target_version: TARGET_VERSION.to_string(),
            source_role: Role::AUCTION_APPROVER,
            destination_role: Role::REBALANCE_MANAGER,
        }
    }
}

impl MigrationPlan {
    pub fn validate(&self) -> Result<()> {
        if self.target_version.is_empty() {
            return Err(MigrationError::InvalidPlan("target version must not be empty"));
        }
        if self.source_role == self.destination_role {
            return Err(MigrationError::InvalidPlan("source and destination roles must differ"));
        }
        if self.source_role == Role::ADMIN || self.destination_role == Role::ADMIN {
            return Err(MigrationError::InvalidPlan("the admin role cannot be remapped"));
        }
        Ok(())
    }
}

/// One-time-use guard
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpellState {
    Ready,
    Cast,
}

/// Where the spell stands against a given fund
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpellStatus {
    /// Governance has not granted the spell its rights yet
    Unauthorized,
    /// Holds the admin role and the proxy ownership, ready to cast
    Authorized,
    Cast,
}

/// Result of a successful cast
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MigrationReceipt {
    pub from_version: String,
    pub to_version: String,
    /// Source-role members granted the destination role, in grant order
    pub migrated_members: Vec<Address>,
    /// Single admin and proxy owner after the cast
    pub admin: Address,
}

// ============================================================================
// Spell
// ============================================================================

#[derive(Clone, Debug)]
pub struct MigrationSpell {
    address: Address,
    plan: MigrationPlan,
    state: SpellState,
}

impl MigrationSpell {
    pub fn new(address: Address, plan: MigrationPlan) -> Result<Self> {
        if address.is_zero() {
            return Err(MigrationError::InvalidPlan("spell address must be non-zero"));
        }
        plan.validate()?;
        Ok(Self {
            address,
            plan,
            state: SpellState::Ready,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn plan(&self) -> &MigrationPlan {
        &self.plan
    }

    pub fn state(&self) -> SpellState {
        self.state
    }

    pub fn status(&self, vault: &Vault) -> SpellStatus {
        match self.state {
            SpellState::Cast => SpellStatus::Cast,
            SpellState::Ready if self.holds_privileges(vault) => SpellStatus::Authorized,
            SpellState::Ready => SpellStatus::Unauthorized,
        }
    }

    fn holds_privileges(&self, vault: &Vault) -> bool {
        vault.has_role(Role::ADMIN, self.address) && vault.proxy_owner() == self.address
    }

    /// Run the migration on behalf of `caller`
    ///
    /// # Process
    /// 1. Reject if already cast
    /// 2. Require `caller` to be a fund admin (not the spell itself)
    /// 3. Require the spell to hold the admin role and the proxy ownership
    /// 4. Reject if the fund is already at the target version
    /// 5. Upgrade the fund through the proxy admin
    /// 6. Grant the destination role to every source-role member
    /// 7. Return proxy ownership to `caller` and renounce the admin role
    /// 8. Check the single-admin post-conditions
    ///
    /// Steps 2-8 are one transaction; the spell only becomes `Cast` once it
    /// commits.
    ///
    /// # Errors
    /// * AlreadyCast - spell was cast before
    /// * Unauthorized - caller or spell lacks the required privileges
    /// * AlreadyMigrated - fund is already at the target version
    /// * InvariantViolation - a post-condition failed (a defect, never expected)
    /// * Role / ProxyAdmin - an underlying privileged call failed
    pub fn cast(&mut self, vault: &mut Vault, caller: Address) -> Result<MigrationReceipt> {
        if self.state == SpellState::Cast {
            warn!("Error: spell {} already cast", self.address);
            return Err(MigrationError::AlreadyCast);
        }

        let receipt = vault.transact(|vault| self.migrate(vault, caller))?;
        self.state = SpellState::Cast;

        info!(
            "Spell {} cast by {}: version {} -> {}, {} member(s) granted {}",
            self.address,
            caller,
            receipt.from_version,
            receipt.to_version,
            receipt.migrated_members.len(),
            self.plan.destination_role
        );
        Ok(receipt)
    }

    fn migrate(&self, vault: &mut Vault, caller: Address) -> Result<MigrationReceipt> {
        let spell = self.address;
        let plan = &self.plan;

        if caller == spell || !vault.has_role(Role::ADMIN, caller) {
            warn!("Error: {} is not a fund admin and cannot cast", caller);
            return Err(MigrationError::Unauthorized {
                caller,
                reason: "caller is not a fund admin",
            });
        }
        if !vault.has_role(Role::ADMIN, spell) {
            warn!("Error: spell {} was not granted the admin role", spell);
            return Err(MigrationError::Unauthorized {
                caller,
                reason: "spell does not hold the fund admin role",
            });
        }
        if vault.proxy_owner() != spell {
            warn!("Error: spell {} does not own the proxy admin", spell);
            return Err(MigrationError::Unauthorized {
                caller,
                reason: "spell does not own the proxy admin",
            });
        }

        let from_version = vault.version().to_string();
        if from_version == plan.target_version {
            warn!("Error: fund already at version {}", from_version);
            return Err(MigrationError::AlreadyMigrated(from_version));
        }

        vault.upgrade_fund(spell, &plan.target_version)?;
        debug!("Fund upgraded {} -> {}", from_version, plan.target_version);

        // Enumerate once; grants below must not change what we iterate over
        let source = vault.role_members(plan.source_role);
        for member in &source {
            vault.grant_role(spell, plan.destination_role, *member)?;
        }
        if vault.role_member_count(plan.destination_role) < source.len()
            || source.iter().any(|m| !vault.has_role(plan.destination_role, *m))
        {
            return Err(MigrationError::InvariantViolation(
                "destination role does not cover the source role",
            ));
        }
        debug!("Granted {} to {} member(s) of {}", plan.destination_role, source.len(), plan.source_role);

        vault.transfer_proxy_ownership(spell, caller)?;
        vault.renounce_role(spell, Role::ADMIN)?;

        if vault.role_member_count(Role::ADMIN) != 1 || vault.role_member(Role::ADMIN, 0) != Some(caller) {
            warn!(
                "Error: fund would end with {} admin(s)",
                vault.role_member_count(Role::ADMIN)
            );
            return Err(MigrationError::InvariantViolation("fund must end with exactly one admin"));
        }
        if vault.proxy_owner() != caller {
            return Err(MigrationError::InvariantViolation("proxy admin must return to the caller"));
        }

        Ok(MigrationReceipt {
            from_version,
            to_version: plan.target_version.clone(),
            migrated_members: source,
            admin: caller,
        })
    }
}

//! Identifiers: addresses, token ids, role tags, trade ids

use core::fmt;

// ============================================================================
// Addresses
// ============================================================================

/// 32-byte account address
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(pub [u8; 32]);

impl Address {
    /// The zero address. Never a valid owner.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Deterministic address for a human-readable label (scenario files, tests)
    ///
    /// The label bytes are copied into the address and zero-padded. Labels
    /// longer than 32 bytes are truncated.
    pub const fn from_label(label: &str) -> Self {
        let bytes = label.as_bytes();
        let mut out = [0u8; 32];
        let mut i = 0;
        while i < bytes.len() && i < 32 {
            out[i] = bytes[i];
            i += 1;
        }
        Self(out)
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }

    /// Label this address was derived from, if it looks like one
    pub fn label(&self) -> Option<&str> {
        let end = self.0.iter().position(|b| *b == 0).unwrap_or(32);
        if end == 0 || self.0[end..].iter().any(|b| *b != 0) {
            return None;
        }
        let text = core::str::from_utf8(&self.0[..end]).ok()?;
        if text.bytes().all(|b| b.is_ascii_graphic()) {
            Some(text)
        } else {
            None
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.label() {
            Some(label) => write!(f, "{}", label),
            None => {
                write!(f, "0x")?;
                for b in &self.0[..8] {
                    write!(f, "{:02x}", b)?;
                }
                write!(f, "..")
            }
        }
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

// ============================================================================
// Tokens
// ============================================================================

/// Token identifier (e.g., "USDC\0\0\0\0")
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenId(pub [u8; 8]);

impl TokenId {
    /// Build a token id from a ticker symbol, zero-padded to 8 bytes
    pub const fn from_symbol(symbol: &str) -> Self {
        let bytes = symbol.as_bytes();
        let mut out = [0u8; 8];
        let mut i = 0;
        while i < bytes.len() && i < 8 {
            out[i] = bytes[i];
            i += 1;
        }
        Self(out)
    }

    pub fn symbol(&self) -> &str {
        let end = self.0.iter().position(|b| *b == 0).unwrap_or(8);
        core::str::from_utf8(&self.0[..end]).unwrap_or("?")
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl fmt::Debug for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenId({})", self.symbol())
    }
}

// ============================================================================
// Roles
// ============================================================================

/// Opaque role tag in the fund's access registry
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Role(&'static str);

impl Role {
    /// Administers every other role. Exactly one member at rest.
    pub const ADMIN: Self = Self("DEFAULT_ADMIN_ROLE");
    /// Approves rebalances (version 3 onward)
    pub const REBALANCE_MANAGER: Self = Self("REBALANCE_MANAGER");
    /// Approves auctions (before version 3)
    pub const AUCTION_APPROVER: Self = Self("AUCTION_APPROVER");
    /// Opens approved auctions
    pub const AUCTION_LAUNCHER: Self = Self("AUCTION_LAUNCHER");
    /// Maintains fund metadata
    pub const BRAND_MANAGER: Self = Self("BRAND_MANAGER");

    pub const KNOWN: [Self; 5] = [
        Self::ADMIN,
        Self::REBALANCE_MANAGER,
        Self::AUCTION_APPROVER,
        Self::AUCTION_LAUNCHER,
        Self::BRAND_MANAGER,
    ];

    /// Look up a well-known role by name. `ADMIN` is accepted as an alias.
    pub fn from_name(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("ADMIN") {
            return Some(Self::ADMIN);
        }
        Self::KNOWN
            .iter()
            .copied()
            .find(|role| role.0.eq_ignore_ascii_case(name))
    }

    pub const fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl fmt::Debug for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Role({})", self.0)
    }
}

// ============================================================================
// Trades
// ============================================================================

/// Sequential trade identifier assigned by the fund
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TradeId(pub u64);

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

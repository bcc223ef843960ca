//! Accounts, roles and the call context handed to every mutating operation.
//!
//! The role registry is an external collaborator: validators only ever ask it whether a caller
//! holds a role and never write to it. [`RoleManager`] is a small in-memory registry sufficient
//! to drive the validators outside of a chain.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use tracing::info;

use crate::dates::Timestamp;
use crate::errors::{DateKeeperError, Result};

/// A 20 byte account or contract identifier.
///
/// Serialized as its `0x` prefixed hex string.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// Build an address whose low 8 bytes hold `value` big endian.
    pub fn from_low_u64(value: u64) -> Self {
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&value.to_be_bytes());
        Address(bytes)
    }
}

impl From<u64> for Address {
    fn from(value: u64) -> Self {
        Address::from_low_u64(value)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for b in self.0.iter() {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl FromStr for Address {
    type Err = DateKeeperError;

    fn from_str(s: &str) -> Result<Self> {
        let hex = s.strip_prefix("0x").unwrap_or(s);
        if hex.len() != 40 || !hex.is_ascii() {
            return Err(DateKeeperError::invalid_parameter(
                "address",
                format!("`{}` is not 40 hex characters", s),
            ));
        }
        let mut bytes = [0u8; 20];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[2 * i..2 * i + 2], 16).map_err(|e| {
                DateKeeperError::invalid_parameter("address", format!("`{}`: {}", s, e))
            })?;
        }
        Ok(Address(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Roles recognised by the validators.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// May reconfigure validators.
    Governor,
    /// Operational administrator; holds no validator permissions.
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Governor => write!(f, "governor"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// Read-only view of a role registry.
pub trait RoleRegistry {
    /// Returns whether `account` holds `role`.
    fn has_role(&self, account: &Address, role: Role) -> bool;

    /// Returns whether `account` is a governor.
    fn is_governor(&self, account: &Address) -> bool {
        self.has_role(account, Role::Governor)
    }
}

/// In-memory role registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleManager {
    members: IndexMap<Role, IndexSet<Address>>,
}

impl RoleManager {
    /// Create a registry with an initial set of governors.
    pub fn new(governors: Vec<Address>) -> Self {
        let mut members = IndexMap::new();
        members.insert(Role::Governor, IndexSet::from_iter(governors));
        RoleManager { members }
    }

    /// Grant `role` to every account in `accounts`. Only a governor may appoint.
    pub fn appoint(&mut self, caller: &Address, role: Role, accounts: Vec<Address>) -> Result<()> {
        if !self.is_governor(caller) {
            return Err(DateKeeperError::Unauthorized {
                caller: *caller,
                role: Role::Governor,
            });
        }
        info!(%caller, %role, count = accounts.len(), "appointing accounts");
        self.members.entry(role).or_default().extend(accounts);
        Ok(())
    }

    /// Remove `role` from `account`. Returns whether the account held the role.
    pub fn revoke(&mut self, caller: &Address, role: Role, account: &Address) -> Result<bool> {
        if !self.is_governor(caller) {
            return Err(DateKeeperError::Unauthorized {
                caller: *caller,
                role: Role::Governor,
            });
        }
        let removed = self
            .members
            .get_mut(&role)
            .map(|set| set.shift_remove(account))
            .unwrap_or(false);
        if removed {
            info!(%caller, %role, %account, "revoked role");
        }
        Ok(removed)
    }
}

impl RoleRegistry for RoleManager {
    fn has_role(&self, account: &Address, role: Role) -> bool {
        self.members
            .get(&role)
            .map(|set| set.contains(account))
            .unwrap_or(false)
    }
}

/// The environment of a single call: who is calling, at what block time, and the registry
/// used to authorize them.
#[derive(Clone, Copy)]
pub struct CallContext<'a> {
    /// Account performing the call.
    pub caller: Address,
    /// Current block timestamp, in seconds since the Unix epoch.
    pub now: Timestamp,
    /// Registry consulted for authorization.
    pub roles: &'a dyn RoleRegistry,
}

impl<'a> CallContext<'a> {
    pub fn new(caller: Address, now: Timestamp, roles: &'a dyn RoleRegistry) -> Self {
        CallContext { caller, now, roles }
    }

    /// Fail with [`DateKeeperError::Unauthorized`] unless the caller holds `role`.
    pub fn require(&self, role: Role) -> Result<()> {
        if self.roles.has_role(&self.caller, role) {
            Ok(())
        } else {
            Err(DateKeeperError::Unauthorized {
                caller: self.caller,
                role,
            })
        }
    }
}

impl fmt::Debug for CallContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallContext")
            .field("caller", &self.caller)
            .field("now", &self.now)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_display_round_trip() {
        let a = Address::from_low_u64(0xdead_beef);
        let s = a.to_string();
        assert_eq!(s, "0x00000000000000000000000000000000deadbeef");
        assert_eq!(Address::from_str(&s).unwrap(), a);
        assert!(Address::from_str("0x1234").is_err());
        assert_eq!(serde_json::to_string(&a).unwrap(), format!("\"{}\"", s));
        assert_eq!(serde_json::from_str::<Address>(&format!("\"{}\"", s)).unwrap(), a);
        assert!(serde_json::from_str::<Address>("[0, 1, 2]").is_err());
        assert!(Address::from_str("0xzz000000000000000000000000000000deadbeef").is_err());
    }

    #[test]
    fn test_role_manager_governor_checks() {
        let gov = Address::from(1);
        let other = Address::from(2);
        let mut roles = RoleManager::new(vec![gov]);
        assert!(roles.is_governor(&gov));
        assert!(!roles.is_governor(&other));
        assert!(!roles.has_role(&other, Role::Admin));

        assert!(matches!(
            roles.appoint(&other, Role::Admin, vec![other]),
            Err(DateKeeperError::Unauthorized { .. })
        ));
        roles.appoint(&gov, Role::Admin, vec![other]).unwrap();
        assert!(roles.has_role(&other, Role::Admin));
        assert!(!roles.is_governor(&other));

        assert!(roles.revoke(&gov, Role::Admin, &other).unwrap());
        assert!(!roles.revoke(&gov, Role::Admin, &other).unwrap());
        assert!(!roles.has_role(&other, Role::Admin));
    }

    #[test]
    fn test_call_context_require() {
        let gov = Address::from(1);
        let roles = RoleManager::new(vec![gov]);
        let ctx = CallContext::new(gov, 0, &roles);
        assert!(ctx.require(Role::Governor).is_ok());
        let ctx = CallContext::new(Address::from(9), 0, &roles);
        match ctx.require(Role::Governor) {
            Err(DateKeeperError::Unauthorized { caller, role }) => {
                assert_eq!(caller, Address::from(9));
                assert_eq!(role, Role::Governor);
            }
            _ => panic!("expected Unauthorized"),
        }
    }
}

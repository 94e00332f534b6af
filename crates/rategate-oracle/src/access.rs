//! Owner / updater authorization.
//!
//! Authorization is checked before any validation or mutation and is kept
//! separate from the gates, which only see numbers.

use std::fmt;

use rategate_types::{Address, RateSnapshot};

use crate::{RateError, Result};

/// A role that gates a mutating operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// May change configuration.
    Owner,
    /// May submit supply / TVL observations.
    Updater,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Owner => f.write_str("owner"),
            Self::Updater => f.write_str("updater"),
        }
    }
}

impl Role {
    /// The principal currently holding this role.
    pub fn holder(&self, snapshot: &RateSnapshot) -> Address {
        match self {
            Self::Owner => snapshot.owner,
            Self::Updater => snapshot.updater,
        }
    }
}

/// Check that `caller` holds `role` in `snapshot`.
///
/// # Errors
///
/// [`RateError::Unauthorized`] if it does not. The zero address never holds
/// a role, even on an uninitialized snapshot.
pub fn authorize(snapshot: &RateSnapshot, caller: &Address, role: Role) -> Result<()> {
    let holder = role.holder(snapshot);
    if caller.is_zero() || *caller != holder {
        tracing::warn!(%caller, %role, "access denied");
        return Err(RateError::Unauthorized {
            caller: *caller,
            role,
        });
    }
    Ok(())
}

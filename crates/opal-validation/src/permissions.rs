use serde::{Deserialize, Serialize};

/// Tri-state access decision for a single right.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Access {
    /// No matching rule decided this right.
    #[default]
    Unset,
    Permit,
    Deny,
}

impl Access {
    /// Merge within one layer: a Deny from any matching rule overrides any
    /// Permit; Permit beats Unset.
    pub fn intersect(self, other: Access) -> Access {
        match (self, other) {
            (Access::Deny, _) | (_, Access::Deny) => Access::Deny,
            (Access::Permit, _) | (_, Access::Permit) => Access::Permit,
            _ => Access::Unset,
        }
    }

    /// Merge across layers: the first non-Unset decision wins; later layers
    /// are not consulted once a right is decided.
    pub fn or_level(self, lower: Access) -> Access {
        match self {
            Access::Unset => lower,
            decided => decided,
        }
    }

    /// Returns `true` only for an explicit Permit. Unset counts as denied.
    pub fn is_permit(self) -> bool {
        self == Access::Permit
    }
}

/// The independent rights an ACL can grant or deny.
///
/// Every field defaults to Unset so partial JSON documents ("deny spending,
/// say nothing else") merge correctly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionSet {
    /// Change an account's balance (includes receiving and creation).
    pub account_modify: Access,
    /// Decrease an account's balance.
    pub account_spend: Access,
    /// Let the balance go below zero.
    pub account_negative: Access,
    /// Issue the asset (create funds out of nothing).
    pub account_issuance: Access,
    /// Write data records under the path.
    pub data_modify: Access,
}

impl PermissionSet {
    /// Every right Unset.
    pub fn unset() -> Self {
        Self::default()
    }

    /// Every right Permit.
    pub fn allow_all() -> Self {
        Self {
            account_modify: Access::Permit,
            account_spend: Access::Permit,
            account_negative: Access::Permit,
            account_issuance: Access::Permit,
            data_modify: Access::Permit,
        }
    }

    /// Every right Deny.
    pub fn deny_all() -> Self {
        Self {
            account_modify: Access::Deny,
            account_spend: Access::Deny,
            account_negative: Access::Deny,
            account_issuance: Access::Deny,
            data_modify: Access::Deny,
        }
    }

    /// Merge another set from the same layer, deny overriding permit.
    pub fn intersect_with(&self, other: &PermissionSet) -> PermissionSet {
        PermissionSet {
            account_modify: self.account_modify.intersect(other.account_modify),
            account_spend: self.account_spend.intersect(other.account_spend),
            account_negative: self.account_negative.intersect(other.account_negative),
            account_issuance: self.account_issuance.intersect(other.account_issuance),
            data_modify: self.data_modify.intersect(other.data_modify),
        }
    }

    /// Merge a lower-precedence layer underneath this one: rights already
    /// decided here keep their decision.
    pub fn add_levels(&self, lower: &PermissionSet) -> PermissionSet {
        PermissionSet {
            account_modify: self.account_modify.or_level(lower.account_modify),
            account_spend: self.account_spend.or_level(lower.account_spend),
            account_negative: self.account_negative.or_level(lower.account_negative),
            account_issuance: self.account_issuance.or_level(lower.account_issuance),
            data_modify: self.data_modify.or_level(lower.data_modify),
        }
    }
}

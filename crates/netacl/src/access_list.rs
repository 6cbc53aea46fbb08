//! The access list facade: one policy tree per address family.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::network::{AddressFamily, NetworkAddress};
use crate::tree::{Decision, InsertOutcome, PolicyTree};

/// One successful `add`, as recorded in the rule journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleRecord {
    pub network: NetworkAddress,
    pub policy: bool,
}

/// IP permit/deny list resolving each address to its most specific rule.
///
/// Every successful add is appended to a journal ([`rules`](Self::rules));
/// replaying the journal with [`from_rules`](Self::from_rules) rebuilds an
/// equivalent list.
#[derive(Debug, Clone)]
pub struct AccessList {
    default_policy: bool,
    v4: PolicyTree,
    v6: PolicyTree,
    rules: Vec<RuleRecord>,
    audit_enabled: bool,
}

impl AccessList {
    /// Creates a list that answers `default_policy` for every address.
    pub fn new(default_policy: bool) -> Self {
        Self {
            default_policy,
            v4: PolicyTree::new(AddressFamily::V4, default_policy),
            v6: PolicyTree::new(AddressFamily::V6, default_policy),
            rules: Vec::new(),
            audit_enabled: true,
        }
    }

    /// Disables audit logging of rule changes.
    pub fn without_audit(mut self) -> Self {
        self.audit_enabled = false;
        self
    }

    /// Rebuilds a list by replaying journaled rules in order.
    pub fn from_rules(
        default_policy: bool,
        rules: impl IntoIterator<Item = RuleRecord>,
    ) -> Result<Self> {
        let mut list = Self::new(default_policy).without_audit();
        for rule in rules {
            list.add_network(rule.network, rule.policy)?;
        }
        list.audit_enabled = true;
        Ok(list)
    }

    /// Adds a rule for `network/prefix_len`; the family is detected from the
    /// literal, trying IPv4 syntax first.
    ///
    /// # Errors
    ///
    /// [`AclError::InvalidAddress`](crate::AclError::InvalidAddress) if the
    /// literal matches neither family or the prefix is out of range.
    pub fn add(&mut self, network: &str, prefix_len: u8, policy: bool) -> Result<()> {
        let network = NetworkAddress::parse_any(network, prefix_len)?;
        self.add_network(network, policy)
    }

    /// Adds a rule written as `address/prefix` (a bare address is a host rule).
    pub fn add_cidr(&mut self, cidr: &str, policy: bool) -> Result<()> {
        let network = NetworkAddress::parse_cidr(cidr)?;
        self.add_network(network, policy)
    }

    /// Adds a rule for an already parsed network.
    pub fn add_network(&mut self, network: NetworkAddress, policy: bool) -> Result<()> {
        self.insert(network, policy).map(|_| ())
    }

    /// Adds a rule and reports how the family tree changed.
    pub fn insert(&mut self, network: NetworkAddress, policy: bool) -> Result<InsertOutcome> {
        let outcome = self.tree_mut(network.family()).insert(network, policy)?;
        self.rules.push(RuleRecord { network, policy });

        if self.audit_enabled {
            info!(
                network = %network,
                policy,
                outcome = ?outcome,
                "Access rule added"
            );
        }
        Ok(outcome)
    }

    /// Returns whether `address` is permitted.
    ///
    /// Accepts a bare address or `address/prefix` text. A prefixed query is
    /// answered for the whole network, not for the address written before
    /// the slash: `10.1.2.3/16` resolves as `10.1.0.0/16`, taking the policy
    /// of the deepest rule that contains all of it. A `/24` rule covering
    /// `10.1.2.3` does not decide that query.
    ///
    /// # Errors
    ///
    /// [`AclError::InvalidAddress`](crate::AclError::InvalidAddress) if the
    /// text is not a valid literal of either family.
    pub fn check_access(&self, address: &str) -> Result<bool> {
        self.check_network(&NetworkAddress::parse_cidr(address)?)
    }

    /// Returns the policy of the most specific rule containing all of `network`.
    pub fn check_network(&self, network: &NetworkAddress) -> Result<bool> {
        self.tree(network.family()).lookup(network)
    }

    /// Returns whether a typed address is permitted.
    pub fn check_ip(&self, address: IpAddr) -> Result<bool> {
        self.check_network(&NetworkAddress::from(address))
    }

    /// Resolves `address` and reports which rule decided it.
    pub fn decide(&self, address: &str) -> Result<Decision> {
        let network = NetworkAddress::parse_cidr(address)?;
        let decision = self.tree(network.family()).explain(&network)?;
        if self.audit_enabled {
            debug!(
                address = %network,
                allowed = decision.allowed,
                matched = %decision.matched,
                "Access decision"
            );
        }
        Ok(decision)
    }

    /// The policy configured at construction.
    pub fn default_policy(&self) -> bool {
        self.default_policy
    }

    pub fn tree(&self, family: AddressFamily) -> &PolicyTree {
        match family {
            AddressFamily::V4 => &self.v4,
            AddressFamily::V6 => &self.v6,
        }
    }

    fn tree_mut(&mut self, family: AddressFamily) -> &mut PolicyTree {
        match family {
            AddressFamily::V4 => &mut self.v4,
            AddressFamily::V6 => &mut self.v6,
        }
    }

    /// Successful adds in call order.
    pub fn rules(&self) -> &[RuleRecord] {
        &self.rules
    }

    /// Number of rule nodes across both families.
    pub fn len(&self) -> usize {
        self.v4.len() + self.v6.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

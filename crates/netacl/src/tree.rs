//! Per-family policy tree.
//!
//! Rules are stored as a hierarchy: every node's network strictly contains
//! the networks of its children, and no two siblings contain one another.
//! A lookup descends into the unique child containing the query until no
//! child does; the node it stops at holds the most specific matching rule.
//!
//! Nodes live in an arena and refer to their children by [`NodeId`]. Nodes
//! are never removed, so ids stay valid for the lifetime of the tree and
//! reparenting only rewrites child lists.

use tracing::{debug, trace};

use crate::error::{AclError, Result};
use crate::network::{AddressFamily, NetworkAddress};

/// Index of a node in a [`PolicyTree`]'s arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// The family root, covering the whole address space.
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

/// A rule in the tree: a network, its permit/deny policy and its subnets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyNode {
    network: NetworkAddress,
    policy: bool,
    children: Vec<NodeId>,
}

impl PolicyNode {
    fn new(network: NetworkAddress, policy: bool) -> Self {
        Self {
            network,
            policy,
            children: Vec::new(),
        }
    }

    pub fn network(&self) -> &NetworkAddress {
        &self.network
    }

    /// `true` permits, `false` denies.
    pub fn policy(&self) -> bool {
        self.policy
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Which insertion branch an insert took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new node was attached; `reparented` existing nodes moved beneath it.
    Inserted { reparented: usize },
    /// The network already had a node; its policy was overwritten.
    Replaced { previous: bool },
    /// The enclosing rule already yields this policy, so nothing changed.
    Redundant,
}

/// The answer to a lookup together with the rule that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Whether access is permitted.
    pub allowed: bool,
    /// Network of the deciding node; the family's whole space when no rule matched.
    pub matched: NetworkAddress,
}

impl Decision {
    /// Returns true if no rule matched and the family default applied.
    pub fn is_default(&self) -> bool {
        self.matched.prefix_len() == 0
    }
}

/// Policy hierarchy for one address family.
#[derive(Debug, Clone)]
pub struct PolicyTree {
    family: AddressFamily,
    nodes: Vec<PolicyNode>,
}

impl PolicyTree {
    /// Creates a tree whose root covers the family's whole space with `default_policy`.
    pub fn new(family: AddressFamily, default_policy: bool) -> Self {
        Self {
            family,
            nodes: vec![PolicyNode::new(family.all(), default_policy)],
        }
    }

    pub fn family(&self) -> AddressFamily {
        self.family
    }

    /// Policy applied when no rule matches.
    pub fn default_policy(&self) -> bool {
        self.root().policy
    }

    /// Number of rule nodes, excluding the root.
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn root(&self) -> &PolicyNode {
        &self.nodes[NodeId::ROOT.0]
    }

    pub fn node(&self, id: NodeId) -> Option<&PolicyNode> {
        self.nodes.get(id.0)
    }

    /// Adds a rule, keeping children strict subnets of their parent and
    /// siblings disjoint.
    ///
    /// 1. Descend to the deepest node whose network contains `network`.
    /// 2. If that node's network equals `network`, overwrite its policy.
    /// 3. Else, if that node already yields `policy`, do nothing.
    /// 4. Else attach a new node there and move every sibling it contains
    ///    beneath it.
    ///
    /// # Errors
    ///
    /// - [`AclError::FamilyMismatch`] if `network` belongs to the other family.
    /// - [`AclError::InternalInconsistency`] if two siblings both contain `network`.
    ///
    /// The tree is unchanged when an error is returned.
    pub fn insert(&mut self, network: NetworkAddress, policy: bool) -> Result<InsertOutcome> {
        network.ensure_family(self.family)?;
        let place = self.find_place(&network)?;

        let node = &mut self.nodes[place.0];
        if node.network == network {
            let previous = std::mem::replace(&mut node.policy, policy);
            debug!(network = %network, policy, previous, "Rule policy replaced");
            return Ok(InsertOutcome::Replaced { previous });
        }
        if node.policy == policy {
            debug!(
                network = %network,
                policy,
                enclosing = %node.network,
                "Rule redundant with enclosing rule"
            );
            return Ok(InsertOutcome::Redundant);
        }

        let id = NodeId(self.nodes.len());
        self.nodes.push(PolicyNode::new(network, policy));
        let reparented = self.attach(place, id);

        debug!(
            network = %network,
            policy,
            parent = %self.nodes[place.0].network,
            reparented,
            "Rule inserted"
        );
        Ok(InsertOutcome::Inserted { reparented })
    }

    /// Returns the policy of the most specific rule containing `network`.
    pub fn lookup(&self, network: &NetworkAddress) -> Result<bool> {
        self.explain(network).map(|decision| decision.allowed)
    }

    /// Like [`lookup`](Self::lookup), also reporting the deciding rule.
    pub fn explain(&self, network: &NetworkAddress) -> Result<Decision> {
        network.ensure_family(self.family)?;
        let node = &self.nodes[self.find_place(network)?.0];
        trace!(query = %network, matched = %node.network, allowed = node.policy, "Lookup");
        Ok(Decision {
            allowed: node.policy,
            matched: node.network,
        })
    }

    /// Depth-first walk yielding `(depth, node)` with the root at depth 0.
    pub fn walk(&self) -> Vec<(usize, &PolicyNode)> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![(0, NodeId::ROOT)];
        while let Some((depth, id)) = stack.pop() {
            let node = &self.nodes[id.0];
            out.push((depth, node));
            stack.extend(node.children.iter().rev().map(|&child| (depth + 1, child)));
        }
        out
    }

    /// Checks the structural invariants of the whole tree.
    ///
    /// # Errors
    ///
    /// [`AclError::InternalInconsistency`] describing the first violation:
    /// a child that is not a strict subnet of its parent, two nested
    /// siblings, or a node reachable zero or several times.
    pub fn validate(&self) -> Result<()> {
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![NodeId::ROOT];
        while let Some(id) = stack.pop() {
            if std::mem::replace(&mut seen[id.0], true) {
                return Err(AclError::InternalInconsistency(format!(
                    "node {} is reachable more than once",
                    self.nodes[id.0].network
                )));
            }
            let node = &self.nodes[id.0];
            for (i, &child) in node.children.iter().enumerate() {
                let child_net = &self.nodes[child.0].network;
                if !node.network.contains(child_net) || node.network == *child_net {
                    return Err(AclError::InternalInconsistency(format!(
                        "{child_net} is not a strict subnet of its parent {}",
                        node.network
                    )));
                }
                for &sibling in &node.children[i + 1..] {
                    let sibling_net = &self.nodes[sibling.0].network;
                    if child_net.contains(sibling_net) || sibling_net.contains(child_net) {
                        return Err(AclError::InternalInconsistency(format!(
                            "siblings {child_net} and {sibling_net} overlap under {}",
                            node.network
                        )));
                    }
                }
                stack.push(child);
            }
        }
        if let Some(orphan) = seen.iter().position(|reached| !reached) {
            return Err(AclError::InternalInconsistency(format!(
                "node {} is detached from the tree",
                self.nodes[orphan].network
            )));
        }
        Ok(())
    }

    /// Finds the deepest node whose network contains `network`.
    fn find_place(&self, network: &NetworkAddress) -> Result<NodeId> {
        let mut current = NodeId::ROOT;
        loop {
            let mut containing = None;
            for &child in &self.nodes[current.0].children {
                if !self.nodes[child.0].network.contains(network) {
                    continue;
                }
                if let Some(other) = containing.replace(child) {
                    return Err(AclError::InternalInconsistency(format!(
                        "siblings {} and {} both contain {network}",
                        self.nodes[other.0].network, self.nodes[child.0].network
                    )));
                }
            }
            match containing {
                Some(child) => current = child,
                None => return Ok(current),
            }
        }
    }

    /// Makes `child` a child of `parent`, moving beneath `child` every
    /// existing child of `parent` that it contains. Returns how many nodes
    /// were moved, including moves made while re-attaching them.
    fn attach(&mut self, parent: NodeId, child: NodeId) -> usize {
        let child_net = self.nodes[child.0].network;
        let (subsumed, mut kept): (Vec<NodeId>, Vec<NodeId>) =
            self.nodes[parent.0].children.iter().copied().partition(|&id| {
                let net = &self.nodes[id.0].network;
                child_net.contains(net) && child_net != *net
            });
        kept.push(child);
        self.nodes[parent.0].children = kept;

        let mut moved = 0;
        for id in subsumed {
            trace!(
                network = %self.nodes[id.0].network,
                new_parent = %child_net,
                "Reparenting rule"
            );
            moved += 1 + self.attach(child, id);
        }
        moved
    }
}

//! # netacl: Longest-prefix IP access control
//!
//! Decides whether an IP address is permitted or denied from a set of
//! network-scoped permit/deny rules, entirely in memory.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  AccessList                                  │
//! │  ├─ parse literal, detect family (v4 first)  │
//! │  └─ dispatch to the family's PolicyTree      │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  PolicyTree (one per family)                 │
//! │  ├─ root: whole address space, default       │
//! │  ├─ children: strict subnets of the parent   │
//! │  └─ siblings: never nested                   │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  Decision                                    │
//! │  - policy of the most specific rule          │
//! │  - root default when no rule matches         │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Inserting a rule that encloses existing rules moves them beneath it, so
//! a lookup only ever descends into one child per level.
//!
//! ## Examples
//!
//! ```
//! use netacl::AccessList;
//!
//! let mut acl = AccessList::new(false);
//! acl.add("10.0.0.0", 8, true)?;
//! acl.add("10.1.0.0", 16, false)?;
//! acl.add_cidr("2001:db8::/32", true)?;
//!
//! assert!(!acl.check_access("10.1.2.3")?);
//! assert!(acl.check_access("10.2.3.4")?);
//! assert!(!acl.check_access("11.0.0.0")?);
//! assert!(acl.check_access("2001:db8::42")?);
//! # Ok::<(), netacl::AclError>(())
//! ```
//!
//! ## Concurrency
//!
//! [`AccessList`] is plain owned data (`Send + Sync`). Build it, then share
//! it behind an `Arc` for lock-free lookups, or wrap it in a
//! [`SharedAccessList`] when rules keep arriving while lookups run.

pub mod access_list;
pub mod error;
pub mod network;
pub mod shared;
pub mod tree;


// Kani proofs for bounded model checking
#[cfg(any(test, kani))]
mod kani_proofs;

pub use access_list::{AccessList, RuleRecord};
pub use error::{AclError, Result};
pub use network::{AddressFamily, NetworkAddress};
pub use shared::SharedAccessList;
pub use tree::{Decision, InsertOutcome, NodeId, PolicyNode, PolicyTree};

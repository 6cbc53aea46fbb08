//! Lock-guarded access list for services that keep adding rules while serving.

use std::net::IpAddr;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::access_list::AccessList;
use crate::error::{AclError, Result};
use crate::network::NetworkAddress;

/// An [`AccessList`] behind an `Arc<RwLock<_>>`.
///
/// Adds take the write lock for the whole insert, so lookups never see a
/// half-reorganized tree. Lookups share the read lock. Lists that stop
/// changing after start-up can be [`snapshot`](Self::snapshot)ted into an
/// `Arc<AccessList>` and queried without locking.
#[derive(Debug, Clone)]
pub struct SharedAccessList {
    inner: Arc<RwLock<AccessList>>,
}

impl SharedAccessList {
    pub fn new(list: AccessList) -> Self {
        Self {
            inner: Arc::new(RwLock::new(list)),
        }
    }

    pub fn add(&self, network: &str, prefix_len: u8, policy: bool) -> Result<()> {
        self.write()?.add(network, prefix_len, policy)
    }

    pub fn add_cidr(&self, cidr: &str, policy: bool) -> Result<()> {
        self.write()?.add_cidr(cidr, policy)
    }

    pub fn add_network(&self, network: NetworkAddress, policy: bool) -> Result<()> {
        self.write()?.add_network(network, policy)
    }

    pub fn check_access(&self, address: &str) -> Result<bool> {
        self.read()?.check_access(address)
    }

    pub fn check_network(&self, network: &NetworkAddress) -> Result<bool> {
        self.read()?.check_network(network)
    }

    pub fn check_ip(&self, address: IpAddr) -> Result<bool> {
        self.read()?.check_ip(address)
    }

    /// Copies the current list into an immutable, lock-free handle.
    pub fn snapshot(&self) -> Result<Arc<AccessList>> {
        Ok(Arc::new(self.read()?.clone()))
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, AccessList>> {
        self.inner.read().map_err(|_| AclError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, AccessList>> {
        self.inner.write().map_err(|_| AclError::LockPoisoned)
    }
}

impl From<AccessList> for SharedAccessList {
    fn from(list: AccessList) -> Self {
        Self::new(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn concurrent_readers_see_completed_inserts() {
        let shared = SharedAccessList::new(AccessList::new(false).without_audit());
        shared.add("10.0.0.0", 8, true).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let shared = shared.clone();
                thread::spawn(move || {
                    let probe = format!("10.{i}.0.1");
                    shared.check_access(&probe).unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
    }

    #[test]
    fn writer_and_readers_interleave() {
        let shared = SharedAccessList::new(AccessList::new(false).without_audit());

        let writer = {
            let shared = shared.clone();
            thread::spawn(move || {
                for octet in 0..=255u8 {
                    shared.add(&format!("10.{octet}.0.0"), 16, true).unwrap();
                }
            })
        };
        let reader = {
            let shared = shared.clone();
            thread::spawn(move || {
                for _ in 0..256 {
                    // never errors: every read sees a whole tree
                    shared.check_access("10.200.1.1").unwrap();
                }
            })
        };

        writer.join().unwrap();
        reader.join().unwrap();
        assert!(shared.check_access("10.200.1.1").unwrap());
        assert!(!shared.check_access("11.0.0.1").unwrap());
    }

    #[test]
    fn snapshot_is_detached() {
        let shared = SharedAccessList::from(AccessList::new(false).without_audit());
        shared.add_cidr("192.168.0.0/16", true).unwrap();
        let frozen = shared.snapshot().unwrap();
        shared.add_cidr("192.168.1.0/24", false).unwrap();

        assert!(frozen.check_access("192.168.1.1").unwrap());
        assert!(!shared.check_access("192.168.1.1").unwrap());
        frozen.tree(crate::AddressFamily::V4).validate().unwrap();
    }

    #[test]
    fn poisoned_lock_is_reported() {
        let shared = SharedAccessList::new(AccessList::new(false).without_audit());
        let poisoner = shared.clone();
        let _ = thread::spawn(move || {
            let _guard = poisoner.inner.write().unwrap();
            panic!("poison the lock");
        })
        .join();

        assert_eq!(shared.check_access("10.0.0.1"), Err(AclError::LockPoisoned));
        assert_eq!(shared.add("10.0.0.0", 8, true), Err(AclError::LockPoisoned));
    }
}

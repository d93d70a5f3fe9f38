//! Replica peer records, keyed by process id

use gds_core::{Error, Peer, Record, Result};
use tracing::debug;

use super::{now, Store};
use crate::wire;

impl Store {
    /// Register a peer and return its key
    ///
    /// A deleted peer with the same pid is revived with its version history.
    pub fn create_peer(&self, mut peer: Peer) -> Result<String> {
        if peer.id == 0 {
            return Err(Error::IncompleteRecord("peer pid is required".to_string()));
        }

        let mut inner = self.inner.write();
        let key = peer.key();
        peer.metadata = match inner.get_record::<Peer>(&key)? {
            Some(old) if !old.is_tombstone() => {
                return Err(Error::DuplicateEntity(format!("peer {} already exists", key)));
            }
            Some(old) => old.metadata,
            None => None,
        };

        let ts = now();
        peer.created = ts.clone();
        peer.modified = ts;
        peer.deleted.clear();
        self.advance(&mut peer)?;

        let data = wire::marshal(&peer)?;
        inner.commit(|_, sequence, batch| {
            sequence.next();
            batch.put(peer.store_key(), data);
            Ok(())
        })?;

        debug!(target: "gds::store", pid = peer.id, addr = %peer.addr, "peer created");
        Ok(key)
    }

    /// Fetch a peer by pid
    pub fn retrieve_peer(&self, pid: u64) -> Result<Peer> {
        match self.inner.read().get_record::<Peer>(&pid.to_string())? {
            Some(peer) if !peer.is_tombstone() => Ok(peer),
            _ => Err(Error::not_found(format!("peer {}", pid))),
        }
    }

    /// Every live peer, in key order
    pub fn list_peers(&self) -> Result<Vec<Peer>> {
        self.inner.read().list_records()
    }

    /// Replace a peer with a versioned tombstone
    ///
    /// Deleting a missing or already deleted peer does nothing.
    pub fn delete_peer(&self, pid: u64) -> Result<()> {
        let mut inner = self.inner.write();
        let mut peer = match inner.get_record::<Peer>(&pid.to_string())? {
            Some(old) if !old.is_tombstone() => old,
            _ => return Ok(()),
        };

        let ts = now();
        peer.modified = ts.clone();
        peer.deleted = ts;
        self.advance(&mut peer)?;

        let data = wire::marshal(&peer)?;
        inner.commit(|_, _, batch| {
            batch.put(peer.store_key(), data);
            Ok(())
        })?;

        debug!(target: "gds::store", pid, "peer deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;

    fn peer(pid: u64) -> Peer {
        Peer {
            id: pid,
            addr: format!("replica-{}.example.com:4435", pid),
            name: format!("replica-{}", pid),
            region: "us-east-1".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_requires_pid() {
        let store = Store::open(StoreConfig::memory()).unwrap();
        assert!(matches!(
            store.create_peer(peer(0)),
            Err(Error::IncompleteRecord(_))
        ));
    }

    #[test]
    fn test_create_retrieve_list() {
        let store = Store::open(StoreConfig::memory()).unwrap();
        assert_eq!(store.create_peer(peer(8)).unwrap(), "8");
        store.create_peer(peer(12)).unwrap();
        assert!(matches!(
            store.create_peer(peer(8)),
            Err(Error::DuplicateEntity(_))
        ));

        assert_eq!(store.retrieve_peer(8).unwrap().name, "replica-8");
        assert!(store.retrieve_peer(9).unwrap_err().is_not_found());

        // keys sort as strings
        let pids: Vec<u64> = store.list_peers().unwrap().iter().map(|p| p.id).collect();
        assert_eq!(pids, vec![12, 8]);
        assert_eq!(store.sequence(), 2);
    }

    #[test]
    fn test_delete_then_revive() {
        let store = Store::open(StoreConfig::memory()).unwrap();
        store.create_peer(peer(8)).unwrap();
        store.delete_peer(8).unwrap();
        store.delete_peer(8).unwrap();
        store.delete_peer(99).unwrap();

        assert!(store.retrieve_peer(8).unwrap_err().is_not_found());
        assert!(store.list_peers().unwrap().is_empty());

        store.create_peer(peer(8)).unwrap();
        let revived = store.retrieve_peer(8).unwrap();
        assert!(revived.deleted.is_empty());
        assert_eq!(revived.metadata.unwrap().version.unwrap().counter, 3);
    }
}

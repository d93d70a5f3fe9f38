//! Certificate request records

use gds_core::{CertificateRequest, Error, Record, Result};
use tracing::debug;
use uuid::Uuid;

use super::{now, Store};
use crate::wire;

impl Store {
    /// Store a new certificate request and return its id
    pub fn create_certreq(&self, mut req: CertificateRequest) -> Result<String> {
        req.id = Uuid::new_v4().to_string();
        let ts = now();
        req.created = ts.clone();
        req.modified = ts;
        req.deleted.clear();
        req.metadata = None;

        let mut inner = self.inner.write();
        self.advance(&mut req)?;
        let data = wire::marshal(&req)?;
        inner.commit(|_, sequence, batch| {
            sequence.next();
            batch.put(req.store_key(), data);
            Ok(())
        })?;

        debug!(target: "gds::store", id = %req.id, "certreq created");
        Ok(req.id)
    }

    /// Fetch a certificate request by id
    pub fn retrieve_certreq(&self, id: &str) -> Result<CertificateRequest> {
        if id.is_empty() {
            return Err(Error::not_found("certreq id is required"));
        }
        match self.inner.read().get_record::<CertificateRequest>(id)? {
            Some(req) if !req.is_tombstone() => Ok(req),
            _ => Err(Error::not_found(format!("certreq {}", id))),
        }
    }

    /// Create or replace a certificate request under its own id
    ///
    /// An existing record, even a tombstone, supplies the version history;
    /// otherwise a zero version on the incoming record is discarded.
    pub fn update_certreq(&self, mut req: CertificateRequest) -> Result<()> {
        if req.id.is_empty() {
            return Err(Error::IncompleteRecord("certreq id is required".to_string()));
        }

        let mut inner = self.inner.write();
        match inner.get_record::<CertificateRequest>(&req.id)? {
            Some(old) => {
                if req.created.is_empty() && !old.is_tombstone() {
                    req.created = old.created;
                }
                req.metadata = old.metadata;
            }
            None => {
                if req.metadata.as_ref().map_or(true, |m| m.has_zero_version()) {
                    req.metadata = None;
                }
            }
        }

        req.modified = now();
        if req.created.is_empty() {
            req.created = req.modified.clone();
        }
        req.deleted.clear();
        self.advance(&mut req)?;

        let data = wire::marshal(&req)?;
        inner.commit(|_, _, batch| {
            batch.put(req.store_key(), data);
            Ok(())
        })?;

        debug!(target: "gds::store", id = %req.id, "certreq updated");
        Ok(())
    }

    /// Replace a certificate request with a versioned tombstone
    ///
    /// Deleting a missing or already deleted request does nothing.
    pub fn delete_certreq(&self, id: &str) -> Result<()> {
        let mut inner = self.inner.write();
        let old = match inner.get_record::<CertificateRequest>(id)? {
            Some(old) if !old.is_tombstone() => old,
            _ => return Ok(()),
        };

        let mut tombstone = old.tombstone(now());
        self.advance(&mut tombstone)?;
        let data = wire::marshal(&tombstone)?;
        inner.commit(|_, _, batch| {
            batch.put(tombstone.store_key(), data);
            Ok(())
        })?;

        debug!(target: "gds::store", id, "certreq deleted");
        Ok(())
    }

    /// Every live certificate request, in id order
    pub fn list_certreqs(&self) -> Result<Vec<CertificateRequest>> {
        self.inner.read().list_records()
    }
}

// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! An in-memory store for registered user records
//!
//! The store is the only mutable state shared between protocol sessions:
//! registration publishes a record, login reads one. Writes are serialized
//! per key by the underlying concurrent map; reads take no lock.

use crate::errors::ProtocolError;
use crate::opaque::UserRecord;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// A concurrent map from username to registered [`UserRecord`]
#[derive(Default)]
pub struct UserStore {
    records: DashMap<String, Arc<UserRecord>>,
}

impl UserStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes a completed registration. A re-registration under the same
    /// username replaces the previous record.
    pub fn insert(&self, record: UserRecord) {
        debug!(username = %record.username, "storing user record");
        self.records
            .insert(record.username.clone(), Arc::new(record));
    }

    /// Looks up the record for a username.
    ///
    /// The unknown-user error is distinguishable from a failed password
    /// check; deployments that must resist username enumeration should
    /// collapse the two before answering the peer.
    pub fn get(&self, username: &str) -> Result<Arc<UserRecord>, ProtocolError> {
        match self.records.get(username) {
            Some(record) => Ok(Arc::clone(record.value())),
            None => {
                debug!(username = %username, "lookup for unregistered user");
                Err(ProtocolError::UnknownUserError(username.to_string()))
            }
        }
    }

    /// Number of registered users
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no users are registered
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint_dig::BigUint;
    use rand::rngs::OsRng;
    use rsa::RsaPrivateKey;

    fn dummy_record(username: &str) -> UserRecord {
        let mut rng = OsRng;
        let client_s_pk = RsaPrivateKey::new(&mut rng, 1024).unwrap().to_public_key();
        UserRecord {
            username: username.to_string(),
            oprf_key: BigUint::from(42u32),
            v: BigUint::from(7u32),
            envelope: vec![0u8; 64],
            client_s_pk,
        }
    }

    #[test]
    fn insert_and_get() {
        let store = UserStore::new();
        assert!(store.is_empty());
        let record = dummy_record("alice");
        store.insert(record.clone());
        assert_eq!(store.len(), 1);
        assert_eq!(*store.get("alice").unwrap(), record);
    }

    #[test]
    fn unknown_user() {
        let store = UserStore::new();
        let err = store.get("bob").unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownUserError(_)));
        assert_eq!(err.to_string(), "no such user: bob");
    }

    #[test]
    fn reregistration_replaces_record() {
        let store = UserStore::new();
        store.insert(dummy_record("alice"));
        let replacement = dummy_record("alice");
        store.insert(replacement.clone());
        assert_eq!(store.len(), 1);
        assert_eq!(*store.get("alice").unwrap(), replacement);
    }
}

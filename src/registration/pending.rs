//! Pending registration sessions.
//!
//! After a submit we keep a short-lived record keyed by an opaque cookie so
//! "resend verification email" can re-issue a link without the user typing
//! everything again. Entries expire on their own. Losing one only disables
//! resend; the emailed link keeps working regardless.

use moka::future::Cache;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct PendingRegistration {
    /// The payload token the original link was issued for. Resends re-sign
    /// this same token, so every sent link completes the same registration.
    pub payload_token: String,
    pub email: String,
    pub name: String,
}

#[derive(Clone)]
pub struct PendingStore {
    sessions: Cache<Uuid, PendingRegistration>,
}

impl PendingStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Cache::builder().time_to_live(ttl).build(),
        }
    }

    pub async fn put(&self, pending: PendingRegistration) -> Uuid {
        let id = Uuid::new_v4();
        self.sessions.insert(id, pending).await;
        id
    }

    pub async fn get(&self, id: Uuid) -> Option<PendingRegistration> {
        self.sessions.get(&id).await
    }

    pub async fn clear(&self, id: Uuid) {
        self.sessions.invalidate(&id).await;
    }
}

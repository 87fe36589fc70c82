//! Google identity linking
//!
//! OAuth negotiation happens upstream; by the time a profile reaches this
//! service the identity is already verified. Linking is keyed on email:
//! a profile for a known address attaches Google fields to that account,
//! an unknown address creates a fresh one.

use std::sync::Arc;

use helpdesk_shared::{GoogleProfile, User};

use crate::error::ApiResult;
use crate::store::{RecordStore, UserStore};

pub struct IdentityLinker {
    store: Arc<dyn RecordStore>,
}

impl IdentityLinker {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Attach a verified Google profile to its account, creating one if
    /// needed. Repeatable; profile fields are refreshed on every call and
    /// an existing password credential survives the link.
    pub async fn link(&self, profile: &GoogleProfile) -> ApiResult<User> {
        let user = self.store.upsert_google_user(profile).await?;
        tracing::info!(user_id = %user.id, "Google identity linked");
        Ok(user)
    }
}

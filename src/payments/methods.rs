//! Payment methods

use std::fmt;

use jiff::Timestamp;
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::{payments::PaymentError, stores::UserId};

/// Payment method identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentMethodId(pub u64);

impl fmt::Display for PaymentMethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tells whether orders or payments still point at a payment method.
#[automock]
pub trait PaymentMethodReferences {
    /// Returns whether any order or payment references `method`.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::References`] if the lookup fails.
    fn is_referenced(&self, method: PaymentMethodId) -> Result<bool, PaymentError>;
}

/// What happened to a deleted payment method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deletion {
    /// Still referenced, so only flagged as deleted
    SoftDeleted,

    /// Unreferenced; the caller may drop it
    Removed,
}

/// A stored card or account used to pay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentMethod {
    id: PaymentMethodId,
    owner: Option<UserId>,
    gateway: String,
    remote_id: Option<String>,
    reusable: bool,
    default: bool,
    expires_time: Option<Timestamp>,
    created_time: Timestamp,
    deleted: bool,
}

impl PaymentMethod {
    /// Creates a reusable payment method.
    pub fn new(id: PaymentMethodId, gateway: impl Into<String>, created_time: Timestamp) -> Self {
        Self {
            id,
            owner: None,
            gateway: gateway.into(),
            remote_id: None,
            reusable: true,
            default: false,
            expires_time: None,
            created_time,
            deleted: false,
        }
    }

    /// Sets the owner.
    #[must_use]
    pub fn with_owner(mut self, owner: UserId) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Sets when the method expires.
    #[must_use]
    pub fn with_expires_time(mut self, expires_time: Timestamp) -> Self {
        self.expires_time = Some(expires_time);
        self
    }

    /// Returns the id.
    pub fn id(&self) -> PaymentMethodId {
        self.id
    }

    /// Returns the owner.
    pub fn owner(&self) -> Option<UserId> {
        self.owner
    }

    /// Returns the payment gateway id.
    pub fn gateway(&self) -> &str {
        &self.gateway
    }

    /// Returns the gateway's id for the method.
    pub fn remote_id(&self) -> Option<&str> {
        self.remote_id.as_deref()
    }

    /// Sets the gateway's id for the method.
    pub fn set_remote_id(&mut self, remote_id: impl Into<String>) {
        self.remote_id = Some(remote_id.into());
    }

    /// Returns whether the method may be used for more than one payment.
    pub fn is_reusable(&self) -> bool {
        self.reusable
    }

    /// Sets whether the method may be reused.
    pub fn set_reusable(&mut self, reusable: bool) {
        self.reusable = reusable;
    }

    /// Returns whether this is the owner's default method.
    pub fn is_default(&self) -> bool {
        self.default
    }

    /// Sets whether this is the owner's default method.
    pub fn set_default(&mut self, default: bool) {
        self.default = default;
    }

    /// Returns when the method was created.
    pub fn created_time(&self) -> Timestamp {
        self.created_time
    }

    /// Returns when the method expires.
    pub fn expires_time(&self) -> Option<Timestamp> {
        self.expires_time
    }

    /// Returns whether the method expired at `now`.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_time.is_some_and(|expires| expires <= now)
    }

    /// Returns whether the method was soft deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Deletes the method: soft deletes it while orders or payments still
    /// reference it, otherwise clears the flag and reports it removable.
    ///
    /// # Errors
    ///
    /// Returns a [`PaymentError`] if references cannot be looked up.
    pub fn delete(
        &mut self,
        references: &dyn PaymentMethodReferences,
    ) -> Result<Deletion, PaymentError> {
        if references.is_referenced(self.id)? {
            self.deleted = true;

            Ok(Deletion::SoftDeleted)
        } else {
            self.deleted = false;

            Ok(Deletion::Removed)
        }
    }
}

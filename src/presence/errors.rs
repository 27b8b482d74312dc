use thiserror::Error;

use crate::store::StoreError;
use crate::subscription::SubscriptionError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PresenceError {
    #[error("Presence write failed: {0}")]
    StoreWrite(#[from] StoreError),

    #[error(transparent)]
    Subscription(#[from] SubscriptionError),
}

use async_trait::async_trait;

use crate::StoreError;

/// Mutual-exclusion capability used to close check-then-act races, most
/// importantly the duplicate payment-intent window. Implementations may be
/// process-local or distributed; callers only see acquire/release.
#[async_trait]
pub trait LockManager: Send + Sync {
    async fn acquire(&self, key: &str) -> Result<Box<dyn LockLease>, StoreError>;
}

#[async_trait]
pub trait LockLease: Send {
    async fn release(self: Box<Self>) -> Result<(), StoreError>;
}

use crate::models::{Subscription, SubscriptionStatus};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use service_core::error::AppError;

/// Persistence for subscription records. Every call is scoped to one owner.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn insert(&self, subscription: &Subscription) -> Result<(), AppError>;

    async fn insert_many(&self, subscriptions: &[Subscription]) -> Result<(), AppError>;

    async fn find(&self, owner_id: &str, id: &str) -> Result<Option<Subscription>, AppError>;

    /// All of the owner's records, oldest first.
    async fn list(&self, owner_id: &str) -> Result<Vec<Subscription>, AppError>;

    /// Overwrite a stored record. Returns false when it does not exist.
    async fn replace(&self, subscription: &Subscription) -> Result<bool, AppError>;

    async fn delete(&self, owner_id: &str, id: &str) -> Result<bool, AppError>;

    async fn delete_all(&self, owner_id: &str) -> Result<u64, AppError>;

    /// Move every record currently in one of `from` to `to`.
    async fn set_status_all(
        &self,
        owner_id: &str,
        from: &[SubscriptionStatus],
        to: SubscriptionStatus,
    ) -> Result<u64, AppError>;

    async fn health_check(&self) -> Result<(), AppError>;
}

/// Process-local store keyed by subscription id.
#[derive(Default)]
pub struct InMemorySubscriptionStore {
    records: DashMap<String, Subscription>,
}

impl InMemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn insert(&self, subscription: &Subscription) -> Result<(), AppError> {
        if self.records.contains_key(&subscription.id) {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Subscription {} already exists",
                subscription.id
            )));
        }
        self.records
            .insert(subscription.id.clone(), subscription.clone());
        Ok(())
    }

    async fn insert_many(&self, subscriptions: &[Subscription]) -> Result<(), AppError> {
        for subscription in subscriptions {
            self.insert(subscription).await?;
        }
        Ok(())
    }

    async fn find(&self, owner_id: &str, id: &str) -> Result<Option<Subscription>, AppError> {
        Ok(self
            .records
            .get(id)
            .filter(|s| s.owner_id == owner_id)
            .map(|s| s.value().clone()))
    }

    async fn list(&self, owner_id: &str) -> Result<Vec<Subscription>, AppError> {
        let mut items: Vec<Subscription> = self
            .records
            .iter()
            .filter(|s| s.owner_id == owner_id)
            .map(|s| s.value().clone())
            .collect();
        items.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(items)
    }

    async fn replace(&self, subscription: &Subscription) -> Result<bool, AppError> {
        match self.records.get_mut(&subscription.id) {
            Some(mut existing) if existing.owner_id == subscription.owner_id => {
                *existing = subscription.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, owner_id: &str, id: &str) -> Result<bool, AppError> {
        Ok(self
            .records
            .remove_if(id, |_, s| s.owner_id == owner_id)
            .is_some())
    }

    async fn delete_all(&self, owner_id: &str) -> Result<u64, AppError> {
        let mut removed = 0;
        self.records.retain(|_, s| {
            let keep = s.owner_id != owner_id;
            if !keep {
                removed += 1;
            }
            keep
        });
        Ok(removed)
    }

    async fn set_status_all(
        &self,
        owner_id: &str,
        from: &[SubscriptionStatus],
        to: SubscriptionStatus,
    ) -> Result<u64, AppError> {
        let now = Utc::now();
        let mut modified = 0;
        for mut entry in self.records.iter_mut() {
            if entry.owner_id == owner_id && from.contains(&entry.status) {
                entry.status = to;
                entry.updated_at = now;
                modified += 1;
            }
        }
        Ok(modified)
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}

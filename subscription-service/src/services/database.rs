use super::store::SubscriptionStore;
use crate::models::{Subscription, SubscriptionStatus};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, DateTime as BsonDateTime},
    options::{FindOptions, IndexOptions},
    Client as MongoClient, Collection, Database, IndexModel,
};
use service_core::error::AppError;

#[derive(Clone)]
pub struct MongoDb {
    client: MongoClient,
    db: Database,
}

impl MongoDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!("Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            AppError::from(e)
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for subscription-service");

        let subscriptions = self.subscriptions();

        let owner_index = IndexModel::builder()
            .keys(doc! { "owner_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("owner_id_lookup".to_string())
                    .build(),
            )
            .build();

        subscriptions
            .create_index(owner_index, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create owner_id index on subscriptions: {}", e);
                AppError::from(e)
            })?;
        tracing::info!("Created index on subscriptions.owner_id");

        let owner_status_index = IndexModel::builder()
            .keys(doc! { "owner_id": 1, "status": 1 })
            .options(
                IndexOptions::builder()
                    .name("owner_status_lookup".to_string())
                    .build(),
            )
            .build();

        subscriptions
            .create_index(owner_status_index, None)
            .await
            .map_err(|e| {
                tracing::error!(
                    "Failed to create owner_status index on subscriptions: {}",
                    e
                );
                AppError::from(e)
            })?;
        tracing::info!("Created index on subscriptions.(owner_id, status)");

        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }

    pub fn subscriptions(&self) -> Collection<Subscription> {
        self.db.collection("subscriptions")
    }
}

/// [`SubscriptionStore`] backed by the `subscriptions` collection.
pub struct MongoSubscriptionStore {
    db: MongoDb,
}

impl MongoSubscriptionStore {
    pub fn new(db: MongoDb) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SubscriptionStore for MongoSubscriptionStore {
    async fn insert(&self, subscription: &Subscription) -> Result<(), AppError> {
        self.db
            .subscriptions()
            .insert_one(subscription, None)
            .await
            .map_err(|e| {
                tracing::error!(subscription_id = %subscription.id, "Failed to insert subscription: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }

    async fn insert_many(&self, subscriptions: &[Subscription]) -> Result<(), AppError> {
        if subscriptions.is_empty() {
            return Ok(());
        }
        self.db
            .subscriptions()
            .insert_many(subscriptions, None)
            .await
            .map_err(|e| {
                tracing::error!(count = subscriptions.len(), "Failed to insert subscriptions: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }

    async fn find(&self, owner_id: &str, id: &str) -> Result<Option<Subscription>, AppError> {
        let found = self
            .db
            .subscriptions()
            .find_one(doc! { "_id": id, "owner_id": owner_id }, None)
            .await?;
        Ok(found)
    }

    async fn list(&self, owner_id: &str) -> Result<Vec<Subscription>, AppError> {
        let find_options = FindOptions::builder()
            .sort(doc! { "created_at": 1, "_id": 1 })
            .build();

        let cursor = self
            .db
            .subscriptions()
            .find(doc! { "owner_id": owner_id }, find_options)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list subscriptions: {}", e);
                AppError::from(e)
            })?;

        let items: Vec<Subscription> = cursor.try_collect().await.map_err(|e| {
            tracing::error!("Failed to collect subscriptions: {}", e);
            AppError::from(e)
        })?;

        Ok(items)
    }

    async fn replace(&self, subscription: &Subscription) -> Result<bool, AppError> {
        let result = self
            .db
            .subscriptions()
            .replace_one(
                doc! { "_id": &subscription.id, "owner_id": &subscription.owner_id },
                subscription,
                None,
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn delete(&self, owner_id: &str, id: &str) -> Result<bool, AppError> {
        let result = self
            .db
            .subscriptions()
            .delete_one(doc! { "_id": id, "owner_id": owner_id }, None)
            .await?;
        Ok(result.deleted_count > 0)
    }

    async fn delete_all(&self, owner_id: &str) -> Result<u64, AppError> {
        let result = self
            .db
            .subscriptions()
            .delete_many(doc! { "owner_id": owner_id }, None)
            .await?;
        Ok(result.deleted_count)
    }

    async fn set_status_all(
        &self,
        owner_id: &str,
        from: &[SubscriptionStatus],
        to: SubscriptionStatus,
    ) -> Result<u64, AppError> {
        let from: Vec<&str> = from.iter().map(|s| s.as_str()).collect();
        let result = self
            .db
            .subscriptions()
            .update_many(
                doc! { "owner_id": owner_id, "status": { "$in": from } },
                doc! { "$set": { "status": to.as_str(), "updated_at": BsonDateTime::now() } },
                None,
            )
            .await?;
        Ok(result.modified_count)
    }

    async fn health_check(&self) -> Result<(), AppError> {
        self.db.health_check().await
    }
}

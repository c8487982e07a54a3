use crate::utils::error::AppError;
use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, Document};
use serde::{de::DeserializeOwned, Serialize};

/// A persisted document addressed by its string `id` field.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + Unpin + 'static {
    fn id(&self) -> &str;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    pub offset: u64,
    pub limit: Option<u64>,
}

impl Page {
    pub fn new(offset: Option<i64>, limit: Option<i64>) -> Self {
        Page {
            offset: offset.unwrap_or(0).max(0) as u64,
            limit: limit.filter(|l| *l > 0).map(|l| l as u64),
        }
    }
}

/// Data access used by every interactor. Filters are plain BSON documents.
#[async_trait]
pub trait Collection<T: Entity>: Send + Sync {
    async fn item(&self, filter: Document) -> Result<Option<T>, AppError>;

    async fn item_by_id(&self, id: &str) -> Result<Option<T>, AppError> {
        self.item(doc! { "id": id }).await
    }

    async fn items(&self, filter: Document, page: Page) -> Result<Vec<T>, AppError>;

    async fn insert_item(&self, item: &T) -> Result<(), AppError>;

    /// Replaces the stored document with the same id.
    async fn update_item(&self, item: &T) -> Result<(), AppError>;

    /// Applies an operator update (`$set`, `$unset`, `$push`, `$addToSet`,
    /// `$pull`) to every match in one server-side step. `array_filters` bind
    /// the `$[name]` placeholders used in update paths.
    async fn update_items(
        &self,
        filter: Document,
        update: Document,
        array_filters: Vec<Document>,
    ) -> Result<u64, AppError>;

    /// Operator update of one document. Returns whether it exists.
    async fn update_by_id(&self, id: &str, update: Document) -> Result<bool, AppError> {
        Ok(self.update_items(doc! { "id": id }, update, Vec::new()).await? > 0)
    }

    async fn delete_item(&self, id: &str) -> Result<bool, AppError>;

    async fn delete_items(&self, filter: Document) -> Result<u64, AppError>;

    async fn count(&self, filter: Document) -> Result<u64, AppError>;

    async fn exist(&self, filter: Document) -> Result<bool, AppError> {
        Ok(self.count(filter).await? > 0)
    }
}

pub struct MongoCollection<T: Send + Sync> {
    inner: mongodb::Collection<T>,
}

impl<T: Send + Sync> MongoCollection<T> {
    pub fn new(inner: mongodb::Collection<T>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<T: Entity> Collection<T> for MongoCollection<T> {
    async fn item(&self, filter: Document) -> Result<Option<T>, AppError> {
        Ok(self.inner.find_one(filter).await?)
    }

    async fn items(&self, filter: Document, page: Page) -> Result<Vec<T>, AppError> {
        let mut find = self.inner.find(filter).skip(page.offset);
        if let Some(limit) = page.limit {
            find = find.limit(limit as i64);
        }
        let cursor = find.await?;
        Ok(cursor.try_collect().await?)
    }

    async fn insert_item(&self, item: &T) -> Result<(), AppError> {
        self.inner.insert_one(item).await?;
        Ok(())
    }

    async fn update_item(&self, item: &T) -> Result<(), AppError> {
        let result = self.inner.replace_one(doc! { "id": item.id() }, item).await?;
        if result.matched_count == 0 {
            return Err(AppError::NotFound(format!("document {}", item.id())));
        }
        Ok(())
    }

    async fn update_items(
        &self,
        filter: Document,
        update: Document,
        array_filters: Vec<Document>,
    ) -> Result<u64, AppError> {
        let action = self.inner.update_many(filter, update);
        let result = if array_filters.is_empty() {
            action.await?
        } else {
            action.array_filters(array_filters).await?
        };
        Ok(result.matched_count)
    }

    async fn delete_item(&self, id: &str) -> Result<bool, AppError> {
        let result = self.inner.delete_one(doc! { "id": id }).await?;
        Ok(result.deleted_count > 0)
    }

    async fn delete_items(&self, filter: Document) -> Result<u64, AppError> {
        let result = self.inner.delete_many(filter).await?;
        Ok(result.deleted_count)
    }

    async fn count(&self, filter: Document) -> Result<u64, AppError> {
        Ok(self.inner.count_documents(filter).await?)
    }
}

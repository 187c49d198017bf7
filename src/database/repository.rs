use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::backend::{Row, TenantConnection};
use super::error::DatabaseError;
use super::schema::TableDef;
use crate::tenancy::PartitionName;

/// A row type stored in one tenant table.
pub trait Entity: DeserializeOwned + Serialize + Send + Sync + 'static {
    const TABLE: &'static TableDef;

    /// Insertable shape (no id, no server-side timestamps)
    type New: Serialize + Send + Sync;
}

/// Typed access to one table of one partition.
///
/// The partition is fixed when the tenant handle is bound; no method takes a
/// partition or tenant argument.
pub struct Collection<T> {
    connection: Arc<dyn TenantConnection>,
    partition: PartitionName,
    _phantom: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            connection: self.connection.clone(),
            partition: self.partition.clone(),
            _phantom: PhantomData,
        }
    }
}

impl<T: Entity> Collection<T> {
    pub(crate) fn new(connection: Arc<dyn TenantConnection>, partition: PartitionName) -> Self {
        Self {
            connection,
            partition,
            _phantom: PhantomData,
        }
    }

    pub async fn create(&self, new: &T::New) -> Result<T, DatabaseError> {
        let row = self
            .connection
            .insert(&self.partition, T::TABLE, to_row(new)?)
            .await?;
        from_row(row)
    }

    pub async fn list(&self) -> Result<Vec<T>, DatabaseError> {
        self.select_any(Row::new()).await
    }

    /// Rows matching every column = value pair in `filter`
    pub async fn select_any(&self, filter: Row) -> Result<Vec<T>, DatabaseError> {
        self.connection
            .select(&self.partition, T::TABLE, &filter)
            .await?
            .into_iter()
            .map(from_row)
            .collect()
    }

    pub async fn select_one(&self, id: i64) -> Result<Option<T>, DatabaseError> {
        Ok(self.select_any(where_eq("id", id)).await?.into_iter().next())
    }

    pub async fn select_404(&self, id: i64) -> Result<T, DatabaseError> {
        self.select_one(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("{} {} not found", T::TABLE.name, id)))
    }

    pub async fn update(&self, id: i64, patch: Row) -> Result<Option<T>, DatabaseError> {
        self.connection
            .update(&self.partition, T::TABLE, id, patch)
            .await?
            .map(from_row)
            .transpose()
    }

    pub async fn delete(&self, id: i64) -> Result<bool, DatabaseError> {
        self.connection.delete(&self.partition, T::TABLE, id).await
    }

    pub async fn count(&self) -> Result<usize, DatabaseError> {
        Ok(self
            .connection
            .select(&self.partition, T::TABLE, &Row::new())
            .await?
            .len())
    }
}

/// Single-column equality filter for [`Collection::select_any`]
pub fn where_eq(column: &str, value: impl Into<Value>) -> Row {
    let mut filter = Row::new();
    filter.insert(column.to_string(), value.into());
    filter
}

fn to_row<S: Serialize + ?Sized>(value: &S) -> Result<Row, DatabaseError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(DatabaseError::Decode(format!("expected an object, got {}", other))),
    }
}

fn from_row<T: DeserializeOwned>(row: Row) -> Result<T, DatabaseError> {
    Ok(serde_json::from_value(Value::Object(row))?)
}

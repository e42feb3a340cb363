//! Transaction category repository.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, SqlErr,
};
use tracing::info;

use saku_shared::AppError;
use saku_shared::types::CategoryId;

use super::{NameError, normalize_name};
use crate::entities::{transaction_categories, transactions};

/// Error types for category operations.
#[derive(Debug, thiserror::Error)]
pub enum CategoryError {
    /// Category not found.
    #[error("Transaction category not found: {0}")]
    NotFound(CategoryId),

    /// Name is blank or too long.
    #[error("Invalid category name: {0}")]
    InvalidName(#[from] NameError),

    /// Category still referenced by transactions.
    #[error("Cannot delete category {0}: it is referenced by transactions")]
    InUse(CategoryId),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<CategoryError> for AppError {
    fn from(err: CategoryError) -> Self {
        match err {
            CategoryError::NotFound(_) => Self::NotFound(err.to_string()),
            CategoryError::InvalidName(_) => Self::Validation(err.to_string()),
            CategoryError::InUse(_) => Self::Conflict(err.to_string()),
            CategoryError::Database(e) => Self::Database(e.to_string()),
        }
    }
}

/// Transaction category repository.
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    db: DatabaseConnection,
}

impl CategoryRepository {
    /// Creates a new category repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a category.
    pub async fn create(&self, name: &str) -> Result<transaction_categories::Model, CategoryError> {
        let name = normalize_name(name)?;
        let category = transaction_categories::ActiveModel {
            name: Set(name),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        info!(
            category_id = category.transaction_category_id,
            "Transaction category created"
        );
        Ok(category)
    }

    /// Gets a category by ID.
    pub async fn get(
        &self,
        category_id: CategoryId,
    ) -> Result<transaction_categories::Model, CategoryError> {
        transaction_categories::Entity::find_by_id(category_id.into_inner())
            .one(&self.db)
            .await?
            .ok_or(CategoryError::NotFound(category_id))
    }

    /// Lists all categories ordered by ID.
    pub async fn list(&self) -> Result<Vec<transaction_categories::Model>, CategoryError> {
        Ok(transaction_categories::Entity::find()
            .order_by_asc(transaction_categories::Column::TransactionCategoryId)
            .all(&self.db)
            .await?)
    }

    /// Renames a category.
    pub async fn rename(
        &self,
        category_id: CategoryId,
        name: &str,
    ) -> Result<transaction_categories::Model, CategoryError> {
        let name = normalize_name(name)?;
        let category = self.get(category_id).await?;

        let mut active: transaction_categories::ActiveModel = category.into();
        active.name = Set(name);
        Ok(active.update(&self.db).await?)
    }

    /// Deletes a category that no transaction references.
    pub async fn delete(&self, category_id: CategoryId) -> Result<(), CategoryError> {
        let id = category_id.into_inner();
        let references = transactions::Entity::find()
            .filter(transactions::Column::TransactionCategoryId.eq(id))
            .count(&self.db)
            .await?;
        if references > 0 {
            return Err(CategoryError::InUse(category_id));
        }

        let result = transaction_categories::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(|e| match e.sql_err() {
                Some(SqlErr::ForeignKeyConstraintViolation(_)) => CategoryError::InUse(category_id),
                _ => CategoryError::Database(e),
            })?;

        if result.rows_affected == 0 {
            return Err(CategoryError::NotFound(category_id));
        }

        info!(category_id = id, "Transaction category deleted");
        Ok(())
    }
}

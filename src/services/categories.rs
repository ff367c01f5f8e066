//! Category management service

use crate::{
    error::{AppError, AppResult},
    models::category::{Category, CreateCategory, UpdateCategory},
    repository::Repository,
};

#[derive(Clone)]
pub struct CategoriesService {
    repository: Repository,
}

impl CategoriesService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self) -> AppResult<Vec<Category>> {
        self.repository.categories.list().await
    }

    pub async fn get(&self, id: i32) -> AppResult<Category> {
        self.repository.categories.get_by_id(id).await
    }

    pub async fn create(&self, data: CreateCategory) -> AppResult<Category> {
        if self.repository.categories.name_exists(data.name.trim(), None).await? {
            return Err(AppError::Conflict(format!(
                "Category '{}' already exists",
                data.name.trim()
            )));
        }
        let category = self.repository.categories.create(&data).await?;
        tracing::info!("Category created id={} name={}", category.id, category.name);
        Ok(category)
    }

    pub async fn update(&self, id: i32, data: UpdateCategory) -> AppResult<Category> {
        if let Some(name) = data.name.as_deref() {
            if self.repository.categories.name_exists(name.trim(), Some(id)).await? {
                return Err(AppError::Conflict(format!(
                    "Category '{}' already exists",
                    name.trim()
                )));
            }
        }
        let category = self.repository.categories.update(id, &data).await?;
        tracing::info!("Category updated id={}", id);
        Ok(category)
    }

    /// Delete a category; refused while books are filed under it
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let category = self.repository.categories.get_by_id(id).await?;
        if category.book_count > 0 {
            return Err(AppError::Conflict(format!(
                "Category {} still has {} book(s)",
                id, category.book_count
            )));
        }
        self.repository.categories.delete(id).await?;
        tracing::info!("Category deleted id={}", id);
        Ok(())
    }
}

//! Member administration service

use super::auth::hash_password;
use crate::{
    error::{AppError, AppResult},
    models::{
        pagination::PageRequest,
        user::{CreateMember, Member, MemberQuery, MemberSort, Role, UpdateMember},
    },
    repository::{users::NewUser, Repository},
};

#[derive(Clone)]
pub struct MembersService {
    repository: Repository,
}

impl MembersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn search(
        &self,
        query: &MemberQuery,
        page: &PageRequest<MemberSort>,
    ) -> AppResult<(Vec<Member>, i64)> {
        self.repository.users.search(query, page).await
    }

    pub async fn get(&self, id: i32) -> AppResult<Member> {
        self.repository.users.get_member(id).await
    }

    pub async fn create(&self, data: CreateMember) -> AppResult<Member> {
        if self.repository.users.email_exists(&data.email, None).await? {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let password_hash = hash_password(&data.password)?;
        let member = self
            .repository
            .users
            .create(&NewUser {
                email: &data.email,
                password_hash: &password_hash,
                name: &data.name,
                phone: data.phone.as_deref(),
                address: data.address.as_deref(),
                role: data.role.unwrap_or(Role::Member),
                is_active: data.is_active.unwrap_or(true),
            })
            .await?;

        tracing::info!("Member created id={} role={}", member.id, member.role);
        Ok(member)
    }

    pub async fn update(&self, id: i32, data: UpdateMember) -> AppResult<Member> {
        if let Some(email) = data.email.as_deref() {
            if self.repository.users.email_exists(email, Some(id)).await? {
                return Err(AppError::Conflict("Email already registered".to_string()));
            }
        }

        let password_hash = data.password.as_deref().map(hash_password).transpose()?;
        let member = self.repository.users.update(id, &data, password_hash).await?;
        tracing::info!("Member updated id={}", id);
        Ok(member)
    }

    /// Delete a member account. Administrators cannot delete themselves and
    /// members holding books cannot be removed.
    pub async fn delete(&self, id: i32, acting_user_id: i32) -> AppResult<()> {
        if id == acting_user_id {
            return Err(AppError::BusinessRule(
                "You cannot delete your own account".to_string(),
            ));
        }

        let active = self.repository.users.active_borrow_count(id).await?;
        if active > 0 {
            return Err(AppError::Conflict(format!(
                "Member {} still has {} book(s) on loan",
                id, active
            )));
        }

        self.repository.users.delete(id).await?;
        tracing::info!("Member deleted id={} by user id={}", id, acting_user_id);
        Ok(())
    }
}

//! Users (members) repository

use sqlx::{Pool, Postgres, QueryBuilder};

use super::{contains_pattern, search_term};
use crate::{
    error::{AppError, AppResult},
    models::{
        pagination::PageRequest,
        user::{Member, MemberQuery, MemberSort, Role, UpdateMember, UpdateProfile, User},
    },
};

const MEMBER_SELECT: &str = r#"
    SELECT u.id, u.email, u.name, u.phone, u.address, u.role, u.is_active,
           (SELECT COUNT(*) FROM borrow_requests r
            WHERE r.user_id = u.id AND r.status = 'APPROVED') AS active_borrows,
           u.created_at, u.updated_at
    FROM users u
"#;

/// Values for a new account
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
    pub name: &'a str,
    pub phone: Option<&'a str>,
    pub address: Option<&'a str>,
    pub role: Role,
    pub is_active: bool,
}

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get the full user row (with password hash) by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Get user by email (authentication)
    pub async fn get_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Get public member profile by ID
    pub async fn get_member(&self, id: i32) -> AppResult<Member> {
        let query = format!("{} WHERE u.id = $1", MEMBER_SELECT);
        sqlx::query_as::<_, Member>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Member with id {} not found", id)))
    }

    /// Check if email already exists
    pub async fn email_exists(&self, email: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM users
                WHERE LOWER(email) = LOWER($1) AND ($2::int IS NULL OR id != $2)
            )
            "#,
        )
        .bind(email.trim())
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Search members with pagination
    pub async fn search(
        &self,
        query: &MemberQuery,
        page: &PageRequest<MemberSort>,
    ) -> AppResult<(Vec<Member>, i64)> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users u");
        push_filters(&mut count, query);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(MEMBER_SELECT);
        push_filters(&mut select, query);
        select
            .push(format!(" ORDER BY {}", page.order_clause("u.id")))
            .push(" LIMIT ")
            .push_bind(page.per_page)
            .push(" OFFSET ")
            .push_bind(page.offset());

        let members = select
            .build_query_as::<Member>()
            .fetch_all(&self.pool)
            .await?;

        Ok((members, total))
    }

    /// Create a user
    pub async fn create(&self, user: &NewUser<'_>) -> AppResult<Member> {
        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO users (email, password_hash, name, phone, address, role, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(user.email.trim())
        .bind(user.password_hash)
        .bind(user.name.trim())
        .bind(user.phone)
        .bind(user.address)
        .bind(user.role)
        .bind(user.is_active)
        .fetch_one(&self.pool)
        .await?;

        self.get_member(id).await
    }

    /// Admin update; absent fields keep their value
    pub async fn update(
        &self,
        id: i32,
        data: &UpdateMember,
        password_hash: Option<String>,
    ) -> AppResult<Member> {
        let result = sqlx::query(
            r#"
            UPDATE users SET
                email = COALESCE($2, email),
                password_hash = COALESCE($3, password_hash),
                name = COALESCE($4, name),
                phone = COALESCE($5, phone),
                address = COALESCE($6, address),
                role = COALESCE($7, role),
                is_active = COALESCE($8, is_active),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(data.email.as_deref().map(str::trim))
        .bind(password_hash)
        .bind(data.name.as_deref().map(str::trim))
        .bind(&data.phone)
        .bind(&data.address)
        .bind(data.role)
        .bind(data.is_active)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Member with id {} not found", id)));
        }
        self.get_member(id).await
    }

    /// Self-service profile update
    pub async fn update_profile(
        &self,
        id: i32,
        data: &UpdateProfile,
        password_hash: Option<String>,
    ) -> AppResult<Member> {
        sqlx::query(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                phone = COALESCE($3, phone),
                address = COALESCE($4, address),
                password_hash = COALESCE($5, password_hash),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(data.name.as_deref().map(str::trim))
        .bind(&data.phone)
        .bind(&data.address)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;

        self.get_member(id).await
    }

    /// Promote an account to administrator and reset its password
    pub async fn promote_admin(&self, id: i32, password_hash: &str) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE users SET role = 'ADMIN', is_active = TRUE, password_hash = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Number of approved (in hand) borrows for a member
    pub async fn active_borrow_count(&self, id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrow_requests WHERE user_id = $1 AND status = 'APPROVED'",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Delete a user (favorites, requests and history cascade)
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Member with id {} not found", id)));
        }
        Ok(())
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &MemberQuery) {
    qb.push(" WHERE 1=1");

    if let Some(term) = search_term(&query.search) {
        let pattern = contains_pattern(term);
        qb.push(" AND (LOWER(u.name) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR LOWER(u.email) LIKE ")
            .push_bind(pattern)
            .push(")");
    }

    if let Some(role) = query.role {
        qb.push(" AND u.role = ").push_bind(role);
    }

    if let Some(is_active) = query.is_active {
        qb.push(" AND u.is_active = ").push_bind(is_active);
    }
}

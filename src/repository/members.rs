//! Members repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::member::{CreateMember, Member, UpdateMember},
};

/// Member joined with its user identity
pub(crate) const MEMBER_SELECT: &str = r#"
    SELECT m.id, m.user_id, u.username, u.email, m.membership_date
    FROM members m
    JOIN users u ON u.id = m.user_id
"#;

#[derive(Clone)]
pub struct MembersRepository {
    pool: Pool<Postgres>,
}

impl MembersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List all members
    pub async fn list(&self) -> AppResult<Vec<Member>> {
        let rows = sqlx::query_as::<_, Member>(&format!("{} ORDER BY m.id", MEMBER_SELECT))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Get member by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Member> {
        sqlx::query_as::<_, Member>(&format!("{} WHERE m.id = $1", MEMBER_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Member {} not found", id)))
    }

    /// Create a member and its user identity
    pub async fn create(&self, data: &CreateMember) -> AppResult<Member> {
        self.ensure_username_free(&data.username, None).await?;

        let mut tx = self.pool.begin().await?;

        let user_id: i32 =
            sqlx::query_scalar("INSERT INTO users (username, email) VALUES ($1, $2) RETURNING id")
                .bind(&data.username)
                .bind(&data.email)
                .fetch_one(&mut *tx)
                .await?;

        let member_id: i32 =
            sqlx::query_scalar("INSERT INTO members (user_id) VALUES ($1) RETURNING id")
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await?;

        tx.commit().await?;

        self.get_by_id(member_id).await
    }

    /// Update the user identity of a member
    pub async fn update(&self, id: i32, data: &UpdateMember) -> AppResult<Member> {
        let member = self.get_by_id(id).await?;

        if let Some(ref username) = data.username {
            self.ensure_username_free(username, Some(member.user_id)).await?;
        }

        sqlx::query(
            r#"
            UPDATE users SET username = COALESCE($2, username), email = COALESCE($3, email)
            WHERE id = $1
            "#,
        )
        .bind(member.user_id)
        .bind(&data.username)
        .bind(&data.email)
        .execute(&self.pool)
        .await?;

        self.get_by_id(id).await
    }

    /// Delete member and its user identity
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let member = self.get_by_id(id).await?;

        let active: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM loans WHERE member_id = $1 AND is_returned = FALSE)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        if active {
            return Err(AppError::Conflict(format!("Member {} has active loans", id)));
        }

        // Cascades to the member row and its loan history
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(member.user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn ensure_username_free(&self, username: &str, exclude_user_id: Option<i32>) -> AppResult<()> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 AND ($2::int IS NULL OR id != $2))",
        )
        .bind(username)
        .bind(exclude_user_id)
        .fetch_one(&self.pool)
        .await?;

        if taken {
            return Err(AppError::Conflict(format!("Username {} already exists", username)));
        }
        Ok(())
    }
}

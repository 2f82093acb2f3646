use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::model::{Account, AccountPatch, NewAccount};
use super::store::{StoreError, UserStore};

/// PostgreSQL-backed store. Uniqueness is enforced by the
/// `users_username_key` / `users_email_key` constraints.
#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let user = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, username, email, password_hash, firstname, lastname,
                   current_organisation, bio, role, email_verified, is_active, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, StoreError> {
        let user = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, username, email, password_hash, firstname, lastname,
                   current_organisation, bio, role, email_verified, is_active, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await
        .context("find user by username")?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let user = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, username, email, password_hash, firstname, lastname,
                   current_organisation, bio, role, email_verified, is_active, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    async fn find_all(&self) -> Result<Vec<Account>, StoreError> {
        let users = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, username, email, password_hash, firstname, lastname,
                   current_organisation, bio, role, email_verified, is_active, created_at
            FROM users
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("list users")?;
        Ok(users)
    }

    async fn create(&self, new: NewAccount) -> Result<Account, StoreError> {
        sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO users (id, username, email, password_hash, firstname, lastname,
                               current_organisation, bio, role)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, username, email, password_hash, firstname, lastname,
                      current_organisation, bio, role, email_verified, is_active, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.username)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(&new.firstname)
        .bind(&new.lastname)
        .bind(&new.current_organisation)
        .bind(&new.bio)
        .bind(new.role)
        .fetch_one(&self.db)
        .await
        .map_err(|e| map_write_error(e, "insert user"))
    }

    async fn update(&self, id: Uuid, patch: AccountPatch) -> Result<Option<Account>, StoreError> {
        sqlx::query_as::<_, Account>(
            r#"
            UPDATE users SET
                firstname            = COALESCE($2, firstname),
                lastname             = COALESCE($3, lastname),
                current_organisation = COALESCE($4, current_organisation),
                bio                  = COALESCE($5, bio),
                password_hash        = COALESCE($6, password_hash),
                is_active            = COALESCE($7, is_active)
            WHERE id = $1
            RETURNING id, username, email, password_hash, firstname, lastname,
                      current_organisation, bio, role, email_verified, is_active, created_at
            "#,
        )
        .bind(id)
        .bind(patch.firstname)
        .bind(patch.lastname)
        .bind(patch.current_organisation)
        .bind(patch.bio)
        .bind(patch.password_hash)
        .bind(patch.is_active)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| map_write_error(e, "update user"))
    }

    async fn remove(&self, id: Uuid) -> Result<bool, StoreError> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete user")?;
        Ok(res.rows_affected() > 0)
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

fn map_write_error(err: sqlx::Error, what: &'static str) -> StoreError {
    if is_unique_violation(&err) {
        let field = match &err {
            sqlx::Error::Database(db_err) if db_err.constraint() == Some("users_username_key") => {
                "username"
            }
            _ => "email",
        };
        return StoreError::DuplicateKey(field);
    }
    StoreError::Backend(anyhow::Error::new(err).context(what))
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Row};
use uuid::Uuid;

use sancharie_core::account::{Gender, ProfileUpdate, User};
use sancharie_core::repository::{RepositoryError, UserRepository};
use sancharie_shared::PhoneNumber;

use crate::database::map_sqlx;

const USER_COLUMNS: &str =
    "id, phone, name, email, age, gender, is_profile_complete, created_at, updated_at, last_login";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    phone: String,
    name: Option<String>,
    email: Option<String>,
    age: Option<i16>,
    gender: Option<String>,
    is_profile_complete: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    last_login: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let phone = PhoneNumber::parse(&row.phone)
            .map_err(|e| RepositoryError::Backend(format!("stored phone for user {}: {}", row.id, e)))?;
        Ok(User {
            id: row.id,
            phone,
            name: row.name,
            email: row.email,
            age: row.age.and_then(|a| u8::try_from(a).ok()),
            gender: row.gender.as_deref().and_then(Gender::parse),
            is_profile_complete: row.is_profile_complete,
            created_at: row.created_at,
            updated_at: row.updated_at,
            last_login: row.last_login,
        })
    }
}

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;
        row.map(User::try_from).transpose()
    }

    async fn find_by_phone(&self, phone: &PhoneNumber) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(&format!("SELECT {} FROM users WHERE phone = $1", USER_COLUMNS))
            .bind(phone.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;
        row.map(User::try_from).transpose()
    }

    async fn record_login(&self, phone: &PhoneNumber) -> Result<(User, bool), RepositoryError> {
        // xmax = 0 only for freshly inserted rows.
        let sql = format!(
            "INSERT INTO users (id, phone) VALUES ($1, $2)
             ON CONFLICT (phone) DO UPDATE SET last_login = NOW()
             RETURNING {}, (xmax = 0) AS inserted",
            USER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(Uuid::new_v4())
            .bind(phone.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx)?;
        let inserted: bool = row.try_get("inserted").map_err(map_sqlx)?;
        let user = User::try_from(UserRow::from_row(&row).map_err(map_sqlx)?)?;
        Ok((user, inserted))
    }

    async fn update_profile(&self, id: Uuid, update: &ProfileUpdate) -> Result<User, RepositoryError> {
        let mut user = self
            .find_by_id(id)
            .await?
            .ok_or(RepositoryError::NotFound("User"))?;
        user.apply(update);

        let row: UserRow = sqlx::query_as(&format!(
            "UPDATE users SET name = $2, email = $3, age = $4, gender = $5,
                is_profile_complete = $6, updated_at = $7
             WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.age.map(i16::from))
        .bind(user.gender.map(Gender::as_str))
        .bind(user.is_profile_complete)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)?;
        User::try_from(row)
    }
}

use chrono::Utc;
use sqlx::{Sqlite, SqlitePool};

use crate::{
    errors::RequestError,
    models::{NewUser, User},
};

pub async fn get_user_by_username(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<User>, RequestError> {
    let user = sqlx::query_as::<Sqlite, User>(
        r#"
        SELECT id, username, password FROM users WHERE username = $1
        "#,
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

pub async fn insert_user(pool: &SqlitePool, user: &NewUser) -> Result<User, RequestError> {
    let mut tx = pool.begin().await?;
    let user = sqlx::query_as::<Sqlite, User>(
        r#"
        INSERT INTO users (username, email, password, date_joined)
        VALUES ($1, $2, $3, $4)
        RETURNING id, username, password
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.password)
    .bind(Utc::now())
    .fetch_one(&mut tx)
    .await?;
    tx.commit().await?;
    Ok(user)
}

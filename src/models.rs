use chrono::{DateTime, Utc};
use serde::Serialize;

pub const TITLE_MAX_LENGTH: usize = 255;
pub const SLUG_MAX_LENGTH: usize = 255;

/// An article row joined with the name and slug of its category.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub photo: Option<String>,
    pub time_create: DateTime<Utc>,
    pub time_update: DateTime<Utc>,
    pub is_published: bool,
    pub cat_id: i64,
    pub cat_name: String,
    pub cat_slug: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

/// A category annotated with the number of articles referencing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct CategoryCount {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub total: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password: String,
}

/// Column values for a new article, already validated.
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub photo: Option<String>,
    pub is_published: bool,
    pub cat_id: i64,
}

/// Column values for a new user; `password` is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
}

use chrono::Utc;
use sqlx::{Sqlite, SqlitePool};

use crate::errors::RequestError;
use crate::models::{Article, NewArticle};

use super::SetClause;

const ARTICLE_COLUMNS: &str = r#"
            SELECT articles.id           AS "id",
                   articles.title        AS "title",
                   articles.slug         AS "slug",
                   articles.content      AS "content",
                   articles.photo        AS "photo",
                   articles.time_create  AS "time_create",
                   articles.time_update  AS "time_update",
                   articles.is_published AS "is_published",
                   articles.cat_id       AS "cat_id",
                   categories.name       AS "cat_name",
                   categories.slug       AS "cat_slug"
            FROM   articles
                   JOIN categories
                     ON categories.id = articles.cat_id
"#;

const ARTICLE_ORDERING: &str = " ORDER BY articles.time_create DESC, articles.title ASC ";

/// Which articles a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArticleScope<'a> {
    All,
    Published,
    PublishedInCategory(&'a str),
}

impl ArticleScope<'_> {
    fn where_clause(&self) -> &'static str {
        match self {
            ArticleScope::All => "",
            ArticleScope::Published => " WHERE articles.is_published = 1 ",
            ArticleScope::PublishedInCategory(_) => {
                " WHERE articles.is_published = 1 AND categories.slug = $1 "
            }
        }
    }

    fn category_slug(&self) -> Option<&str> {
        match self {
            ArticleScope::PublishedInCategory(slug) => Some(slug),
            _ => None,
        }
    }
}

pub async fn count_articles_in_db(
    pool: &SqlitePool,
    scope: ArticleScope<'_>,
) -> Result<i64, RequestError> {
    let query = format!(
        "SELECT COUNT(*) FROM articles JOIN categories ON categories.id = articles.cat_id {}",
        scope.where_clause()
    );
    let mut query = sqlx::query_scalar::<Sqlite, i64>(&query);
    if let Some(slug) = scope.category_slug() {
        query = query.bind(slug);
    }
    Ok(query.fetch_one(pool).await?)
}

pub async fn list_articles_in_db(
    pool: &SqlitePool,
    scope: ArticleScope<'_>,
    limit: i64,
    offset: i64,
) -> Result<Vec<Article>, RequestError> {
    let placeholder = if scope.category_slug().is_some() { 2 } else { 1 };
    let query = format!(
        "{}{}{} LIMIT ${} OFFSET ${}",
        ARTICLE_COLUMNS,
        scope.where_clause(),
        ARTICLE_ORDERING,
        placeholder,
        placeholder + 1
    );
    let mut query = sqlx::query_as::<Sqlite, Article>(&query);
    if let Some(slug) = scope.category_slug() {
        query = query.bind(slug);
    }
    let articles = query.bind(limit).bind(offset).fetch_all(pool).await?;
    Ok(articles)
}

pub async fn get_article_by_slug_in_db(
    pool: &SqlitePool,
    slug: &str,
) -> Result<Option<Article>, RequestError> {
    let query = format!("{} WHERE articles.slug = $1", ARTICLE_COLUMNS);
    let article = sqlx::query_as::<Sqlite, Article>(&query)
        .bind(slug)
        .fetch_optional(pool)
        .await?;
    Ok(article)
}

pub async fn get_article_by_id_in_db(
    pool: &SqlitePool,
    id: i64,
) -> Result<Option<Article>, RequestError> {
    let query = format!("{} WHERE articles.id = $1", ARTICLE_COLUMNS);
    let article = sqlx::query_as::<Sqlite, Article>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(article)
}

pub async fn create_article_in_db(
    pool: &SqlitePool,
    NewArticle {
        title,
        slug,
        content,
        photo,
        is_published,
        cat_id,
    }: NewArticle,
) -> Result<Article, RequestError> {
    let mut tx = pool.begin().await?;
    let now = Utc::now();
    let id = sqlx::query_scalar::<Sqlite, i64>(
        r#"
        INSERT INTO articles (title, slug, content, photo, time_create, time_update, is_published, cat_id)
        VALUES ($1, $2, $3, $4, $5, $5, $6, $7)
        RETURNING id
        "#,
    )
    .bind(title)
    .bind(slug)
    .bind(content)
    .bind(photo)
    .bind(now)
    .bind(is_published)
    .bind(cat_id)
    .fetch_one(&mut tx)
    .await?;
    tx.commit().await?;

    get_article_by_id_in_db(pool, id)
        .await?
        .ok_or(RequestError::NotFound)
}

/// Fields an editor may change on an existing article.
#[derive(Debug, Default)]
pub struct ArticleChanges {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub content: Option<String>,
    pub photo: Option<String>,
    pub cat_id: Option<i64>,
}

/// Applies `changes` and stamps the update time, even when nothing else changed.
pub async fn update_article_in_db(
    pool: &SqlitePool,
    id: i64,
    ArticleChanges {
        title,
        slug,
        content,
        photo,
        cat_id,
    }: ArticleChanges,
) -> Result<Article, RequestError> {
    let mut tx = pool.begin().await?;
    let (mut assignments, params) = SetClause::default()
        .set("title", title)
        .set("slug", slug)
        .set("content", content)
        .set("photo", photo)
        .set("cat_id", cat_id.map(|id| id.to_string()))
        .build();
    assignments.push(format!("time_update = ${}", params.len() + 1));
    let query = format!(
        "UPDATE articles SET {} WHERE id = ${}",
        assignments.join(", "),
        params.len() + 2
    );
    let mut query = sqlx::query(&query);
    for param in params {
        query = query.bind(param);
    }
    let result = query.bind(Utc::now()).bind(id).execute(&mut tx).await?;
    if result.rows_affected() == 0 {
        return Err(RequestError::NotFound);
    }
    tx.commit().await?;

    get_article_by_id_in_db(pool, id)
        .await?
        .ok_or(RequestError::NotFound)
}

pub async fn set_article_published_in_db(
    pool: &SqlitePool,
    id: i64,
    is_published: bool,
) -> Result<(), RequestError> {
    let mut tx = pool.begin().await?;
    let result = sqlx::query(
        r#"
        UPDATE articles SET is_published = $1, time_update = $2 WHERE id = $3
        "#,
    )
    .bind(is_published)
    .bind(Utc::now())
    .bind(id)
    .execute(&mut tx)
    .await?;
    if result.rows_affected() == 0 {
        return Err(RequestError::NotFound);
    }
    tx.commit().await?;
    Ok(())
}

/// Case-insensitive substring search over title and content, optionally narrowed
/// by the published flag. `%` and `_` in `term` match themselves.
pub async fn search_articles_in_db(
    pool: &SqlitePool,
    term: &str,
    is_published: Option<bool>,
) -> Result<Vec<Article>, RequestError> {
    let query = format!(
        "{} WHERE (articles.title LIKE $1 ESCAPE '\\' OR articles.content LIKE $1 ESCAPE '\\') \
         AND (articles.is_published = $2 OR $2 IS NULL) {}",
        ARTICLE_COLUMNS, ARTICLE_ORDERING
    );
    let pattern = format!("%{}%", escape_like(term));
    let articles = sqlx::query_as::<Sqlite, Article>(&query)
        .bind(pattern)
        .bind(is_published)
        .fetch_all(pool)
        .await?;
    Ok(articles)
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

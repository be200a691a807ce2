use std::str::FromStr;

use sqlx::{Sqlite, SqlitePool};

use crate::errors::RequestError;
use crate::models::{Category, CategoryCount};

/// Categories with fewer articles than this are left out of aggregated lists.
/// Zero keeps empty categories in, reported with a count of 0.
pub const MIN_ARTICLES_PER_CATEGORY: i64 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryField {
    Id,
    Name,
    Slug,
    Total,
}

/// A sort key such as `name` or `-total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryOrder {
    pub field: CategoryField,
    pub descending: bool,
}

impl CategoryOrder {
    fn to_sql(self) -> String {
        let column = match self.field {
            CategoryField::Id => "categories.id",
            CategoryField::Name => "categories.name",
            CategoryField::Slug => "categories.slug",
            CategoryField::Total => "total",
        };
        let direction = if self.descending { "DESC" } else { "ASC" };
        // Ties fall back to the natural id order.
        format!("{} {}, categories.id ASC", column, direction)
    }
}

impl FromStr for CategoryOrder {
    type Err = RequestError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (descending, name) = match value.strip_prefix('-') {
            Some(name) => (true, name),
            None => (false, value),
        };
        let field = match name {
            "id" | "pk" => CategoryField::Id,
            "name" => CategoryField::Name,
            "slug" => CategoryField::Slug,
            "total" => CategoryField::Total,
            _ => return Err(RequestError::RunTimeError("Unknown category sort field")),
        };
        Ok(CategoryOrder { field, descending })
    }
}

/// Parameters of the category aggregation: restrict to one category or order by a field.
#[derive(Debug, Clone, Copy, Default)]
pub struct CategoryQuery {
    pub id: Option<i64>,
    pub sort: Option<CategoryOrder>,
}

/// Counts, per category, the articles referencing it, published or not.
///
/// With an `id` only that category comes back. Otherwise every category meeting
/// [`MIN_ARTICLES_PER_CATEGORY`] is returned, by id or by the requested order.
pub async fn aggregate_categories_in_db(
    pool: &SqlitePool,
    CategoryQuery { id, sort }: CategoryQuery,
) -> Result<Vec<CategoryCount>, RequestError> {
    let order = match (id, sort) {
        (None, Some(sort)) => sort.to_sql(),
        _ => String::from("categories.id ASC"),
    };
    let query = format!(
        r#"
        SELECT categories.id      AS "id",
               categories.name    AS "name",
               categories.slug    AS "slug",
               COUNT(articles.id) AS "total"
        FROM   categories
               LEFT JOIN articles
                      ON articles.cat_id = categories.id
        WHERE  ( categories.id = $1
                  OR $1 IS NULL )
        GROUP  BY categories.id
        HAVING ( COUNT(articles.id) >= $2
                  OR $1 IS NOT NULL )
        ORDER  BY {}
        "#,
        order
    );
    let cats = sqlx::query_as::<Sqlite, CategoryCount>(&query)
        .bind(id)
        .bind(MIN_ARTICLES_PER_CATEGORY)
        .fetch_all(pool)
        .await?;
    Ok(cats)
}

pub async fn list_categories_in_db(pool: &SqlitePool) -> Result<Vec<Category>, RequestError> {
    let cats = sqlx::query_as::<Sqlite, Category>(
        r#"
        SELECT id, name, slug FROM categories ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(cats)
}

pub async fn get_category_by_slug_in_db(
    pool: &SqlitePool,
    slug: &str,
) -> Result<Option<Category>, RequestError> {
    let cat = sqlx::query_as::<Sqlite, Category>(
        r#"
        SELECT id, name, slug FROM categories WHERE slug = $1
        "#,
    )
    .bind(slug)
    .fetch_optional(pool)
    .await?;
    Ok(cat)
}

pub async fn insert_category(
    pool: &SqlitePool,
    name: &str,
    slug: &str,
) -> Result<Category, RequestError> {
    let mut tx = pool.begin().await?;
    let cat = sqlx::query_as::<Sqlite, Category>(
        r#"
        INSERT INTO categories (name, slug)
        VALUES ($1, $2)
        RETURNING id, name, slug
        "#,
    )
    .bind(name)
    .bind(slug)
    .fetch_one(&mut tx)
    .await?;
    tx.commit().await?;
    Ok(cat)
}

/// Deletes a category, refusing while any article still references it.
pub async fn delete_category_in_db(pool: &SqlitePool, id: i64) -> Result<(), RequestError> {
    let mut tx = pool.begin().await?;
    let result = sqlx::query(
        r#"
        DELETE FROM categories WHERE id = $1
        "#,
    )
    .bind(id)
    .execute(&mut tx)
    .await
    .map_err(RequestError::from)
    .map_err(|e| {
        if e.is_foreign_key_violation() {
            RequestError::Protected
        } else {
            e
        }
    })?;
    if result.rows_affected() == 0 {
        return Err(RequestError::NotFound);
    }
    tx.commit().await?;
    Ok(())
}

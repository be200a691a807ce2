//! Per-request template context shared by every page: navigation menu, the
//! cached category list and the highlighted category.

use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::SqlitePool;

use crate::authentication::MaybeUser;
use crate::cache::CategoryCache;
use crate::db_helpers::{aggregate_categories_in_db, CategoryQuery};
use crate::errors::RequestError;

pub type Context = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MenuItem {
    pub title: &'static str,
    pub url_name: &'static str,
    pub url: &'static str,
}

pub const ADD_PAGE: &str = "add_page";

pub const MENU: [MenuItem; 3] = [
    MenuItem {
        title: "About site",
        url_name: "about",
        url: "/about/",
    },
    MenuItem {
        title: "Add article",
        url_name: ADD_PAGE,
        url: "/addpage/",
    },
    MenuItem {
        title: "Feedback",
        url_name: "contact",
        url: "/contact/",
    },
];

/// The menu for the caller; anonymous visitors do not get the "add article" entry.
pub fn user_menu(user: &MaybeUser) -> Vec<MenuItem> {
    let mut menu = MENU.to_vec();
    if !user.is_authenticated() {
        menu.remove(1);
    }
    menu
}

/// Merges `extra` with the shared page data.
///
/// `menu` and `cats` always come from here; `cat_selected` defaults to 0 (no
/// category highlighted) unless the caller supplied one.
pub async fn build_context(
    pool: &SqlitePool,
    categories: &CategoryCache,
    user: &MaybeUser,
    title: impl Into<String>,
    extra: Context,
) -> Result<Context, RequestError> {
    let cats = categories
        .get_or_load(|| aggregate_categories_in_db(pool, CategoryQuery::default()))
        .await?;

    let mut context = extra;
    context.insert("title".to_owned(), Value::String(title.into()));
    context.insert("menu".to_owned(), to_value(&user_menu(user))?);
    context.insert("cats".to_owned(), to_value(cats.as_ref())?);
    context.insert("user".to_owned(), to_value(&user.0)?);
    context
        .entry("cat_selected")
        .or_insert_with(|| Value::from(0));
    Ok(context)
}

pub fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<Value, RequestError> {
    serde_json::to_value(value).map_err(|e| {
        tracing::error!(error = %e, "failed to serialize template context");
        RequestError::ServerError
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authentication::AuthUser;
    use crate::db_helpers::test_support::{category, new_article, test_pool};
    use crate::db_helpers::create_article_in_db;
    use std::time::Duration;

    fn anonymous() -> MaybeUser {
        MaybeUser(None)
    }

    fn signed_in() -> MaybeUser {
        MaybeUser(Some(AuthUser {
            id: 1,
            username: "anna".to_owned(),
        }))
    }

    #[test]
    fn anonymous_menu_drops_only_add_article() {
        let full = user_menu(&signed_in());
        let short = user_menu(&anonymous());
        assert_eq!(full.len(), short.len() + 1);
        assert!(short.iter().all(|item| item.url_name != ADD_PAGE));
        assert_eq!(
            full.into_iter()
                .filter(|item| item.url_name != ADD_PAGE)
                .collect::<Vec<_>>(),
            short
        );
        assert_eq!(MENU.len(), 3);
    }

    #[tokio::test]
    async fn context_merges_shared_and_caller_keys() {
        let (pool, _dir) = test_pool().await;
        category(&pool, "Actresses", "actresses").await;
        let cache = CategoryCache::new(Duration::from_secs(60));
        let mut extra = Context::new();
        extra.insert("posts".to_owned(), Value::Array(vec![]));

        let context = build_context(&pool, &cache, &anonymous(), "Home page", extra)
            .await
            .unwrap();

        assert_eq!(context["title"], "Home page");
        assert_eq!(context["cat_selected"], 0);
        assert_eq!(context["posts"], Value::Array(vec![]));
        assert_eq!(context["menu"].as_array().unwrap().len(), 2);
        assert_eq!(context["cats"][0]["slug"], "actresses");
        assert!(context["user"].is_null());
    }

    #[tokio::test]
    async fn caller_selected_category_is_kept() {
        let (pool, _dir) = test_pool().await;
        let cache = CategoryCache::new(Duration::from_secs(60));
        let mut extra = Context::new();
        extra.insert("cat_selected".to_owned(), Value::from(4));
        let context = build_context(&pool, &cache, &signed_in(), "Category", extra)
            .await
            .unwrap();
        assert_eq!(context["cat_selected"], 4);
        assert_eq!(context["menu"].as_array().unwrap().len(), 3);
        assert_eq!(context["user"]["username"], "anna");
    }

    #[tokio::test]
    async fn category_counts_are_stale_within_ttl() {
        let (pool, _dir) = test_pool().await;
        let cat = category(&pool, "Actresses", "actresses").await;
        let cache = CategoryCache::new(Duration::from_secs(60));

        let first = build_context(&pool, &cache, &anonymous(), "Home", Context::new())
            .await
            .unwrap();
        create_article_in_db(&pool, new_article("new", cat.id, true))
            .await
            .unwrap();
        let second = build_context(&pool, &cache, &anonymous(), "Home", Context::new())
            .await
            .unwrap();

        assert_eq!(first["cats"], second["cats"]);
        assert_eq!(second["cats"][0]["total"], 0);

        let fresh = CategoryCache::new(Duration::from_secs(60));
        let third = build_context(&pool, &fresh, &anonymous(), "Home", Context::new())
            .await
            .unwrap();
        assert_eq!(third["cats"][0]["total"], 1);
    }
}

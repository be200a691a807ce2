use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, Query},
    response::{IntoResponse, Redirect},
    Extension,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    authentication::MaybeUser,
    context::{build_context, to_value, Context, MENU},
    db_helpers::{
        count_articles_in_db, create_article_in_db, get_article_by_slug_in_db,
        list_articles_in_db, list_categories_in_db, ArticleScope,
    },
    errors::RequestError,
    forms::{
        AddArticleForm, CleanedArticle, Form, FormErrors, CATEGORY_CHOICE_MESSAGE,
        DUPLICATE_SLUG_MESSAGE, PHOTO_MAX_BYTES,
    },
    media::{remove_photo, store_photo},
    models::Article,
    pagination::{Page, Paginator},
    AppState,
};

use super::{form_context, invalid_form, HtmlResult, PageResult};

pub const PAGINATE_BY: i64 = 3;
pub const ACCESS_DENIED_REDIRECT: &str = "/?denied=1";
/// Request body limit for the article form: room for a full-size photo plus the text fields.
pub const UPLOAD_BODY_LIMIT: usize = 2 * PHOTO_MAX_BYTES;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    page: Option<String>,
    denied: Option<String>,
}

#[derive(Serialize)]
struct PageOfArticles<'a> {
    #[serde(flatten)]
    page: &'a Page,
    object_list: &'a [Article],
}

// ----------------- Article Handlers -----------------
pub async fn home(
    Extension(state): Extension<AppState>,
    user: MaybeUser,
    Query(query): Query<ListQuery>,
) -> HtmlResult {
    let scope = ArticleScope::Published;
    let count = count_articles_in_db(&state.pool, scope).await?;
    let page = Paginator::new(count, PAGINATE_BY).page(query.page.as_deref())?;
    let posts = list_articles_in_db(&state.pool, scope, page.limit, page.offset).await?;

    let mut extra = Context::new();
    extra.insert("posts".to_owned(), to_value(&posts)?);
    extra.insert("page_obj".to_owned(), to_value(&page)?);
    extra.insert("denied".to_owned(), Value::Bool(query.denied.is_some()));
    let context = build_context(&state.pool, &state.categories, &user, "Home page", extra).await?;
    state.templates.render("index.html", context)
}

pub async fn show_category(
    Extension(state): Extension<AppState>,
    user: MaybeUser,
    Path(cat_slug): Path<String>,
    Query(query): Query<ListQuery>,
) -> HtmlResult {
    let scope = ArticleScope::PublishedInCategory(&cat_slug);
    let count = count_articles_in_db(&state.pool, scope).await?;
    // An empty category is a missing page, not an empty list.
    if count == 0 {
        return Err(RequestError::NotFound);
    }
    let page = Paginator::new(count, PAGINATE_BY).page(query.page.as_deref())?;
    let posts = list_articles_in_db(&state.pool, scope, page.limit, page.offset).await?;
    let (cat_id, title) = match posts.first() {
        Some(post) => (post.cat_id, format!("Category - {}", post.cat_name)),
        None => return Err(RequestError::NotFound),
    };

    let mut extra = Context::new();
    extra.insert("posts".to_owned(), to_value(&posts)?);
    extra.insert("page_obj".to_owned(), to_value(&page)?);
    extra.insert("cat_selected".to_owned(), Value::from(cat_id));
    let context = build_context(&state.pool, &state.categories, &user, title, extra).await?;
    state.templates.render("index.html", context)
}

pub async fn show_post(
    Extension(state): Extension<AppState>,
    user: MaybeUser,
    Path(post_slug): Path<String>,
) -> HtmlResult {
    let post = get_article_by_slug_in_db(&state.pool, &post_slug)
        .await?
        .ok_or(RequestError::NotFound)?;

    let title = post.title.clone();
    let mut extra = Context::new();
    extra.insert("post".to_owned(), to_value(&post)?);
    let context = build_context(&state.pool, &state.categories, &user, title, extra).await?;
    state.templates.render("post.html", context)
}

/// Every article, published or not, with forgiving page numbers.
pub async fn about(
    Extension(state): Extension<AppState>,
    Query(query): Query<ListQuery>,
) -> HtmlResult {
    let count = count_articles_in_db(&state.pool, ArticleScope::All).await?;
    let page = Paginator::new(count, PAGINATE_BY).get_page(query.page.as_deref());
    let articles =
        list_articles_in_db(&state.pool, ArticleScope::All, page.limit, page.offset).await?;

    let mut context = Context::new();
    context.insert(
        "page_obj".to_owned(),
        to_value(&PageOfArticles {
            page: &page,
            object_list: &articles,
        })?,
    );
    context.insert("menu".to_owned(), to_value(&MENU)?);
    context.insert("title".to_owned(), Value::from("About site"));
    state.templates.render("about.html", context)
}

async fn render_add_page(
    state: &AppState,
    user: &MaybeUser,
    form: &AddArticleForm,
    errors: &FormErrors,
) -> HtmlResult {
    let mut extra = form_context(form, errors)?;
    let categories = list_categories_in_db(&state.pool).await?;
    extra.insert("categories".to_owned(), to_value(&categories)?);
    let context = build_context(&state.pool, &state.categories, user, "Add article", extra).await?;
    state.templates.render("addpage.html", context)
}

pub async fn add_page_form(Extension(state): Extension<AppState>, user: MaybeUser) -> PageResult {
    if !user.is_authenticated() {
        return Ok(Redirect::to(ACCESS_DENIED_REDIRECT).into_response());
    }
    let page = render_add_page(&state, &user, &AddArticleForm::initial(), &FormErrors::new()).await?;
    Ok(page.into_response())
}

pub async fn add_page(
    Extension(state): Extension<AppState>,
    user: MaybeUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> PageResult {
    if !user.is_authenticated() {
        return Ok(Redirect::to(ACCESS_DENIED_REDIRECT).into_response());
    }
    let multipart = multipart.map_err(|_| RequestError::RunTimeError("Malformed form data"))?;
    let form = AddArticleForm::from_multipart(multipart).await?;
    let cleaned = match form.validate() {
        Ok(cleaned) => cleaned,
        Err(errors) => {
            let page = render_add_page(&state, &user, &form, &errors).await?;
            return Ok(invalid_form(page));
        }
    };

    match save_article(&state, cleaned).await? {
        Ok(article) => {
            tracing::info!(slug = %article.slug, user = ?user.get_id(), "article created");
            Ok(Redirect::to("/").into_response())
        }
        Err(errors) => {
            let page = render_add_page(&state, &user, &form, &errors).await?;
            Ok(invalid_form(page))
        }
    }
}

/// Stores the photo and inserts the article. Constraint violations come back as
/// form errors; the stored photo is removed again when the insert fails.
async fn save_article(
    state: &AppState,
    CleanedArticle { mut article, photo }: CleanedArticle,
) -> Result<Result<Article, FormErrors>, RequestError> {
    let media_root = state.config.media_root.as_path();
    if let Some(photo) = &photo {
        article.photo = Some(store_photo(media_root, photo, Utc::now()).await?);
    }
    let stored_photo = article.photo.clone();

    match create_article_in_db(&state.pool, article).await {
        Ok(article) => Ok(Ok(article)),
        Err(e) => {
            if let Some(path) = &stored_photo {
                remove_photo(media_root, path).await;
            }
            if e.is_unique_violation() {
                Ok(Err(FormErrors::single("slug", DUPLICATE_SLUG_MESSAGE)))
            } else if e.is_foreign_key_violation() {
                Ok(Err(FormErrors::single("cat", CATEGORY_CHOICE_MESSAGE)))
            } else {
                Err(e)
            }
        }
    }
}

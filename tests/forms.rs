mod common;

use chrono::Utc;
use common::{location, spawn_app, TestApp, PASSWORD};
use reqwest::{multipart, StatusCode};
use women::{count_articles_in_db, get_article_by_slug_in_db, ArticleScope};

fn article_form(title: &str, slug: &str, cat_id: i64) -> multipart::Form {
    multipart::Form::new()
        .text("title", title.to_owned())
        .text("slug", slug.to_owned())
        .text("content", "Some text")
        .text("is_published", "on")
        .text("cat", cat_id.to_string())
}

async fn article_count(app: &TestApp) -> i64 {
    count_articles_in_db(&app.state.pool, ArticleScope::All)
        .await
        .unwrap()
}

#[tokio::test]
async fn anonymous_visitor_cannot_add_articles() {
    let app = spawn_app().await;
    let cat = app.category("Singers", "singers").await;

    let response = app.get("/addpage/").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/?denied=1");

    let response = app
        .post_multipart("/addpage/", article_form("Sneaky", "sneaky", cat.id))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/?denied=1");

    let response = app.post_form("/addpage/", &[("title", "Sneaky")]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(article_count(&app).await, 0);
}

#[tokio::test]
async fn title_of_200_characters_is_saved() {
    let app = spawn_app().await;
    let cat = app.category("Singers", "singers").await;
    app.sign_up("anna").await;

    let form_page = app.get("/addpage/").await;
    assert_eq!(form_page.status(), StatusCode::OK);
    assert!(form_page.text().await.unwrap().contains("Category not selected"));

    let title = "a".repeat(200);
    let response = app
        .post_multipart("/addpage/", article_form(&title, "long-title", cat.id))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let saved = get_article_by_slug_in_db(&app.state.pool, "long-title")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(saved.title, title);
    assert!(saved.is_published);
    assert_eq!(saved.cat_id, cat.id);
    assert_eq!(saved.time_create, saved.time_update);
}

#[tokio::test]
async fn title_of_201_characters_is_rejected() {
    let app = spawn_app().await;
    let cat = app.category("Singers", "singers").await;
    app.sign_up("anna").await;

    let response = app
        .post_multipart("/addpage/", article_form(&"a".repeat(201), "too-long", cat.id))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = response.text().await.unwrap();
    assert!(body.contains("Length exceeds 200 characters"));
    // The submitted values are shown again.
    assert!(body.contains(r#"value="too-long""#));
    assert_eq!(article_count(&app).await, 0);
}

#[tokio::test]
async fn duplicate_slug_and_unknown_category_are_field_errors() {
    let app = spawn_app().await;
    let cat = app.category("Singers", "singers").await;
    app.article("Existing", "taken", cat.id, true).await;
    app.sign_up("anna").await;

    let response = app
        .post_multipart("/addpage/", article_form("Another", "taken", cat.id))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response
        .text()
        .await
        .unwrap()
        .contains("Article with this URL already exists."));

    let response = app
        .post_multipart("/addpage/", article_form("Another", "another", cat.id + 100))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response
        .text()
        .await
        .unwrap()
        .contains("Select a valid choice."));
    assert_eq!(article_count(&app).await, 1);
}

#[tokio::test]
async fn unchecked_box_saves_draft_and_blank_slug_is_derived() {
    let app = spawn_app().await;
    let cat = app.category("Singers", "singers").await;
    app.sign_up("anna").await;

    let form = multipart::Form::new()
        .text("title", "Ada Lovelace")
        .text("slug", "")
        .text("content", "")
        .text("cat", cat.id.to_string());
    let response = app.post_multipart("/addpage/", form).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let saved = get_article_by_slug_in_db(&app.state.pool, "ada-lovelace")
        .await
        .unwrap()
        .unwrap();
    assert!(!saved.is_published);
    let home = app.get("/").await.text().await.unwrap();
    assert!(!home.contains("Ada Lovelace"));
}

#[tokio::test]
async fn photo_is_stored_in_dated_directory() {
    let app = spawn_app().await;
    let cat = app.category("Singers", "singers").await;
    app.sign_up("anna").await;

    let photo = multipart::Part::bytes(b"\x89PNG\r\n\x1a\nimage-bytes".to_vec())
        .file_name("portrait.png")
        .mime_str("image/png")
        .unwrap();
    let form = article_form("With photo", "with-photo", cat.id).part("photo", photo);
    let response = app.post_multipart("/addpage/", form).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let saved = get_article_by_slug_in_db(&app.state.pool, "with-photo")
        .await
        .unwrap()
        .unwrap();
    let photo = saved.photo.unwrap();
    let expected_directory = Utc::now().format("photo/%Y/%m/%d/").to_string();
    assert!(photo.starts_with(&expected_directory), "{}", photo);
    assert!(app.dir.path().join("media").join(&photo).exists());
}

fn png_of_size(size: usize) -> multipart::Part {
    let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
    bytes.resize(size, 0);
    multipart::Part::bytes(bytes)
        .file_name("large.png")
        .mime_str("image/png")
        .unwrap()
}

#[tokio::test]
async fn photo_larger_than_two_megabytes_is_accepted() {
    let app = spawn_app().await;
    let cat = app.category("Singers", "singers").await;
    app.sign_up("anna").await;

    let form = article_form("Big photo", "big-photo", cat.id)
        .part("photo", png_of_size(3 * 1024 * 1024));
    let response = app.post_multipart("/addpage/", form).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let saved = get_article_by_slug_in_db(&app.state.pool, "big-photo")
        .await
        .unwrap()
        .unwrap();
    let stored = app.dir.path().join("media").join(saved.photo.unwrap());
    assert_eq!(std::fs::metadata(stored).unwrap().len(), 3 * 1024 * 1024);
}

#[tokio::test]
async fn oversized_photo_is_a_field_error() {
    let app = spawn_app().await;
    let cat = app.category("Singers", "singers").await;
    app.sign_up("anna").await;

    let form = article_form("Huge photo", "huge-photo", cat.id)
        .part("photo", png_of_size(9 * 1024 * 1024));
    let response = app.post_multipart("/addpage/", form).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = response.text().await.unwrap();
    assert!(body.contains("The file is too large."));
    assert!(body.contains(r#"value="huge-photo""#));
    assert_eq!(article_count(&app).await, 0);
}

#[tokio::test]
async fn non_image_upload_is_rejected() {
    let app = spawn_app().await;
    let cat = app.category("Singers", "singers").await;
    app.sign_up("anna").await;

    let photo = multipart::Part::bytes(b"plain text".to_vec()).file_name("notes.txt");
    let form = article_form("With text", "with-text", cat.id).part("photo", photo);
    let response = app.post_multipart("/addpage/", form).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.text().await.unwrap().contains("Upload a valid image."));
    assert_eq!(article_count(&app).await, 0);
}

#[tokio::test]
async fn registration_errors_are_shown_inline() {
    let app = spawn_app().await;
    let response = app
        .post_form(
            "/register/",
            &[
                ("username", "anna"),
                ("email", "not-an-email"),
                ("password1", PASSWORD),
                ("password2", "something-else"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.headers().get(reqwest::header::SET_COOKIE).is_none());
    let body = response.text().await.unwrap();
    assert!(body.contains("Enter a valid email address."));
    assert!(body.contains("The two password fields didn"));
    assert!(!body.contains(PASSWORD));

    app.sign_up("anna").await;
    app.get("/logout/").await;
    let response = app
        .post_form(
            "/register/",
            &[
                ("username", "anna"),
                ("email", "anna@example.com"),
                ("password1", PASSWORD),
                ("password2", PASSWORD),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response
        .text()
        .await
        .unwrap()
        .contains("A user with that username already exists."));
}

#[tokio::test]
async fn login_and_logout_cycle() {
    let app = spawn_app().await;
    app.sign_up("anna").await;

    let response = app.get("/logout/").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login/");
    assert_eq!(app.get("/addpage/").await.status(), StatusCode::SEE_OTHER);

    let response = app
        .post_form("/login/", &[("username", "anna"), ("password", "wrong-password")])
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response
        .text()
        .await
        .unwrap()
        .contains("Please enter a correct username and password."));

    let response = app
        .post_form("/login/", &[("username", "anna"), ("password", PASSWORD)])
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    assert_eq!(app.get("/addpage/").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn contact_form_checks_the_captcha() {
    let app = spawn_app().await;

    let page = app.get("/contact/").await;
    assert_eq!(page.status(), StatusCode::OK);
    assert!(page.text().await.unwrap().contains(r#"name="captcha_key""#));

    app.state
        .captchas
        .insert("known-key".to_owned(), "WXYZ".to_owned())
        .await;
    let response = app
        .post_form(
            "/contact/",
            &[
                ("name", "Anna"),
                ("email", "anna@example.com"),
                ("content", "Hello there"),
                ("captcha", "wxyz"),
                ("captcha_key", "known-key"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    // The challenge was consumed by the first submission.
    let response = app
        .post_form(
            "/contact/",
            &[
                ("name", "Anna"),
                ("email", "anna@example.com"),
                ("content", "Hello again"),
                ("captcha", "wxyz"),
                ("captcha_key", "known-key"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = response.text().await.unwrap();
    assert!(body.contains("Invalid CAPTCHA"));
    assert!(body.contains("Hello again"));
}

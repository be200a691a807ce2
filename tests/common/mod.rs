#![allow(dead_code)]

use std::{net::SocketAddr, time::Duration};

use reqwest::{redirect::Policy, Client, Response, StatusCode};
use tempfile::TempDir;
use women::{
    create_article_in_db, get_random_free_port, insert_category, make_router, run_app, AppState,
    Category, Config, NewArticle,
};

pub const PASSWORD: &str = "str0ng-passw0rd";

pub struct TestApp {
    pub address: SocketAddr,
    pub client: Client,
    pub state: AppState,
    pub dir: TempDir,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.address, path)
    }

    pub async fn get(&self, path: &str) -> Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    pub async fn post_form(&self, path: &str, fields: &[(&str, &str)]) -> Response {
        self.client
            .post(self.url(path))
            .form(fields)
            .send()
            .await
            .unwrap()
    }

    pub async fn post_multipart(&self, path: &str, form: reqwest::multipart::Form) -> Response {
        self.client
            .post(self.url(path))
            .multipart(form)
            .send()
            .await
            .unwrap()
    }

    pub async fn category(&self, name: &str, slug: &str) -> Category {
        insert_category(&self.state.pool, name, slug).await.unwrap()
    }

    pub async fn article(&self, title: &str, slug: &str, cat_id: i64, is_published: bool) {
        let article = NewArticle {
            title: title.to_owned(),
            slug: slug.to_owned(),
            content: format!("About {}", title),
            photo: None,
            is_published,
            cat_id,
        };
        create_article_in_db(&self.state.pool, article).await.unwrap();
    }

    /// Registers `username` through the site; the client keeps the session cookie.
    pub async fn sign_up(&self, username: &str) {
        let email = format!("{}@example.com", username);
        let response = self
            .post_form(
                "/register/",
                &[
                    ("username", username),
                    ("email", email.as_str()),
                    ("password1", PASSWORD),
                    ("password2", PASSWORD),
                ],
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");
    }
}

pub fn location(response: &Response) -> &str {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

pub async fn spawn_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let database_url = format!("sqlite://{}", dir.path().join("women.db").display());
    let mut config = Config::new(database_url, "test-secret");
    config.media_root = dir.path().join("media");
    let state = AppState::new(config).await.unwrap();

    let (_, address) = get_random_free_port();
    tokio::spawn(run_app(make_router(), state.clone(), address));

    let client = Client::builder()
        .cookie_store(true)
        .redirect(Policy::none())
        .build()
        .unwrap();
    let health = format!("http://{}/check_health", address);
    for _ in 0..100 {
        if client.get(&health).send().await.is_ok() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    TestApp {
        address,
        client,
        state,
        dir,
    }
}

use std::{future::Future, sync::Arc, time::Duration};

use moka::future::Cache;
use rand::{distributions::Uniform, Rng};

use crate::{errors::RequestError, models::CategoryCount};

const CATEGORIES_KEY: &str = "cats";
const CAPTCHA_TTL: Duration = Duration::from_secs(5 * 60);
const CAPTCHA_CAPACITY: u64 = 10_000;
const CAPTCHA_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ";
const CAPTCHA_LENGTH: usize = 4;
const CAPTCHA_KEY_LENGTH: usize = 32;

/// Lookaside cache for the annotated category list shown on every page.
///
/// Entries expire after a fixed time-to-live; nothing invalidates them early, so
/// pages may show stale counts until then. Concurrent misses may each recompute
/// and store the list, which is harmless.
#[derive(Clone)]
pub struct CategoryCache {
    inner: Cache<&'static str, Arc<Vec<CategoryCount>>>,
}

impl CategoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Cache::builder().max_capacity(1).time_to_live(ttl).build(),
        }
    }

    /// Returns the cached list or runs `load` and stores its result.
    pub async fn get_or_load<F, Fut>(&self, load: F) -> Result<Arc<Vec<CategoryCount>>, RequestError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<CategoryCount>, RequestError>>,
    {
        if let Some(cats) = self.inner.get(CATEGORIES_KEY).await {
            return Ok(cats);
        }
        tracing::debug!("category cache miss");
        let cats = Arc::new(load().await?);
        self.inner.insert(CATEGORIES_KEY, cats.clone()).await;
        Ok(cats)
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Challenge {
    pub key: String,
    pub text: String,
}

/// Short-lived human-verification challenges for the contact form.
#[derive(Clone)]
pub struct CaptchaStore {
    inner: Cache<String, String>,
}

impl Default for CaptchaStore {
    fn default() -> Self {
        Self::new(CAPTCHA_TTL)
    }
}

impl CaptchaStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(CAPTCHA_CAPACITY)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn issue(&self) -> Challenge {
        // ThreadRng is not Send, so it must be gone before the await below.
        let (key, text) = {
            let mut rng = rand::thread_rng();
            let key: String = (&mut rng)
                .sample_iter(rand::distributions::Alphanumeric)
                .take(CAPTCHA_KEY_LENGTH)
                .map(char::from)
                .collect();
            let letters = Uniform::from(0..CAPTCHA_ALPHABET.len());
            let text: String = (0..CAPTCHA_LENGTH)
                .map(|_| CAPTCHA_ALPHABET[rng.sample(letters)] as char)
                .collect();
            (key, text)
        };
        self.insert(key.clone(), text.clone()).await;
        Challenge { key, text }
    }

    pub async fn insert(&self, key: String, text: String) {
        self.inner.insert(key, text).await;
    }

    /// Checks an answer; a challenge can be answered only once, right or wrong.
    pub async fn verify(&self, key: &str, answer: &str) -> bool {
        match self.inner.remove(key).await {
            Some(text) => text.eq_ignore_ascii_case(answer.trim()),
            None => false,
        }
    }
}

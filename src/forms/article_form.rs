use axum::extract::{multipart::MultipartError, Multipart};
use serde::Serialize;

use crate::errors::RequestError;
use crate::models::{NewArticle, SLUG_MAX_LENGTH, TITLE_MAX_LENGTH};

use super::{max_length, required, Form, Validator};

pub const TITLE_FORM_LIMIT: usize = 200;
pub const TITLE_TOO_LONG_MESSAGE: &str = "Length exceeds 200 characters";
pub const SLUG_MESSAGE: &str =
    "Enter a valid slug consisting of letters, numbers, underscores or hyphens.";
pub const DUPLICATE_SLUG_MESSAGE: &str = "Article with this URL already exists.";
pub const CATEGORY_CHOICE_MESSAGE: &str =
    "Select a valid choice. That choice is not one of the available choices.";
pub const IMAGE_MESSAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

/// Largest photo accepted; the body limit on the upload route sits above it so
/// oversized photos reach the form and come back as a field error.
pub const PHOTO_MAX_BYTES: usize = 8 * 1024 * 1024;
pub const PHOTO_TOO_LARGE_MESSAGE: &str = "The file is too large. Upload an image of at most 8 MB.";

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp"];

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn extension(&self) -> Option<String> {
        std::path::Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
    }

    fn looks_like_image(&self) -> bool {
        let bytes = self.bytes.as_slice();
        bytes.starts_with(b"\x89PNG\r\n\x1a\n")
            || bytes.starts_with(b"\xff\xd8\xff")
            || bytes.starts_with(b"GIF87a")
            || bytes.starts_with(b"GIF89a")
            || bytes.starts_with(b"BM")
            || (bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP")
    }
}

/// The "add article" form as submitted (multipart, because of the photo).
#[derive(Debug, Clone, Default, Serialize)]
pub struct AddArticleForm {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub is_published: bool,
    pub cat: String,
    #[serde(skip)]
    pub photo: Option<UploadedFile>,
    /// The photo part could not be read in full, usually because of the body limit.
    #[serde(skip)]
    pub photo_truncated: bool,
}

#[derive(Debug, Clone)]
pub struct CleanedArticle {
    pub article: NewArticle,
    pub photo: Option<UploadedFile>,
}

impl AddArticleForm {
    /// A blank form, as first shown to the user.
    pub fn initial() -> Self {
        AddArticleForm {
            is_published: true,
            ..Default::default()
        }
    }

    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, RequestError> {
        let malformed = |_: MultipartError| RequestError::RunTimeError("Malformed form data");
        let mut form = AddArticleForm::default();
        while let Some(field) = multipart.next_field().await.map_err(malformed)? {
            let name = field.name().unwrap_or_default().to_owned();
            match name.as_str() {
                "photo" => {
                    let file_name = field.file_name().unwrap_or_default().to_owned();
                    let bytes = match field.bytes().await {
                        Ok(bytes) => bytes,
                        Err(e) => {
                            // Nothing after a cut-off part can be read.
                            tracing::debug!(error = %e, "photo upload was not received completely");
                            form.photo_truncated = true;
                            break;
                        }
                    };
                    // Browsers send an empty part when no file was chosen.
                    if !file_name.is_empty() || !bytes.is_empty() {
                        form.photo = Some(UploadedFile {
                            file_name,
                            bytes: bytes.to_vec(),
                        });
                    }
                }
                "title" => form.title = field.text().await.map_err(malformed)?,
                "slug" => form.slug = field.text().await.map_err(malformed)?,
                "content" => form.content = field.text().await.map_err(malformed)?,
                "cat" => form.cat = field.text().await.map_err(malformed)?,
                "is_published" => {
                    let value = field.text().await.map_err(malformed)?;
                    form.is_published = matches!(value.as_str(), "on" | "true" | "1");
                }
                _ => {}
            }
        }
        Ok(form)
    }

    /// The slug to store: the submitted one, or one derived from the title.
    pub fn effective_slug(&self) -> String {
        let slug = self.slug.trim();
        if slug.is_empty() {
            slug::slugify(self.title.trim())
        } else {
            slug.to_owned()
        }
    }
}

fn title_required(form: &AddArticleForm) -> Result<(), String> {
    required(&form.title)
}

fn title_model_length(form: &AddArticleForm) -> Result<(), String> {
    max_length(form.title.trim(), TITLE_MAX_LENGTH)
}

fn title_form_length(form: &AddArticleForm) -> Result<(), String> {
    if form.title.trim().chars().count() > TITLE_FORM_LIMIT {
        Err(TITLE_TOO_LONG_MESSAGE.to_owned())
    } else {
        Ok(())
    }
}

fn slug_required(form: &AddArticleForm) -> Result<(), String> {
    required(&form.effective_slug())
}

fn slug_characters(form: &AddArticleForm) -> Result<(), String> {
    let valid = form
        .effective_slug()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(SLUG_MESSAGE.to_owned())
    }
}

fn slug_length(form: &AddArticleForm) -> Result<(), String> {
    max_length(&form.effective_slug(), SLUG_MAX_LENGTH)
}

fn photo_size(form: &AddArticleForm) -> Result<(), String> {
    let too_large = form.photo_truncated
        || form
            .photo
            .as_ref()
            .map(|photo| photo.bytes.len() > PHOTO_MAX_BYTES)
            .unwrap_or(false);
    if too_large {
        Err(PHOTO_TOO_LARGE_MESSAGE.to_owned())
    } else {
        Ok(())
    }
}

fn photo_is_image(form: &AddArticleForm) -> Result<(), String> {
    match &form.photo {
        None => Ok(()),
        Some(photo) => {
            let known_extension = photo
                .extension()
                .map(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
                .unwrap_or(false);
            if known_extension && photo.looks_like_image() {
                Ok(())
            } else {
                Err(IMAGE_MESSAGE.to_owned())
            }
        }
    }
}

fn cat_required(form: &AddArticleForm) -> Result<(), String> {
    required(&form.cat)
}

fn cat_choice(form: &AddArticleForm) -> Result<(), String> {
    match form.cat.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(()),
        _ => Err(CATEGORY_CHOICE_MESSAGE.to_owned()),
    }
}

impl Form for AddArticleForm {
    type Cleaned = CleanedArticle;

    const VALIDATORS: &'static [(&'static str, Validator<Self>)] = &[
        ("title", title_required),
        ("title", title_model_length),
        ("title", title_form_length),
        ("slug", slug_required),
        ("slug", slug_characters),
        ("slug", slug_length),
        ("photo", photo_size),
        ("photo", photo_is_image),
        ("cat", cat_required),
        ("cat", cat_choice),
    ];

    fn cleaned(&self) -> CleanedArticle {
        CleanedArticle {
            article: NewArticle {
                title: self.title.trim().to_owned(),
                slug: self.effective_slug(),
                content: self.content.clone(),
                photo: None,
                is_published: self.is_published,
                cat_id: self.cat.trim().parse().unwrap_or_default(),
            },
            photo: self.photo.clone(),
        }
    }
}

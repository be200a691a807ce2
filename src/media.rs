use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};

use crate::errors::RequestError;
use crate::forms::UploadedFile;

const PHOTO_DIRECTORY: &str = "photo";
const MAX_FILE_STEM: usize = 80;

/// Keeps the base name only and replaces anything outside `[-_.a-zA-Z0-9]`.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_owned();
    if cleaned.is_empty() {
        String::from("upload")
    } else {
        cleaned
    }
}

/// Directory for uploads made at `now`, relative to the media root.
pub fn photo_directory(now: DateTime<Utc>) -> PathBuf {
    Path::new(PHOTO_DIRECTORY).join(now.format("%Y/%m/%d").to_string())
}

/// Writes the photo under the media root and returns its relative path, the
/// value stored on the article. An existing file is never overwritten.
pub async fn store_photo(
    media_root: &Path,
    photo: &UploadedFile,
    now: DateTime<Utc>,
) -> Result<String, RequestError> {
    let directory = photo_directory(now);
    tokio::fs::create_dir_all(media_root.join(&directory)).await?;

    let name = sanitize_file_name(&photo.file_name);
    let (stem, extension) = match name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => (stem.to_owned(), format!(".{}", extension)),
        _ => (name.clone(), String::new()),
    };
    let stem: String = stem.chars().take(MAX_FILE_STEM).collect();

    let mut candidate = format!("{}{}", stem, extension);
    loop {
        let relative = directory.join(&candidate);
        let file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(media_root.join(&relative))
            .await;
        match file {
            Ok(mut file) => {
                tokio::io::AsyncWriteExt::write_all(&mut file, &photo.bytes).await?;
                return Ok(relative.to_string_lossy().replace('\\', "/"));
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                let suffix: String = rand::thread_rng()
                    .sample_iter(Alphanumeric)
                    .take(7)
                    .map(char::from)
                    .collect();
                candidate = format!("{}_{}{}", stem, suffix, extension);
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Best-effort cleanup of a stored photo whose article was not saved.
pub async fn remove_photo(media_root: &Path, relative: &str) {
    if let Err(e) = tokio::fs::remove_file(media_root.join(relative)).await {
        tracing::warn!(path = relative, error = %e, "failed to remove orphaned upload");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn file_names_are_flattened() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\photos\\my pic.png"), "my_pic.png");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
        assert_eq!(sanitize_file_name(""), "upload");
    }

    #[test]
    fn directory_is_date_partitioned() {
        let now = Utc.with_ymd_and_hms(2023, 4, 9, 12, 0, 0).unwrap();
        assert_eq!(photo_directory(now), PathBuf::from("photo/2023/04/09"));
    }

    #[tokio::test]
    async fn clashing_names_get_a_suffix() {
        let root = tempfile::tempdir().unwrap();
        let now = Utc.with_ymd_and_hms(2023, 4, 9, 12, 0, 0).unwrap();
        let photo = UploadedFile {
            file_name: "face.png".to_owned(),
            bytes: b"\x89PNG\r\n\x1a\n".to_vec(),
        };
        let first = store_photo(root.path(), &photo, now).await.unwrap();
        let second = store_photo(root.path(), &photo, now).await.unwrap();
        assert_eq!(first, "photo/2023/04/09/face.png");
        assert_ne!(first, second);
        assert!(second.starts_with("photo/2023/04/09/face_"));
        assert!(second.ends_with(".png"));
        assert!(root.path().join(&second).exists());

        remove_photo(root.path(), &second).await;
        assert!(!root.path().join(&second).exists());
    }
}

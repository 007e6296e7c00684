use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use crate::gemini::InlineData;

/// Mime type for an image file, judged by its extension
pub fn image_mime_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}

/// Normalise a path the terminal pasted for a drag-and-drop: quotes,
/// `file://` prefixes and backslash-escaped spaces are removed.
pub fn parse_dropped_path(raw: &str) -> PathBuf {
    let mut s = raw.trim();
    for quote in ['\'', '"'] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            s = &s[1..s.len() - 1];
        }
    }
    let s = s.strip_prefix("file://").unwrap_or(s);
    PathBuf::from(s.replace("\\ ", " ").replace("%20", " "))
}

/// An image chosen for an image search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    pub path: PathBuf,
    pub mime_type: String,
    pub size: u64,
}

impl ImageAttachment {
    /// Accept `path` only if it names an existing image file
    pub fn from_path(path: &Path) -> Result<Self> {
        let mime_type = image_mime_type(path)
            .ok_or_else(|| anyhow!("Not an image file: {}", path.display()))?;
        let metadata = std::fs::metadata(path)
            .map_err(|e| anyhow!("Cannot open {}: {}", path.display(), e))?;
        if !metadata.is_file() {
            return Err(anyhow!("Not a file: {}", path.display()));
        }

        Ok(Self {
            path: path.to_path_buf(),
            mime_type: mime_type.to_string(),
            size: metadata.len(),
        })
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    pub fn size_label(&self) -> String {
        if self.size >= 1024 * 1024 {
            format!("{:.1} MB", self.size as f64 / (1024.0 * 1024.0))
        } else if self.size >= 1024 {
            format!("{:.1} KB", self.size as f64 / 1024.0)
        } else {
            format!("{} B", self.size)
        }
    }

    /// Read the file and encode it as base64 inline data
    pub async fn to_inline_data(&self) -> Result<InlineData> {
        let bytes = tokio::fs::read(&self.path).await?;
        Ok(InlineData {
            mime_type: self.mime_type.clone(),
            data: BASE64.encode(bytes),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_image_mime_type_by_extension() {
        assert_eq!(image_mime_type(Path::new("a/b.PNG")), Some("image/png"));
        assert_eq!(image_mime_type(Path::new("photo.jpeg")), Some("image/jpeg"));
        assert_eq!(image_mime_type(Path::new("notes.txt")), None);
        assert_eq!(image_mime_type(Path::new("no_extension")), None);
    }

    #[test]
    fn test_parse_dropped_path_variants() {
        assert_eq!(parse_dropped_path("  '/tmp/my pic.png' "), PathBuf::from("/tmp/my pic.png"));
        assert_eq!(parse_dropped_path("\"/tmp/a.png\""), PathBuf::from("/tmp/a.png"));
        assert_eq!(parse_dropped_path("file:///tmp/my%20pic.png"), PathBuf::from("/tmp/my pic.png"));
        assert_eq!(parse_dropped_path("/tmp/my\\ pic.png\n"), PathBuf::from("/tmp/my pic.png"));
    }

    #[test]
    fn test_from_path_rejects_non_images_and_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let text = dir.path().join("notes.txt");
        std::fs::write(&text, "hi").unwrap();
        assert!(ImageAttachment::from_path(&text).is_err());
        assert!(ImageAttachment::from_path(&dir.path().join("missing.png")).is_err());
    }

    #[tokio::test]
    async fn test_inline_data_is_base64() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixel.png");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"hello").unwrap();

        let attachment = ImageAttachment::from_path(&path).unwrap();
        assert_eq!(attachment.size, 5);
        assert_eq!(attachment.file_name(), "pixel.png");
        assert_eq!(attachment.size_label(), "5 B");

        let inline = attachment.to_inline_data().await.unwrap();
        assert_eq!(inline.mime_type, "image/png");
        assert_eq!(inline.data, "aGVsbG8=");
    }
}

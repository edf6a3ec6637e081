//! Page crops of panel screenshots and the collaborators that produce and
//! host them. Sync plans windows and hashes content, then asks a
//! [`PanelImageSource`] for the crops. [`FileImageSource`] decodes local PNG
//! and JPEG screenshots and re-encodes each crop as PNG.

use std::{
    io::{Cursor, ErrorKind},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use image::ImageFormat;
use sha2::{Digest, Sha256};
use tokio::{fs, task};
use tracing::{debug, warn};

use crate::models::Item;

#[derive(Debug, Clone)]
pub struct PanelImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page_number: u32,
    pub top: u32,
    pub height: u32,
}

#[async_trait]
pub trait PanelImageSource: Send + Sync {
    /// `None` when the panel has no screenshot.
    async fn load(&self, panel: &Item) -> Result<Option<PanelImage>>;

    async fn crop(&self, image: &PanelImage, window: &PageWindow) -> Result<Vec<u8>>;
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Stores the bytes and returns a URL for them.
    async fn upload(&self, bytes: Vec<u8>, file_name: &str) -> Result<String>;
}

/// Image source for deployments without screenshot access; no pages are
/// produced.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPanelImages;

#[async_trait]
impl PanelImageSource for NoPanelImages {
    async fn load(&self, _panel: &Item) -> Result<Option<PanelImage>> {
        Ok(None)
    }

    async fn crop(&self, _image: &PanelImage, _window: &PageWindow) -> Result<Vec<u8>> {
        anyhow::bail!("no panel image source configured")
    }
}

/// Reads panel screenshots from local files named by `image_url`. Relative
/// paths resolve against `root`; remote URLs are ignored.
#[derive(Debug, Clone)]
pub struct FileImageSource {
    root: PathBuf,
}

impl FileImageSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, url: &str) -> Option<PathBuf> {
        let raw = url.strip_prefix("file://").unwrap_or(url);
        if raw.contains("://") {
            return None;
        }
        let path = Path::new(raw);
        Some(if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        })
    }
}

#[async_trait]
impl PanelImageSource for FileImageSource {
    async fn load(&self, panel: &Item) -> Result<Option<PanelImage>> {
        let Some(url) = panel.image_url.as_deref().filter(|u| !u.is_empty()) else {
            return Ok(None);
        };
        let Some(path) = self.resolve(url) else {
            debug!(panel = %panel.item_id, url, "Panel image is not a local file");
            return Ok(None);
        };
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                warn!(panel = %panel.item_id, path = %path.display(), "Panel image is missing");
                return Ok(None);
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("Failed to read panel image {}", path.display()))
            }
        };

        let encoded = bytes.clone();
        let (width, height) = task::spawn_blocking(move || -> Result<(u32, u32)> {
            let decoded = image::load_from_memory(&encoded)?;
            Ok((decoded.width(), decoded.height()))
        })
        .await??;
        Ok(Some(PanelImage {
            bytes,
            width,
            height,
        }))
    }

    async fn crop(&self, shot: &PanelImage, window: &PageWindow) -> Result<Vec<u8>> {
        let bytes = shot.bytes.clone();
        let width = shot.width;
        let window = *window;
        task::spawn_blocking(move || -> Result<Vec<u8>> {
            let decoded = image::load_from_memory(&bytes)?;
            let page = decoded.crop_imm(0, window.top, width, window.height);
            let mut out = Cursor::new(Vec::new());
            page.write_to(&mut out, ImageFormat::Png)?;
            Ok(out.into_inner())
        })
        .await?
    }
}

/// Media store writing content-addressed files under a local directory.
#[derive(Debug, Clone)]
pub struct DirectoryMediaStore {
    root: PathBuf,
}

impl DirectoryMediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl MediaStore for DirectoryMediaStore {
    async fn upload(&self, bytes: Vec<u8>, file_name: &str) -> Result<String> {
        let dir = self.root.join(&content_hash(&bytes)[..16]);
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create media directory {}", dir.display()))?;
        let path = dir.join(file_name);
        fs::write(&path, &bytes)
            .await
            .with_context(|| format!("Failed to write media file {}", path.display()))?;
        Ok(format!("file://{}", path.display()))
    }
}

pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Fixed-height windows from the top of the image, at most `max_pages`.
/// The last window is clipped to the image.
pub fn plan_pages(image_height: u32, page_height: u32, max_pages: usize) -> Vec<PageWindow> {
    if image_height == 0 || page_height == 0 {
        return Vec::new();
    }
    let count = image_height.div_ceil(page_height) as usize;
    (0..count.min(max_pages))
        .map(|idx| {
            let top = idx as u32 * page_height;
            PageWindow {
                page_number: idx as u32 + 1,
                top,
                height: page_height.min(image_height - top),
            }
        })
        .collect()
}

pub fn page_file_name(panel_code: &str, page_number: u32) -> String {
    let safe: String = panel_code
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("{safe}-page-{page_number}.png")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_cover_image_and_respect_cap() {
        let pages = plan_pages(2500, 1000, 10);
        assert_eq!(
            pages,
            vec![
                PageWindow { page_number: 1, top: 0, height: 1000 },
                PageWindow { page_number: 2, top: 1000, height: 1000 },
                PageWindow { page_number: 3, top: 2000, height: 500 },
            ]
        );
        assert_eq!(plan_pages(9000, 1000, 4).len(), 4);
        assert!(plan_pages(0, 1000, 4).is_empty());
    }

    #[test]
    fn content_hash_is_stable_hex() {
        let a = content_hash(b"panel");
        assert_eq!(a, content_hash(b"panel"));
        assert_eq!(a.len(), 64);
        assert_ne!(a, content_hash(b"panel2"));
    }

    #[test]
    fn page_file_names_are_path_safe() {
        assert_eq!(page_file_name("ns_PANEL-home page", 2), "ns_PANEL-home_page-page-2.png");
    }

    #[tokio::test]
    async fn file_source_loads_and_crops_local_png() {
        let dir = tempfile::tempdir().expect("tempdir");
        image::RgbImage::new(12, 30)
            .save(dir.path().join("home.png"))
            .expect("write png");

        let source = FileImageSource::new(dir.path());
        let mut panel = Item::new("p1", crate::models::ItemCategory::Panel, "Home");
        panel.image_url = Some("home.png".to_string());

        let shot = source.load(&panel).await.expect("load").expect("image");
        assert_eq!((shot.width, shot.height), (12, 30));

        let window = plan_pages(shot.height, 20, 10)[1];
        let crop = source.crop(&shot, &window).await.expect("crop");
        let decoded = image::load_from_memory(&crop).expect("decode crop");
        assert_eq!((decoded.width(), decoded.height()), (12, 10));

        panel.image_url = Some("https://cdn.example/home.png".to_string());
        assert!(source.load(&panel).await.expect("load").is_none());
    }

    #[tokio::test]
    async fn directory_store_writes_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = DirectoryMediaStore::new(dir.path());
        let url = store.upload(b"png".to_vec(), "p.png").await.expect("upload");
        let path = url.strip_prefix("file://").expect("file url");
        assert_eq!(std::fs::read(path).expect("read"), b"png");
    }
}

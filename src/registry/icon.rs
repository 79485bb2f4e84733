//! Marker icon loading and the process-wide icon cache

use crate::{
    core::marker::{Marker, MarkerIcon},
    prelude::HashMap,
    runtime::lock,
    Result,
};
use async_trait::async_trait;
use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// A decoded RGBA icon, ready to hand to a native SDK
#[derive(Debug, Clone, PartialEq)]
pub struct IconImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Arc<Vec<u8>>,
}

impl IconImage {
    /// Decode PNG or JPEG bytes
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes)?.to_rgba8();
        Ok(Self {
            width: image.width(),
            height: image.height(),
            rgba: Arc::new(image.into_raw()),
        })
    }
}

/// Source of raw icon bytes
#[async_trait]
pub trait IconLoader: Send + Sync {
    /// Download a remote icon
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;

    /// Read a bundled resource by name
    async fn load_resource(&self, name: &str) -> Result<Vec<u8>>;

    /// Read an icon file from the device
    async fn load_file(&self, path: &Path) -> Result<Vec<u8>> {
        Ok(tokio::fs::read(path).await?)
    }
}

/// Loader used in production: `reqwest` for remote icons, the filesystem for
/// resources and files.
#[cfg(feature = "http-icons")]
#[derive(Debug, Clone)]
pub struct HttpIconLoader {
    client: reqwest::Client,
    resource_dir: PathBuf,
}

#[cfg(feature = "http-icons")]
impl HttpIconLoader {
    pub fn new(resource_dir: impl Into<PathBuf>) -> Self {
        Self {
            client: reqwest::Client::new(),
            resource_dir: resource_dir.into(),
        }
    }

    fn resource_path(&self, name: &str) -> PathBuf {
        let path = self.resource_dir.join(name);
        if path.extension().is_some() {
            path
        } else {
            path.with_extension("png")
        }
    }
}

#[cfg(feature = "http-icons")]
#[async_trait]
impl IconLoader for HttpIconLoader {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn load_resource(&self, name: &str) -> Result<Vec<u8>> {
        Ok(tokio::fs::read(self.resource_path(name)).await?)
    }
}

/// Remote icon URL to decoded image.
///
/// Entries are never evicted, so each URL is downloaded at most once for the
/// lifetime of the cache.
#[derive(Debug, Default)]
pub struct IconCache {
    entries: Mutex<HashMap<String, IconImage>>,
}

impl IconCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, url: &str) -> Option<IconImage> {
        lock(&self.entries).get(url).cloned()
    }

    pub fn insert(&self, url: String, image: IconImage) {
        lock(&self.entries).insert(url, image);
    }

    pub fn contains(&self, url: &str) -> bool {
        lock(&self.entries).contains_key(url)
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

async fn load_icon(loader: &dyn IconLoader, source: &MarkerIcon) -> Result<IconImage> {
    let bytes = match source {
        MarkerIcon::Url(url) => loader.fetch(url).await?,
        MarkerIcon::Resource(name) => loader.load_resource(name).await?,
        MarkerIcon::File(path) => loader.load_file(path).await?,
    };
    IconImage::decode(&bytes)
}

/// Resolve the icons of a whole marker batch.
///
/// Returns one entry per marker, in order. Every download and lookup of the
/// batch has finished when this returns. A marker whose icon cannot be loaded
/// gets `None` and is shown with the SDK's default icon.
pub async fn resolve_icons(
    markers: &[Marker],
    loader: &dyn IconLoader,
    cache: &IconCache,
) -> Vec<Option<IconImage>> {
    let sources: Vec<Option<MarkerIcon>> = markers.iter().map(Marker::icon_source).collect();

    let mut pending: Vec<&str> = Vec::new();
    for source in &sources {
        if let Some(MarkerIcon::Url(url)) = source {
            if !cache.contains(url) && !pending.contains(&url.as_str()) {
                pending.push(url);
            }
        }
    }

    let downloads = join_all(pending.iter().map(|url| async move {
        let result = load_icon(loader, &MarkerIcon::Url(url.to_string())).await;
        (*url, result)
    }));
    let locals = join_all(sources.iter().map(|source| async move {
        match source {
            Some(MarkerIcon::Url(_)) | None => None,
            Some(local) => Some(load_icon(loader, local).await),
        }
    }));
    let (downloads, locals) = futures::join!(downloads, locals);

    for (url, result) in downloads {
        match result {
            Ok(image) => cache.insert(url.to_string(), image),
            Err(e) => log::warn!("Failed to download marker icon {}: {}", url, e),
        }
    }

    sources
        .iter()
        .zip(locals)
        .map(|(source, local)| match (source, local) {
            (Some(MarkerIcon::Url(url)), _) => cache.get(url),
            (_, Some(Ok(image))) => Some(image),
            (Some(source), Some(Err(e))) => {
                log::warn!("Failed to load marker icon {:?}: {}", source, e);
                None
            }
            _ => None,
        })
        .collect()
}

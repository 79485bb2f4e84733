//! Offline region types shared by both platform adapters
//!
//! Regions are stored by the native SDK. This layer builds region
//! definitions, tags each region with a JSON metadata blob carrying its name,
//! and turns native status notifications into [`DownloadProgress`] values.

use crate::core::{geo::LatLngBounds, listener::Listener, style::MapStyle};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadOfflineRegionOptions {
    pub name: String,
    #[serde(default)]
    pub style: MapStyle,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub bounds: LatLngBounds,
    /// Falls back to the token of the last `show` when absent
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(skip)]
    pub on_progress: Option<Listener<DownloadProgress>>,
}

impl DownloadOfflineRegionOptions {
    pub fn new(name: impl Into<String>, bounds: LatLngBounds, min_zoom: f64, max_zoom: f64) -> Self {
        Self {
            name: name.into(),
            style: MapStyle::default(),
            min_zoom,
            max_zoom,
            bounds,
            access_token: None,
            on_progress: None,
        }
    }

    pub fn with_style(mut self, style: MapStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn on_progress(mut self, listener: impl Into<Listener<DownloadProgress>>) -> Self {
        self.on_progress = Some(listener.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOfflineRegionOptions {
    pub name: String,
}

impl DeleteOfflineRegionOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A region known to native offline storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfflineRegion {
    pub name: String,
    pub style: String,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub bounds: LatLngBounds,
}

/// Progress report handed to the download listener
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadProgress {
    pub name: String,
    pub completed: u64,
    pub expected: u64,
    /// Always within `[0, 100]` and never lower than a previous report
    pub percentage: f64,
    pub complete: bool,
    pub completed_size: u64,
}

/// Metadata blob stored with every region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionMetadata {
    pub name: String,
}

impl RegionMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn encode(&self) -> crate::Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Name stored in a metadata blob. Blobs written by other code decode to
    /// an empty name.
    pub fn decode_name(bytes: &[u8]) -> String {
        match serde_json::from_slice::<RegionMetadata>(bytes) {
            Ok(metadata) => metadata.name,
            Err(e) => {
                log::warn!("Unreadable offline region metadata: {}", e);
                String::new()
            }
        }
    }
}

/// Raw status numbers reported by a native SDK
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegionStatus {
    pub completed_count: u64,
    pub expected_count: u64,
    pub completed_size: u64,
    pub complete: bool,
}

/// Turns native status notifications into monotonic progress reports
#[derive(Debug)]
pub struct ProgressTracker {
    name: String,
    last_percentage: f64,
    completed: bool,
}

impl ProgressTracker {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            last_percentage: 0.0,
            completed: false,
        }
    }

    /// Record a status change. The flag is `true` only for the first
    /// notification that reports completion.
    pub fn observe(&mut self, status: RegionStatus) -> (DownloadProgress, bool) {
        let raw = if status.expected_count > 0 {
            100.0 * status.completed_count as f64 / status.expected_count as f64
        } else {
            0.0
        };
        let mut percentage = raw.clamp(0.0, 100.0).max(self.last_percentage);
        if status.complete {
            percentage = 100.0;
        }
        self.last_percentage = percentage;

        let first_completion = status.complete && !self.completed;
        self.completed |= status.complete;

        let progress = DownloadProgress {
            name: self.name.clone(),
            completed: status.completed_count,
            expected: status.expected_count,
            percentage,
            complete: status.complete,
            completed_size: status.completed_size,
        };
        (progress, first_completion)
    }
}

//! Offline regions on the Android SDK
//!
//! Each region gets its own observer. The observer reports every status
//! change to the caller and settles the download on the first completion.

use super::sdk::{
    AndroidMapSdk, AndroidOfflineManager, AndroidOfflineRegion, OfflineRegionDefinition,
    OfflineRegionObserver, OfflineRegionStatus,
};
use crate::{
    core::listener::Listener,
    offline::{
        DownloadOfflineRegionOptions, DownloadProgress, OfflineRegion, ProgressTracker,
        RegionMetadata, RegionStatus,
    },
    runtime::{completion, lock, Callback},
    MapError, Result,
};
use std::sync::{Arc, Mutex};

struct DownloadObserver {
    tracker: Mutex<ProgressTracker>,
    listener: Option<Listener<DownloadProgress>>,
    done: Mutex<Option<Callback<Result<()>>>>,
}

impl DownloadObserver {
    fn settle(&self, result: Result<()>) {
        let done = lock(&self.done).take();
        if let Some(done) = done {
            done(result);
        }
    }
}

impl OfflineRegionObserver for DownloadObserver {
    fn on_status_changed(&self, status: OfflineRegionStatus) {
        let (progress, first_completion) = lock(&self.tracker).observe(RegionStatus {
            completed_count: status.completed_resource_count,
            expected_count: status.required_resource_count,
            completed_size: status.completed_resource_size,
            complete: status.is_complete(),
        });

        if let Some(listener) = &self.listener {
            listener.call(progress);
        }
        if first_completion {
            self.settle(Ok(()));
        }
    }

    fn on_error(&self, reason: String, message: String) {
        log::warn!("Offline download failed: {} {}", reason, message);
        self.settle(Err(MapError::Native(format!("{}: {}", reason, message))));
    }

    fn mapbox_tile_count_limit_exceeded(&self, limit: u64) {
        self.settle(Err(MapError::Native(format!(
            "Offline tile count limit of {} exceeded",
            limit
        ))));
    }
}

pub(super) async fn download(
    sdk: &dyn AndroidMapSdk,
    token: &str,
    options: DownloadOfflineRegionOptions,
) -> Result<()> {
    sdk.set_access_token(token)?;

    let definition = OfflineRegionDefinition {
        style_url: options.style.url().to_string(),
        bounds: options.bounds,
        min_zoom: options.min_zoom,
        max_zoom: options.max_zoom,
        pixel_ratio: sdk.pixel_ratio(),
    };
    let metadata = RegionMetadata::new(options.name.clone()).encode()?;

    let (callback, created) = completion();
    sdk.offline_manager()
        .create_offline_region(definition, metadata, callback);
    let region = created.wait().await??;

    let (done, finished) = completion();
    region.set_observer(Arc::new(DownloadObserver {
        tracker: Mutex::new(ProgressTracker::new(options.name.clone())),
        listener: options.on_progress.clone(),
        done: Mutex::new(Some(done)),
    }));
    region.set_download_state(true);

    let result = finished.wait().await?;
    region.set_download_state(false);
    if result.is_ok() {
        log::info!("Offline region '{}' downloaded", options.name);
    }
    result
}

async fn regions(manager: &dyn AndroidOfflineManager) -> Result<Vec<Arc<dyn AndroidOfflineRegion>>> {
    let (callback, listed) = completion();
    manager.list_offline_regions(callback);
    Ok(listed.wait().await??)
}

pub(super) async fn list(manager: &dyn AndroidOfflineManager) -> Result<Vec<OfflineRegion>> {
    Ok(regions(manager)
        .await?
        .iter()
        .map(|region| {
            let definition = region.definition();
            OfflineRegion {
                name: RegionMetadata::decode_name(&region.metadata()),
                style: definition.style_url,
                min_zoom: definition.min_zoom,
                max_zoom: definition.max_zoom,
                bounds: definition.bounds,
            }
        })
        .collect())
}

/// Delete every region named `name`
pub(super) async fn delete(manager: &dyn AndroidOfflineManager, name: &str) -> Result<()> {
    let matching: Vec<_> = regions(manager)
        .await?
        .into_iter()
        .filter(|region| RegionMetadata::decode_name(&region.metadata()) == name)
        .collect();

    if matching.is_empty() {
        return Err(MapError::RegionNotFound);
    }

    for region in matching {
        let (callback, deleted) = completion();
        region.delete(callback);
        deleted.wait().await??;
        log::debug!("deleted offline region {} ('{}')", region.id(), name);
    }
    Ok(())
}

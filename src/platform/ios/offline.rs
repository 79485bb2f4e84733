//! Offline packs on the iOS SDK
//!
//! Progress arrives as storage-wide notifications; the download observes
//! them filtered by its own pack id and removes its observer when done.

use super::sdk::{
    MglOfflinePack, MglOfflineStorage, MglTilePyramidRegion, OfflinePackState, PackNotification,
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

struct PackObserver {
    pack: u64,
    tracker: Mutex<ProgressTracker>,
    listener: Option<Listener<DownloadProgress>>,
    done: Mutex<Option<Callback<Result<()>>>>,
}

impl PackObserver {
    fn settle(&self, result: Result<()>) {
        let done = lock(&self.done).take();
        if let Some(done) = done {
            done(result);
        }
    }

    fn notify(&self, notification: PackNotification) {
        if notification.pack() != self.pack {
            return;
        }
        match notification {
            PackNotification::ProgressChanged {
                state, progress, ..
            } => {
                let (report, first_completion) = lock(&self.tracker).observe(RegionStatus {
                    completed_count: progress.count_of_resources_completed,
                    expected_count: progress.count_of_resources_expected,
                    completed_size: progress.count_of_bytes_completed,
                    complete: state == OfflinePackState::Complete,
                });
                if let Some(listener) = &self.listener {
                    listener.call(report);
                }
                if first_completion {
                    self.settle(Ok(()));
                }
            }
            PackNotification::Error { message, .. } => {
                log::warn!("Offline pack {} failed: {}", self.pack, message);
                self.settle(Err(MapError::Native(message)));
            }
            PackNotification::MaximumMapboxTilesReached { maximum, .. } => {
                self.settle(Err(MapError::Native(format!(
                    "Offline tile count limit of {} exceeded",
                    maximum
                ))));
            }
        }
    }
}

pub(super) async fn download(
    storage: &dyn MglOfflineStorage,
    options: DownloadOfflineRegionOptions,
) -> Result<()> {
    let region = MglTilePyramidRegion {
        style_url: options.style.url().to_string(),
        bounds: options.bounds,
        from_zoom: options.min_zoom,
        to_zoom: options.max_zoom,
    };
    let context = RegionMetadata::new(options.name.clone()).encode()?;

    let (callback, added) = completion();
    storage.add_pack(region, context, callback);
    let pack = added.wait().await??;

    let (done, finished) = completion();
    let observer = Arc::new(PackObserver {
        pack: pack.id(),
        tracker: Mutex::new(ProgressTracker::new(options.name.clone())),
        listener: options.on_progress.clone(),
        done: Mutex::new(Some(done)),
    });
    let token = storage.add_observer(Arc::new(move |notification: PackNotification| {
        observer.notify(notification)
    }));
    pack.resume();

    let result = finished.wait().await;
    storage.remove_observer(token);
    let result = result?;
    if result.is_ok() {
        log::info!("Offline region '{}' downloaded", options.name);
    } else {
        pack.suspend();
    }
    result
}

fn describe(pack: &Arc<dyn MglOfflinePack>) -> OfflineRegion {
    let region = pack.region();
    OfflineRegion {
        name: RegionMetadata::decode_name(&pack.context()),
        style: region.style_url,
        min_zoom: region.from_zoom,
        max_zoom: region.to_zoom,
        bounds: region.bounds,
    }
}

pub(super) fn list(storage: &dyn MglOfflineStorage) -> Vec<OfflineRegion> {
    storage.packs().iter().map(describe).collect()
}

/// Remove every pack named `name`
pub(super) async fn delete(storage: &dyn MglOfflineStorage, name: &str) -> Result<()> {
    let matching: Vec<_> = storage
        .packs()
        .into_iter()
        .filter(|pack| RegionMetadata::decode_name(&pack.context()) == name)
        .collect();

    if matching.is_empty() {
        return Err(MapError::RegionNotFound);
    }

    for pack in &matching {
        let (callback, removed) = completion();
        storage.remove_pack(pack, callback);
        removed.wait().await??;
    }
    log::debug!("removed {} offline packs named '{}'", matching.len(), name);
    Ok(())
}

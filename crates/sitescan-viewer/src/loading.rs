//! Model loading for the viewer.
//!
//! Starts one `load_sequence` task for the configured URLs and polls its
//! events every frame. Progress feeds the loading screen; the primary model
//! publishes a handle and mounts the camera controller; secondaries become
//! available in the model picker as they finish.
//!
//! Uses platform-agnostic `async_channel` for communication between the
//! download task and the main thread.

use bevy::prelude::*;
use bytes::Bytes;
use sitescan::{
    AbortHandle, AbortSignal, AssetReadiness, AssetSlot, AssetStatus, Error,
    FreeFlyController, HandleRegistry, Loader, ObjectHandle, SequenceEvent, abort_pair,
};

use crate::async_runtime::TaskSpawner;
use crate::camera::{SiteController, ViewerCamera};
use crate::launch_params::LaunchParams;

/// Plugin for loading site models.
pub struct LoadingPlugin;

impl Plugin for LoadingPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<LoadChannels>()
            .add_systems(Startup, (init_site_models, start_loading).chain())
            .add_systems(Update, poll_load_events);
    }
}

/// Messages from the download task.
enum LoadMessage {
    Event(SequenceEvent),
    /// The primary server sent no size; loading continues without progress.
    ProgressUnavailable,
    Finished(sitescan::Result<()>),
}

/// Channel between the download task and the main thread.
#[derive(Resource)]
struct LoadChannels {
    tx: async_channel::Sender<LoadMessage>,
    rx: async_channel::Receiver<LoadMessage>,
}

impl Default for LoadChannels {
    fn default() -> Self {
        let (tx, rx) = async_channel::unbounded();
        Self { tx, rx }
    }
}

/// Keeps the running download alive. Dropping it aborts the download.
#[derive(Resource)]
struct ActiveLoad {
    _abort: AbortHandle,
}

/// Loading-screen state.
#[derive(Resource, Debug, Default)]
pub struct LoadProgress {
    /// Primary download progress in percent, if the size is known.
    pub percent: Option<f64>,
    /// Whether the primary model is ready.
    pub primary_ready: bool,
    /// Error that stopped the primary download.
    pub error: Option<String>,
}

/// Downloaded models and the one currently displayed.
#[derive(Resource)]
pub struct SiteModels {
    urls: Vec<String>,
    blobs: Vec<Option<Bytes>>,
    readiness: AssetReadiness,
    registry: HandleRegistry,
    slot: AssetSlot,
    displayed: Option<usize>,
}

impl SiteModels {
    /// Create an empty model set for `urls`.
    pub fn new(urls: Vec<String>) -> Self {
        let registry = HandleRegistry::new();
        Self {
            blobs: vec![None; urls.len()],
            readiness: AssetReadiness::new(urls.len()),
            slot: AssetSlot::new(registry.clone()),
            registry,
            urls,
            displayed: None,
        }
    }

    /// Model URLs in picker order.
    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    /// Load status of the model at `index`.
    pub fn status(&self, index: usize) -> AssetStatus {
        self.readiness.status(index).unwrap_or_default()
    }

    /// Index of the displayed model.
    pub fn displayed(&self) -> Option<usize> {
        self.displayed
    }

    /// Handle of the displayed model.
    pub fn current_handle(&self) -> Option<&ObjectHandle> {
        self.slot.current()
    }

    /// Registry the handles are published into.
    pub fn registry(&self) -> &HandleRegistry {
        &self.registry
    }

    /// Record a finished download.
    pub fn store(&mut self, index: usize, blob: Bytes) {
        if let Some(entry) = self.blobs.get_mut(index) {
            *entry = Some(blob);
            self.readiness.set(index, AssetStatus::Ready);
        }
    }

    /// Record a failed download.
    pub fn mark_failed(&mut self, index: usize) {
        self.readiness.set(index, AssetStatus::Failed);
    }

    /// Display the model at `index`, revoking the previous handle.
    ///
    /// Returns `None` when the model is not ready.
    pub fn show(&mut self, index: usize) -> Option<ObjectHandle> {
        let blob = self.blobs.get(index)?.clone()?;
        let handle = self.slot.replace(blob);
        self.displayed = Some(index);
        tracing::info!("Displaying model {} as {handle}", self.urls[index]);
        Some(handle)
    }
}

/// Create the model set from the launch parameters.
#[allow(clippy::needless_pass_by_value)]
fn init_site_models(mut commands: Commands, params: Res<LaunchParams>) {
    commands.insert_resource(SiteModels::new(params.urls.clone()));
    commands.init_resource::<LoadProgress>();
}

/// Spawn the download task.
#[allow(clippy::needless_pass_by_value)]
fn start_loading(
    mut commands: Commands,
    params: Res<LaunchParams>,
    channels: Res<LoadChannels>,
    spawner: TaskSpawner,
) {
    let (abort, signal) = abort_pair();
    commands.insert_resource(ActiveLoad { _abort: abort });

    let urls = params.urls.clone();
    let primary = params.primary;
    let tx = channels.tx.clone();

    spawner.spawn(async move {
        let loader = Loader::new();
        let forward = |event| {
            send(&tx, LoadMessage::Event(event));
        };

        let result = loader.load_sequence(&urls, primary, &signal, forward).await;
        let result = match result {
            Err(Error::LengthUnknown { url }) => {
                tracing::warn!("{url} has no declared size, loading without progress");
                send(&tx, LoadMessage::ProgressUnavailable);
                load_without_progress(&loader, &urls, primary, &signal, &tx).await
            }
            result => result.map(|_| ()),
        };
        send(&tx, LoadMessage::Finished(result));
    });

    tracing::info!("Started loading {} model(s)", params.urls.len());
}

/// Fallback when the primary server does not declare a size.
async fn load_without_progress(
    loader: &Loader,
    urls: &[String],
    primary: usize,
    signal: &AbortSignal,
    tx: &async_channel::Sender<LoadMessage>,
) -> sitescan::Result<()> {
    let blob = loader.load_unsized(&urls[primary], signal).await?;
    if !send(
        tx,
        LoadMessage::Event(SequenceEvent::PrimaryReady {
            index: primary,
            url: urls[primary].clone(),
            blob,
        }),
    ) {
        return Ok(());
    }

    for (index, url) in urls.iter().enumerate().filter(|(i, _)| *i != primary) {
        let event = match loader.load_unsized(url, signal).await {
            Ok(blob) => SequenceEvent::SecondaryReady {
                index,
                url: url.clone(),
                blob,
            },
            Err(Error::Aborted { url }) => return Err(Error::Aborted { url }),
            Err(error) => SequenceEvent::SecondaryFailed {
                index,
                url: url.clone(),
                error,
            },
        };
        if !send(tx, LoadMessage::Event(event)) {
            return Ok(());
        }
    }
    Ok(())
}

/// Queue a message for the frame loop.
///
/// Returns `false` once the receiver is gone, which only happens while the
/// app shuts down.
fn send(tx: &async_channel::Sender<LoadMessage>, message: LoadMessage) -> bool {
    if tx.try_send(message).is_err() {
        tracing::debug!("Load channel closed, dropping message");
        return false;
    }
    true
}

/// Apply download events on the main thread.
#[allow(clippy::needless_pass_by_value)]
fn poll_load_events(
    mut commands: Commands,
    channels: Res<LoadChannels>,
    params: Res<LaunchParams>,
    mut progress: ResMut<LoadProgress>,
    mut models: ResMut<SiteModels>,
) {
    while let Ok(message) = channels.rx.try_recv() {
        match message {
            LoadMessage::Event(SequenceEvent::Progress(event)) => {
                tracing::debug!(
                    "{}: {} / {} bytes",
                    event.url,
                    event.received_bytes,
                    event.total_bytes
                );
                progress.percent = Some(event.percent);
            }
            LoadMessage::ProgressUnavailable => {
                progress.percent = None;
            }
            LoadMessage::Event(SequenceEvent::PrimaryReady { index, url, blob }) => {
                tracing::info!("Primary model ready: {url} ({} bytes)", blob.len());
                models.store(index, blob);
                models.show(index);
                progress.primary_ready = true;

                let settings = params.controller;
                let camera = ViewerCamera::new(settings.home);
                commands.insert_resource(SiteController(FreeFlyController::mount(
                    camera, settings,
                )));
            }
            LoadMessage::Event(SequenceEvent::SecondaryReady { index, url, blob }) => {
                tracing::info!("Model ready: {url} ({} bytes)", blob.len());
                models.store(index, blob);
            }
            LoadMessage::Event(SequenceEvent::SecondaryFailed { index, url, error }) => {
                tracing::warn!("Model {url} failed to load: {error}");
                models.mark_failed(index);
            }
            LoadMessage::Finished(Ok(())) => {
                tracing::info!("All model downloads finished");
                commands.remove_resource::<ActiveLoad>();
            }
            LoadMessage::Finished(Err(error)) => {
                if matches!(error, Error::Aborted { .. }) {
                    tracing::info!("Model loading aborted");
                } else if !progress.primary_ready {
                    tracing::error!("Failed to load primary model: {error}");
                    models.mark_failed(params.primary);
                    progress.error = Some(error.to_string());
                }
                commands.remove_resource::<ActiveLoad>();
            }
        }
    }
}

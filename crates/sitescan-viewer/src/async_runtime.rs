//! Background task spawning for native and WASM.
//!
//! Downloads run off the frame loop. On native they run on a Tokio runtime
//! (reqwest needs one); in the browser they run as local futures on Bevy's
//! async compute pool, since fetch futures are not `Send`.

use std::future::Future;
#[cfg(target_family = "wasm")]
use std::marker::PhantomData;

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;

/// Installs the runtime that [`TaskSpawner`] spawns onto.
pub struct AsyncRuntimePlugin;

impl Plugin for AsyncRuntimePlugin {
    fn build(&self, app: &mut App) {
        #[cfg(target_family = "wasm")]
        let _ = app;

        #[cfg(not(target_family = "wasm"))]
        app.add_plugins(bevy_tokio_tasks::TokioTasksPlugin::default());
    }
}

/// System parameter that spawns detached background tasks.
///
/// Tasks report back to systems through `async_channel`.
#[derive(SystemParam)]
pub struct TaskSpawner<'w, 's> {
    #[cfg(not(target_family = "wasm"))]
    runtime: Res<'w, bevy_tokio_tasks::TokioTasksRuntime>,
    #[cfg(target_family = "wasm")]
    _world: PhantomData<&'w ()>,
    _local: Local<'s, ()>,
}

#[cfg(not(target_family = "wasm"))]
impl TaskSpawner<'_, '_> {
    /// Run `future` to completion on the Tokio runtime.
    pub fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.runtime.spawn_background_task(move |_ctx| future);
    }
}

#[cfg(target_family = "wasm")]
impl TaskSpawner<'_, '_> {
    /// Run `future` to completion on the browser event loop.
    pub fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + 'static,
    {
        bevy::tasks::AsyncComputeTaskPool::get()
            .spawn_local(future)
            .detach();
    }
}

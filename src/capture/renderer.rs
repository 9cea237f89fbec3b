use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::oneshot;
use tracing::debug;

use crate::capture::{
    CaptureCallbacks, CaptureConfig, CaptureHandle, CapturePhase, CaptureResultMap,
    spawn_capture,
};
use crate::core::PlanSnapshot;
use crate::error::{ChartError, ChartResult};
use crate::render::{PixmapSurfaceFactory, SurfaceFactory};

struct ActiveCycle {
    snapshot: Arc<PlanSnapshot>,
    handle: CaptureHandle,
}

/// Long-lived owner of report chart capture, one cycle per plan snapshot.
///
/// Snapshots are compared by `Arc` identity: handing the same snapshot again
/// (an incidental re-render) does not start a new cycle, while a new snapshot
/// cancels whatever is pending and starts over. Unmounting or dropping the
/// renderer cancels the pending cycle without invoking its callbacks.
pub struct ChartCaptureRenderer {
    config: Arc<CaptureConfig>,
    factory: Arc<dyn SurfaceFactory>,
    active: Option<ActiveCycle>,
    next_cycle_id: u64,
}

impl ChartCaptureRenderer {
    pub fn new(config: CaptureConfig) -> ChartResult<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            factory: Arc::new(PixmapSurfaceFactory),
            active: None,
            next_cycle_id: 1,
        })
    }

    #[must_use]
    pub fn with_surface_factory(mut self, factory: Arc<dyn SurfaceFactory>) -> Self {
        self.factory = factory;
        self
    }

    #[must_use]
    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    #[must_use]
    pub fn current_snapshot(&self) -> Option<&Arc<PlanSnapshot>> {
        self.active.as_ref().map(|active| &active.snapshot)
    }

    /// Phase of the current cycle, `Idle` when nothing has been requested.
    #[must_use]
    pub fn phase(&self) -> CapturePhase {
        self.active
            .as_ref()
            .map_or(CapturePhase::Idle, |active| active.handle.phase())
    }

    #[must_use]
    pub fn cycle_id(&self) -> Option<u64> {
        self.active.as_ref().map(|active| active.handle.cycle_id())
    }

    /// Requests a capture of `snapshot`. Must be called within a Tokio runtime.
    ///
    /// Returns `true` when a new cycle was started. When `snapshot` is the one
    /// already being (or already) captured, the call is a no-op and
    /// `callbacks` are dropped unused.
    pub fn set_snapshot(
        &mut self,
        snapshot: Arc<PlanSnapshot>,
        callbacks: CaptureCallbacks,
    ) -> bool {
        if let Some(active) = &self.active {
            if Arc::ptr_eq(&active.snapshot, &snapshot) {
                debug!(
                    cycle_id = active.handle.cycle_id(),
                    "snapshot unchanged, capture not re-triggered"
                );
                return false;
            }
        }

        // Cancel the previous cycle before the new one can report.
        self.unmount();

        let cycle_id = self.next_cycle_id;
        self.next_cycle_id += 1;
        let handle = spawn_capture(
            cycle_id,
            Arc::clone(&snapshot),
            Arc::clone(&self.config),
            Arc::clone(&self.factory),
            callbacks,
        );
        self.active = Some(ActiveCycle { snapshot, handle });
        true
    }

    /// Waits for the current cycle to settle and returns its terminal phase.
    pub async fn wait_for_cycle(&mut self) -> CapturePhase {
        match self.active.as_mut() {
            Some(active) => active.handle.wait().await,
            None => CapturePhase::Idle,
        }
    }

    /// Tears down the current cycle, if any. Its callbacks will not run.
    pub fn unmount(&mut self) {
        if let Some(active) = self.active.take() {
            debug!(cycle_id = active.handle.cycle_id(), "unmounting capture cycle");
            active.handle.cancel();
        }
    }
}

impl Drop for ChartCaptureRenderer {
    fn drop(&mut self) {
        self.unmount();
    }
}

/// Runs one capture cycle with the default headless surfaces and waits for it.
pub async fn capture_charts(
    snapshot: Arc<PlanSnapshot>,
    config: CaptureConfig,
) -> ChartResult<CaptureResultMap> {
    capture_charts_with(snapshot, config, Arc::new(PixmapSurfaceFactory)).await
}

/// Like [`capture_charts`], drawing on surfaces from `factory`.
pub async fn capture_charts_with(
    snapshot: Arc<PlanSnapshot>,
    config: CaptureConfig,
    factory: Arc<dyn SurfaceFactory>,
) -> ChartResult<CaptureResultMap> {
    let mut renderer = ChartCaptureRenderer::new(config)?.with_surface_factory(factory);

    // Both callbacks share the sender; only the one that fires consumes it.
    let (result_tx, result_rx) = oneshot::channel();
    let on_complete_tx = Arc::new(Mutex::new(Some(result_tx)));
    let on_error_tx = Arc::clone(&on_complete_tx);
    let callbacks = CaptureCallbacks::new(
        move |images| send_once(&on_complete_tx, Ok(images)),
        move |err| send_once(&on_error_tx, Err(err)),
    );

    renderer.set_snapshot(snapshot, callbacks);
    renderer.wait_for_cycle().await;
    result_rx.await.unwrap_or(Err(ChartError::Cancelled))
}

type ResultSender = Arc<Mutex<Option<oneshot::Sender<ChartResult<CaptureResultMap>>>>>;

fn send_once(sender: &ResultSender, result: ChartResult<CaptureResultMap>) {
    let sender = sender
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take();
    if let Some(sender) = sender {
        let _ = sender.send(result);
    }
}

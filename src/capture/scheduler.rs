use std::any::Any;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::capture::{
    CaptureConfig, CaptureResultMap, ImageCollector, MountedStage, OffscreenStage,
    ReadinessPolicy,
};
use crate::core::PlanSnapshot;
use crate::error::{ChartError, ChartResult};
use crate::render::SurfaceFactory;

/// Progress of one capture cycle.
///
/// `Completed`, `Failed` and `Cancelled` are terminal. A cycle enters
/// `Completed` or `Failed` only after its callback has returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CapturePhase {
    Idle,
    Mounting,
    Waiting,
    Capturing,
    Completed,
    Failed,
    Cancelled,
}

impl CapturePhase {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

type CompleteFn = Box<dyn FnOnce(CaptureResultMap) + Send>;
type ErrorFn = Box<dyn FnOnce(ChartError) + Send>;

/// The two ways a cycle can report back. Invoking either consumes the value,
/// so a cycle can never call both.
pub struct CaptureCallbacks {
    on_complete: CompleteFn,
    on_error: ErrorFn,
}

impl CaptureCallbacks {
    pub fn new(
        on_complete: impl FnOnce(CaptureResultMap) + Send + 'static,
        on_error: impl FnOnce(ChartError) + Send + 'static,
    ) -> Self {
        Self {
            on_complete: Box::new(on_complete),
            on_error: Box::new(on_error),
        }
    }

    pub fn complete(self, images: CaptureResultMap) {
        (self.on_complete)(images);
    }

    pub fn fail(self, err: ChartError) {
        (self.on_error)(err);
    }
}

impl fmt::Debug for CaptureCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureCallbacks").finish_non_exhaustive()
    }
}

type CallbackSlot = Arc<Mutex<Option<CaptureCallbacks>>>;

/// Owner of one running cycle. Dropping it cancels the cycle.
///
/// Callbacks are handed out under a lock that [`CaptureHandle::cancel`] also
/// takes: once `cancel` returns, no callback will start. A callback that was
/// already dispatched runs to completion.
#[derive(Debug)]
pub struct CaptureHandle {
    cycle_id: u64,
    token: CancellationToken,
    callbacks: CallbackSlot,
    phase_rx: watch::Receiver<CapturePhase>,
    task: JoinHandle<()>,
}

impl CaptureHandle {
    #[must_use]
    pub fn cycle_id(&self) -> u64 {
        self.cycle_id
    }

    #[must_use]
    pub fn phase(&self) -> CapturePhase {
        *self.phase_rx.borrow()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancels the cycle but keeps the handle so its final phase can be observed.
    pub fn cancel(&self) {
        self.token.cancel();
        let discarded = lock_callbacks(&self.callbacks).take();
        drop(discarded);
    }

    /// Waits for the cycle to reach a terminal phase and returns it.
    pub async fn wait(&mut self) -> CapturePhase {
        match self.phase_rx.wait_for(|phase| phase.is_terminal()).await {
            Ok(phase) => *phase,
            // The cycle task is gone without reporting; treat it as torn down.
            Err(_) => CapturePhase::Cancelled,
        }
    }
}

impl Drop for CaptureHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Spawns one mount → wait → capture cycle on the current Tokio runtime.
///
/// The cycle runs under a supervisor: if it panics, `on_error` receives
/// [`ChartError::Aborted`] unless the cycle was cancelled or had already
/// reported.
#[must_use]
pub fn spawn_capture(
    cycle_id: u64,
    snapshot: Arc<PlanSnapshot>,
    config: Arc<CaptureConfig>,
    factory: Arc<dyn SurfaceFactory>,
    callbacks: CaptureCallbacks,
) -> CaptureHandle {
    let token = CancellationToken::new();
    let (phase_tx, phase_rx) = watch::channel(CapturePhase::Idle);
    let callbacks: CallbackSlot = Arc::new(Mutex::new(Some(callbacks)));

    let cycle = CaptureCycle {
        cycle_id,
        snapshot,
        config,
        factory,
        token: token.clone(),
        callbacks: Arc::clone(&callbacks),
        phase_tx: Arc::new(phase_tx),
    };
    let task = tokio::spawn(supervise(cycle));

    CaptureHandle {
        cycle_id,
        token,
        callbacks,
        phase_rx,
        task,
    }
}

async fn supervise(cycle: CaptureCycle) {
    let cycle_id = cycle.cycle_id;
    let token = cycle.token.clone();
    let callbacks = Arc::clone(&cycle.callbacks);
    let phase_tx = Arc::clone(&cycle.phase_tx);

    let Err(err) = tokio::spawn(cycle.run()).await else {
        return;
    };
    error!(cycle_id, error = %err, "capture cycle aborted");
    let phase = match take_callbacks(&callbacks, &token) {
        Some(callbacks) => {
            callbacks.fail(ChartError::Aborted(abort_reason(err)));
            CapturePhase::Failed
        }
        None if token.is_cancelled() => CapturePhase::Cancelled,
        None => CapturePhase::Failed,
    };
    phase_tx.send_replace(phase);
}

struct CaptureCycle {
    cycle_id: u64,
    snapshot: Arc<PlanSnapshot>,
    config: Arc<CaptureConfig>,
    factory: Arc<dyn SurfaceFactory>,
    token: CancellationToken,
    callbacks: CallbackSlot,
    phase_tx: Arc<watch::Sender<CapturePhase>>,
}

impl CaptureCycle {
    async fn run(self) {
        let cycle_id = self.cycle_id;
        if let Err(err) = self.config.validate() {
            self.report(Err(err));
            return;
        }

        debug!(cycle_id, charts = self.config.kinds.len(), "capture cycle mounting");
        self.set_phase(CapturePhase::Mounting);
        let mut stage =
            OffscreenStage::mount(&self.snapshot, &self.config, &self.factory, &self.token);

        self.set_phase(CapturePhase::Waiting);
        tokio::select! {
            biased;
            () = self.token.cancelled() => {
                debug!(cycle_id, "capture cycle cancelled before capture");
                self.set_phase(CapturePhase::Cancelled);
                return;
            }
            () = wait_for_settle(&mut stage, &self.config) => {}
        }

        self.set_phase(CapturePhase::Capturing);
        let collect = tokio::task::spawn_blocking(move || ImageCollector::collect(&stage));
        let outcome = tokio::select! {
            biased;
            () = self.token.cancelled() => {
                debug!(cycle_id, "capture cycle cancelled during capture");
                self.set_phase(CapturePhase::Cancelled);
                return;
            }
            joined = collect => {
                joined.unwrap_or_else(|err| Err(ChartError::Aborted(abort_reason(err))))
            }
        };

        self.report(outcome);
    }

    fn report(&self, outcome: ChartResult<CaptureResultMap>) {
        let cycle_id = self.cycle_id;
        let Some(callbacks) = take_callbacks(&self.callbacks, &self.token) else {
            debug!(cycle_id, "capture cycle cancelled before reporting");
            self.set_phase(CapturePhase::Cancelled);
            return;
        };

        match outcome {
            Ok(images) => {
                info!(
                    cycle_id,
                    captured = images.len(),
                    requested = self.config.kinds.len(),
                    "chart capture completed"
                );
                callbacks.complete(images);
                self.set_phase(CapturePhase::Completed);
            }
            Err(err) => {
                warn!(cycle_id, error = %err, "chart capture failed");
                callbacks.fail(err);
                self.set_phase(CapturePhase::Failed);
            }
        }
    }

    fn set_phase(&self, phase: CapturePhase) {
        self.phase_tx.send_replace(phase);
    }
}

/// Hands the callbacks out at most once, and never after cancellation.
fn take_callbacks(slot: &CallbackSlot, token: &CancellationToken) -> Option<CaptureCallbacks> {
    let mut callbacks = lock_callbacks(slot);
    if token.is_cancelled() {
        return None;
    }
    callbacks.take()
}

fn lock_callbacks(slot: &CallbackSlot) -> MutexGuard<'_, Option<CaptureCallbacks>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

fn abort_reason(err: JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }
    let payload: Box<dyn Any + Send> = err.into_panic();
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "cycle panicked".to_owned())
}

async fn wait_for_settle(stage: &mut MountedStage, config: &CaptureConfig) {
    let delay = config.settle_delay();
    match config.readiness {
        ReadinessPolicy::FixedDelay => tokio::time::sleep(delay).await,
        ReadinessPolicy::RenderSignal if delay.is_zero() => stage.wait_until_painted().await,
        ReadinessPolicy::RenderSignal => {
            if tokio::time::timeout(delay, stage.wait_until_painted())
                .await
                .is_err()
            {
                warn!(
                    painted = stage.painted_count(),
                    mounted = stage.len(),
                    delay_ms = config.settle_delay_ms,
                    "charts did not finish painting before the settle delay"
                );
            }
        }
    }
}

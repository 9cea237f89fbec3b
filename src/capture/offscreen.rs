use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::capture::CaptureConfig;
use crate::core::{ChartDataset, ChartKind, PlanSnapshot};
use crate::error::{ChartError, ChartResult};
use crate::render::{RasterSurface, SurfaceFactory, build_chart_frame};

type SurfaceSlot = Arc<Mutex<Option<Box<dyn RasterSurface>>>>;

/// One chart mounted on its own off-screen surface.
pub struct MountedChart {
    kind: ChartKind,
    slot: SurfaceSlot,
}

impl MountedChart {
    #[must_use]
    pub fn kind(&self) -> ChartKind {
        self.kind
    }

    /// True when the chart's surface exists and holds a painted frame.
    #[must_use]
    pub fn is_readable(&self) -> bool {
        lock_slot(&self.slot)
            .as_ref()
            .is_some_and(|surface| surface.is_painted())
    }

    /// Reads the painted surface back as PNG bytes.
    pub fn read_png(&self) -> ChartResult<Vec<u8>> {
        let slot = lock_slot(&self.slot);
        let surface = slot.as_ref().ok_or_else(|| {
            ChartError::Backend(format!("no surface attached for chart `{}`", self.kind))
        })?;
        if !surface.is_painted() {
            return Err(ChartError::Backend(format!(
                "surface for chart `{}` was never painted",
                self.kind
            )));
        }
        surface.encode_png()
    }
}

/// All charts of one capture cycle, painting in the background.
pub struct MountedStage {
    charts: Vec<MountedChart>,
    painted_rx: watch::Receiver<usize>,
}

impl MountedStage {
    #[must_use]
    pub fn charts(&self) -> &[MountedChart] {
        &self.charts
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.charts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.charts.is_empty()
    }

    /// Number of charts whose paint attempt has finished, successful or not.
    #[must_use]
    pub fn painted_count(&self) -> usize {
        *self.painted_rx.borrow()
    }

    /// Resolves once every chart has finished its paint attempt.
    pub async fn wait_until_painted(&mut self) {
        let total = self.charts.len();
        // An error means every painter is gone, so nothing is left to wait for.
        let _ = self.painted_rx.wait_for(|painted| *painted >= total).await;
    }
}

/// Mounts charts on invisible surfaces so their normal paint path runs.
pub struct OffscreenStage;

impl OffscreenStage {
    /// Starts building and painting every requested chart on blocking
    /// workers and returns at once. Must be called from within a Tokio
    /// runtime.
    ///
    /// Nothing here fails the cycle: a chart whose frame or surface cannot be
    /// produced keeps an empty slot and is skipped at capture time. Once
    /// `token` is cancelled, charts that have not started painting are left
    /// empty.
    #[must_use]
    pub fn mount(
        snapshot: &Arc<PlanSnapshot>,
        config: &Arc<CaptureConfig>,
        factory: &Arc<dyn SurfaceFactory>,
        token: &CancellationToken,
    ) -> MountedStage {
        let (painted_tx, painted_rx) = watch::channel(0usize);
        let painted_tx = Arc::new(painted_tx);

        let charts: Vec<MountedChart> = config
            .kinds
            .iter()
            .map(|kind| MountedChart {
                kind: *kind,
                slot: Arc::new(Mutex::new(None)),
            })
            .collect();
        let jobs = charts
            .iter()
            .map(|chart| PaintJob {
                kind: chart.kind,
                slot: Arc::clone(&chart.slot),
                attempt: PaintAttempt(Arc::clone(&painted_tx)),
            })
            .collect();

        let painter = Painter {
            snapshot: Arc::clone(snapshot),
            config: Arc::clone(config),
            factory: Arc::clone(factory),
            token: token.clone(),
        };
        spawn_painters(painter, jobs);

        MountedStage { charts, painted_rx }
    }
}

/// Counts one finished paint attempt when dropped, so a painter that fails,
/// is skipped or panics still releases the readiness wait.
struct PaintAttempt(Arc<watch::Sender<usize>>);

impl Drop for PaintAttempt {
    fn drop(&mut self) {
        self.0.send_modify(|painted| *painted += 1);
    }
}

struct PaintJob {
    kind: ChartKind,
    slot: SurfaceSlot,
    attempt: PaintAttempt,
}

struct Painter {
    snapshot: Arc<PlanSnapshot>,
    config: Arc<CaptureConfig>,
    factory: Arc<dyn SurfaceFactory>,
    token: CancellationToken,
}

impl Painter {
    fn paint(&self, job: PaintJob) {
        let PaintJob {
            kind,
            slot,
            attempt: _attempt,
        } = job;
        if self.token.is_cancelled() {
            debug!(chart = %kind, "capture cancelled, chart not painted");
            return;
        }
        match self.paint_surface(kind) {
            Ok(surface) => {
                debug!(chart = %kind, backend = surface.backend_name(), "chart painted");
                *lock_slot(&slot) = Some(surface);
            }
            Err(err) => warn!(chart = %kind, error = %err, "chart paint failed"),
        }
    }

    fn paint_surface(&self, kind: ChartKind) -> ChartResult<Box<dyn RasterSurface>> {
        let dataset = ChartDataset::from_plan(kind, &self.snapshot)?;
        let frame = build_chart_frame(&dataset, &self.config.style, self.config.viewport)?;
        let mut surface = self.factory.create_surface(kind, self.config.viewport)?;
        surface.render(&frame)?;
        Ok(surface)
    }
}

#[cfg(not(feature = "parallel-mount"))]
fn spawn_painters(painter: Painter, jobs: Vec<PaintJob>) {
    let painter = Arc::new(painter);
    for job in jobs {
        let painter = Arc::clone(&painter);
        tokio::task::spawn_blocking(move || painter.paint(job));
    }
}

#[cfg(feature = "parallel-mount")]
fn spawn_painters(painter: Painter, jobs: Vec<PaintJob>) {
    use rayon::prelude::*;

    tokio::task::spawn_blocking(move || {
        jobs.into_par_iter().for_each(|job| painter.paint(job));
    });
}

fn lock_slot(slot: &SurfaceSlot) -> MutexGuard<'_, Option<Box<dyn RasterSurface>>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use plan_charts::capture::{
    CaptureCallbacks, CaptureConfig, CapturePhase, CaptureResultMap, ChartCaptureRenderer,
    PNG_DATA_URI_PREFIX, ReadinessPolicy, capture_charts, capture_charts_with,
    decode_png_data_uri, spawn_capture,
};
use plan_charts::core::{CapitalSource, ChartKind, PlanSnapshot, Viewport};
use plan_charts::error::{ChartError, ChartResult};
use plan_charts::render::{
    NullRenderer, NullSurfaceFactory, PixmapSurface, PixmapSurfaceFactory, RasterSurface,
    RenderFrame, Renderer, SurfaceFactory,
};
use rust_decimal::Decimal;

#[derive(Default)]
struct Outcome {
    completed: AtomicUsize,
    failed: AtomicUsize,
    images: Mutex<Option<CaptureResultMap>>,
    error: Mutex<Option<ChartError>>,
}

impl Outcome {
    fn callbacks(self: &Arc<Self>) -> CaptureCallbacks {
        let on_complete = Arc::clone(self);
        let on_error = Arc::clone(self);
        CaptureCallbacks::new(
            move |images| {
                on_complete.completed.fetch_add(1, Ordering::SeqCst);
                *on_complete.images.lock().expect("images lock") = Some(images);
            },
            move |err| {
                on_error.failed.fetch_add(1, Ordering::SeqCst);
                *on_error.error.lock().expect("error lock") = Some(err);
            },
        )
    }

    fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    fn images(&self) -> CaptureResultMap {
        self.images
            .lock()
            .expect("images lock")
            .clone()
            .expect("completion delivered images")
    }
}

/// Pixmap surfaces for most charts, never-readable surfaces for `broken`.
struct PartiallyBrokenFactory {
    broken: Vec<ChartKind>,
}

impl SurfaceFactory for PartiallyBrokenFactory {
    fn create_surface(
        &self,
        kind: ChartKind,
        viewport: Viewport,
    ) -> ChartResult<Box<dyn RasterSurface>> {
        if self.broken.contains(&kind) {
            return Ok(Box::new(NullRenderer::default()));
        }
        Ok(Box::new(PixmapSurface::new(viewport)?))
    }
}

/// Pixmap surfaces whose read-back raises a flag, then stalls or panics.
struct SlowReadFactory {
    reading: Arc<AtomicBool>,
    read_delay: Duration,
    panic_on_read: bool,
}

impl SlowReadFactory {
    fn stalling(reading: &Arc<AtomicBool>, read_delay: Duration) -> Self {
        Self {
            reading: Arc::clone(reading),
            read_delay,
            panic_on_read: false,
        }
    }

    fn panicking() -> Self {
        Self {
            reading: Arc::new(AtomicBool::new(false)),
            read_delay: Duration::ZERO,
            panic_on_read: true,
        }
    }
}

impl SurfaceFactory for SlowReadFactory {
    fn create_surface(
        &self,
        _kind: ChartKind,
        viewport: Viewport,
    ) -> ChartResult<Box<dyn RasterSurface>> {
        Ok(Box::new(SlowReadSurface {
            inner: PixmapSurface::new(viewport)?,
            reading: Arc::clone(&self.reading),
            read_delay: self.read_delay,
            panic_on_read: self.panic_on_read,
        }))
    }
}

struct SlowReadSurface {
    inner: PixmapSurface,
    reading: Arc<AtomicBool>,
    read_delay: Duration,
    panic_on_read: bool,
}

impl Renderer for SlowReadSurface {
    fn render(&mut self, frame: &RenderFrame) -> ChartResult<()> {
        self.inner.render(frame)
    }
}

impl RasterSurface for SlowReadSurface {
    fn backend_name(&self) -> &'static str {
        "slow-read"
    }

    fn is_painted(&self) -> bool {
        self.inner.is_painted()
    }

    fn encode_png(&self) -> ChartResult<Vec<u8>> {
        self.reading.store(true, Ordering::SeqCst);
        if self.panic_on_read {
            panic!("png encoder crashed");
        }
        std::thread::sleep(self.read_delay);
        self.inner.encode_png()
    }
}

/// Pixmap surfaces that count how many were created, panicking for `panics_for`.
#[derive(Default)]
struct CountingFactory {
    created: AtomicUsize,
    panics_for: Option<ChartKind>,
}

impl SurfaceFactory for CountingFactory {
    fn create_surface(
        &self,
        kind: ChartKind,
        viewport: Viewport,
    ) -> ChartResult<Box<dyn RasterSurface>> {
        if self.panics_for == Some(kind) {
            panic!("surface allocation for `{kind}` crashed");
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(PixmapSurface::new(viewport)?))
    }
}

fn funded_plan() -> PlanSnapshot {
    PlanSnapshot::default()
        .with_plan_id("plan-42")
        .with_monthly_totals(Decimal::from(10_000_000), Decimal::from(5_000_000))
        .with_capital_source(CapitalSource::new("Savings", Decimal::from(60_000_000)))
}

fn signal_config() -> CaptureConfig {
    CaptureConfig::default()
        .with_viewport(Viewport::new(320, 180))
        .with_readiness(ReadinessPolicy::RenderSignal)
        .with_settle_delay(Duration::from_secs(5))
}

fn fixed_delay_config(delay: Duration) -> CaptureConfig {
    CaptureConfig::default()
        .with_viewport(Viewport::new(320, 180))
        .with_readiness(ReadinessPolicy::FixedDelay)
        .with_settle_delay(delay)
}

#[tokio::test]
async fn funded_plan_captures_profit_loss_and_capital_structure() {
    let config = signal_config().with_kinds([ChartKind::ProfitLoss, ChartKind::CapitalStructure]);
    let images = capture_charts(Arc::new(funded_plan()), config)
        .await
        .expect("capture");

    let kinds: Vec<ChartKind> = images.kinds().collect();
    assert_eq!(kinds, vec![ChartKind::ProfitLoss, ChartKind::CapitalStructure]);
    for (_, data_uri) in images.iter() {
        assert!(data_uri.starts_with(PNG_DATA_URI_PREFIX));
        let png = decode_png_data_uri(data_uri).expect("decode");
        assert!(png.starts_with(b"\x89PNG"));
    }

    let json = serde_json::to_value(&images).expect("json");
    assert!(json.get("profitLoss").is_some());
    assert!(json.get("capitalStructure").is_some());
}

#[tokio::test]
async fn empty_plan_still_captures_every_chart_within_delay() {
    let delay = Duration::from_millis(300);
    let config = fixed_delay_config(delay);

    let images = tokio::time::timeout(
        delay + Duration::from_secs(5),
        capture_charts(Arc::new(PlanSnapshot::default()), config),
    )
    .await
    .expect("capture finished in time")
    .expect("capture");

    assert_eq!(images.len(), ChartKind::ALL.len());
    assert!(images.missing(&ChartKind::ALL).is_empty());
}

#[tokio::test]
async fn unreadable_charts_are_skipped() {
    let factory = Arc::new(PartiallyBrokenFactory {
        broken: vec![ChartKind::RevenueStreams, ChartKind::Forecast],
    });
    let images = capture_charts_with(Arc::new(funded_plan()), signal_config(), factory)
        .await
        .expect("partial capture still succeeds");

    assert_eq!(images.len(), 4);
    assert!(!images.contains(ChartKind::RevenueStreams));
    assert!(!images.contains(ChartKind::Forecast));
    assert_eq!(
        images.missing(&ChartKind::ALL),
        vec![ChartKind::RevenueStreams, ChartKind::Forecast]
    );
}

#[tokio::test]
async fn nothing_readable_reports_error_callback_only() {
    let outcome = Arc::new(Outcome::default());
    let mut renderer = ChartCaptureRenderer::new(signal_config())
        .expect("renderer")
        .with_surface_factory(Arc::new(NullSurfaceFactory));

    assert!(renderer.set_snapshot(Arc::new(funded_plan()), outcome.callbacks()));
    assert_eq!(renderer.wait_for_cycle().await, CapturePhase::Failed);

    assert_eq!(outcome.completed(), 0);
    assert_eq!(outcome.failed(), 1);
    let err = outcome.error.lock().expect("error lock").take();
    assert!(matches!(
        err,
        Some(ChartError::NothingCaptured { attempted: 6 })
    ));
}

#[tokio::test]
async fn one_shot_capture_surfaces_total_failure_as_error() {
    let result = capture_charts_with(
        Arc::new(funded_plan()),
        signal_config(),
        Arc::new(NullSurfaceFactory),
    )
    .await;
    assert!(matches!(result, Err(ChartError::NothingCaptured { .. })));
}

#[tokio::test]
async fn completion_callback_runs_once_per_snapshot() {
    let outcome = Arc::new(Outcome::default());
    let mut renderer = ChartCaptureRenderer::new(signal_config()).expect("renderer");
    let snapshot = Arc::new(funded_plan());

    assert!(renderer.set_snapshot(Arc::clone(&snapshot), outcome.callbacks()));
    assert_eq!(renderer.wait_for_cycle().await, CapturePhase::Completed);
    assert_eq!(renderer.phase(), CapturePhase::Completed);

    // Re-rendering with the same snapshot does not start another cycle.
    assert!(!renderer.set_snapshot(Arc::clone(&snapshot), outcome.callbacks()));
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(outcome.completed(), 1);
    assert_eq!(outcome.failed(), 0);
    assert_eq!(renderer.cycle_id(), Some(1));
    assert_eq!(outcome.images().len(), ChartKind::ALL.len());
}

#[tokio::test]
async fn equal_plans_capture_the_same_chart_set() {
    let mut renderer = ChartCaptureRenderer::new(signal_config()).expect("renderer");

    let first = Arc::new(Outcome::default());
    renderer.set_snapshot(Arc::new(funded_plan()), first.callbacks());
    renderer.wait_for_cycle().await;

    let second = Arc::new(Outcome::default());
    assert!(renderer.set_snapshot(Arc::new(funded_plan()), second.callbacks()));
    renderer.wait_for_cycle().await;

    let first_kinds: Vec<ChartKind> = first.images().kinds().collect();
    let second_kinds: Vec<ChartKind> = second.images().kinds().collect();
    assert_eq!(first_kinds, second_kinds);
    assert_eq!(renderer.cycle_id(), Some(2));
}

#[tokio::test]
async fn unmount_before_capture_invokes_no_callback() {
    let outcome = Arc::new(Outcome::default());
    let mut renderer =
        ChartCaptureRenderer::new(fixed_delay_config(Duration::from_millis(200))).expect("renderer");

    renderer.set_snapshot(Arc::new(funded_plan()), outcome.callbacks());
    renderer.unmount();
    assert_eq!(renderer.phase(), CapturePhase::Idle);
    assert!(renderer.current_snapshot().is_none());

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(outcome.completed(), 0);
    assert_eq!(outcome.failed(), 0);
}

#[tokio::test]
async fn dropping_renderer_cancels_pending_cycle() {
    let outcome = Arc::new(Outcome::default());
    {
        let mut renderer = ChartCaptureRenderer::new(fixed_delay_config(Duration::from_millis(200)))
            .expect("renderer");
        renderer.set_snapshot(Arc::new(funded_plan()), outcome.callbacks());
    }

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(outcome.completed(), 0);
    assert_eq!(outcome.failed(), 0);
}

#[tokio::test]
async fn new_snapshot_supersedes_pending_cycle() {
    let stale = Arc::new(Outcome::default());
    let fresh = Arc::new(Outcome::default());
    let mut renderer =
        ChartCaptureRenderer::new(fixed_delay_config(Duration::from_millis(200))).expect("renderer");

    renderer.set_snapshot(Arc::new(PlanSnapshot::default()), stale.callbacks());
    renderer.set_snapshot(Arc::new(funded_plan()), fresh.callbacks());
    assert_eq!(renderer.wait_for_cycle().await, CapturePhase::Completed);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(stale.completed() + stale.failed(), 0);
    assert_eq!(fresh.completed(), 1);
    assert_eq!(
        renderer
            .current_snapshot()
            .and_then(|snapshot| snapshot.plan_id.as_deref()),
        Some("plan-42")
    );
}

#[tokio::test]
async fn cancelled_handle_reports_cancelled_phase() {
    let outcome = Arc::new(Outcome::default());
    let mut handle = spawn_capture(
        7,
        Arc::new(funded_plan()),
        Arc::new(fixed_delay_config(Duration::from_millis(200))),
        Arc::new(PixmapSurfaceFactory),
        outcome.callbacks(),
    );

    assert_eq!(handle.cycle_id(), 7);
    handle.cancel();
    assert_eq!(handle.wait().await, CapturePhase::Cancelled);
    assert_eq!(handle.phase(), CapturePhase::Cancelled);
    assert_eq!(outcome.completed() + outcome.failed(), 0);
}

#[tokio::test]
async fn cancel_while_reading_surfaces_invokes_no_callback() {
    let reading = Arc::new(AtomicBool::new(false));
    let factory = Arc::new(SlowReadFactory::stalling(&reading, Duration::from_millis(300)));
    let outcome = Arc::new(Outcome::default());
    let mut handle = spawn_capture(
        3,
        Arc::new(funded_plan()),
        Arc::new(signal_config().with_kinds([ChartKind::ProfitLoss])),
        factory,
        outcome.callbacks(),
    );

    tokio::time::timeout(Duration::from_secs(5), async {
        while !reading.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("cycle started reading surfaces");
    assert_eq!(handle.phase(), CapturePhase::Capturing);

    handle.cancel();
    assert_eq!(handle.wait().await, CapturePhase::Cancelled);

    // Let the stalled read finish; its result must be discarded.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(outcome.completed() + outcome.failed(), 0);
    assert_eq!(handle.phase(), CapturePhase::Cancelled);
}

#[tokio::test]
async fn panicking_surface_read_reports_aborted_error() {
    let outcome = Arc::new(Outcome::default());
    let mut handle = spawn_capture(
        4,
        Arc::new(funded_plan()),
        Arc::new(signal_config().with_kinds([ChartKind::ProfitLoss])),
        Arc::new(SlowReadFactory::panicking()),
        outcome.callbacks(),
    );

    let phase = tokio::time::timeout(Duration::from_secs(5), handle.wait())
        .await
        .expect("cycle settled");
    assert_eq!(phase, CapturePhase::Failed);
    assert_eq!(outcome.completed(), 0);
    assert_eq!(outcome.failed(), 1);
    let err = outcome.error.lock().expect("error lock").take();
    match err {
        Some(ChartError::Aborted(reason)) => assert!(reason.contains("png encoder crashed")),
        other => panic!("expected an aborted cycle, got {other:?}"),
    }
}

#[tokio::test]
async fn panicking_painter_does_not_stall_render_signal() {
    let factory = Arc::new(CountingFactory {
        panics_for: Some(ChartKind::Forecast),
        ..CountingFactory::default()
    });
    let config = signal_config().with_settle_delay(Duration::ZERO);

    let images = tokio::time::timeout(
        Duration::from_secs(5),
        capture_charts_with(Arc::new(funded_plan()), config, factory),
    )
    .await
    .expect("readiness wait released")
    .expect("capture");

    assert_eq!(images.len(), ChartKind::ALL.len() - 1);
    assert!(!images.contains(ChartKind::Forecast));
}

#[tokio::test]
async fn panicking_completion_callback_ends_in_failed_phase() {
    let failed = Arc::new(AtomicUsize::new(0));
    let on_error_count = Arc::clone(&failed);
    let callbacks = CaptureCallbacks::new(
        |_| panic!("report sink unavailable"),
        move |_| {
            on_error_count.fetch_add(1, Ordering::SeqCst);
        },
    );
    let mut handle = spawn_capture(
        5,
        Arc::new(funded_plan()),
        Arc::new(signal_config().with_kinds([ChartKind::ProfitLoss])),
        Arc::new(PixmapSurfaceFactory),
        callbacks,
    );

    let phase = tokio::time::timeout(Duration::from_secs(5), handle.wait())
        .await
        .expect("cycle settled");
    assert_eq!(phase, CapturePhase::Failed);
    assert_eq!(failed.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn cancelled_cycle_skips_pending_paints() {
    let factory = Arc::new(CountingFactory::default());
    let outcome = Arc::new(Outcome::default());
    let mut handle = spawn_capture(
        6,
        Arc::new(funded_plan()),
        Arc::new(signal_config()),
        Arc::clone(&factory) as Arc<dyn SurfaceFactory>,
        outcome.callbacks(),
    );

    // Nothing has run yet on the current-thread runtime.
    handle.cancel();
    assert_eq!(handle.wait().await, CapturePhase::Cancelled);
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(factory.created.load(Ordering::SeqCst), 0);
    assert_eq!(outcome.completed() + outcome.failed(), 0);
}

#[tokio::test]
async fn overflowing_plan_figures_drop_only_the_affected_chart() {
    let huge = Decimal::from_i128_with_scale(7 * 10_i128.pow(27), 0);
    let plan = PlanSnapshot::default().with_monthly_totals(huge, Decimal::ZERO);
    assert!(plan.validate().is_err());

    let images = tokio::time::timeout(
        Duration::from_secs(5),
        capture_charts(Arc::new(plan), signal_config()),
    )
    .await
    .expect("capture settled")
    .expect("capture");

    assert!(!images.contains(ChartKind::Feasibility));
    assert!(images.contains(ChartKind::ProfitLoss));
}

#[test]
fn invalid_config_is_rejected_up_front() {
    let config = CaptureConfig::default().with_kinds(Vec::new());
    assert!(matches!(
        ChartCaptureRenderer::new(config),
        Err(ChartError::Config(_))
    ));

    let config = fixed_delay_config(Duration::ZERO);
    assert!(ChartCaptureRenderer::new(config).is_err());

    let config = signal_config().with_viewport(Viewport::new(100_000, 180));
    assert!(matches!(
        ChartCaptureRenderer::new(config),
        Err(ChartError::Config(_))
    ));
}

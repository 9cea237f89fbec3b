use plan_charts::capture::{CaptureConfig, capture_charts_with, decode_png_data_uri};
use plan_charts::core::PlanSnapshot;
use plan_charts::render::{PixmapSurfaceFactory, SurfaceFactory};
use plan_charts::report::ReportPayload;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const USAGE: &str =
    "usage: render_plan_charts --plan <plan.json> --out <dir> [--config <config.json>] [--cairo]";

#[derive(Debug)]
struct CliArgs {
    plan: PathBuf,
    out_dir: PathBuf,
    config: Option<PathBuf>,
    cairo: bool,
}

fn main() {
    let _ = plan_charts::telemetry::init_default_tracing();
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let args = parse_args()?;

    let plan = PlanSnapshot::from_json_str(&read_file(&args.plan)?).map_err(|err| err.to_string())?;
    plan.validate().map_err(|err| err.to_string())?;
    let config = match &args.config {
        Some(path) => CaptureConfig::from_json_str(&read_file(path)?).map_err(|err| err.to_string())?,
        None => CaptureConfig::default(),
    };
    let requested = config.kinds.clone();
    let factory = surface_factory(args.cairo)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .map_err(|err| format!("failed to start runtime: {err}"))?;
    let plan = Arc::new(plan);
    let captured = runtime.block_on(capture_charts_with(Arc::clone(&plan), config, factory));

    fs::create_dir_all(&args.out_dir)
        .map_err(|err| format!("failed to create `{}`: {err}", args.out_dir.display()))?;

    let payload = match captured {
        Ok(images) => {
            for (kind, data_uri) in images.iter() {
                let png = decode_png_data_uri(data_uri).map_err(|err| err.to_string())?;
                let path = args.out_dir.join(format!("{}.png", kind.as_tag()));
                fs::write(&path, png)
                    .map_err(|err| format!("failed to write `{}`: {err}", path.display()))?;
                println!("wrote {}", path.display());
            }
            ReportPayload::new(&plan, images, &requested).map_err(|err| err.to_string())?
        }
        Err(err) => {
            eprintln!("warning: {err}; report will contain no charts");
            ReportPayload::without_charts(&plan, &requested).map_err(|err| err.to_string())?
        }
    };

    let report_path = args.out_dir.join("report.json");
    let json = payload.to_json_pretty().map_err(|err| err.to_string())?;
    fs::write(&report_path, json)
        .map_err(|err| format!("failed to write `{}`: {err}", report_path.display()))?;
    println!("wrote {}", report_path.display());
    Ok(())
}

fn read_file(path: &Path) -> Result<String, String> {
    fs::read_to_string(path).map_err(|err| format!("failed to read `{}`: {err}", path.display()))
}

#[cfg(feature = "cairo-backend")]
fn surface_factory(cairo: bool) -> Result<Arc<dyn SurfaceFactory>, String> {
    if cairo {
        return Ok(Arc::new(plan_charts::render::CairoSurfaceFactory));
    }
    Ok(Arc::new(PixmapSurfaceFactory))
}

#[cfg(not(feature = "cairo-backend"))]
fn surface_factory(cairo: bool) -> Result<Arc<dyn SurfaceFactory>, String> {
    if cairo {
        return Err("--cairo requires feature `cairo-backend`".to_owned());
    }
    Ok(Arc::new(PixmapSurfaceFactory))
}

fn parse_args() -> Result<CliArgs, String> {
    let mut args = std::env::args().skip(1);
    let mut plan = None::<PathBuf>;
    let mut out_dir = None::<PathBuf>;
    let mut config = None::<PathBuf>;
    let mut cairo = false;

    while let Some(flag) = args.next() {
        match flag.as_str() {
            "--plan" => {
                let value = args
                    .next()
                    .ok_or_else(|| "missing value for --plan".to_owned())?;
                plan = Some(PathBuf::from(value));
            }
            "--out" => {
                let value = args
                    .next()
                    .ok_or_else(|| "missing value for --out".to_owned())?;
                out_dir = Some(PathBuf::from(value));
            }
            "--config" => {
                let value = args
                    .next()
                    .ok_or_else(|| "missing value for --config".to_owned())?;
                config = Some(PathBuf::from(value));
            }
            "--cairo" => cairo = true,
            "--help" | "-h" => return Err(USAGE.to_owned()),
            _ => return Err(format!("unknown argument `{flag}`\n{USAGE}")),
        }
    }

    Ok(CliArgs {
        plan: plan.ok_or_else(|| format!("missing --plan\n{USAGE}"))?,
        out_dir: out_dir.ok_or_else(|| format!("missing --out\n{USAGE}"))?,
        config,
        cairo,
    })
}

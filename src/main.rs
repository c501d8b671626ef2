mod adapters;
mod application;
mod cli;
mod domain;

use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::adapters::{
    alert::desktop::DesktopAlert,
    console::prompt::ConsolePrompt,
    onnx::{model_catalog::OnnxModelCatalog, yolo_engine::OnnxYoloEngine},
    storage::{config_store::JsonConfigStore, detection_log::JsonlDetectionLog},
    v4l2::{camera_repo::V4l2SourceCatalog, capture::V4l2Capture},
    window::minifb_display::MinifbDisplay,
};
use crate::application::{
    notifier::Notifier,
    ports::PromptPort,
    services::{load_config, StartupService},
    session::{SessionLoop, SessionPorts},
};
use crate::cli::Cli;
use crate::domain::{
    camera::{CaptureRequest, FrameSize},
    model::{ModelId, YoloParams},
    throttle::DEFAULT_COOLDOWN,
};

const APP_NAME: &str = "live-detect";
const CAPTURE_FPS: u32 = 30;

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    // Background runtime for alerts and async startup checks; the tick loop
    // stays on the main thread for the window.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;

    let startup = StartupService::new(Arc::new(V4l2SourceCatalog::new()), Arc::new(OnnxModelCatalog::new()));

    if cli.list_sources {
        let sources = runtime.block_on(startup.list_sources())?;
        if sources.is_empty() {
            println!("No video sources found.");
        }
        for s in sources {
            println!("{}: {}", s.path, s.describe());
        }
        return Ok(ExitCode::SUCCESS);
    }

    let store = JsonConfigStore::new(&cli.config);
    let mut config = load_config(&store);
    for rejected in cli.overrides().apply(&mut config) {
        tracing::warn!("{}", rejected);
    }

    // installed before any prompt so Ctrl+C also cancels a pending question
    let interrupted = Arc::new(AtomicBool::new(false));
    let handler_flag = interrupted.clone();
    if let Err(err) = ctrlc::set_handler(move || handler_flag.store(true, Ordering::SeqCst)) {
        tracing::warn!("Failed to install Ctrl+C handler: {err}");
    }

    let mut console = ConsolePrompt::stdio(interrupted.clone());
    console.notice("Live Object Detector");
    console.notice(&"=".repeat(50));

    let model = ModelId::from_path(&config.model_path);
    runtime
        .block_on(startup.validate_model(&model))
        .with_context(|| format!("Error loading model {}", model.onnx_path))?;
    let engine = OnnxYoloEngine::load(&model, YoloParams::default())
        .with_context(|| format!("Error loading model {}", model.onnx_path))?;

    let index = runtime.block_on(startup.resolve_source(&config, &mut console));
    if interrupted.load(Ordering::SeqCst) {
        console.notice("Interrupted by user");
        return Ok(ExitCode::SUCCESS);
    }
    let request = CaptureRequest {
        index,
        size: FrameSize { width: config.display_size.0, height: config.display_size.1 },
        fps: CAPTURE_FPS,
    };
    let capture = V4l2Capture::open(&request)
        .with_context(|| format!("Failed to open video source {}", index))?;
    let display = MinifbDisplay::open(APP_NAME, config.display_size)?;

    let notifier = Notifier::spawn(Arc::new(DesktopAlert::new(APP_NAME)), DEFAULT_COOLDOWN, runtime.handle());
    let detection_log = JsonlDetectionLog::new(&config.output_file);

    let ports = SessionPorts {
        source: Box::new(capture),
        detector: Box::new(engine),
        display: Box::new(display),
        console: Box::new(console),
        store: Box::new(store),
        detection_log: Box::new(detection_log),
    };
    let report = SessionLoop::new(config, ports, notifier, interrupted).run();

    tracing::debug!("Final settings: {:?}", report.config);

    // in-flight alerts never hold the exit
    runtime.shutdown_timeout(Duration::from_secs(1));

    Ok(if report.outcome.is_success() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

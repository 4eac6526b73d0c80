//! perimeterd - safety perimeter daemon
//!
//! This daemon:
//! 1. Loads the zone snapshot for the configured robot (fail-fast if absent)
//! 2. Runs a detector feed thread publishing into a latest-wins slot
//! 3. Evaluates each detection result: foot points -> zone membership ->
//!    hazard flags -> robot state transition
//! 4. Issues field-bus commands on state changes only
//! 5. Records zone events and drives the repeating hazard alerts
//! 6. Logs frame-rate and drop diagnostics periodically

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use perimeter_kernel::config::PerimeterdConfig;
use perimeter_kernel::{
    DetectorBackend, FpsEstimator, FrameEvaluator, LatestSlot, LogAnnouncer, RetryingRobot,
    RobotInterface, SafetyController, ScriptedBackend, SqliteEventLog, SqliteZoneStore,
    StateAggregator, ZoneClassifier, ZoneStore,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to the JSON config file (overrides PERIMETER_CONFIG).
    #[arg(long, env = "PERIMETER_CONFIG")]
    config: Option<PathBuf>,
    /// Start with the controller disabled until an operator enables it.
    #[arg(long)]
    start_disabled: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let cfg = PerimeterdConfig::load_with_path(args.config.as_deref())?;

    // Missing zones are the one fatal configuration error: refuse to watch
    // a floor we have no geometry for.
    let mut zone_store = SqliteZoneStore::open(&cfg.db_path)?;
    let zones = zone_store.load_zones(cfg.robot_id)?;
    log::info!(
        "loaded {} zone(s) for robot {} from {}",
        zones.len(),
        cfg.robot_id,
        cfg.db_path
    );

    let event_log = SqliteEventLog::open(&cfg.db_path)?;
    let robot = build_robot(&cfg)?;
    log::info!("robot transport: {}", robot.name());

    let controller = Arc::new(Mutex::new(SafetyController::new(
        robot,
        Box::new(event_log),
        Arc::new(LogAnnouncer),
        cfg.alerts_enabled,
        cfg.alert_intervals,
    )));

    let mut evaluator = FrameEvaluator::new(
        zones,
        cfg.foot_offsets,
        ZoneClassifier::new(cfg.slow_bias, cfg.stop_bias),
        StateAggregator::new(cfg.silence_policy),
    );

    if !args.start_disabled {
        controller
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .enable();
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || {
            shutdown.store(true, Ordering::SeqCst);
        })?;
    }

    let slot = Arc::new(LatestSlot::new());
    let feed = spawn_detector_feed(slot.clone(), shutdown.clone(), cfg.target_fps);

    let mut fps = FpsEstimator::new(cfg.target_fps.max(1) * 5);
    let mut last_health_log = Instant::now();
    let frame_interval = Duration::from_millis(1000 / u64::from(cfg.target_fps.max(1)));

    log::info!("perimeterd running. db={}", cfg.db_path);

    while !shutdown.load(Ordering::SeqCst) {
        let Some(result) = slot.take() else {
            std::thread::sleep(Duration::from_millis(5));
            continue;
        };

        let flags = evaluator.evaluate(&result);
        {
            let mut controller = controller.lock().unwrap_or_else(|e| e.into_inner());
            controller.apply_frame(flags);
        }
        fps.tick();

        if last_health_log.elapsed() >= Duration::from_secs(5) {
            let controller = controller.lock().unwrap_or_else(|e| e.into_inner());
            log::info!(
                "state={} ack={} fps={:.1} dropped_results={}",
                controller.state(),
                controller.command_acknowledged(),
                fps.fps(),
                slot.dropped()
            );
            last_health_log = Instant::now();
        }

        std::thread::sleep(frame_interval);
    }

    log::info!("shutting down: disabling controller");
    controller
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .disable();
    if feed.join().is_err() {
        log::error!("detector feed thread panicked");
    }
    Ok(())
}

fn build_robot(cfg: &PerimeterdConfig) -> Result<Box<dyn RobotInterface>> {
    #[cfg(feature = "robot-modbus")]
    {
        let robot = perimeter_kernel::robot::ModbusRobot::connect(
            &cfg.robot.address,
            cfg.robot.port,
            cfg.robot.slave_id,
        )?;
        return Ok(Box::new(RetryingRobot::new(robot)));
    }
    #[cfg(not(feature = "robot-modbus"))]
    {
        let _ = &cfg.robot;
        Ok(Box::new(RetryingRobot::new(
            perimeter_kernel::SimulatedRobot::new(),
        )))
    }
}

/// Detector feed: runs the backend at the target cadence and publishes each
/// result, newest wins. The real deployment swaps the scripted backend for
/// the production detector behind the same trait.
fn spawn_detector_feed(
    slot: Arc<LatestSlot<perimeter_kernel::DetectionResult>>,
    shutdown: Arc<AtomicBool>,
    target_fps: u32,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        let mut backend = ScriptedBackend::new();
        let interval = Duration::from_millis(1000 / u64::from(target_fps.max(1)));
        while !shutdown.load(Ordering::SeqCst) {
            match backend.detect(&[], 640, 480) {
                Ok(result) => slot.publish(result),
                Err(err) => log::warn!("detector feed error: {}", err),
            }
            std::thread::sleep(interval);
        }
    })
}

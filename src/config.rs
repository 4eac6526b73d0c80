use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::aggregate::SilencePolicy;
use crate::classifier::ZoneBias;
use crate::controller::AlertIntervals;
use crate::locator::FootOffsets;

const DEFAULT_DB_PATH: &str = "perimeter.db";
const DEFAULT_ROBOT_ADDRESS: &str = "192.168.0.2";
const DEFAULT_ROBOT_PORT: u16 = 502;
const DEFAULT_ROBOT_SLAVE_ID: u8 = 2;
const DEFAULT_ROBOT_ID: i64 = 1;
const DEFAULT_TARGET_FPS: u32 = 10;
const DEFAULT_STOP_ALERT_SECS: f64 = 2.0;
const DEFAULT_SLOW_ALERT_SECS: f64 = 5.0;

#[derive(Debug, Deserialize, Default)]
struct PerimeterdConfigFile {
    db_path: Option<String>,
    target_fps: Option<u32>,
    robot: Option<RobotConfigFile>,
    zones: Option<ZonesConfigFile>,
    locator: Option<FootOffsets>,
    classifier: Option<ClassifierConfigFile>,
    alerts: Option<AlertConfigFile>,
    silence: Option<SilenceConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct RobotConfigFile {
    address: Option<String>,
    port: Option<u16>,
    slave_id: Option<u8>,
}

#[derive(Debug, Deserialize, Default)]
struct ZonesConfigFile {
    robot_id: Option<i64>,
}

#[derive(Debug, Deserialize, Default)]
struct ClassifierConfigFile {
    slow: Option<ZoneBias>,
    stop: Option<ZoneBias>,
}

#[derive(Debug, Deserialize, Default)]
struct AlertConfigFile {
    enabled: Option<bool>,
    stop_interval_secs: Option<f64>,
    slow_interval_secs: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct SilenceConfigFile {
    policy: Option<String>,
    escalate_after_frames: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct PerimeterdConfig {
    pub db_path: String,
    pub target_fps: u32,
    pub robot: RobotSettings,
    pub robot_id: i64,
    pub foot_offsets: FootOffsets,
    pub slow_bias: ZoneBias,
    pub stop_bias: ZoneBias,
    pub alerts_enabled: bool,
    pub alert_intervals: AlertIntervals,
    pub silence_policy: SilencePolicy,
}

#[derive(Debug, Clone)]
pub struct RobotSettings {
    pub address: String,
    pub port: u16,
    pub slave_id: u8,
}

impl PerimeterdConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("PERIMETER_CONFIG").ok();
        Self::load_with_path(config_path.as_deref().map(Path::new))
    }

    pub fn load_with_path(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: PerimeterdConfigFile) -> Result<Self> {
        let db_path = file.db_path.unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
        let target_fps = file.target_fps.unwrap_or(DEFAULT_TARGET_FPS);
        let robot = RobotSettings {
            address: file
                .robot
                .as_ref()
                .and_then(|robot| robot.address.clone())
                .unwrap_or_else(|| DEFAULT_ROBOT_ADDRESS.to_string()),
            port: file
                .robot
                .as_ref()
                .and_then(|robot| robot.port)
                .unwrap_or(DEFAULT_ROBOT_PORT),
            slave_id: file
                .robot
                .as_ref()
                .and_then(|robot| robot.slave_id)
                .unwrap_or(DEFAULT_ROBOT_SLAVE_ID),
        };
        let robot_id = file
            .zones
            .and_then(|zones| zones.robot_id)
            .unwrap_or(DEFAULT_ROBOT_ID);
        let foot_offsets = file.locator.unwrap_or_default();
        let slow_bias = file
            .classifier
            .as_ref()
            .and_then(|c| c.slow)
            .unwrap_or_default();
        let stop_bias = file
            .classifier
            .as_ref()
            .and_then(|c| c.stop)
            .unwrap_or_default();
        let alerts_enabled = file
            .alerts
            .as_ref()
            .and_then(|alerts| alerts.enabled)
            .unwrap_or(true);
        let alert_intervals = AlertIntervals {
            stop: secs(
                file.alerts
                    .as_ref()
                    .and_then(|alerts| alerts.stop_interval_secs)
                    .unwrap_or(DEFAULT_STOP_ALERT_SECS),
            )?,
            slow: secs(
                file.alerts
                    .as_ref()
                    .and_then(|alerts| alerts.slow_interval_secs)
                    .unwrap_or(DEFAULT_SLOW_ALERT_SECS),
            )?,
        };
        let silence_policy = match file.silence {
            Some(silence) => parse_silence_policy(
                silence.policy.as_deref(),
                silence.escalate_after_frames,
            )?,
            None => SilencePolicy::default(),
        };
        Ok(Self {
            db_path,
            target_fps,
            robot,
            robot_id,
            foot_offsets,
            slow_bias,
            stop_bias,
            alerts_enabled,
            alert_intervals,
            silence_policy,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(db_path) = std::env::var("PERIMETER_DB_PATH") {
            if !db_path.trim().is_empty() {
                self.db_path = db_path;
            }
        }
        if let Ok(address) = std::env::var("PERIMETER_ROBOT_ADDR") {
            if !address.trim().is_empty() {
                self.robot.address = address;
            }
        }
        if let Ok(robot_id) = std::env::var("PERIMETER_ROBOT_ID") {
            self.robot_id = robot_id
                .parse()
                .map_err(|_| anyhow!("PERIMETER_ROBOT_ID must be an integer"))?;
        }
        if let Ok(alerts) = std::env::var("PERIMETER_ALERTS") {
            self.alerts_enabled = match alerts.trim() {
                "1" | "true" | "on" => true,
                "0" | "false" | "off" => false,
                other => {
                    return Err(anyhow!(
                        "PERIMETER_ALERTS must be one of 1/0/true/false/on/off, got '{}'",
                        other
                    ))
                }
            };
        }
        if let Ok(policy) = std::env::var("PERIMETER_SILENCE_POLICY") {
            let frames = std::env::var("PERIMETER_SILENCE_FRAMES")
                .ok()
                .map(|v| {
                    v.parse::<u32>()
                        .map_err(|_| anyhow!("PERIMETER_SILENCE_FRAMES must be an integer"))
                })
                .transpose()?;
            self.silence_policy = parse_silence_policy(Some(&policy), frames)?;
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        self.foot_offsets.validate()?;
        if self.target_fps == 0 {
            return Err(anyhow!("target_fps must be greater than zero"));
        }
        if self.alert_intervals.stop.is_zero() || self.alert_intervals.slow.is_zero() {
            return Err(anyhow!("alert intervals must be greater than zero"));
        }
        if self.alert_intervals.stop > self.alert_intervals.slow {
            return Err(anyhow!(
                "stop alert interval must not exceed the slow alert interval"
            ));
        }
        if let SilencePolicy::EscalateAfterFrames(frames) = self.silence_policy {
            if frames == 0 {
                return Err(anyhow!("silence escalation frame count must be >= 1"));
            }
        }
        Ok(())
    }
}

fn parse_silence_policy(policy: Option<&str>, frames: Option<u32>) -> Result<SilencePolicy> {
    match policy {
        None | Some("clear") => Ok(SilencePolicy::ClearImmediately),
        Some("escalate") => {
            let frames =
                frames.ok_or_else(|| anyhow!("escalate silence policy needs a frame count"))?;
            Ok(SilencePolicy::EscalateAfterFrames(frames))
        }
        Some(other) => Err(anyhow!(
            "silence policy must be 'clear' or 'escalate', got '{}'",
            other
        )),
    }
}

fn secs(value: f64) -> Result<Duration> {
    if !value.is_finite() || value < 0.0 {
        return Err(anyhow!("interval seconds must be a non-negative number"));
    }
    Ok(Duration::from_secs_f64(value))
}

fn read_config_file(path: &Path) -> Result<PerimeterdConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

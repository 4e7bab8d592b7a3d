// Rates, timeouts, topics and the robot configuration file
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::auto::{AutoConfig, AutoStep};
use crate::subsystems::ServoConfig;
use crate::swerve::{CharacterizationMode, KinematicLimits, ModuleConstants, SwerveKinematics};
use crate::teleop::{ControlBoardConfig, LimitProfiles, ShaperConfig};

// Control loop frequency
pub const LOOP_HZ: u64 = 50;

// Sensor sampling frequency for odometry
pub const ODOMETRY_HZ: u64 = 250;

// Driver input timeout for watchdog
pub const INPUT_TIMEOUT: Duration = Duration::from_millis(250);

// Zenoh topics
pub const TOPIC_DRIVER_INPUT: &str = "swerve/cmd/driver"; // operator input
pub const TOPIC_MODE: &str = "swerve/cmd/mode"; // disabled / teleop / autonomous
pub const TOPIC_STATUS: &str = "swerve/state/status"; // health and diagnostics

// Configuration file (extension resolved by the config crate) and env prefix
pub const DEFAULT_CONFIG_PATH: &str = "config/settings";
pub const ENV_PREFIX: &str = "SWERVE";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub loop_hz: u64,
    pub odometry_hz: u64,
    pub input_timeout_ms: u64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            loop_hz: LOOP_HZ,
            odometry_hz: ODOMETRY_HZ,
            input_timeout_ms: INPUT_TIMEOUT.as_millis() as u64,
        }
    }
}

impl ControlConfig {
    pub fn loop_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.loop_hz as f64)
    }

    pub fn odometry_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.odometry_hz as f64)
    }

    pub fn input_timeout(&self) -> Duration {
        Duration::from_millis(self.input_timeout_ms)
    }

    /// Sensor capture runs on its own task when it is faster than the loop
    pub fn decoupled_sampling(&self) -> bool {
        self.odometry_hz > self.loop_hz
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModuleConfig {
    pub name: String,
    /// Mounting location (x forward, y left), m
    pub location: [f64; 2],
    /// Steering calibration offset, rad
    #[serde(default)]
    pub offset: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DriveConfig {
    pub modules: Vec<ModuleConfig>,
    pub max_module_speed: f64,
    #[serde(default = "default_stop_epsilon")]
    pub stop_epsilon: f64,
    #[serde(default)]
    pub drive_ks: f64,
    #[serde(default)]
    pub drive_kv: f64,
    #[serde(default)]
    pub open_loop_teleop: bool,
    #[serde(default)]
    pub characterization: CharacterizationMode,
}

fn default_stop_epsilon() -> f64 {
    0.001
}

impl DriveConfig {
    pub fn module_constants(&self, module: &ModuleConfig) -> ModuleConstants {
        ModuleConstants {
            offset: module.offset,
            max_speed: self.max_module_speed,
            stop_epsilon: self.stop_epsilon,
            drive_ks: self.drive_ks,
            drive_kv: self.drive_kv,
            characterization: self.characterization,
        }
    }

    pub fn kinematics(&self) -> SwerveKinematics {
        SwerveKinematics::new(self.modules.iter().map(|m| m.location).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RobotConfig {
    #[serde(default)]
    pub control: ControlConfig,
    pub drive: DriveConfig,
    pub limits: LimitProfiles,
    #[serde(default)]
    pub operator: ShaperConfig,
    #[serde(default)]
    pub control_board: ControlBoardConfig,
    #[serde(default)]
    pub servos: Vec<ServoConfig>,
    #[serde(default)]
    pub autonomous: Option<AutoConfig>,
}

impl RobotConfig {
    /// Load from `path`, or from the default settings file, with
    /// `SWERVE__`-prefixed environment variables layered on top.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => {
                info!("Using configuration from {:?}", path);
                let name = path
                    .to_str()
                    .ok_or_else(|| invalid(format!("path {:?} is not valid UTF-8", path)))?;
                ::config::File::with_name(name)
            }
            None => {
                info!("Using default configuration {}", DEFAULT_CONFIG_PATH);
                ::config::File::with_name(DEFAULT_CONFIG_PATH)
            }
        };
        let settings = ::config::Config::builder()
            .add_source(file)
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;
        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = ::config::Config::builder()
            .add_source(::config::File::from_str(toml, ::config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let control = &self.control;
        if control.loop_hz == 0 || control.odometry_hz == 0 {
            return Err(invalid("loop and odometry rates must be positive"));
        }

        let drive = &self.drive;
        if drive.modules.is_empty() {
            return Err(invalid("drive needs at least one module"));
        }
        let mut names = BTreeSet::new();
        for module in &drive.modules {
            if !names.insert(module.name.as_str()) {
                return Err(invalid(format!("duplicate module {}", module.name)));
            }
            if !module.offset.is_finite() || !module.location.iter().all(|v| v.is_finite()) {
                return Err(invalid(format!("module {} has a non-finite value", module.name)));
            }
        }
        positive("drive.max_module_speed", drive.max_module_speed)?;
        if !(drive.stop_epsilon.is_finite() && drive.stop_epsilon >= 0.0) {
            return Err(invalid("drive.stop_epsilon must be finite and non-negative"));
        }
        if !(drive.drive_ks.is_finite() && drive.drive_kv.is_finite()) {
            return Err(invalid("drive feedforward gains must be finite"));
        }

        limits("limits.uncapped", &self.limits.uncapped)?;
        limits("limits.demo", &self.limits.demo)?;

        let operator = &self.operator;
        if !(0.0..1.0).contains(&operator.deadband) {
            return Err(invalid("operator.deadband must be in [0, 1)"));
        }
        if !(operator.max_turn_fraction > 0.0 && operator.max_turn_fraction <= 1.0) {
            return Err(invalid("operator.max_turn_fraction must be in (0, 1]"));
        }

        let mut servo_names = BTreeSet::new();
        for servo in &self.servos {
            if !servo_names.insert(servo.name.as_str()) {
                return Err(invalid(format!("duplicate servo {}", servo.name)));
            }
            if !(servo.min_position.is_finite()
                && servo.max_position.is_finite()
                && servo.min_position < servo.max_position)
            {
                return Err(invalid(format!("servo {} has an empty position range", servo.name)));
            }
            positive(&format!("servo {} tolerance", servo.name), servo.tolerance)?;
            positive(&format!("servo {} max_voltage", servo.name), servo.max_voltage)?;
            if let Some(preset) = servo
                .presets
                .iter()
                .find(|p| !(servo.min_position..=servo.max_position).contains(*p))
            {
                return Err(invalid(format!(
                    "servo {} preset {} is outside its range",
                    servo.name, preset
                )));
            }
        }

        if let Some(auto) = &self.autonomous {
            for step in &auto.steps {
                match step {
                    AutoStep::Wait { seconds } | AutoStep::Drive { seconds, .. }
                        if !(seconds.is_finite() && *seconds >= 0.0) =>
                    {
                        return Err(invalid(format!("{}: bad step duration", auto.name)));
                    }
                    AutoStep::Servo { name, .. } | AutoStep::ServoVoltage { name, .. }
                        if !servo_names.contains(name.as_str()) =>
                    {
                        return Err(invalid(format!("{}: unknown servo {}", auto.name, name)));
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }
}

fn positive(what: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{what} must be finite and positive")))
    }
}

fn limits(what: &str, limits: &KinematicLimits) -> Result<(), ConfigError> {
    positive(&format!("{what}.max_linear_velocity"), limits.max_linear_velocity)?;
    positive(&format!("{what}.max_angular_velocity"), limits.max_angular_velocity)
}

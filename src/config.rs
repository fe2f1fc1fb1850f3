//! Robot configuration
//!
//! One TOML file holds every tunable: loop period and startup phase, device
//! bindings, control constants, output port bindings and watchdog settings.
//! Every section has defaults, so a partial file (or none at all) still
//! yields a runnable configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::actuator::safety::SafetySettings;
use crate::actuator::{ActuatorChannel, OutputSettings};
use crate::controller::ControllerSettings;
use crate::mapping::{ControlCycle, DriveTuning, InputBindings, ManipulatorTuning};
use crate::robot::RobotPhase;

const CONFIG_DIR: &str = "hatchbot";
const CONFIG_FILE: &str = "robot.toml";
pub const CONFIG_ENV: &str = "HATCHBOT_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("No user configuration directory available")]
    NoConfigDir,

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ControlSettings {
    /// Scheduler period in milliseconds
    pub period_ms: u64,
    /// Phase requested at startup
    pub startup_phase: RobotPhase,
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            period_ms: 20,
            startup_phase: RobotPhase::Teleop,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct InputSettings {
    pub drive_stick: usize,
    pub arm_stick: usize,
    pub speed_toggle_button: u8,
    pub joystick_deadzone: f32,
    pub poll_interval_us: u64,
}

impl Default for InputSettings {
    fn default() -> Self {
        let bindings = InputBindings::default();
        let controller = ControllerSettings::default();
        Self {
            drive_stick: bindings.drive_stick,
            arm_stick: bindings.arm_stick,
            speed_toggle_button: bindings.speed_toggle_button,
            joystick_deadzone: controller.joystick_deadzone,
            poll_interval_us: controller.poll_interval_us,
        }
    }
}

impl InputSettings {
    pub fn bindings(&self) -> InputBindings {
        InputBindings {
            drive_stick: self.drive_stick,
            arm_stick: self.arm_stick,
            speed_toggle_button: self.speed_toggle_button,
        }
    }

    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            joystick_deadzone: self.joystick_deadzone,
            device_slots: self.drive_stick.max(self.arm_stick) + 1,
            poll_interval_us: self.poll_interval_us,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct RobotConfig {
    pub control: ControlSettings,
    pub input: InputSettings,
    pub drive: DriveTuning,
    pub manipulator: ManipulatorTuning,
    pub output: OutputSettings,
    pub safety: SafetySettings,
}

impl RobotConfig {
    /// Loads from `path`, or from the user config directory
    ///
    /// Without an explicit path a missing file is created with defaults.
    pub async fn load(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path,
            None => {
                let path = default_config_path()?;
                Self::ensure_default_config(&path).await?;
                path
            }
        };

        let config = Self::read_from(&path).await?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub async fn read_from(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Writes the default configuration if no file exists at `path`
    pub async fn ensure_default_config(path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if tokio::fs::try_exists(path).await.map_err(io_err)? {
            debug!("Configuration file {} exists", path.display());
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let content = Self::default().to_toml_string()?;
        tokio::fs::write(path, content).await.map_err(io_err)?;
        info!("Wrote default configuration to {}", path.display());
        Ok(())
    }

    pub fn period(&self) -> Duration {
        Duration::from_millis(self.control.period_ms)
    }

    pub fn control_cycle(&self) -> ControlCycle {
        ControlCycle::new(
            self.input.bindings(),
            self.drive.clone(),
            self.manipulator.clone(),
        )
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.control.period_ms == 0 {
            return Err(invalid("control.period_ms must be positive"));
        }

        if self.input.drive_stick == self.input.arm_stick {
            return Err(invalid("input.drive_stick and input.arm_stick must differ"));
        }
        if self.input.speed_toggle_button == 0 {
            return Err(invalid("input.speed_toggle_button is 1-based"));
        }
        if !(0.0..1.0).contains(&self.input.joystick_deadzone) {
            return Err(invalid("input.joystick_deadzone must be in [0, 1)"));
        }

        for (name, value) in [
            ("drive.high_speed_scale", self.drive.high_speed_scale),
            ("drive.low_speed_scale", self.drive.low_speed_scale),
            ("drive.turn_scale", self.drive.turn_scale),
            ("manipulator.hatch_power", self.manipulator.hatch_power),
            ("manipulator.cargo_power", self.manipulator.cargo_power),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(&format!("{name} must be in [0, 1], got {value}")));
            }
        }
        if !(0.0..1.0).contains(&self.manipulator.cargo_deadband) {
            return Err(invalid("manipulator.cargo_deadband must be in [0, 1)"));
        }

        if self.output.pwm_period_ms == 0 {
            return Err(invalid("output.pwm_period_ms must be positive"));
        }
        let mut ports = HashSet::new();
        for channel in ActuatorChannel::ALL {
            let binding = self.output.channels.get(channel);
            if binding.ports.is_empty() {
                return Err(invalid(&format!("{channel} has no output ports")));
            }
            for port in &binding.ports {
                if !ports.insert(*port) {
                    return Err(invalid(&format!("port {port} is bound more than once")));
                }
            }
        }

        if self.safety.expiration_ms <= self.control.period_ms {
            return Err(invalid(&format!(
                "safety.expiration_ms ({}) must exceed control.period_ms ({})",
                self.safety.expiration_ms, self.control.period_ms
            )));
        }

        Ok(())
    }
}

/// Path from the environment, else `<config dir>/hatchbot/robot.toml`
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }
    let mut path = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    path.push(CONFIG_DIR);
    path.push(CONFIG_FILE);
    Ok(path)
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Invalid(message.to_string())
}

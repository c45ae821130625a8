//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{ArbError, Result};

/// Full arbiter configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
#[derive(Default)]
pub struct Config {
    pub engine: EngineConfig,
    pub arbitration: ArbitrationConfig,
    pub audit: AuditConfig,
    pub paths: PathsConfig,
}

/// Rule-engine thresholds and the anti-oscillation window.
///
/// Fixed at engine construction; never mutated during operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Below this, human reliability is critically low (hard safety rule A).
    pub critical_low_threshold: f64,
    /// Below this, a reliability score counts as degraded (hard safety rule B,
    /// fatigue flagging).
    pub low_threshold: f64,
    /// At or above this, a reliability score is considered excellent.
    pub high_threshold: f64,
    /// Minimum dwell time after a committed mode change, in seconds.
    pub minimum_mode_duration_secs: f64,
    /// Below this, a reported docking reliability counts as suboptimal.
    pub docking_degraded_threshold: f64,
}

/// Arbitration loop cadence and initial state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ArbitrationConfig {
    /// Interval between arbitration cycles in milliseconds.
    pub tick_interval_ms: u64,
    /// Interval between status snapshots in milliseconds.
    pub status_interval_ms: u64,
    /// Control mode at startup.
    pub initial_mode: String,
    /// Mission phase assumed before the first phase feed arrives.
    pub initial_phase: String,
    /// Task criticality assumed before the first criticality feed arrives.
    pub initial_criticality: String,
}

/// Audit trail sink settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AuditConfig {
    /// Maximum audit file size before rotation (bytes).
    pub max_size_bytes: u64,
    /// Number of rotated files to keep.
    pub max_rotated_files: u32,
    /// Seconds between forced fsync calls.
    pub fsync_interval_secs: u64,
}

/// Filesystem paths used by the arbiter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    pub audit_log: PathBuf,
    /// RAM-backed fallback for the audit log when the primary is unwritable.
    pub audit_fallback: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            critical_low_threshold: 0.5,
            low_threshold: 0.6,
            high_threshold: 0.8,
            minimum_mode_duration_secs: 120.0,
            docking_degraded_threshold: 0.7,
        }
    }
}

impl Default for ArbitrationConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 500,
            status_interval_ms: 5_000,
            initial_mode: "human".to_string(),
            initial_phase: "Transit".to_string(),
            initial_criticality: "Routine".to_string(),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: 100 * 1024 * 1024, // 100 MiB
            max_rotated_files: 5,
            fsync_interval_secs: 10,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home_dir = env::var_os("HOME").map_or_else(
            || {
                eprintln!(
                    "[ARB-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths"
                );
                PathBuf::from("/tmp")
            },
            PathBuf::from,
        );
        let cfg = home_dir.join(".config").join("arb").join("config.toml");
        let data = home_dir.join(".local").join("share").join("arb");
        Self {
            config_file: cfg,
            audit_log: data.join("audit.jsonl"),
            audit_fallback: Some(PathBuf::from("/dev/shm/arb-audit.jsonl")),
        }
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from the default path;
    /// defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| ArbError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(ArbError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        // engine
        set_env_f64(
            "ARB_ENGINE_CRITICAL_LOW_THRESHOLD",
            &mut self.engine.critical_low_threshold,
        )?;
        set_env_f64("ARB_ENGINE_LOW_THRESHOLD", &mut self.engine.low_threshold)?;
        set_env_f64("ARB_ENGINE_HIGH_THRESHOLD", &mut self.engine.high_threshold)?;
        set_env_f64(
            "ARB_ENGINE_MINIMUM_MODE_DURATION_SECS",
            &mut self.engine.minimum_mode_duration_secs,
        )?;
        set_env_f64(
            "ARB_ENGINE_DOCKING_DEGRADED_THRESHOLD",
            &mut self.engine.docking_degraded_threshold,
        )?;

        // arbitration
        set_env_u64(
            "ARB_ARBITRATION_TICK_INTERVAL_MS",
            &mut self.arbitration.tick_interval_ms,
        )?;
        set_env_u64(
            "ARB_ARBITRATION_STATUS_INTERVAL_MS",
            &mut self.arbitration.status_interval_ms,
        )?;
        if let Ok(raw) = env::var("ARB_ARBITRATION_INITIAL_MODE") {
            self.arbitration.initial_mode = raw;
        }
        if let Ok(raw) = env::var("ARB_ARBITRATION_INITIAL_PHASE") {
            self.arbitration.initial_phase = raw;
        }

        // audit
        set_env_u64("ARB_AUDIT_MAX_SIZE_BYTES", &mut self.audit.max_size_bytes)?;
        set_env_u32(
            "ARB_AUDIT_MAX_ROTATED_FILES",
            &mut self.audit.max_rotated_files,
        )?;
        set_env_u64(
            "ARB_AUDIT_FSYNC_INTERVAL_SECS",
            &mut self.audit.fsync_interval_secs,
        )?;

        // paths
        if let Ok(raw) = env::var("ARB_PATHS_AUDIT_LOG") {
            self.paths.audit_log = PathBuf::from(raw);
        }
        if let Ok(raw) = env::var("ARB_PATHS_AUDIT_FALLBACK") {
            self.paths.audit_fallback = if raw.is_empty() {
                None
            } else {
                Some(PathBuf::from(raw))
            };
        }

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        for (name, val) in [
            ("critical_low_threshold", self.engine.critical_low_threshold),
            ("low_threshold", self.engine.low_threshold),
            ("high_threshold", self.engine.high_threshold),
            (
                "docking_degraded_threshold",
                self.engine.docking_degraded_threshold,
            ),
        ] {
            if !(0.0..=1.0).contains(&val) {
                return Err(ArbError::InvalidConfig {
                    details: format!("engine.{name} must be in [0, 1], got {val}"),
                });
            }
        }

        if !(self.engine.critical_low_threshold < self.engine.low_threshold
            && self.engine.low_threshold < self.engine.high_threshold)
        {
            return Err(ArbError::InvalidConfig {
                details: "engine thresholds must strictly ascend: critical_low < low < high"
                    .to_string(),
            });
        }

        if self.engine.minimum_mode_duration_secs <= 0.0
            || !self.engine.minimum_mode_duration_secs.is_finite()
        {
            return Err(ArbError::InvalidConfig {
                details: format!(
                    "engine.minimum_mode_duration_secs must be positive and finite, got {}",
                    self.engine.minimum_mode_duration_secs
                ),
            });
        }

        if self.arbitration.tick_interval_ms == 0 {
            return Err(ArbError::InvalidConfig {
                details: "arbitration.tick_interval_ms must be nonzero".to_string(),
            });
        }

        self.arbitration
            .initial_mode
            .parse::<crate::authority::types::ControlMode>()
            .map_err(|e| ArbError::InvalidConfig {
                details: format!("arbitration.initial_mode: {e}"),
            })?;

        if self.audit.max_rotated_files == 0 {
            return Err(ArbError::InvalidConfig {
                details: "audit.max_rotated_files must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

// ──────────────────────── env helpers ────────────────────────

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok()
}

fn set_env_f64(name: &str, target: &mut f64) -> Result<()> {
    if let Some(raw) = env_var(name) {
        *target = raw.trim().parse::<f64>().map_err(|e| ArbError::InvalidConfig {
            details: format!("{name}: {e}"),
        })?;
    }
    Ok(())
}

fn set_env_u64(name: &str, target: &mut u64) -> Result<()> {
    if let Some(raw) = env_var(name) {
        *target = raw.trim().parse::<u64>().map_err(|e| ArbError::InvalidConfig {
            details: format!("{name}: {e}"),
        })?;
    }
    Ok(())
}

fn set_env_u32(name: &str, target: &mut u32) -> Result<()> {
    if let Some(raw) = env_var(name) {
        *target = raw.trim().parse::<u32>().map_err(|e| ArbError::InvalidConfig {
            details: format!("{name}: {e}"),
        })?;
    }
    Ok(())
}

// ──────────────────────── tests ────────────────────────

use crate::error::{CaptureError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// When a capture session counts as complete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletionPolicy {
    /// Every checkpoint of the field must be captured
    AllCaptured,
    /// At least this many checkpoints must be captured
    AtLeast(usize),
}

impl CompletionPolicy {
    /// Whether `captured` out of `total` checkpoints satisfies the policy
    pub fn is_complete(&self, captured: usize, total: usize) -> bool {
        if total == 0 {
            return false;
        }
        match self {
            CompletionPolicy::AllCaptured => captured >= total,
            CompletionPolicy::AtLeast(n) => captured >= (*n).min(total),
        }
    }
}

impl fmt::Display for CompletionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionPolicy::AllCaptured => f.write_str("all"),
            CompletionPolicy::AtLeast(n) => write!(f, "{}", n),
        }
    }
}

/// Layered configuration for OrbitCap
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    pub captures_root: ConfigValue<PathBuf>,
    pub backend_url: ConfigValue<String>,
    pub ring_count: ConfigValue<u8>,
    pub points_per_ring: ConfigValue<usize>,
    pub ring_radius: ConfigValue<f32>,
    pub distance_threshold: ConfigValue<f32>,
    pub elevation_threshold: ConfigValue<f32>,
    pub motion_threshold: ConfigValue<f64>,
    pub completion: ConfigValue<CompletionPolicy>,
    pub auto_capture_interval_ms: ConfigValue<u64>,
    pub feedback_delay_ms: ConfigValue<u64>,
    pub use_depth: ConfigValue<bool>,
}

impl LayeredConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        Self {
            captures_root: ConfigValue::new(PathBuf::from("captures"), ConfigSource::Default),
            backend_url: ConfigValue::new(
                "http://127.0.0.1:3001".to_string(),
                ConfigSource::Default,
            ),
            ring_count: ConfigValue::new(1, ConfigSource::Default),
            points_per_ring: ConfigValue::new(20, ConfigSource::Default),
            ring_radius: ConfigValue::new(0.15, ConfigSource::Default),
            distance_threshold: ConfigValue::new(0.4, ConfigSource::Default),
            elevation_threshold: ConfigValue::new(15.0, ConfigSource::Default),
            motion_threshold: ConfigValue::new(0.02, ConfigSource::Default),
            completion: ConfigValue::new(CompletionPolicy::AllCaptured, ConfigSource::Default),
            auto_capture_interval_ms: ConfigValue::new(1000, ConfigSource::Default),
            feedback_delay_ms: ConfigValue::new(3000, ConfigSource::Default),
            use_depth: ConfigValue::new(true, ConfigSource::Default),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| CaptureError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to read config file: {}", e),
            })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| CaptureError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        if let Some(root) = file_config.captures_root {
            self.captures_root.update(root, ConfigSource::File);
        }
        if let Some(url) = file_config.backend_url {
            self.backend_url.update(url, ConfigSource::File);
        }
        if let Some(rings) = file_config.ring_count {
            self.ring_count.update(validate_ring_count(rings)?, ConfigSource::File);
        }
        if let Some(points) = file_config.points_per_ring {
            self.points_per_ring.update(validate_points(points)?, ConfigSource::File);
        }
        if let Some(radius) = file_config.ring_radius {
            self.ring_radius.update(radius, ConfigSource::File);
        }
        if let Some(distance) = file_config.distance_threshold {
            self.distance_threshold.update(distance, ConfigSource::File);
        }
        if let Some(elevation) = file_config.elevation_threshold {
            self.elevation_threshold.update(elevation, ConfigSource::File);
        }
        if let Some(motion) = file_config.motion_threshold {
            self.motion_threshold.update(motion, ConfigSource::File);
        }
        if let Some(completion) = file_config.completion {
            self.completion.update(parse_completion(&completion)?, ConfigSource::File);
        }
        if let Some(interval) = file_config.auto_capture_interval_ms {
            self.auto_capture_interval_ms
                .update(validate_interval(interval)?, ConfigSource::File);
        }
        if let Some(delay) = file_config.feedback_delay_ms {
            self.feedback_delay_ms.update(delay, ConfigSource::File);
        }
        if let Some(use_depth) = file_config.use_depth {
            self.use_depth.update(use_depth, ConfigSource::File);
        }

        Ok(self)
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        if let Ok(root) = env::var("ORBITCAP_CAPTURES_ROOT") {
            self.captures_root.update(PathBuf::from(root), ConfigSource::Environment);
        }

        if let Ok(url) = env::var("ORBITCAP_BACKEND_URL") {
            self.backend_url.update(url, ConfigSource::Environment);
        }

        if let Some(rings) =
            env_parsed("ORBITCAP_RING_COUNT", "1 or 2", |s| validate_ring_count(s.parse().ok()?).ok())
        {
            self.ring_count.update(rings, ConfigSource::Environment);
        }

        if let Some(points) = env_parsed("ORBITCAP_POINTS_PER_RING", "positive integer", |s| {
            validate_points(s.parse().ok()?).ok()
        }) {
            self.points_per_ring.update(points, ConfigSource::Environment);
        }

        if let Some(radius) = env_parsed("ORBITCAP_RING_RADIUS", "metres", |s| s.parse().ok()) {
            self.ring_radius.update(radius, ConfigSource::Environment);
        }

        if let Some(distance) =
            env_parsed("ORBITCAP_DISTANCE_THRESHOLD", "metres", |s| s.parse().ok())
        {
            self.distance_threshold.update(distance, ConfigSource::Environment);
        }

        if let Some(elevation) =
            env_parsed("ORBITCAP_ELEVATION_THRESHOLD", "degrees", |s| s.parse().ok())
        {
            self.elevation_threshold.update(elevation, ConfigSource::Environment);
        }

        if let Some(motion) = env_parsed("ORBITCAP_MOTION_THRESHOLD", "number", |s| s.parse().ok())
        {
            self.motion_threshold.update(motion, ConfigSource::Environment);
        }

        if let Some(completion) =
            env_parsed("ORBITCAP_COMPLETION", "all or an integer", |s| parse_completion(s).ok())
        {
            self.completion.update(completion, ConfigSource::Environment);
        }

        if let Some(interval) =
            env_parsed("ORBITCAP_AUTO_CAPTURE_INTERVAL_MS", "positive milliseconds", |s| {
                validate_interval(s.parse().ok()?).ok()
            })
        {
            self.auto_capture_interval_ms.update(interval, ConfigSource::Environment);
        }

        if let Some(delay) =
            env_parsed("ORBITCAP_FEEDBACK_DELAY_MS", "milliseconds", |s| s.parse().ok())
        {
            self.feedback_delay_ms.update(delay, ConfigSource::Environment);
        }

        if let Some(use_depth) =
            env_parsed("ORBITCAP_USE_DEPTH", "true or false", |s| parse_bool(s).ok())
        {
            self.use_depth.update(use_depth, ConfigSource::Environment);
        }

        self
    }

    /// Update configuration from CLI arguments
    pub fn update_from_cli(&mut self, overrides: CliConfigOverrides) {
        if let Some(root) = overrides.captures_root {
            self.captures_root.update(root, ConfigSource::Cli);
        }

        if let Some(url) = overrides.backend_url {
            self.backend_url.update(url, ConfigSource::Cli);
        }

        if let Some(rings) = overrides.ring_count {
            self.ring_count.update(rings, ConfigSource::Cli);
        }

        if let Some(points) = overrides.points_per_ring {
            self.points_per_ring.update(points, ConfigSource::Cli);
        }

        if let Some(completion) = overrides.completion {
            self.completion.update(completion, ConfigSource::Cli);
        }

        if let Some(use_depth) = overrides.use_depth {
            self.use_depth.update(use_depth, ConfigSource::Cli);
        }
    }

    /// Get all configuration values as a map for inspection
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        let mut map = HashMap::new();

        map.insert(
            "captures_root".to_string(),
            (self.captures_root.value.display().to_string(), self.captures_root.source),
        );
        map.insert(
            "backend_url".to_string(),
            (self.backend_url.value.clone(), self.backend_url.source),
        );
        map.insert(
            "ring_count".to_string(),
            (self.ring_count.value.to_string(), self.ring_count.source),
        );
        map.insert(
            "points_per_ring".to_string(),
            (self.points_per_ring.value.to_string(), self.points_per_ring.source),
        );
        map.insert(
            "ring_radius".to_string(),
            (format!("{} m", self.ring_radius.value), self.ring_radius.source),
        );
        map.insert(
            "distance_threshold".to_string(),
            (format!("{} m", self.distance_threshold.value), self.distance_threshold.source),
        );
        map.insert(
            "elevation_threshold".to_string(),
            (format!("{}°", self.elevation_threshold.value), self.elevation_threshold.source),
        );
        map.insert(
            "motion_threshold".to_string(),
            (self.motion_threshold.value.to_string(), self.motion_threshold.source),
        );
        map.insert(
            "completion".to_string(),
            (self.completion.value.to_string(), self.completion.source),
        );
        map.insert(
            "auto_capture_interval_ms".to_string(),
            (
                self.auto_capture_interval_ms.value.to_string(),
                self.auto_capture_interval_ms.source,
            ),
        );
        map.insert(
            "feedback_delay_ms".to_string(),
            (self.feedback_delay_ms.value.to_string(), self.feedback_delay_ms.source),
        );
        map.insert(
            "use_depth".to_string(),
            (self.use_depth.value.to_string(), self.use_depth.source),
        );

        map
    }
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    captures_root: Option<PathBuf>,
    backend_url: Option<String>,
    ring_count: Option<u8>,
    points_per_ring: Option<usize>,
    ring_radius: Option<f32>,
    distance_threshold: Option<f32>,
    elevation_threshold: Option<f32>,
    motion_threshold: Option<f64>,
    completion: Option<String>,
    auto_capture_interval_ms: Option<u64>,
    feedback_delay_ms: Option<u64>,
    use_depth: Option<bool>,
}

/// CLI configuration overrides
#[derive(Debug, Default)]
pub struct CliConfigOverrides {
    pub captures_root: Option<PathBuf>,
    pub backend_url: Option<String>,
    pub ring_count: Option<u8>,
    pub points_per_ring: Option<usize>,
    pub completion: Option<CompletionPolicy>,
    pub use_depth: Option<bool>,
}

fn env_parsed<T>(key: &str, expected: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
    let raw = env::var(key).ok()?;
    let parsed = parse(&raw);
    if parsed.is_none() {
        tracing::warn!("Invalid {} value '{}': expected {}", key, raw, expected);
    }
    parsed
}

fn validate_ring_count(rings: u8) -> Result<u8> {
    match rings {
        1 | 2 => Ok(rings),
        _ => Err(CaptureError::ConfigInvalid {
            key: "ring_count".to_string(),
            reason: format!("Unsupported ring count {}. Use 1 or 2", rings),
        }),
    }
}

fn validate_points(points: usize) -> Result<usize> {
    if points == 0 {
        return Err(CaptureError::ConfigInvalid {
            key: "points_per_ring".to_string(),
            reason: "A ring needs at least one checkpoint".to_string(),
        });
    }
    Ok(points)
}

fn validate_interval(interval_ms: u64) -> Result<u64> {
    if interval_ms == 0 {
        return Err(CaptureError::ConfigInvalid {
            key: "auto_capture_interval_ms".to_string(),
            reason: "Auto capture needs an interval of at least 1 ms".to_string(),
        });
    }
    Ok(interval_ms)
}

/// Parse completion policy from string
pub fn parse_completion(s: &str) -> Result<CompletionPolicy> {
    let trimmed = s.trim();
    if trimmed.eq_ignore_ascii_case("all") {
        return Ok(CompletionPolicy::AllCaptured);
    }
    match trimmed.parse::<usize>() {
        Ok(n) if n > 0 => Ok(CompletionPolicy::AtLeast(n)),
        _ => Err(CaptureError::ConfigInvalid {
            key: "completion".to_string(),
            reason: format!("Invalid completion policy: {}. Use all or a positive count", s),
        }),
    }
}

/// Parse boolean flag from string
pub fn parse_bool(s: &str) -> Result<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(CaptureError::ConfigInvalid {
            key: "use_depth".to_string(),
            reason: format!("Invalid boolean: {}. Use true or false", s),
        }),
    }
}

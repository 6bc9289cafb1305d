use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure for the QA automator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Retry policy configuration
    #[serde(default)]
    pub retry: RetryConfig,

    /// Timeouts for external collaborators
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Case grouping policy
    #[serde(default)]
    pub grouping: GroupingConfig,

    /// Navigation memory tuning
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Filesystem locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Device automation settings
    #[serde(default)]
    pub device: DeviceConfig,

    /// External flow producer command
    #[serde(default)]
    pub producer: ProducerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Retry policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Maximum attempts per case (1-10)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt in milliseconds, 0 disables backoff
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Upper bound for the delay between attempts in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

const fn default_max_attempts() -> u32 {
    10
}

const fn default_initial_backoff_ms() -> u64 {
    1000
}

const fn default_max_backoff_ms() -> u64 {
    30_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// Timeouts for the flow producer and the execution collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TimeoutConfig {
    #[serde(default = "default_timeout_secs")]
    pub producer_secs: u64,

    #[serde(default = "default_timeout_secs")]
    pub execution_secs: u64,
}

const fn default_timeout_secs() -> u64 {
    120
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            producer_secs: default_timeout_secs(),
            execution_secs: default_timeout_secs(),
        }
    }
}

/// Case grouping policy
///
/// See `services::case_grouper` for the rule these settings drive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GroupingConfig {
    /// Maximum cases in one scenario before the group is split
    #[serde(default = "default_max_cases_per_scenario")]
    pub max_cases_per_scenario: usize,

    /// Group cases without a journey tag by their suite path
    #[serde(default = "default_true")]
    pub group_by_suite: bool,

    /// Tag prefixes that declare a journey, e.g. `journey:checkout`
    #[serde(default = "default_journey_prefixes")]
    pub journey_tag_prefixes: Vec<String>,
}

const fn default_max_cases_per_scenario() -> usize {
    5
}

const fn default_true() -> bool {
    true
}

fn default_journey_prefixes() -> Vec<String> {
    vec!["journey".to_string(), "scenario".to_string()]
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            max_cases_per_scenario: default_max_cases_per_scenario(),
            group_by_suite: default_true(),
            journey_tag_prefixes: default_journey_prefixes(),
        }
    }
}

/// Navigation memory tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MemoryConfig {
    /// Share of remaining headroom gained on a confirming observation
    #[serde(default = "default_reinforce_rate")]
    pub reinforce_rate: f64,

    /// Share of confidence lost by a hypothesis that failed
    #[serde(default = "default_penalty_rate")]
    pub penalty_rate: f64,

    /// Share of confidence lost by hypotheses contradicted by a success
    #[serde(default = "default_contradiction_rate")]
    pub contradiction_rate: f64,

    /// Initial confidence of heuristic hypotheses
    #[serde(default = "default_heuristic_confidence")]
    pub heuristic_confidence: f64,

    /// Initial confidence of newly observed hypotheses
    #[serde(default = "default_observed_confidence")]
    pub observed_confidence: f64,
}

const fn default_reinforce_rate() -> f64 {
    0.3
}

const fn default_penalty_rate() -> f64 {
    0.3
}

const fn default_contradiction_rate() -> f64 {
    0.1
}

const fn default_heuristic_confidence() -> f64 {
    0.3
}

const fn default_observed_confidence() -> f64 {
    0.5
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            reinforce_rate: default_reinforce_rate(),
            penalty_rate: default_penalty_rate(),
            contradiction_rate: default_contradiction_rate(),
            heuristic_confidence: default_heuristic_confidence(),
            observed_confidence: default_observed_confidence(),
        }
    }
}

/// Filesystem locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PathsConfig {
    /// Directory holding the navigation memory and attempt state snapshots
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    /// Directory for reports, logs and screenshots
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: PathBuf,

    /// Directory where generated flows are stored
    #[serde(default = "default_flows_dir")]
    pub flows_dir: PathBuf,
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(".qa-automator/state")
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("artifacts")
}

fn default_flows_dir() -> PathBuf {
    PathBuf::from("artifacts/flows")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
            artifacts_dir: default_artifacts_dir(),
            flows_dir: default_flows_dir(),
        }
    }
}

/// Device automation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DeviceConfig {
    /// Path to the maestro binary
    #[serde(default = "default_maestro_bin")]
    pub maestro_bin: String,

    /// Device id, `None` lets maestro choose
    #[serde(default)]
    pub device: Option<String>,

    /// Application id under test
    #[serde(default = "default_app_id")]
    pub app_id: String,

    /// App build to install (`.apk`, `.app`), relative to the project root
    #[serde(default)]
    pub app_path: Option<PathBuf>,

    /// Install the app before running a scenario's first attempt
    #[serde(default)]
    pub install_app: bool,

    /// With `install_app`, install only before the first scenario of the run
    #[serde(default = "default_true")]
    pub install_once: bool,

    /// Uninstall and reinstall at every scenario boundary so each scenario
    /// starts from fresh app state, onboarding included
    #[serde(default)]
    pub reinstall_per_scenario: bool,
}

fn default_maestro_bin() -> String {
    "maestro".to_string()
}

fn default_app_id() -> String {
    "default".to_string()
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            maestro_bin: default_maestro_bin(),
            device: None,
            app_id: default_app_id(),
            app_path: None,
            install_app: false,
            install_once: default_true(),
            reinstall_per_scenario: false,
        }
    }
}

/// External flow producer command
///
/// The command receives a JSON request on stdin and prints a JSON flow
/// descriptor on stdout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProducerConfig {
    #[serde(default)]
    pub command: Option<String>,

    #[serde(default)]
    pub args: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files, stderr only when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
        }
    }
}

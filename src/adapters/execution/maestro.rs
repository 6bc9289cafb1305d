//! Maestro CLI execution collaborator.
//!
//! Runs `maestro [--device <id>] test -e APP_ID=<app> <flow>` as a child
//! process, keeps the combined output as a log file under the artifacts
//! directory and, when the flow fails, tries to grab a screenshot of the
//! device.
//!
//! When configured, the app build is installed before a scenario's first
//! attempt, either once per run or as a clean uninstall and reinstall at
//! every scenario boundary so onboarding state never leaks between
//! scenarios.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::fs;
use tokio::process::Command;

use crate::domain::models::{DeviceConfig, DeviceTarget, FlowArtifact};
use crate::domain::ports::{ExecutionCollaborator, ExecutionError, ExecutionOutcome};

/// Longest log tail carried in a failure message.
const EXCERPT_MAX_CHARS: usize = 4000;

/// When to install the app build.
#[derive(Debug, Clone, Default)]
pub struct InstallPolicy {
    pub app_path: Option<PathBuf>,
    pub install_app: bool,
    pub install_once: bool,
    pub reinstall_per_scenario: bool,
}

impl InstallPolicy {
    pub fn from_device(device: &DeviceConfig) -> Self {
        Self {
            app_path: device.app_path.clone(),
            install_app: device.install_app,
            install_once: device.install_once,
            reinstall_per_scenario: device.reinstall_per_scenario,
        }
    }
}

/// Maestro execution configuration.
#[derive(Debug, Clone)]
pub struct MaestroConfig {
    pub binary_path: String,
    pub artifacts_dir: PathBuf,
    /// Capture a screenshot after a failed run.
    pub screenshot_on_failure: bool,
    pub install: InstallPolicy,
}

impl MaestroConfig {
    pub fn new(device: &DeviceConfig, artifacts_dir: impl Into<PathBuf>) -> Self {
        Self {
            binary_path: device.maestro_bin.clone(),
            artifacts_dir: artifacts_dir.into(),
            screenshot_on_failure: true,
            install: InstallPolicy::from_device(device),
        }
    }
}

/// What a scenario boundary requires of the device.
#[derive(Debug, Clone, PartialEq, Eq)]
enum InstallStep {
    Skip,
    Install(PathBuf),
    Reinstall(PathBuf),
}

pub struct MaestroExecutor {
    config: MaestroConfig,
    installed: AtomicBool,
}

impl MaestroExecutor {
    pub fn new(config: MaestroConfig) -> Self {
        Self {
            config,
            installed: AtomicBool::new(false),
        }
    }

    fn install_step(&self) -> InstallStep {
        let policy = &self.config.install;
        let Some(app_path) = policy.app_path.clone() else {
            return InstallStep::Skip;
        };
        if policy.reinstall_per_scenario {
            InstallStep::Reinstall(app_path)
        } else if !policy.install_app
            || (policy.install_once && self.installed.load(Ordering::SeqCst))
        {
            InstallStep::Skip
        } else {
            InstallStep::Install(app_path)
        }
    }

    fn test_command(&self, flow: &FlowArtifact, target: &DeviceTarget) -> Command {
        let mut cmd = self.base_command(target);
        cmd.arg("test");
        if !target.app_id.is_empty() {
            cmd.arg("-e").arg(format!("APP_ID={}", target.app_id));
        }
        cmd.arg(&flow.location);
        cmd
    }

    fn base_command(&self, target: &DeviceTarget) -> Command {
        let mut cmd = Command::new(&self.config.binary_path);
        if let Some(device) = &target.device {
            cmd.arg("--device").arg(device);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    fn log_path(&self, flow: &FlowArtifact) -> PathBuf {
        self.config
            .artifacts_dir
            .join("logs")
            .join(format!("{}.log", flow_stem(&flow.location)))
    }

    async fn run_tool(&self, mut cmd: Command) -> Result<Output, ExecutionError> {
        cmd.output().await.map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => ExecutionError::Launch(format!(
                "maestro binary not found: {}",
                self.config.binary_path
            )),
            _ => ExecutionError::Io(err),
        })
    }

    async fn write_log(&self, name: &str, body: &str) -> Result<String, ExecutionError> {
        let dir = self.config.artifacts_dir.join("logs");
        fs::create_dir_all(&dir).await?;
        let path = dir.join(name);
        fs::write(&path, body).await?;
        Ok(path.display().to_string())
    }

    /// Uninstall failures are logged and ignored: the app may simply not
    /// be installed yet.
    async fn reinstall(
        &self,
        scenario_id: &str,
        app_path: &Path,
        target: &DeviceTarget,
    ) -> Result<Vec<String>, ExecutionError> {
        let mut uninstall = self.base_command(target);
        uninstall.arg("uninstall").arg(&target.app_id);
        let uninstall_log = match self.run_tool(uninstall).await {
            Ok(output) => format!("uninstall_exit={}\n{}", output.status, combined_output(&output)),
            Err(err) => {
                tracing::debug!(scenario_id, error = %err, "app uninstall failed");
                format!("uninstall failed: {err}")
            }
        };

        let mut install = self.base_command(target);
        install.arg("install").arg(app_path);
        let output = self.run_tool(install).await?;
        let body = format!(
            "scenario_boundary={scenario_id}\n{uninstall_log}\ninstall_exit={}\n{}",
            output.status,
            combined_output(&output)
        );
        let log = self
            .write_log(&format!("{}-app-reinstall.log", safe_file_name(scenario_id)), &body)
            .await?;
        if !output.status.success() {
            return Err(ExecutionError::AppInstall {
                message: format!("reinstall exited with {}: {}", output.status, excerpt(&body)),
                evidence: vec![log],
            });
        }
        Ok(vec![log])
    }

    async fn install(
        &self,
        scenario_id: &str,
        app_path: &Path,
        target: &DeviceTarget,
    ) -> Result<Vec<String>, ExecutionError> {
        let mut install = self.base_command(target);
        install.arg("install").arg(app_path);
        let output = self.run_tool(install).await?;
        let body = combined_output(&output);
        let name = if self.config.install.install_once {
            "app-install.log".to_string()
        } else {
            format!("{}-app-install.log", safe_file_name(scenario_id))
        };
        let log = self.write_log(&name, &body).await?;
        if !output.status.success() {
            return Err(ExecutionError::AppInstall {
                message: format!("install exited with {}: {}", output.status, excerpt(&body)),
                evidence: vec![log],
            });
        }
        Ok(vec![log])
    }

    /// Best effort; a missing screenshot never fails the attempt.
    async fn capture_screenshot(&self, flow: &FlowArtifact, target: &DeviceTarget) -> Option<String> {
        let dir = self.config.artifacts_dir.join("screenshots");
        fs::create_dir_all(&dir).await.ok()?;
        let shot = dir.join(format!("{}.png", flow_stem(&flow.location)));

        let mut cmd = self.base_command(target);
        cmd.arg("screenshot").arg(&shot);
        match cmd.output().await {
            Ok(output) if output.status.success() => Some(shot.display().to_string()),
            Ok(output) => {
                tracing::debug!(status = %output.status, "maestro screenshot failed");
                None
            }
            Err(err) => {
                tracing::debug!(error = %err, "maestro screenshot could not be launched");
                None
            }
        }
    }
}

#[async_trait]
impl ExecutionCollaborator for MaestroExecutor {
    fn name(&self) -> &'static str {
        "maestro"
    }

    async fn execute(
        &self,
        flow: &FlowArtifact,
        target: &DeviceTarget,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        let cmd = self.test_command(flow, target);

        tracing::debug!(flow = %flow.location.display(), device = ?target.device, "running maestro flow");
        let output = self.run_tool(cmd).await?;
        let combined = combined_output(&output);

        let log_path = self.log_path(flow);
        if let Some(parent) = log_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&log_path, &combined).await?;
        let mut evidence = vec![log_path.display().to_string()];

        if output.status.success() {
            return Ok(ExecutionOutcome::Success {
                evidence,
                observed_path: None,
            });
        }

        if self.config.screenshot_on_failure {
            if let Some(shot) = self.capture_screenshot(flow, target).await {
                evidence.push(shot);
            }
        }

        let cause = classify_failure(&combined);
        tracing::debug!(status = %output.status, cause, "maestro flow failed");
        if cause == "timeout" {
            return Ok(ExecutionOutcome::TimedOut { evidence });
        }
        Ok(ExecutionOutcome::Failure {
            message: format!("maestro exited with {}: {}", output.status, excerpt(&combined)),
            evidence,
            cause: Some(cause.to_string()),
        })
    }

    async fn prepare_scenario(
        &self,
        scenario_id: &str,
        target: &DeviceTarget,
    ) -> Result<Vec<String>, ExecutionError> {
        let evidence = match self.install_step() {
            InstallStep::Skip => return Ok(Vec::new()),
            InstallStep::Reinstall(app_path) => {
                tracing::info!(scenario_id, app = %target.app_id, "reinstalling app for scenario");
                self.reinstall(scenario_id, &app_path, target).await?
            }
            InstallStep::Install(app_path) => {
                tracing::info!(scenario_id, app_path = %app_path.display(), "installing app");
                self.install(scenario_id, &app_path, target).await?
            }
        };
        self.installed.store(true, Ordering::SeqCst);
        Ok(evidence)
    }
}

fn combined_output(output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    [stdout.trim(), stderr.trim()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn safe_file_name(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') { c } else { '_' })
        .collect()
}

/// Classify Maestro output into a coarse failure cause.
pub fn classify_failure(output: &str) -> &'static str {
    let lower = output.to_lowercase();
    if lower.contains("timed out") || lower.contains("timeout") {
        "timeout"
    } else if lower.contains("element") && lower.contains("not found") {
        "element_not_found"
    } else if lower.contains("assert") && lower.contains("failed") {
        "assertion_failed"
    } else if lower.contains("yaml") && (lower.contains("parse") || lower.contains("invalid")) {
        "invalid_yaml"
    } else {
        "unknown_maestro_failure"
    }
}

/// Tail of the output, which is where Maestro prints the failing command.
fn excerpt(output: &str) -> &str {
    let count = output.chars().count();
    if count <= EXCERPT_MAX_CHARS {
        return output;
    }
    let skip = count - EXCERPT_MAX_CHARS;
    match output.char_indices().nth(skip) {
        Some((index, _)) => &output[index..],
        None => output,
    }
}

fn flow_stem(location: &Path) -> String {
    location
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "flow".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_failure() {
        assert_eq!(classify_failure("Element not found: Text matching \"Login\""), "element_not_found");
        assert_eq!(classify_failure("Assertion is false: assertVisible failed"), "assertion_failed");
        assert_eq!(classify_failure("Command timed out"), "timeout");
        assert_eq!(classify_failure("Invalid YAML at line 3"), "invalid_yaml");
        assert_eq!(classify_failure("something else"), "unknown_maestro_failure");
    }

    #[test]
    fn test_excerpt_keeps_tail() {
        let long = format!("{}END", "x".repeat(EXCERPT_MAX_CHARS + 10));
        let tail = excerpt(&long);
        assert_eq!(tail.chars().count(), EXCERPT_MAX_CHARS);
        assert!(tail.ends_with("END"));
        assert_eq!(excerpt("short"), "short");
    }

    fn executor(artifacts_dir: &Path, install: InstallPolicy) -> MaestroExecutor {
        MaestroExecutor::new(MaestroConfig {
            binary_path: "definitely-not-a-maestro-binary".into(),
            artifacts_dir: artifacts_dir.to_path_buf(),
            screenshot_on_failure: false,
            install,
        })
    }

    fn args(cmd: &Command) -> Vec<String> {
        cmd.as_std()
            .get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_flow_command_passes_device_and_app_id() {
        let executor = executor(Path::new("artifacts"), InstallPolicy::default());
        let target = DeviceTarget {
            device: Some("emulator-5554".into()),
            app_id: "com.example.shop".into(),
        };
        let cmd = executor.test_command(&FlowArtifact::new("flows/TC-1.yaml"), &target);
        assert_eq!(
            args(&cmd),
            vec![
                "--device",
                "emulator-5554",
                "test",
                "-e",
                "APP_ID=com.example.shop",
                "flows/TC-1.yaml"
            ]
        );

        let bare = executor.test_command(&FlowArtifact::new("f.yaml"), &DeviceTarget::default());
        assert_eq!(args(&bare), vec!["test", "f.yaml"]);
    }

    #[test]
    fn test_install_step_follows_policy() {
        let app = PathBuf::from("build/app.apk");
        let policy = |install_app, install_once, reinstall_per_scenario| InstallPolicy {
            app_path: Some(app.clone()),
            install_app,
            install_once,
            reinstall_per_scenario,
        };

        let dir = Path::new("artifacts");
        assert_eq!(executor(dir, InstallPolicy::default()).install_step(), InstallStep::Skip);
        assert_eq!(executor(dir, policy(false, true, false)).install_step(), InstallStep::Skip);

        let once = executor(dir, policy(true, true, false));
        assert_eq!(once.install_step(), InstallStep::Install(app.clone()));
        once.installed.store(true, Ordering::SeqCst);
        assert_eq!(once.install_step(), InstallStep::Skip);

        let every_scenario = executor(dir, policy(true, false, false));
        every_scenario.installed.store(true, Ordering::SeqCst);
        assert_eq!(every_scenario.install_step(), InstallStep::Install(app.clone()));

        let reinstall = executor(dir, policy(false, true, true));
        reinstall.installed.store(true, Ordering::SeqCst);
        assert_eq!(reinstall.install_step(), InstallStep::Reinstall(app));
    }

    #[tokio::test]
    async fn test_prepare_without_install_does_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let executor = executor(dir.path(), InstallPolicy::default());
        let evidence = executor
            .prepare_scenario("auth", &DeviceTarget::default())
            .await
            .unwrap();
        assert!(evidence.is_empty());
        assert!(!dir.path().join("logs").exists());
    }

    #[tokio::test]
    async fn test_failed_install_is_retried_next_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let executor = executor(
            dir.path(),
            InstallPolicy {
                app_path: Some("build/app.apk".into()),
                install_app: true,
                install_once: true,
                reinstall_per_scenario: false,
            },
        );
        let result = executor.prepare_scenario("auth", &DeviceTarget::default()).await;
        assert!(matches!(result, Err(ExecutionError::Launch(_))));
        assert!(!executor.installed.load(Ordering::SeqCst));
        assert!(matches!(executor.install_step(), InstallStep::Install(_)));
    }

    #[test]
    fn test_safe_file_name() {
        assert_eq!(safe_file_name("journey:auth / login"), "journey_auth___login");
    }

    #[tokio::test]
    async fn test_missing_binary_is_launch_error() {
        let dir = tempfile::tempdir().unwrap();
        let executor = executor(dir.path(), InstallPolicy::default());
        let result = executor
            .execute(&FlowArtifact::new("flow.yaml"), &DeviceTarget::default())
            .await;
        assert!(matches!(result, Err(ExecutionError::Launch(_))));
    }
}

//! Project root and configuration shared by the commands.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::adapters::execution::MaestroConfig;
use crate::domain::models::{Config, DeviceTarget};
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::logging::LogConfig;

/// Directory under the project root that holds project configuration.
pub const PROJECT_DIR: &str = ".qa-automator";

#[derive(Debug, Clone)]
pub struct ProjectContext {
    pub root: PathBuf,
    pub config: Config,
}

impl ProjectContext {
    pub fn load(root: &Path) -> Result<Self> {
        let config = ConfigLoader::load_from_dir(root)
            .with_context(|| format!("Failed to load configuration for {}", root.display()))?;
        Ok(Self::new(root, config))
    }

    pub fn new(root: impl Into<PathBuf>, config: Config) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    /// Relative paths in the configuration are relative to the project root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn state_dir(&self) -> PathBuf {
        self.resolve(&self.config.paths.state_dir)
    }

    pub fn artifacts_dir(&self) -> PathBuf {
        self.resolve(&self.config.paths.artifacts_dir)
    }

    pub fn flows_dir(&self) -> PathBuf {
        self.resolve(&self.config.paths.flows_dir)
    }

    pub fn log_config(&self) -> LogConfig {
        let mut log_config = LogConfig::from(&self.config.logging);
        log_config.log_dir = log_config.log_dir.map(|dir| self.resolve(&dir));
        log_config
    }

    /// Maestro settings with the app build path resolved.
    pub fn maestro_config(&self) -> MaestroConfig {
        let mut maestro = MaestroConfig::new(&self.config.device, self.artifacts_dir());
        maestro.install.app_path = maestro.install.app_path.map(|path| self.resolve(&path));
        maestro
    }

    pub fn device_target(&self) -> DeviceTarget {
        DeviceTarget {
            device: self.config.device.device.clone(),
            app_id: self.config.device.app_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_paths_resolve_against_root() {
        let mut config = Config::default();
        config.paths.artifacts_dir = PathBuf::from("/tmp/qa-artifacts");
        config.logging.log_dir = Some(PathBuf::from("logs"));
        let ctx = ProjectContext::new("/work/app", config);

        assert_eq!(ctx.state_dir(), PathBuf::from("/work/app/.qa-automator/state"));
        assert_eq!(ctx.artifacts_dir(), PathBuf::from("/tmp/qa-artifacts"));
        assert_eq!(ctx.log_config().log_dir, Some(PathBuf::from("/work/app/logs")));
    }

    #[test]
    fn test_maestro_config_resolves_app_path() {
        let mut config = Config::default();
        config.device.app_id = "com.example.shop".into();
        config.device.app_path = Some(PathBuf::from("build/app.apk"));
        config.device.reinstall_per_scenario = true;
        let ctx = ProjectContext::new("/work/app", config);

        let maestro = ctx.maestro_config();
        assert_eq!(maestro.install.app_path, Some(PathBuf::from("/work/app/build/app.apk")));
        assert!(maestro.install.reinstall_per_scenario);
        assert_eq!(maestro.artifacts_dir, PathBuf::from("/work/app/artifacts"));
        assert_eq!(ctx.device_target().app_id, "com.example.shop");
    }
}

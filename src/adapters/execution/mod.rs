//! Execution collaborator adapters.

pub mod maestro;
pub mod scripted;

pub use maestro::{InstallPolicy, MaestroConfig, MaestroExecutor};
pub use scripted::{ScriptedExecutor, ScriptedRun};

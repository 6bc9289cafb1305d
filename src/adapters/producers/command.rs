//! Flow producer backed by an external command.
//!
//! The command receives the [`FlowRequest`] as JSON on stdin and must
//! print one JSON object on stdout:
//!
//! ```json
//! {"flow_path": "artifacts/flows/TC-1.yaml", "navigation_path": ["Home", "Login"]}
//! ```
//!
//! or, when it refuses the case:
//!
//! ```json
//! {"error": "steps reference a physical device button", "unsupported": true}
//! ```

use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::domain::models::{FlowArtifact, NavigationPath, ProducerConfig};
use crate::domain::ports::{FlowProducer, FlowRequest, ProducerError};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CommandReply {
    Flow {
        flow_path: PathBuf,
        #[serde(default)]
        navigation_path: Option<Vec<String>>,
    },
    Refusal {
        error: String,
        #[serde(default)]
        unsupported: bool,
    },
}

/// Command producer configuration.
#[derive(Debug, Clone)]
pub struct CommandProducerConfig {
    pub program: String,
    pub args: Vec<String>,
    /// Exported to the command as `QA_AUTOMATOR_FLOWS_DIR`.
    pub flows_dir: PathBuf,
}

impl CommandProducerConfig {
    /// Build from the producer section; `None` when no command is set.
    pub fn from_producer(producer: &ProducerConfig, flows_dir: impl Into<PathBuf>) -> Option<Self> {
        let program = producer.command.as_ref()?.trim();
        if program.is_empty() {
            return None;
        }
        Some(Self {
            program: program.to_string(),
            args: producer.args.clone(),
            flows_dir: flows_dir.into(),
        })
    }
}

pub struct CommandFlowProducer {
    config: CommandProducerConfig,
}

impl CommandFlowProducer {
    pub fn new(config: CommandProducerConfig) -> Self {
        Self { config }
    }

    fn parse_reply(&self, stdout: &str) -> Result<FlowArtifact, ProducerError> {
        let line = stdout
            .lines()
            .rev()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .ok_or_else(|| ProducerError::ContractViolation("producer printed nothing".to_string()))?;

        let reply: CommandReply = serde_json::from_str(line).map_err(|err| {
            ProducerError::ContractViolation(format!("unparseable producer reply: {err}"))
        })?;

        match reply {
            CommandReply::Flow {
                flow_path,
                navigation_path,
            } => {
                if flow_path.as_os_str().is_empty() {
                    return Err(ProducerError::ContractViolation(
                        "producer returned an empty flow path".to_string(),
                    ));
                }
                let flow = FlowArtifact::new(flow_path);
                Ok(match navigation_path {
                    Some(steps) => flow.with_navigation_path(NavigationPath::new(steps)),
                    None => flow,
                })
            }
            CommandReply::Refusal {
                error,
                unsupported: true,
            } => Err(ProducerError::UnsupportedCase(error)),
            CommandReply::Refusal { error, .. } => Err(ProducerError::ContractViolation(error)),
        }
    }
}

#[async_trait]
impl FlowProducer for CommandFlowProducer {
    fn name(&self) -> &'static str {
        "command"
    }

    async fn produce_flow(&self, request: FlowRequest) -> Result<FlowArtifact, ProducerError> {
        let payload = serde_json::to_vec(&request)
            .map_err(|err| ProducerError::ContractViolation(format!("request not serializable: {err}")))?;

        let mut child = Command::new(&self.config.program)
            .args(&self.config.args)
            .env("QA_AUTOMATOR_FLOWS_DIR", &self.config.flows_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| match err.kind() {
                std::io::ErrorKind::NotFound => ProducerError::Unavailable(format!(
                    "producer command not found: {}",
                    self.config.program
                )),
                _ => ProducerError::Io(err),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&payload).await?;
            stdin.shutdown().await?;
        }

        let output = child.wait_with_output().await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProducerError::ContractViolation(format!(
                "producer exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let flow = self.parse_reply(&stdout)?;
        tracing::debug!(
            case_id = %request.case.id,
            attempt = request.attempt,
            flow = %flow.location.display(),
            "producer returned flow"
        );
        Ok(flow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn producer() -> CommandFlowProducer {
        CommandFlowProducer::new(CommandProducerConfig {
            program: "cat".into(),
            args: vec![],
            flows_dir: "flows".into(),
        })
    }

    #[test]
    fn test_parse_flow_reply() {
        let flow = producer()
            .parse_reply("log line\n{\"flow_path\": \"a.yaml\", \"navigation_path\": [\"Home\"]}\n")
            .unwrap();
        assert_eq!(flow.location, PathBuf::from("a.yaml"));
        assert_eq!(flow.navigation_path.unwrap().steps(), ["Home".to_string()]);
    }

    #[test]
    fn test_parse_refusals() {
        let unsupported = producer().parse_reply(r#"{"error": "needs NFC", "unsupported": true}"#);
        assert!(matches!(unsupported, Err(ProducerError::UnsupportedCase(_))));

        let violation = producer().parse_reply(r#"{"error": "model overloaded"}"#);
        assert!(matches!(violation, Err(ProducerError::ContractViolation(_))));

        assert!(matches!(
            producer().parse_reply("   \n"),
            Err(ProducerError::ContractViolation(_))
        ));
        assert!(matches!(
            producer().parse_reply(r#"{"flow_path": ""}"#),
            Err(ProducerError::ContractViolation(_))
        ));
    }

    #[test]
    fn test_config_requires_command() {
        let mut section = ProducerConfig::default();
        assert!(CommandProducerConfig::from_producer(&section, "flows").is_none());
        section.command = Some("./produce.sh".into());
        let config = CommandProducerConfig::from_producer(&section, "flows").unwrap();
        assert_eq!(config.program, "./produce.sh");
    }
}

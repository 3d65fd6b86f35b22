use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::contract::Converter;
use crate::error::ConvertError;
use crate::format::Format;

/// Any stdout line containing this marks the conversion as failed, whatever
/// the exit status.
pub const ERROR_MARKER: &str = "ERROR";

/// PDF <-> DOCX helper shipped in `scripts/`, run by the default command.
pub const DEFAULT_OFFICE_SCRIPT: &str =
    concat!(env!("CARGO_MANIFEST_DIR"), "/scripts/office_convert.py");

/// An external program invocation. Each argument may contain the placeholders
/// `{mode}` (`pdf2docx` or `docx2pdf`), `{input}` and `{output}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for ExternalCommand {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            args: [DEFAULT_OFFICE_SCRIPT, "{mode}", "{input}", "{output}"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl ExternalCommand {
    fn render_args(&self, mode: &str, input: &Path, output: &Path) -> Vec<String> {
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{mode}", mode)
                    .replace("{input}", &input)
                    .replace("{output}", &output)
            })
            .collect()
    }
}

/// Converts between PDF and DOCX by running an external program.
///
/// Arguments are passed directly to the program (no shell), and the scratch
/// paths it receives are built from sanitized filenames.
pub struct OfficeProcess {
    command: ExternalCommand,
    timeout: Duration,
}

impl OfficeProcess {
    pub fn new(command: ExternalCommand, timeout: Duration) -> Self {
        Self { command, timeout }
    }
}

fn mode_for(source_format: Format, target: Format) -> Option<&'static str> {
    match (source_format, target) {
        (Format::Pdf, Format::Docx) => Some("pdf2docx"),
        (Format::Docx, Format::Pdf) => Some("docx2pdf"),
        _ => None,
    }
}

#[async_trait]
impl Converter for OfficeProcess {
    async fn convert(
        &self,
        source: &Path,
        output: &Path,
        source_format: Format,
        target: Format,
    ) -> Result<(), ConvertError> {
        let mode = mode_for(source_format, target).ok_or(ConvertError::Unsupported {
            source_format,
            target,
        })?;
        let args = self.command.render_args(mode, source, output);
        let program = &self.command.program;
        info!(program = %program, ?args, "Running external converter");

        let mut cmd = Command::new(program);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let outcome = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                error!(error = ?e, program = %program, "Failed to launch external converter");
                return Err(ConvertError::Process(format!(
                    "could not launch '{program}': {e}"
                )));
            }
            Err(_) => {
                error!(program = %program, timeout_secs = self.timeout.as_secs(), "External converter timed out");
                return Err(ConvertError::Process(format!(
                    "'{program}' timed out after {}s",
                    self.timeout.as_secs()
                )));
            }
        };

        let stdout = String::from_utf8_lossy(&outcome.stdout);
        let stderr = String::from_utf8_lossy(&outcome.stderr);
        debug!(status = ?outcome.status, stdout = %stdout.trim(), stderr = %stderr.trim(), "External converter finished");

        if let Some(line) = stdout.lines().find(|l| l.contains(ERROR_MARKER)) {
            error!(line = %line, "External converter reported an error");
            return Err(ConvertError::ProcessReported(line.trim().to_string()));
        }
        if !outcome.status.success() {
            let detail = if stderr.trim().is_empty() {
                stdout.trim()
            } else {
                stderr.trim()
            };
            return Err(ConvertError::Process(format!(
                "'{program}' exited with {}: {detail}",
                outcome.status
            )));
        }
        if tokio::fs::metadata(output).await.is_err() {
            return Err(ConvertError::Process(format!(
                "'{program}' reported success but wrote no output"
            )));
        }
        Ok(())
    }
}

//! Native share through a host share command.
//!
//! The command receives the text on stdin. `termux-share` (Android share
//! sheet under Termux) is picked up automatically; anything else has to be
//! configured. Share failures and cancellations are logged and swallowed.

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Title shown on the share sheet.
pub const SHARE_TITLE: &str = "AI 얼굴 분석 결과";

const TERMUX_SHARE: &str = "termux-share";

#[derive(Error, Debug)]
pub enum ShareError {
    #[error("failed to start share command {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("share command I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("share cancelled or failed (exit status {0})")]
    Cancelled(std::process::ExitStatus),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharePayload {
    pub title: String,
    pub text: String,
    pub url: Option<String>,
}

impl SharePayload {
    pub fn new(text: &str, url: Option<&str>) -> Self {
        Self {
            title: SHARE_TITLE.to_string(),
            text: text.to_string(),
            url: url.map(str::to_string),
        }
    }

    /// Body written to the share command: the text, then the URL on its own line.
    pub fn body(&self) -> String {
        match &self.url {
            Some(url) => format!("{}\n\n{url}", self.text),
            None => self.text.clone(),
        }
    }
}

#[async_trait]
pub trait ShareTarget: Send + Sync {
    async fn share(&self, payload: &SharePayload) -> Result<(), ShareError>;
}

/// A share command, e.g. `termux-share -a send` or a user script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandShare {
    program: PathBuf,
    args: Vec<OsString>,
    termux: bool,
}

impl CommandShare {
    /// Parse a configured command line (whitespace separated, no quoting).
    pub fn from_command_line(command: &str) -> Option<Self> {
        let mut words = command.split_whitespace();
        let program = PathBuf::from(words.next()?);
        let termux = program.file_name().is_some_and(|n| n == TERMUX_SHARE);
        Some(Self {
            program,
            args: words.map(OsString::from).collect(),
            termux,
        })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command(&self, payload: &SharePayload) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if self.termux && self.args.is_empty() {
            cmd.args(["-a", "send", "-c", "text/plain", "-t"]).arg(&payload.title);
        }
        cmd.env("SHARE_TITLE", &payload.title);
        if let Some(url) = &payload.url {
            cmd.env("SHARE_URL", url);
        }
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        cmd
    }
}

#[async_trait]
impl ShareTarget for CommandShare {
    async fn share(&self, payload: &SharePayload) -> Result<(), ShareError> {
        let mut child = self
            .command(payload)
            .spawn()
            .map_err(|source| ShareError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(payload.body().as_bytes()).await?;
            stdin.shutdown().await?;
        }

        let status = child.wait().await?;
        if status.success() {
            Ok(())
        } else {
            Err(ShareError::Cancelled(status))
        }
    }
}

/// Locate `program` on `PATH`.
fn find_in_path(program: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

/// Detect the host share capability once at startup.
///
/// A configured command wins; otherwise `termux-share` if it is on `PATH`.
pub fn detect(configured: Option<&str>) -> Option<CommandShare> {
    if let Some(command) = configured.filter(|c| !c.trim().is_empty()) {
        let share = CommandShare::from_command_line(command)?;
        tracing::info!(program = %share.program.display(), "share command configured");
        return Some(share);
    }
    let program = find_in_path(TERMUX_SHARE)?;
    tracing::info!(program = %program.display(), "share command detected");
    Some(CommandShare {
        program,
        args: Vec::new(),
        termux: true,
    })
}

/// Share via `target`, logging failure or cancellation instead of returning it.
pub async fn share_quietly(target: &dyn ShareTarget, payload: &SharePayload) -> bool {
    match target.share(payload).await {
        Ok(()) => {
            tracing::info!("result shared");
            true
        }
        Err(err) => {
            tracing::info!(error = %err, "sharing failed or was cancelled");
            false
        }
    }
}

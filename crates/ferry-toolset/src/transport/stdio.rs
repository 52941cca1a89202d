//! Stdio transport: spawns a tool server as a subprocess and speaks
//! newline-delimited JSON over its stdin/stdout.

use crate::error::ToolsetError;
use crate::protocol::{RequestId, RpcRequest, RpcResponse};
use crate::transport::ToolTransport;
use async_trait::async_trait;
use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, error, trace, warn};

struct StdioProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl StdioProcess {
    fn check_alive(&mut self, command_str: &str) -> Result<(), ToolsetError> {
        match self.child.try_wait() {
            Ok(Some(status)) => {
                warn!(
                    command = %command_str,
                    exit_code = ?status.code(),
                    "tool server process exited"
                );
                Err(ToolsetError::ProcessExited)
            }
            Ok(None) => Ok(()),
            Err(e) => Err(ToolsetError::Io(e)),
        }
    }
}

impl Drop for StdioProcess {
    fn drop(&mut self) {
        // Best effort; kill_on_drop backs this up.
        let _ = self.child.start_kill();
    }
}

/// Stdio transport around a spawned tool server process.
///
/// Every exchange writes one request line and reads until the matching
/// response arrives; server-initiated notification lines are skipped. The
/// header map is ignored because stdio has no header channel.
pub struct StdioToolTransport {
    inner: Mutex<StdioProcess>,
    command_str: String,
    read_timeout: Duration,
}

impl StdioToolTransport {
    /// Spawn a tool server process.
    ///
    /// Stderr is inherited so server diagnostics land in our own logs.
    pub async fn spawn(
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
        read_timeout: Duration,
    ) -> Result<Self, ToolsetError> {
        let command_str = format!("{} {}", command, args.join(" "));
        debug!(command = %command_str, "spawning tool server process");

        let mut cmd = Command::new(command);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        for (key, value) in env {
            cmd.env(key, value);
        }

        let mut child = cmd.spawn().map_err(|e| {
            error!(error = %e, command = %command_str, "failed to spawn tool server");
            ToolsetError::ProcessSpawn(format!("{}: {}", command_str, e))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ToolsetError::ProcessSpawn("Failed to capture stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ToolsetError::ProcessSpawn("Failed to capture stdout".to_string()))?;

        debug!(command = %command_str, "tool server process spawned");

        Ok(Self {
            inner: Mutex::new(StdioProcess {
                child,
                stdin,
                stdout: BufReader::new(stdout),
            }),
            command_str,
            read_timeout,
        })
    }

    /// The command line this transport spawned, for diagnostics.
    pub fn command(&self) -> &str {
        &self.command_str
    }

    async fn read_response(
        process: &mut StdioProcess,
        expected_id: &RequestId,
        command_str: &str,
    ) -> Result<RpcResponse, ToolsetError> {
        loop {
            let mut line = String::new();
            let bytes_read = process.stdout.read_line(&mut line).await.map_err(|e| {
                error!(error = %e, "failed to read from tool server stdout");
                ToolsetError::transport(format!("Read failed: {}", e))
            })?;
            if bytes_read == 0 {
                warn!(command = %command_str, "tool server closed stdout");
                return Err(ToolsetError::ProcessExited);
            }

            let line = line.trim_end();
            trace!(message = %line, "line from tool server");

            // Notifications and log lines are not responses; skip them.
            let response: RpcResponse = match serde_json::from_str(line) {
                Ok(response) => response,
                Err(_) => {
                    trace!("skipping non-response line");
                    continue;
                }
            };
            if &response.id != expected_id {
                warn!(
                    expected = %expected_id,
                    got = %response.id,
                    "skipping response for a different request"
                );
                continue;
            }
            return Ok(response);
        }
    }
}

#[async_trait]
impl ToolTransport for StdioToolTransport {
    async fn exchange(
        &self,
        request: RpcRequest,
        _headers: &HashMap<String, String>,
    ) -> Result<RpcResponse, ToolsetError> {
        let mut process = self.inner.lock().await;
        process.check_alive(&self.command_str)?;

        let line = serde_json::to_string(&request)?;
        trace!(message = %line, "sending request to tool server");

        process
            .stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| ToolsetError::transport(format!("Write failed: {}", e)))?;
        process
            .stdin
            .write_all(b"\n")
            .await
            .map_err(|e| ToolsetError::transport(format!("Write newline failed: {}", e)))?;
        process
            .stdin
            .flush()
            .await
            .map_err(|e| ToolsetError::transport(format!("Flush failed: {}", e)))?;

        match tokio::time::timeout(
            self.read_timeout,
            Self::read_response(&mut process, &request.id, &self.command_str),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ToolsetError::Timeout(self.read_timeout)),
        }
    }
}

impl std::fmt::Debug for StdioToolTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StdioToolTransport")
            .field("command", &self.command_str)
            .field("read_timeout", &self.read_timeout)
            .finish()
    }
}

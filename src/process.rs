use std::path::Path;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::error::{AppError, Result};

/// Output of a command run in captured mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// Exit code, or -1 when the process was terminated by a signal.
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Command running `command_line` through the platform shell (`sh -c` /
/// `cmd /C`) in `cwd`.
///
/// Callers get the exit status back; a non-zero status is never an error
/// here. Command lines are not logged: rendered templates may carry
/// credentials.
fn shell_command(command_line: &str, cwd: &Path) -> Command {
    #[cfg(windows)]
    let mut cmd = {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(command_line);
        cmd
    };

    #[cfg(not(windows))]
    let mut cmd = {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command_line);
        cmd
    };

    cmd.current_dir(cwd);
    cmd
}

fn exit_code(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

/// Run a command and buffer its output. Nothing is printed.
pub async fn run_captured(command_line: &str, cwd: &Path) -> Result<CommandResult> {
    tracing::debug!(cwd = %cwd.display(), "Running shell command (captured)");

    let output = shell_command(command_line, cwd)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| AppError::Process(format!("Failed to run shell command: {e}")))?;

    Ok(CommandResult {
        status: exit_code(output.status),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Run a command, echoing every output line indented by three spaces.
/// Stderr is merged into the same stream. Returns the exit status.
pub async fn run_streamed(command_line: &str, cwd: &Path) -> Result<i32> {
    run_streamed_with(command_line, cwd, |line| println!("   {line}")).await
}

/// Like [`run_streamed`] but hands each line to `on_line` instead of stdout.
pub async fn run_streamed_with<F>(command_line: &str, cwd: &Path, mut on_line: F) -> Result<i32>
where
    F: FnMut(&str),
{
    tracing::debug!(cwd = %cwd.display(), "Running shell command (streamed)");

    let mut child = shell_command(command_line, cwd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| AppError::Process(format!("Failed to spawn shell command: {e}")))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| AppError::Process("Child stdout was not captured".to_string()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| AppError::Process("Child stderr was not captured".to_string()))?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let out_task = forward_lines(stdout, tx.clone());
    let err_task = forward_lines(stderr, tx);

    while let Some(line) = rx.recv().await {
        on_line(&line);
    }

    let _ = out_task.await;
    let _ = err_task.await;

    let status = child
        .wait()
        .await
        .map_err(|e| AppError::Process(format!("Failed to wait for shell command: {e}")))?;

    Ok(exit_code(status))
}

fn forward_lines<R>(reader: R, tx: mpsc::UnboundedSender<String>) -> tokio::task::JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf)
                        .trim_end_matches(['\r', '\n'])
                        .to_string();
                    if tx.send(line).is_err() {
                        break;
                    }
                }
            }
        }
    })
}

/// Quote a value so the platform shell passes it as a single argument.
pub fn shell_quote(value: &str) -> String {
    #[cfg(windows)]
    {
        // cmd.exe has no escape for a double quote inside a quoted argument
        format!("\"{}\"", value.replace('"', "'"))
    }

    #[cfg(not(windows))]
    {
        let safe = !value.is_empty()
            && value
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || "_-./:=@%+,".contains(c));
        if safe {
            value.to_string()
        } else {
            format!("'{}'", value.replace('\'', r"'\''"))
        }
    }
}

/// Substitute `{name}` placeholders in a command template with shell-quoted values.
/// Unknown placeholders are left as they are.
pub fn render_command(template: &str, vars: &[(&str, &str)]) -> String {
    let mut rendered = template.to_string();
    for (name, value) in vars {
        rendered = rendered.replace(&format!("{{{name}}}"), &shell_quote(value));
    }
    rendered
}

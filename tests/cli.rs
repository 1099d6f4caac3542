#![cfg(unix)]

use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

fn write_config(dir: &Path, project: &Path, mode: &str) -> std::path::PathBuf {
    let path = dir.join("pages-deploy.toml");
    std::fs::write(
        &path,
        format!(
            "[repo]\npath = {project:?}\nowner = \"octocat\"\nname = \"reservoirs\"\n\n\
             [run]\nmode = \"{mode}\"\n"
        ),
    )
    .unwrap();
    path
}

fn command(config: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_pages-deploy"));
    cmd.arg("-c")
        .arg(config)
        .arg("--no-pause")
        .env_remove("PAGES_DEPLOY__GITHUB__TOKEN")
        .stderr(Stdio::null());
    cmd
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Option<i32> {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if let Some(status) = child.try_wait().unwrap() {
            return status.code();
        }
        thread::sleep(Duration::from_millis(50));
    }
    let _ = child.kill();
    let _ = child.wait();
    None
}

#[test]
fn test_interrupt_at_prompt_exits_cleanly() {
    let tmp = tempfile::tempdir().unwrap();
    let config = write_config(tmp.path(), tmp.path(), "interactive");

    let mut child = command(&config)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    // Kept open: the token prompt stays blocked on stdin
    let _stdin = child.stdin.take().unwrap();

    let stdout = child.stdout.take().unwrap();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in BufReader::new(stdout).lines().map_while(Result::ok) {
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    let prompt_seen = rx
        .iter()
        .any(|line| line.contains("GitHub Personal Access Token"));
    assert!(prompt_seen);
    thread::sleep(Duration::from_millis(300));

    let kill = Command::new("kill")
        .args(["-TERM", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(kill.success());

    let code = wait_with_timeout(&mut child, Duration::from_secs(10));
    assert_eq!(code, Some(0), "process did not exit after the interrupt");

    // Reader ends once the exited process closes stdout
    let rest: Vec<String> = rx.iter().collect();
    assert!(rest.iter().any(|l| l.contains("Operation cancelled")));
}

#[test]
fn test_failed_step_is_reported_once() {
    let tmp = tempfile::tempdir().unwrap();
    let missing = tmp.path().join("missing-project");
    let config = write_config(tmp.path(), &missing, "unattended");

    let mut child = command(&config)
        .env("PAGES_DEPLOY__GITHUB__TOKEN", "t0ken")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();

    let mut output = String::new();
    child.stdout.take().unwrap().read_to_string(&mut output).unwrap();
    let code = wait_with_timeout(&mut child, Duration::from_secs(10));

    assert_eq!(code, Some(1));
    assert_eq!(output.matches("Project directory not found").count(), 1);
    assert!(!output.contains("Unexpected error"));
}

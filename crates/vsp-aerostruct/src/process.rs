//! Monitored execution of external programs.
//!
//! A child's failure is not an error here: it shows up in the report as
//! `launched == false`, a non-zero exit code or a missing artifact, and the
//! caller decides how to continue.

use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{info, warn};

use crate::error::AeroStructResult;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessReport {
    /// Command line as shown to the user
    pub command: String,
    pub launched: bool,
    pub exit_code: Option<i32>,
    /// Lines the child wrote to stdout
    pub output: Vec<String>,
    /// Lines the child wrote to stderr
    pub errors: Vec<String>,
    pub artifact: Option<PathBuf>,
    pub artifact_found: bool,
    pub message: Option<String>,
}

impl ProcessReport {
    pub fn succeeded(&self) -> bool {
        self.launched && self.exit_code == Some(0) && (self.artifact.is_none() || self.artifact_found)
    }
}

/// Single-line rendering of a command, newline terminated.
pub fn pretty_cmd(program: &Path, args: &[String]) -> String {
    let mut s = program.display().to_string();
    for a in args {
        s.push(' ');
        s.push_str(a);
    }
    s.push('\n');
    s
}

fn emit(line: &str, log: &mut Option<&mut dyn Write>) -> AeroStructResult<()> {
    match log {
        Some(w) => writeln!(w, "{line}")?,
        None => info!(target: "aerostruct", "{line}"),
    }
    Ok(())
}

fn drain(
    rx: &Receiver<String>,
    log: &mut Option<&mut dyn Write>,
    output: &mut Vec<String>,
) -> AeroStructResult<()> {
    while let Ok(line) = rx.try_recv() {
        emit(&line, log)?;
        output.push(line);
    }
    Ok(())
}

fn poll(
    child: &mut Child,
    rx: &Receiver<String>,
    log: &mut Option<&mut dyn Write>,
    output: &mut Vec<String>,
) -> AeroStructResult<ExitStatus> {
    loop {
        drain(rx, log, output)?;
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn collect_stderr(child: &mut Child) -> Option<JoinHandle<Vec<String>>> {
    child.stderr.take().map(|err| {
        thread::spawn(move || BufReader::new(err).lines().map_while(Result::ok).collect())
    })
}

/// Run `program` with `args` in `cwd`, echo the command and the child's
/// stdout to `log` (or to the tracing output when `log` is `None`), poll
/// until it exits, then check that `artifact` exists.
pub fn run_monitored(
    program: &Path,
    args: &[String],
    cwd: Option<&Path>,
    mut log: Option<&mut dyn Write>,
    artifact: Option<&Path>,
) -> AeroStructResult<ProcessReport> {
    let mut report = ProcessReport {
        command: pretty_cmd(program, args),
        artifact: artifact.map(Path::to_path_buf),
        ..ProcessReport::default()
    };
    match log.as_mut() {
        Some(w) => write!(w, "{}", report.command)?,
        None => info!(target: "aerostruct", command = %report.command.trim_end(), "launching"),
    }

    let mut cmd = Command::new(program);
    cmd.args(args).stdout(Stdio::piped()).stderr(Stdio::piped());
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            warn!(program = %program.display(), error = %e, "failed to launch");
            report.message = Some(format!("failed to launch {}: {e}", program.display()));
            return Ok(report);
        }
    };
    report.launched = true;

    let (tx, rx) = mpsc::channel::<String>();
    let reader = child.stdout.take().map(move |out| {
        thread::spawn(move || {
            for line in BufReader::new(out).lines().map_while(Result::ok) {
                if tx.send(line).is_err() {
                    break;
                }
            }
        })
    });
    let stderr = collect_stderr(&mut child);

    let polled = poll(&mut child, &rx, &mut log, &mut report.output);
    if polled.is_err() {
        // the child must not outlive a failed monitor
        let _ = child.kill();
        let _ = child.wait();
    }
    drop(child);
    if let Some(handle) = reader {
        let _ = handle.join();
    }
    if let Some(handle) = stderr {
        report.errors = handle.join().unwrap_or_default();
    }
    let status = polled?;
    drain(&rx, &mut log, &mut report.output)?;
    report.exit_code = status.code();
    if !status.success() {
        let detail = report.errors.last().map(|l| format!(": {l}")).unwrap_or_default();
        warn!(program = %program.display(), code = ?report.exit_code, "program failed");
        report.message = Some(format!("{} exited with {status}{detail}", program.display()));
    }

    report.artifact_found = artifact.is_some_and(Path::exists);
    if let Some(path) = artifact
        && !report.artifact_found
        && report.message.is_none()
    {
        warn!(artifact = %path.display(), "expected output not produced");
        report.message = Some(format!("{} was not produced", path.display()));
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pretty_command_line() {
        let s = pretty_cmd(
            Path::new("/opt/bin/vsploads"),
            &["-interp".to_string(), "wing".to_string()],
        );
        assert_eq!(s, "/opt/bin/vsploads -interp wing\n");
    }

    #[test]
    fn missing_program_is_reported_not_raised() {
        let mut log = Vec::new();
        let report = run_monitored(
            Path::new("vsp-aerostruct-no-such-program"),
            &[],
            None,
            Some(&mut log),
            None,
        )
        .unwrap();
        assert!(!report.launched);
        assert!(!report.succeeded());
        assert!(report.message.is_some());
        assert_eq!(String::from_utf8(log).unwrap(), "vsp-aerostruct-no-such-program\n");
    }

    #[cfg(unix)]
    fn sh(script: &str) -> (PathBuf, Vec<String>) {
        (PathBuf::from("/bin/sh"), vec!["-c".to_string(), script.to_string()])
    }

    #[cfg(unix)]
    #[test]
    fn stderr_is_kept_for_the_message() {
        let (program, args) = sh("echo partial; echo 'no such file wing.inp' >&2; exit 3");
        let report = run_monitored(&program, &args, None, None, None).unwrap();
        assert_eq!(report.exit_code, Some(3));
        assert_eq!(report.output, vec!["partial"]);
        assert_eq!(report.errors, vec!["no such file wing.inp"]);
        assert!(report.message.unwrap().ends_with(": no such file wing.inp"));
    }

    /// Accepts the echoed command, fails once the child's output arrives.
    struct BrokenSink;

    impl Write for BrokenSink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if String::from_utf8_lossy(buf).contains("tick") {
                Err(std::io::Error::other("sink closed"))
            } else {
                Ok(buf.len())
            }
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[cfg(unix)]
    #[test]
    fn failing_log_stops_the_child() {
        let (program, args) = sh("echo tick; exec sleep 30");
        let mut sink = BrokenSink;
        let started = std::time::Instant::now();
        let result = run_monitored(&program, &args, None, Some(&mut sink), None);
        assert!(matches!(result, Err(crate::AeroStructError::Io(_))));
        assert!(started.elapsed() < Duration::from_secs(20));
    }
}

use crate::blast::params::Invocation;
use crate::tools::traits::Launcher;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Stdio};

/// Runs the legacy NCBI `blastall` binary as a detached background process.
///
/// Tool stdout and stderr are appended to one shared log file. Each child is
/// reaped by a small watcher thread so finished searches do not linger as
/// zombies; the job itself never waits on them.
pub struct ProcessLauncher {
    program: String,
    log_file: PathBuf,
}

impl ProcessLauncher {
    pub fn new(program: impl Into<String>, log_file: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            log_file: log_file.into(),
        }
    }

    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    fn open_log(&self) -> io::Result<File> {
        OpenOptions::new().create(true).append(true).open(&self.log_file)
    }
}

fn reap_in_background(mut child: Child, label: String) {
    std::thread::spawn(move || match child.wait() {
        Ok(status) if status.success() => {
            tracing::debug!("{} exited cleanly", label);
        }
        Ok(status) => {
            tracing::warn!("{} exited with {}", label, status);
        }
        Err(e) => {
            tracing::warn!("Failed to wait on {}: {}", label, e);
        }
    });
}

impl Launcher for ProcessLauncher {
    fn launch(&self, invocation: &Invocation) -> io::Result<u32> {
        let log = self.open_log()?;
        let log_err = log.try_clone()?;

        let mut cmd = invocation.to_command();
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::from(log));
        cmd.stderr(Stdio::from(log_err));

        tracing::debug!("Running: {}", invocation.command_line());

        let child = cmd.spawn().map_err(|e| {
            io::Error::new(
                e.kind(),
                format!("failed to start {}: {}", invocation.program, e),
            )
        })?;
        let pid = child.id();

        reap_in_background(child, format!("{} [query {}, pid {}]", self.name(), invocation.index, pid));

        Ok(pid)
    }

    fn verify_installation(&self) -> io::Result<()> {
        let program = Path::new(&self.program);
        if program.components().count() > 1 {
            return if program.is_file() {
                Ok(())
            } else {
                Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{} not found", program.display()),
                ))
            };
        }

        let found = std::env::var_os("PATH")
            .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
            .unwrap_or(false);

        if found {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found in PATH", self.program),
            ))
        }
    }

    fn name(&self) -> &str {
        &self.program
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    fn invocation(program: &str, args: &[&str]) -> Invocation {
        Invocation {
            index: 0,
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            input: PathBuf::from("in"),
            output: PathBuf::from("out"),
        }
    }

    #[test]
    fn test_output_goes_to_shared_log() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("blastout.out");
        let launcher = ProcessLauncher::new("sh", &log);

        let pid = launcher
            .launch(&invocation("sh", &["-c", "echo searching"]))
            .unwrap();
        assert!(pid > 0);

        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if std::fs::read_to_string(&log).unwrap_or_default().contains("searching") {
                return;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        panic!("log file never received tool output");
    }

    #[test]
    fn test_missing_program_fails_to_launch() {
        let dir = TempDir::new().unwrap();
        let launcher = ProcessLauncher::new("taed-no-such-tool", dir.path().join("log"));
        let err = launcher
            .launch(&invocation("taed-no-such-tool", &[]))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(launcher.verify_installation().is_err());
    }
}

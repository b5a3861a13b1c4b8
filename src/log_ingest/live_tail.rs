//! Follows an external log tailing process line by line.
//!
//! Tail tools are often wrapper scripts that run the real reader as their
//! own child. The tail is therefore started as the leader of a new process
//! group, and the whole group is killed when a [`LiveTail`] is shut down or
//! dropped (including when the owning task is aborted).

use std::io;
use std::process::Stdio;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};

use crate::configuration::types::TailCommand;
use crate::error_handling::types::SourceError;

/// Kills a process group when dropped.
#[derive(Debug)]
struct ProcessGroup {
    pgid: Option<i32>,
}

impl ProcessGroup {
    fn kill(&mut self) {
        let Some(pgid) = self.pgid.take() else {
            return;
        };
        #[cfg(unix)]
        {
            // SAFETY: killpg only takes plain integers; a stale pgid yields ESRCH.
            let ret = unsafe { libc::killpg(pgid, libc::SIGKILL) };
            if ret != 0 {
                let err = io::Error::last_os_error();
                if err.raw_os_error() != Some(libc::ESRCH) {
                    warn!("Failed to kill log tail process group {}: {}", pgid, err);
                }
            } else {
                debug!("Log tail process group {} killed", pgid);
            }
        }
        #[cfg(not(unix))]
        let _ = pgid;
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

pub struct LiveTail {
    group: ProcessGroup,
    child: Child,
    lines: Lines<BufReader<ChildStdout>>,
    read_timeout: Option<Duration>,
}

impl LiveTail {
    /// Spawns the tail process with its stdout piped back to us.
    ///
    /// Errors
    /// - [`SourceError::ToolingUnavailable`] when the program is not installed.
    /// - [`SourceError::SpawnFailed`] when the OS refuses to start it.
    /// - [`SourceError::StdoutUnavailable`] when no stdout pipe was attached.
    pub fn spawn(command: &TailCommand, read_timeout: Option<Duration>) -> Result<Self, SourceError> {
        debug!("Spawning log tail: {} {:?}", command.program, command.args);
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => SourceError::ToolingUnavailable(command.program.clone()),
            _ => SourceError::SpawnFailed(e),
        })?;
        let group = ProcessGroup {
            pgid: child.id().and_then(|pid| i32::try_from(pid).ok()),
        };

        let stdout = child.stdout.take().ok_or(SourceError::StdoutUnavailable)?;

        if let Some(stderr) = child.stderr.take() {
            let mut reader = BufReader::new(stderr).lines();
            let name = command.program.clone();
            tokio::spawn(async move {
                while let Ok(Some(line)) = reader.next_line().await {
                    debug!("[{}][stderr] {}", name, line);
                }
                debug!("stderr monitoring ended for {}", name);
            });
        }

        info!(
            "Log tail started: {} (pid {:?})",
            command.program,
            child.id()
        );

        Ok(Self {
            group,
            child,
            lines: BufReader::new(stdout).lines(),
            read_timeout,
        })
    }

    /// Waits for the next line of output.
    ///
    /// End of stream is an error here: the tail is expected to run until
    /// killed, so a closed pipe means the process went away.
    pub async fn next_line(&mut self) -> Result<String, SourceError> {
        let read = match self.read_timeout {
            Some(limit) => tokio::time::timeout(limit, self.lines.next_line())
                .await
                .map_err(|_| SourceError::ReadTimeout(limit.as_secs()))?,
            None => self.lines.next_line().await,
        };

        match read {
            Ok(Some(line)) => Ok(line),
            Ok(None) => Err(SourceError::StreamClosed),
            Err(e) => Err(SourceError::ReadFailed(e)),
        }
    }

    /// Kills the process group and reaps the direct child.
    pub async fn shutdown(mut self) {
        self.group.kill();
        if let Err(e) = self.child.kill().await {
            warn!("Failed to kill log tail process: {}", e);
        } else {
            debug!("Log tail process terminated");
        }
    }
}

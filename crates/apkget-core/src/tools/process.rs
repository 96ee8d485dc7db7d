//! Real gateway that spawns external processes.

use std::ffi::OsString;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use wait_timeout::ChildExt;

use crate::error::{Error, Result};
use crate::tools::{Tool, ToolGateway, ToolLocator, ToolOutput};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Spawns tools found by a [`ToolLocator`].
///
/// While a child runs, the cancellation token is polled; a cancelled token
/// kills the child and the run fails with [`Error::Cancelled`].
#[derive(Debug, Clone)]
pub struct ProcessGateway {
    locator: ToolLocator,
    cancel: CancellationToken,
}

impl ProcessGateway {
    pub fn new(locator: ToolLocator) -> Self {
        Self {
            locator,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn locator(&self) -> &ToolLocator {
        &self.locator
    }

    fn command_for(&self, tool: Tool, args: &[OsString]) -> Result<(PathBuf, Vec<OsString>)> {
        if tool.is_jar() {
            let jar = self.locator.locate(tool)?;
            let java = self.locator.locate(Tool::Java)?;
            let mut full = vec![OsString::from("-jar"), jar.into_os_string()];
            full.extend(args.iter().cloned());
            Ok((java, full))
        } else {
            Ok((self.locator.locate(tool)?, args.to_vec()))
        }
    }
}

impl ToolGateway for ProcessGateway {
    fn locate(&self, tool: Tool) -> Result<PathBuf> {
        self.locator.locate(tool)
    }

    fn run(&self, tool: Tool, args: &[OsString]) -> Result<ToolOutput> {
        let (program, args) = self.command_for(tool, args)?;
        debug!(%tool, program = %program.display(), ?args, "running tool");

        let mut child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = loop {
            if let Some(status) = child.wait_timeout(POLL_INTERVAL)? {
                break status;
            }
            if self.cancel.is_cancelled() {
                warn!(%tool, "cancelled, terminating tool");
                let _ = child.kill();
                let _ = child.wait();
                return Err(Error::Cancelled);
            }
        };

        let output = ToolOutput {
            exit_code: status.code(),
            stdout: stdout.map(join_reader).unwrap_or_default(),
            stderr: stderr.map(join_reader).unwrap_or_default(),
        };
        debug!(%tool, exit_code = ?output.exit_code, "tool finished");
        Ok(output)
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> std::thread::JoinHandle<String> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn join_reader(handle: std::thread::JoinHandle<String>) -> String {
    handle.join().unwrap_or_default()
}

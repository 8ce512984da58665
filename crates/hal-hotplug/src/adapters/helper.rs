//! # Probe Helper Processes
//!
//! Runs a helper executable against a provisional device record.
//!
//! The helper sees the record through its environment: `UDI` carries the
//! current identity (empty before one is computed) and every property is
//! exported as `HAL_PROP_<KEY>`, with the key upper-cased and anything
//! outside `[A-Z0-9]` mapped to `_`. Lines of the form `key=value` on the
//! helper's stdout are returned as property updates.

use crate::domain::errors::ProbeError;
use crate::ports::outbound::{HelperInvoker, HelperOutcome};
use async_trait::async_trait;
use hal_device_store::Device;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Environment prefix for exported properties.
pub const PROPERTY_ENV_PREFIX: &str = "HAL_PROP_";

/// How long stdout is still read once the helper itself has exited.
const STDOUT_DRAIN_GRACE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct ProcessHelperInvoker {
    helper_dir: PathBuf,
}

impl ProcessHelperInvoker {
    pub fn new(helper_dir: impl Into<PathBuf>) -> Self {
        Self {
            helper_dir: helper_dir.into(),
        }
    }

    pub fn helper_dir(&self) -> &Path {
        &self.helper_dir
    }

    /// Bare names are looked up in the helper directory.
    fn resolve(&self, helper: &str) -> PathBuf {
        if helper.contains('/') {
            PathBuf::from(helper)
        } else {
            self.helper_dir.join(helper)
        }
    }
}

fn env_key(property: &str) -> String {
    let mut key = String::with_capacity(PROPERTY_ENV_PREFIX.len() + property.len());
    key.push_str(PROPERTY_ENV_PREFIX);
    key.extend(property.chars().map(|c| {
        if c.is_ascii_alphanumeric() {
            c.to_ascii_uppercase()
        } else {
            '_'
        }
    }));
    key
}

fn parse_properties(stdout: &str) -> Vec<(String, String)> {
    stdout
        .lines()
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), value.trim().to_string()))
        })
        .collect()
}

#[async_trait]
impl HelperInvoker for ProcessHelperInvoker {
    async fn invoke(
        &self,
        helper: &str,
        device: &Device,
        timeout: Duration,
    ) -> Result<HelperOutcome, ProbeError> {
        let program = self.resolve(helper);

        let mut command = Command::new(&program);
        command
            .env("UDI", device.udi().unwrap_or(""))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        for (key, value) in device.properties() {
            command.env(env_key(key), value.to_string());
        }

        let mut child = command.spawn().map_err(|source| ProbeError::Spawn {
            helper: helper.to_string(),
            source,
        })?;
        let mut stdout = child.stdout.take();

        let run = async {
            let mut output = Vec::new();
            let status = match stdout.as_mut() {
                None => child.wait().await?,
                Some(pipe) => {
                    let read = pipe.read_to_end(&mut output);
                    tokio::pin!(read);
                    tokio::select! {
                        done = &mut read => {
                            done?;
                            child.wait().await?
                        }
                        status = child.wait() => {
                            let status = status?;
                            // A forked grandchild may keep the pipe open
                            if tokio::time::timeout(STDOUT_DRAIN_GRACE, &mut read).await.is_err() {
                                debug!(helper = helper, "Helper stdout still open after exit");
                            }
                            status
                        }
                    }
                }
            };
            Ok::<_, std::io::Error>((status, String::from_utf8_lossy(&output).into_owned()))
        };
        let result = tokio::time::timeout(timeout, run).await;

        match result {
            Ok(Ok((status, output))) => {
                let exit_code = status.code().unwrap_or(-1);
                debug!(
                    helper = helper,
                    exit_code = exit_code,
                    sysfs_path = device.sysfs_path().unwrap_or(""),
                    "Helper exited"
                );
                Ok(HelperOutcome {
                    timed_out: false,
                    exit_code,
                    properties: parse_properties(&output),
                })
            }
            Ok(Err(source)) => Err(ProbeError::Io {
                helper: helper.to_string(),
                source,
            }),
            Err(_) => {
                warn!(
                    helper = helper,
                    timeout_ms = timeout.as_millis() as u64,
                    "Helper timed out, killing it"
                );
                if let Err(e) = child.kill().await {
                    warn!(helper = helper, error = %e, "Failed to kill helper");
                }
                Ok(HelperOutcome::timeout())
            }
        }
    }
}

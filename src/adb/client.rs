use std::process::Stdio;
use std::time::Duration;

use crate::config::DeviceConfig;
use crate::errors::{PhoneClawError, PhoneClawResult};

/// Captured result of one adb invocation.
#[derive(Debug, Clone)]
pub struct AdbOutput {
    pub stdout: Vec<u8>,
    pub stderr: String,
    pub success: bool,
}

impl AdbOutput {
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// stdout and stderr joined, the way adb prints them to a terminal.
    pub fn combined_text(&self) -> String {
        format!("{}{}", self.stdout_text(), self.stderr)
    }
}

/// Thin wrapper around the `adb` binary, targeting one device.
#[derive(Debug, Clone)]
pub struct AdbClient {
    adb_path: String,
    device_id: Option<String>,
    timeout: Duration,
}

impl AdbClient {
    pub fn new(config: &DeviceConfig) -> Self {
        Self {
            adb_path: config.adb_path.clone(),
            device_id: config.device_id.clone().filter(|d| !d.trim().is_empty()),
            timeout: Duration::from_secs(config.command_timeout_secs),
        }
    }

    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    /// Full argument list, including the `-s <serial>` prefix when a device is pinned.
    pub fn command_args(&self, args: &[&str]) -> Vec<String> {
        let mut full = Vec::with_capacity(args.len() + 2);
        if let Some(serial) = &self.device_id {
            full.push("-s".to_string());
            full.push(serial.clone());
        }
        full.extend(args.iter().map(|a| a.to_string()));
        full
    }

    /// Runs `adb [-s serial] <args>` and captures its output.
    ///
    /// A non-zero exit is not an error here; callers inspect the output.
    /// Spawn failures and timeouts are.
    pub async fn run(&self, args: &[&str]) -> PhoneClawResult<AdbOutput> {
        let full = self.command_args(args);
        tracing::debug!(adb = %self.adb_path, args = ?full, "adb");

        let result = tokio::time::timeout(
            self.timeout,
            tokio::process::Command::new(&self.adb_path)
                .args(&full)
                .stdin(Stdio::null())
                .kill_on_drop(true)
                .output(),
        )
        .await;

        let output = match result {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(PhoneClawError::Device(format!(
                    "failed to run {}: {e}",
                    self.adb_path
                )))
            }
            Err(_) => {
                return Err(PhoneClawError::Device(format!(
                    "adb {} timed out after {}s",
                    args.join(" "),
                    self.timeout.as_secs()
                )))
            }
        };

        let out = AdbOutput {
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            success: output.status.success(),
        };
        if !out.success {
            tracing::debug!(stderr = %out.stderr.trim(), "adb exited non-zero");
        }
        Ok(out)
    }

    pub async fn shell(&self, args: &[&str]) -> PhoneClawResult<AdbOutput> {
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push("shell");
        full.extend_from_slice(args);
        self.run(&full).await
    }

    /// `adb version`, used as a startup reachability check.
    pub async fn version(&self) -> PhoneClawResult<String> {
        let out = tokio::time::timeout(
            self.timeout,
            tokio::process::Command::new(&self.adb_path)
                .arg("version")
                .stdin(Stdio::null())
                .output(),
        )
        .await
        .map_err(|_| PhoneClawError::Device("adb version timed out".into()))?
        .map_err(|e| PhoneClawError::Device(format!("adb not found at {}: {e}", self.adb_path)))?;

        if !out.status.success() {
            return Err(PhoneClawError::Device(format!(
                "adb version failed: {}",
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }
        let text = String::from_utf8_lossy(&out.stdout);
        Ok(text.lines().next().unwrap_or_default().trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_prefix_only_when_pinned() {
        let any = AdbClient::new(&DeviceConfig::default());
        assert_eq!(any.command_args(&["shell", "input", "tap", "1", "2"]), [
            "shell", "input", "tap", "1", "2"
        ]);

        let pinned = AdbClient::new(&DeviceConfig {
            device_id: Some("emulator-5554".into()),
            ..DeviceConfig::default()
        });
        assert_eq!(pinned.command_args(&["shell", "input", "keyevent", "4"]), [
            "-s", "emulator-5554", "shell", "input", "keyevent", "4"
        ]);
    }

    #[test]
    fn blank_serial_is_ignored() {
        let client = AdbClient::new(&DeviceConfig {
            device_id: Some("  ".into()),
            ..DeviceConfig::default()
        });
        assert!(client.device_id().is_none());
    }

    #[tokio::test]
    async fn missing_binary_is_a_device_error() {
        let client = AdbClient::new(&DeviceConfig {
            adb_path: "/nonexistent/phoneclaw-adb".into(),
            ..DeviceConfig::default()
        });
        assert!(matches!(
            client.shell(&["echo", "hi"]).await,
            Err(PhoneClawError::Device(_))
        ));
        assert!(client.version().await.is_err());
    }
}

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;

use crate::adb::apps;
use crate::adb::client::AdbClient;
use crate::config::DeviceConfig;
use crate::errors::{PhoneClawError, PhoneClawResult};
use crate::executor::input::DeviceDriver;

const DOUBLE_TAP_GAP: Duration = Duration::from_millis(100);

/// [`DeviceDriver`] and [`crate::perception::Perception`] backed by `adb shell input` and ADB Keyboard broadcasts.
pub struct AdbDevice {
    pub(crate) client: AdbClient,
    action_delay: Duration,
    automation_ime: String,
    pub(crate) fallback_size: (u32, u32),
}

impl AdbDevice {
    pub fn new(client: AdbClient, config: &DeviceConfig) -> Self {
        Self {
            client,
            action_delay: Duration::from_millis(config.action_delay_ms),
            automation_ime: config.automation_ime.clone(),
            fallback_size: (config.fallback_width, config.fallback_height),
        }
    }

    pub fn client(&self) -> &AdbClient {
        &self.client
    }

    async fn input(&self, args: &[&str]) -> PhoneClawResult<()> {
        let mut full = vec!["input"];
        full.extend_from_slice(args);
        let out = self.client.shell(&full).await?;
        if !out.success {
            return Err(PhoneClawError::Device(format!(
                "input {} failed: {}",
                args.join(" "),
                out.combined_text().trim()
            )));
        }
        Ok(())
    }

    async fn settle(&self) {
        tokio::time::sleep(self.action_delay).await;
    }
}

/// Swipe duration scaled by distance: `dist² / 1000` ms, clamped to 0.5–2 s.
pub fn swipe_duration_ms(start_x: i32, start_y: i32, end_x: i32, end_y: i32) -> u64 {
    let dx = i128::from(start_x) - i128::from(end_x);
    let dy = i128::from(start_y) - i128::from(end_y);
    let dist_sq = dx * dx + dy * dy;
    (dist_sq / 1000).clamp(500, 2000) as u64
}

#[async_trait]
impl DeviceDriver for AdbDevice {
    async fn tap(&self, x: i32, y: i32) -> PhoneClawResult<()> {
        tracing::debug!(x, y, "tap");
        self.input(&["tap", &x.to_string(), &y.to_string()]).await?;
        self.settle().await;
        Ok(())
    }

    async fn double_tap(&self, x: i32, y: i32) -> PhoneClawResult<()> {
        let (xs, ys) = (x.to_string(), y.to_string());
        self.input(&["tap", &xs, &ys]).await?;
        tokio::time::sleep(DOUBLE_TAP_GAP).await;
        self.input(&["tap", &xs, &ys]).await?;
        self.settle().await;
        Ok(())
    }

    async fn long_press(&self, x: i32, y: i32, duration_ms: u64) -> PhoneClawResult<()> {
        // Same-point swipe.
        let (xs, ys) = (x.to_string(), y.to_string());
        self.input(&["swipe", &xs, &ys, &xs, &ys, &duration_ms.to_string()])
            .await?;
        self.settle().await;
        Ok(())
    }

    async fn swipe(
        &self,
        start_x: i32,
        start_y: i32,
        end_x: i32,
        end_y: i32,
        duration_ms: Option<u64>,
    ) -> PhoneClawResult<()> {
        let duration =
            duration_ms.unwrap_or_else(|| swipe_duration_ms(start_x, start_y, end_x, end_y));
        tracing::debug!(start_x, start_y, end_x, end_y, duration, "swipe");
        self.input(&[
            "swipe",
            &start_x.to_string(),
            &start_y.to_string(),
            &end_x.to_string(),
            &end_y.to_string(),
            &duration.to_string(),
        ])
        .await?;
        self.settle().await;
        Ok(())
    }

    async fn back(&self) -> PhoneClawResult<()> {
        self.input(&["keyevent", "4"]).await?;
        self.settle().await;
        Ok(())
    }

    async fn home(&self) -> PhoneClawResult<()> {
        self.input(&["keyevent", "KEYCODE_HOME"]).await?;
        self.settle().await;
        Ok(())
    }

    async fn launch(&self, app_name: &str) -> PhoneClawResult<bool> {
        let Some(package) = apps::package_for(app_name) else {
            tracing::warn!(app = %app_name, "app not in package table");
            return Ok(false);
        };
        tracing::info!(app = %app_name, package, "launching app");
        let out = self
            .client
            .shell(&[
                "monkey",
                "-p",
                package,
                "-c",
                "android.intent.category.LAUNCHER",
                "1",
            ])
            .await?;
        if !out.success {
            return Err(PhoneClawError::Device(format!(
                "monkey launch of {package} failed: {}",
                out.combined_text().trim()
            )));
        }
        self.settle().await;
        Ok(true)
    }

    async fn type_text(&self, text: &str) -> PhoneClawResult<()> {
        // Base64 keeps non-ASCII text intact through the shell.
        let encoded = base64::engine::general_purpose::STANDARD.encode(text.as_bytes());
        tracing::debug!(chars = text.chars().count(), "typing text");
        self.client
            .shell(&["am", "broadcast", "-a", "ADB_INPUT_B64", "--es", "msg", &encoded])
            .await?;
        Ok(())
    }

    async fn clear_text(&self) -> PhoneClawResult<()> {
        self.client
            .shell(&["am", "broadcast", "-a", "ADB_CLEAR_TEXT"])
            .await?;
        Ok(())
    }

    async fn input_method(&self) -> PhoneClawResult<String> {
        let out = self
            .client
            .shell(&["settings", "get", "secure", "default_input_method"])
            .await?;
        Ok(out.combined_text().trim().to_string())
    }

    async fn set_input_method(&self, ime: &str) -> PhoneClawResult<()> {
        // Freshly installed keyboards are often disabled; `ime set` alone fails on them.
        self.client.shell(&["ime", "enable", ime]).await?;
        let out = self.client.shell(&["ime", "set", ime]).await?;
        if !out.success {
            return Err(PhoneClawError::Device(format!(
                "could not select input method {ime}: {}",
                out.combined_text().trim()
            )));
        }
        tracing::debug!(ime, "input method selected");
        Ok(())
    }

    fn automation_input_method(&self) -> &str {
        &self.automation_ime
    }
}

use async_trait::async_trait;

use crate::adb::apps;
use crate::adb::device::AdbDevice;
use crate::errors::{PhoneClawError, PhoneClawResult};
use crate::perception::screenshot;
use crate::perception::traits::Perception;
use crate::perception::types::Screenshot;

/// Shown to the model when no known app has focus.
pub const HOME_SCREEN_NAME: &str = "System Home";

/// What a `screencap` invocation produced.
#[derive(Debug, PartialEq, Eq)]
pub enum CaptureVerdict {
    Image,
    /// The device refused the capture (FLAG_SECURE windows).
    Sensitive,
    Unreadable,
    Disconnected(String),
}

/// Classifies screencap output without decoding the image.
pub fn classify_capture(stdout: &[u8], stderr: &str) -> CaptureVerdict {
    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";
    if stdout.starts_with(PNG_MAGIC) {
        return CaptureVerdict::Image;
    }

    let text = format!("{}{}", String::from_utf8_lossy(stdout), stderr);
    let lowered = text.to_ascii_lowercase();
    if lowered.contains("no devices")
        || lowered.contains("device offline")
        || lowered.contains("device not found")
        || lowered.contains("unauthorized")
    {
        return CaptureVerdict::Disconnected(text.trim().to_string());
    }
    if text.contains("Status: -1") || text.contains("Failed") {
        return CaptureVerdict::Sensitive;
    }
    CaptureVerdict::Unreadable
}

/// Display name of the focused app from `dumpsys window` output.
pub fn focused_app(dumpsys: &str) -> &'static str {
    dumpsys
        .lines()
        .filter(|line| line.contains("mCurrentFocus") || line.contains("mFocusedApp"))
        .find_map(|line| {
            apps::APP_PACKAGES
                .iter()
                .find(|(_, pkg)| line.contains(pkg))
                .map(|(name, _)| *name)
        })
        .unwrap_or(HOME_SCREEN_NAME)
}

#[async_trait]
impl Perception for AdbDevice {
    async fn capture(&self) -> PhoneClawResult<Screenshot> {
        let out = self.client.run(&["exec-out", "screencap", "-p"]).await?;
        let (w, h) = self.fallback_size;

        match classify_capture(&out.stdout, &out.stderr) {
            CaptureVerdict::Image => match screenshot::from_image_bytes(&out.stdout) {
                Ok(shot) => {
                    tracing::debug!(width = shot.width, height = shot.height, "screen captured");
                    Ok(shot)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "screencap returned a corrupt image; using fallback");
                    screenshot::fallback(w, h, false)
                }
            },
            CaptureVerdict::Sensitive => {
                tracing::info!("screen capture refused (secure window); using fallback");
                screenshot::fallback(w, h, true)
            }
            CaptureVerdict::Unreadable => {
                tracing::warn!(stderr = %out.stderr.trim(), "screencap produced no image; using fallback");
                screenshot::fallback(w, h, false)
            }
            CaptureVerdict::Disconnected(detail) => Err(PhoneClawError::Device(detail)),
        }
    }

    async fn current_app(&self) -> PhoneClawResult<String> {
        let out = self.client.shell(&["dumpsys", "window"]).await?;
        let text = out.combined_text();
        if let CaptureVerdict::Disconnected(detail) = classify_capture(&[], &out.stderr) {
            return Err(PhoneClawError::Device(detail));
        }
        Ok(focused_app(&text).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn png_output_is_an_image() {
        assert_eq!(
            classify_capture(b"\x89PNG\r\n\x1a\nrest", ""),
            CaptureVerdict::Image
        );
    }

    #[test]
    fn secure_window_is_sensitive() {
        assert_eq!(
            classify_capture(b"", "Status: -1\n"),
            CaptureVerdict::Sensitive
        );
        assert_eq!(
            classify_capture(b"Failed to take screenshot", ""),
            CaptureVerdict::Sensitive
        );
    }

    #[test]
    fn disconnects_are_distinguished_from_garbage() {
        assert!(matches!(
            classify_capture(b"", "error: no devices/emulators found"),
            CaptureVerdict::Disconnected(_)
        ));
        assert!(matches!(
            classify_capture(b"", "error: device offline"),
            CaptureVerdict::Disconnected(_)
        ));
        assert_eq!(classify_capture(b"", ""), CaptureVerdict::Unreadable);
    }

    #[test]
    fn focused_app_from_dumpsys() {
        let dumpsys = "\
  mDisplayId=0
  mCurrentFocus=Window{3c1f u0 com.tencent.mm/com.tencent.mm.ui.LauncherUI}
  mFocusedApp=ActivityRecord{9a2 u0 com.tencent.mm/.ui.LauncherUI t12}
";
        assert_eq!(focused_app(dumpsys), "微信");
    }

    #[test]
    fn unknown_focus_is_home() {
        let dumpsys = "  mCurrentFocus=Window{1 u0 com.miui.home/com.miui.home.launcher.Launcher}\n";
        assert_eq!(focused_app(dumpsys), HOME_SCREEN_NAME);
        // Packages outside focus lines are ignored.
        assert_eq!(focused_app("com.tencent.mm is installed"), HOME_SCREEN_NAME);
    }
}

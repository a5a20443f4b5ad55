use async_trait::async_trait;

use crate::errors::PhoneClawResult;

/// Device-level primitives. Coordinates are device pixels; the executor has
/// already converted them from the normalized grid.
#[async_trait]
pub trait DeviceDriver: Send + Sync {
    async fn tap(&self, x: i32, y: i32) -> PhoneClawResult<()>;

    async fn double_tap(&self, x: i32, y: i32) -> PhoneClawResult<()>;

    async fn long_press(&self, x: i32, y: i32, duration_ms: u64) -> PhoneClawResult<()>;

    /// `duration_ms = None` lets the driver pick a duration from the distance.
    async fn swipe(
        &self,
        start_x: i32,
        start_y: i32,
        end_x: i32,
        end_y: i32,
        duration_ms: Option<u64>,
    ) -> PhoneClawResult<()>;

    async fn back(&self) -> PhoneClawResult<()>;

    async fn home(&self) -> PhoneClawResult<()>;

    /// Returns `false` when the app name is not known to the driver.
    async fn launch(&self, app_name: &str) -> PhoneClawResult<bool>;

    async fn type_text(&self, text: &str) -> PhoneClawResult<()>;

    async fn clear_text(&self) -> PhoneClawResult<()>;

    /// Identifier of the currently selected input method.
    async fn input_method(&self) -> PhoneClawResult<String>;

    async fn set_input_method(&self, ime: &str) -> PhoneClawResult<()>;

    /// The input method that accepts automated text input.
    fn automation_input_method(&self) -> &str;
}

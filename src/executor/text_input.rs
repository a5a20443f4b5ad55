// Text entry through the automation keyboard.
// Switch IME if needed → clear → type → restore, with restore guaranteed.
use std::time::Duration;

use crate::errors::PhoneClawResult;
use crate::executor::input::DeviceDriver;

pub async fn type_with_automation_keyboard(
    driver: &dyn DeviceDriver,
    text: &str,
    settle: Duration,
) -> PhoneClawResult<()> {
    let automation = driver.automation_input_method().to_string();
    let original = driver.input_method().await?;
    let switched = !original.contains(automation.as_str());

    if switched {
        tracing::info!(from = %original, to = %automation, "switching to automation keyboard");
        driver.set_input_method(&automation).await?;
        tokio::time::sleep(settle).await;
    }

    let typed = clear_and_type(driver, text, settle).await;

    // An empty original IME cannot be restored.
    let restored = if switched && !original.trim().is_empty() {
        tracing::info!(ime = %original, "restoring original keyboard");
        driver.set_input_method(original.trim()).await
    } else {
        Ok(())
    };

    if let Err(e) = &restored {
        tracing::warn!(error = %e, "failed to restore original keyboard");
    }
    typed?;
    restored
}

async fn clear_and_type(
    driver: &dyn DeviceDriver,
    text: &str,
    settle: Duration,
) -> PhoneClawResult<()> {
    driver.clear_text().await?;
    tokio::time::sleep(settle).await;
    tracing::info!(chars = text.chars().count(), "typing text");
    driver.type_text(text).await?;
    tokio::time::sleep(settle).await;
    Ok(())
}

//! Account settings navigation.

use super::driver::{hover_click, press_key};
use super::options::SessionOptions;
use crate::error::{Result, SessionError};
use crate::handle::{AutomationHandle, Key};
use crate::humanize::random_sleep;
use crate::wait::wait_for_element;
use tracing::{debug, info};

/// Entries the account menu shows when the settings item is reachable.
const MENU_ENTRY_COUNT: usize = 3;

/// Flip the chat history setting through the account menu.
pub(crate) async fn toggle_history<H: AutomationHandle>(
    handle: &H,
    options: &SessionOptions,
) -> Result<()> {
    let locators = &options.locators;

    let profile = wait_for_element(
        handle,
        &locators.profile_button,
        options.element_timeout,
        options.poll_interval,
    )
    .await?;
    hover_click(handle, &profile, &options.hover_hold).await?;

    let menu = wait_for_element(
        handle,
        &locators.settings_menu,
        options.element_timeout,
        options.poll_interval,
    )
    .await?;
    let entries = handle
        .find_child_elements(&menu, &locators.menu_entry)
        .await?;
    if entries.len() != MENU_ENTRY_COUNT {
        debug!(entries = entries.len(), "Unexpected account menu layout");
        return Ok(());
    }

    let settings = entries
        .get(1)
        .ok_or_else(|| SessionError::ElementNotFound {
            locator: locators.menu_entry.clone(),
        })?;
    hover_click(handle, settings, &options.hover_hold).await?;
    random_sleep(&options.menu_pause).await;

    // Move focus from the "General" tab to "Data controls".
    handle.key_down(Key::Tab).await?;
    handle.key_down(Key::ArrowDown).await?;
    handle.key_up(Key::ArrowDown).await?;
    handle.key_up(Key::Tab).await?;
    random_sleep(&options.menu_pause).await;

    press_key(handle, Key::Tab).await?;
    press_key(handle, Key::Tab).await?;
    press_key(handle, Key::Enter).await?;

    info!("Toggled chat history");
    Ok(())
}

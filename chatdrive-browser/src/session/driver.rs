//! Writing a message into the page and submitting it.

use super::options::SessionOptions;
use crate::error::Result;
use crate::handle::{AutomationHandle, Key};
use crate::humanize::random_sleep;
use crate::wait::wait_for_element;
use chatdrive_common::DelayRange;
use tracing::debug;

/// How text reaches the input surface.
#[derive(Debug, Clone, PartialEq)]
pub enum InputStrategy {
    /// Character by character with randomized cadence. A newline becomes a
    /// Shift+Enter soft break instead of a submission.
    Humanized {
        char_delay: DelayRange,
        chord_delay: DelayRange,
    },
    /// Content set in one step, then a pause before submitting.
    Direct { submit_pause: DelayRange },
}

/// Type `text` into the input surface and submit it.
pub(crate) async fn send<H: AutomationHandle>(
    handle: &H,
    options: &SessionOptions,
    text: &str,
) -> Result<()> {
    let input = wait_for_element(
        handle,
        &options.locators.input,
        options.element_timeout,
        options.poll_interval,
    )
    .await?;

    match &options.input {
        InputStrategy::Humanized {
            char_delay,
            chord_delay,
        } => {
            handle.hover(&input).await?;
            handle.click(&input).await?;
            for ch in text.chars() {
                random_sleep(char_delay).await;
                if ch == '\n' {
                    soft_break(handle, chord_delay).await?;
                } else {
                    handle.insert_char(ch).await?;
                }
            }
        }
        InputStrategy::Direct { submit_pause } => {
            handle.set_content(&input, text).await?;
            random_sleep(submit_pause).await;
        }
    }

    submit(handle, options).await
}

async fn soft_break<H: AutomationHandle>(handle: &H, delay: &DelayRange) -> Result<()> {
    handle.key_down(Key::Shift).await?;
    random_sleep(delay).await;
    handle.key_down(Key::Enter).await?;
    random_sleep(delay).await;
    handle.key_up(Key::Enter).await?;
    random_sleep(delay).await;
    handle.key_up(Key::Shift).await?;
    random_sleep(delay).await;
    Ok(())
}

async fn submit<H: AutomationHandle>(handle: &H, options: &SessionOptions) -> Result<()> {
    let button = match options.locators.submit.as_deref() {
        Some(selector) => handle.find_element(selector).await?,
        None => None,
    };

    match button {
        Some(button) => {
            debug!("Submitting via send button");
            handle.click(&button).await
        }
        None => {
            debug!("Submitting via Enter");
            press_key(handle, Key::Enter).await
        }
    }
}

pub(crate) async fn press_key<H: AutomationHandle>(handle: &H, key: Key) -> Result<()> {
    handle.key_down(key).await?;
    handle.key_up(key).await
}

/// Hover, then a mouse press held for a random interval before release.
pub(crate) async fn hover_click<H: AutomationHandle>(
    handle: &H,
    element: &H::Element,
    hold: &DelayRange,
) -> Result<()> {
    handle.hover(element).await?;
    handle.press(element).await?;
    random_sleep(hold).await;
    handle.release(element).await
}

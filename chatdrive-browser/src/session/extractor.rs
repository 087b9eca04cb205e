//! Reading the rendered transcript.

use super::message::{ChatMessage, Role};
use super::options::SessionOptions;
use super::store::MessageStore;
use crate::error::Result;
use crate::handle::AutomationHandle;
use crate::ids::MessageId;
use crate::wait::wait_for_elements;
use std::collections::HashSet;
use tracing::{debug, trace};

/// Messages currently rendered, in page order.
///
/// Each id is yielded at most once per call. Ids already in `store` yield
/// the cached copy without re-reading the entry's text.
pub(crate) async fn collect<H: AutomationHandle>(
    handle: &H,
    options: &SessionOptions,
    store: &mut MessageStore,
) -> Result<Vec<ChatMessage>> {
    let locators = &options.locators;
    let entries = wait_for_elements(
        handle,
        &locators.message_entry,
        options.element_timeout,
        options.poll_interval,
    )
    .await?;

    if entries.is_empty() {
        debug!("No rendered messages");
        return Ok(Vec::new());
    }

    let mut seen = HashSet::new();
    let mut messages = Vec::with_capacity(entries.len());

    for entry in &entries {
        let raw_id = handle
            .attribute(entry, &locators.id_attribute)
            .await?
            .unwrap_or_default();
        let Ok(id) = MessageId::parse(&raw_id) else {
            trace!(id = %raw_id, "Skipping entry with malformed id");
            continue;
        };
        if !seen.insert(id.clone()) {
            continue;
        }

        if let Some(cached) = store.get(&id) {
            messages.push(cached.clone());
            continue;
        }

        let raw_role = handle
            .attribute(entry, &locators.role_attribute)
            .await?
            .unwrap_or_default();
        let Some(role) = Role::classify(&raw_role) else {
            trace!(%id, role = %raw_role, "Ignoring entry");
            continue;
        };

        let text = handle.text(entry).await?;
        messages.push(store.insert(ChatMessage::new(id, role, text)).clone());
    }

    debug!(count = messages.len(), cached = store.len(), "Collected messages");
    Ok(messages)
}

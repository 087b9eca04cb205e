//! Chromium automation over the DevTools protocol.

use super::{AutomationHandle, Exchange, HandleFactory, Key};
use crate::error::{Result, SessionError};
use crate::network::ExchangeRecorder;
use crate::profile::resolve_profile_dir;
use async_trait::async_trait;
use base64::Engine;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType, DispatchMouseEventParams,
    DispatchMouseEventType, MouseButton,
};
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent,
    EventResponseReceived, GetResponseBodyParams, RequestId,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, BrowserConfig as CdpBrowserConfig, Element, Page};
use chatdrive_common::BrowserConfig;
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// `Input.dispatchKeyEvent` modifier bit for Shift.
const SHIFT_MODIFIER: i64 = 8;

impl From<CdpError> for SessionError {
    fn from(err: CdpError) -> Self {
        Self::AutomationHandleFailure(err.to_string())
    }
}

/// How to launch the browser.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub headless: bool,
    pub profile_dir: Option<PathBuf>,
    pub executable: Option<PathBuf>,
    pub window_size: (u32, u32),
    pub ignored_methods: Vec<String>,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self::from_config(&BrowserConfig::default())
    }
}

impl LaunchOptions {
    /// Launch options for `config`, falling back to the OS default profile.
    pub fn from_config(config: &BrowserConfig) -> Self {
        Self {
            headless: config.headless,
            profile_dir: resolve_profile_dir(config.expanded_profile_dir()),
            executable: config.executable.as_deref().map(PathBuf::from),
            window_size: (config.viewport.width, config.viewport.height),
            ignored_methods: config.ignored_methods.clone(),
        }
    }

    fn to_cdp_config(&self) -> Result<CdpBrowserConfig> {
        let (width, height) = self.window_size;
        let mut builder = CdpBrowserConfig::builder()
            .window_size(width, height)
            .arg("--disable-blink-features=AutomationControlled");
        if !self.headless {
            builder = builder.with_head();
        }
        if let Some(dir) = &self.profile_dir {
            builder = builder.user_data_dir(dir);
        }
        if let Some(executable) = &self.executable {
            builder = builder.chrome_executable(executable);
        }
        builder.build().map_err(SessionError::LaunchFailed)
    }
}

/// Launches one browser per handle.
#[derive(Debug, Clone, Default)]
pub struct ChromiumFactory {
    options: LaunchOptions,
}

impl ChromiumFactory {
    pub fn new(options: LaunchOptions) -> Self {
        Self { options }
    }

    pub fn from_config(config: &BrowserConfig) -> Self {
        Self::new(LaunchOptions::from_config(config))
    }
}

#[async_trait]
impl HandleFactory for ChromiumFactory {
    type Handle = ChromiumHandle;

    async fn create(&self) -> Result<ChromiumHandle> {
        ChromiumHandle::launch(&self.options).await
    }
}

/// A launched browser with one page and its traffic recorder.
pub struct ChromiumHandle {
    browser: Browser,
    page: Page,
    recorder: ExchangeRecorder,
    shift_held: AtomicBool,
    tasks: Vec<JoinHandle<()>>,
}

impl ChromiumHandle {
    pub async fn launch(options: &LaunchOptions) -> Result<Self> {
        let config = options.to_cdp_config()?;
        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| SessionError::LaunchFailed(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "CDP handler error");
                }
            }
        });

        match Self::open_page(&browser, options).await {
            Ok((page, recorder, traffic_task)) => {
                info!(
                    headless = options.headless,
                    profile = ?options.profile_dir,
                    "Browser launched"
                );
                Ok(Self {
                    browser,
                    page,
                    recorder,
                    shift_held: AtomicBool::new(false),
                    tasks: vec![handler_task, traffic_task],
                })
            }
            Err(e) => {
                if let Err(close_err) = browser.close().await {
                    warn!(error = %close_err, "Failed to close browser after launch failure");
                }
                handler_task.abort();
                Err(SessionError::LaunchFailed(e.to_string()))
            }
        }
    }

    async fn open_page(
        browser: &Browser,
        options: &LaunchOptions,
    ) -> Result<(Page, ExchangeRecorder, JoinHandle<()>)> {
        let page = browser.new_page("about:blank").await?;
        page.execute(EnableParams::default()).await?;

        let recorder = ExchangeRecorder::new(&options.ignored_methods);
        let task = spawn_traffic_recorder(page.clone(), recorder.clone()).await?;
        Ok((page, recorder, task))
    }

    fn modifiers(&self) -> i64 {
        if self.shift_held.load(Ordering::SeqCst) {
            SHIFT_MODIFIER
        } else {
            0
        }
    }

    async fn dispatch_key(
        &self,
        kind: DispatchKeyEventType,
        key: &str,
        code: &str,
        virtual_key_code: Option<i64>,
        text: Option<&str>,
    ) -> Result<()> {
        let mut builder = DispatchKeyEventParams::builder()
            .r#type(kind)
            .key(key)
            .code(code)
            .modifiers(self.modifiers());
        if let Some(vk) = virtual_key_code {
            builder = builder
                .windows_virtual_key_code(vk)
                .native_virtual_key_code(vk);
        }
        if let Some(text) = text {
            builder = builder.text(text).unmodified_text(text);
        }
        let params = builder.build().map_err(SessionError::handle)?;
        self.page.execute(params).await?;
        Ok(())
    }

    async fn dispatch_mouse(&self, element: &Element, kind: DispatchMouseEventType) -> Result<()> {
        let point = element.clickable_point().await?;
        let params = DispatchMouseEventParams::builder()
            .r#type(kind)
            .x(point.x)
            .y(point.y)
            .button(MouseButton::Left)
            .click_count(1)
            .build()
            .map_err(SessionError::handle)?;
        self.page.execute(params).await?;
        Ok(())
    }
}

/// Feed the page's network events into `recorder` until the page goes away.
async fn spawn_traffic_recorder(page: Page, recorder: ExchangeRecorder) -> Result<JoinHandle<()>> {
    let mut requests = page.event_listener::<EventRequestWillBeSent>().await?;
    let mut responses = page.event_listener::<EventResponseReceived>().await?;
    let mut finished = page.event_listener::<EventLoadingFinished>().await?;
    let mut failed = page.event_listener::<EventLoadingFailed>().await?;

    Ok(tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(event) = requests.next() => {
                    recorder
                        .on_request(event.request_id.inner(), &event.request.url, &event.request.method)
                        .await;
                }
                Some(event) = responses.next() => {
                    let status = u16::try_from(event.response.status).unwrap_or_default();
                    recorder.on_response(event.request_id.inner(), status).await;
                }
                Some(event) = finished.next() => {
                    let id = event.request_id.inner();
                    if recorder.is_tracked(id).await {
                        let body = fetch_body(&page, event.request_id.clone()).await;
                        recorder.on_finished(id, body).await;
                    }
                }
                Some(event) = failed.next() => {
                    recorder.on_failed(event.request_id.inner()).await;
                }
                else => break,
            }
        }
        trace!("Network event streams closed");
    }))
}

async fn fetch_body(page: &Page, request_id: RequestId) -> Option<Vec<u8>> {
    let response = match page.execute(GetResponseBodyParams::new(request_id)).await {
        Ok(response) => response,
        Err(e) => {
            trace!(error = %e, "Response body unavailable");
            return None;
        }
    };

    let returns = &response.result;
    if returns.base64_encoded {
        base64::engine::general_purpose::STANDARD
            .decode(&returns.body)
            .map_err(|e| trace!(error = %e, "Response body is not valid base64"))
            .ok()
    } else {
        Some(returns.body.clone().into_bytes())
    }
}

#[async_trait]
impl AutomationHandle for ChromiumHandle {
    type Element = Element;

    async fn navigate(&self, url: &str) -> Result<()> {
        debug!(url = %url, "Navigating");
        self.page.goto(url).await?;
        Ok(())
    }

    async fn current_url(&self) -> Result<Option<String>> {
        Ok(self.page.url().await?)
    }

    async fn is_document_ready(&self) -> Result<bool> {
        let state: String = self
            .page
            .evaluate("document.readyState")
            .await?
            .into_value()
            .map_err(SessionError::handle)?;
        Ok(matches!(state.as_str(), "interactive" | "complete"))
    }

    async fn find_element(&self, selector: &str) -> Result<Option<Element>> {
        Ok(self.find_elements(selector).await?.into_iter().next())
    }

    async fn find_elements(&self, selector: &str) -> Result<Vec<Element>> {
        Ok(self.page.find_elements(selector).await?)
    }

    async fn find_child_elements(&self, parent: &Element, selector: &str) -> Result<Vec<Element>> {
        Ok(parent.find_elements(selector).await?)
    }

    async fn attribute(&self, element: &Element, name: &str) -> Result<Option<String>> {
        Ok(element.attribute(name).await?)
    }

    async fn text(&self, element: &Element) -> Result<String> {
        Ok(element.inner_text().await?.unwrap_or_default())
    }

    async fn hover(&self, element: &Element) -> Result<()> {
        element.hover().await?;
        Ok(())
    }

    async fn click(&self, element: &Element) -> Result<()> {
        element.click().await?;
        Ok(())
    }

    async fn press(&self, element: &Element) -> Result<()> {
        self.dispatch_mouse(element, DispatchMouseEventType::MousePressed)
            .await
    }

    async fn release(&self, element: &Element) -> Result<()> {
        self.dispatch_mouse(element, DispatchMouseEventType::MouseReleased)
            .await
    }

    async fn set_content(&self, element: &Element, text: &str) -> Result<()> {
        let literal = serde_json::to_string(text).map_err(SessionError::handle)?;
        let function = format!(
            "function() {{ \
                this.focus(); \
                if ('value' in this) {{ this.value = {literal}; }} else {{ this.textContent = {literal}; }} \
                this.dispatchEvent(new Event('input', {{ bubbles: true }})); \
            }}"
        );
        element.call_js_fn(function, false).await?;
        Ok(())
    }

    async fn key_down(&self, key: Key) -> Result<()> {
        let kind = if key.text().is_some() {
            DispatchKeyEventType::KeyDown
        } else {
            DispatchKeyEventType::RawKeyDown
        };
        self.dispatch_key(
            kind,
            key.name(),
            key.code(),
            Some(key.virtual_key_code()),
            key.text(),
        )
        .await?;
        if key == Key::Shift {
            self.shift_held.store(true, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn key_up(&self, key: Key) -> Result<()> {
        if key == Key::Shift {
            self.shift_held.store(false, Ordering::SeqCst);
        }
        self.dispatch_key(
            DispatchKeyEventType::KeyUp,
            key.name(),
            key.code(),
            Some(key.virtual_key_code()),
            None,
        )
        .await
    }

    async fn insert_char(&self, ch: char) -> Result<()> {
        let mut buf = [0u8; 4];
        let text: &str = ch.encode_utf8(&mut buf);
        self.dispatch_key(DispatchKeyEventType::KeyDown, text, "", None, Some(text))
            .await?;
        self.dispatch_key(DispatchKeyEventType::KeyUp, text, "", None, None)
            .await
    }

    async fn exchange_count(&self) -> Result<usize> {
        Ok(self.recorder.exchange_count().await)
    }

    async fn exchanges_since(&self, mark: usize) -> Result<Vec<Exchange>> {
        Ok(self.recorder.exchanges_since(mark).await)
    }

    async fn close(&mut self) -> Result<()> {
        let result = self.browser.close().await;
        if result.is_ok() {
            // Reap the child so no zombie is left behind.
            let _ = self.browser.wait().await;
        }
        for task in self.tasks.drain(..) {
            task.abort();
        }
        info!("Browser closed");
        result.map(|_| ()).map_err(SessionError::from)
    }
}

impl Drop for ChromiumHandle {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_options_from_config() {
        let config = BrowserConfig {
            headless: false,
            profile_dir: Some("/tmp/chatdrive-profile".into()),
            executable: Some("/usr/bin/chromium".into()),
            ..Default::default()
        };

        let options = LaunchOptions::from_config(&config);
        assert!(!options.headless);
        assert_eq!(
            options.profile_dir,
            Some(PathBuf::from("/tmp/chatdrive-profile"))
        );
        assert_eq!(options.executable, Some(PathBuf::from("/usr/bin/chromium")));
        assert_eq!(options.window_size, (1280, 720));
        assert!(options.ignored_methods.iter().any(|m| m == "GET"));
    }

    #[test]
    fn test_cdp_error_maps_to_handle_failure() {
        let err: SessionError = CdpError::Timeout.into();
        assert!(matches!(err, SessionError::AutomationHandleFailure(_)));
    }
}

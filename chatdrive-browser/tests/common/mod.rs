//! Scripted in-memory automation handle.

#![allow(dead_code)]

use async_trait::async_trait;
use chatdrive_browser::{
    AutomationHandle, CompletionStrategy, Exchange, HandleFactory, InputStrategy, Key, Result,
    SessionError, SessionOptions, TrafficSignal,
};
use chatdrive_common::DelayRange;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const BASE: &str = "https://chatgpt.com";

/// Something the engine did to the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Navigate(String),
    Hover(usize),
    Click(usize),
    Press(usize),
    Release(usize),
    SetContent(usize, String),
    KeyDown(Key),
    KeyUp(Key),
    Char(char),
}

#[derive(Debug, Clone, Default)]
pub struct Node {
    pub selectors: Vec<String>,
    pub attributes: HashMap<String, String>,
    pub text: String,
    pub parent: Option<usize>,
}

impl Node {
    pub fn new(selector: &str) -> Self {
        Self {
            selectors: vec![selector.to_string()],
            ..Default::default()
        }
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn child_of(mut self, parent: usize) -> Self {
        self.parent = Some(parent);
        self
    }
}

/// Page state shared by every handle the factory creates.
#[derive(Debug)]
pub struct Page {
    pub url: Option<String>,
    pub ready: bool,
    pub nodes: Vec<Option<Node>>,
    pub exchanges: Vec<Exchange>,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            url: None,
            ready: true,
            nodes: Vec::new(),
            exchanges: Vec::new(),
        }
    }
}

impl Page {
    /// Add a node and return its element handle.
    pub fn add(&mut self, node: Node) -> usize {
        self.nodes.push(Some(node));
        self.nodes.len() - 1
    }

    pub fn remove(&mut self, element: usize) {
        if let Some(slot) = self.nodes.get_mut(element) {
            *slot = None;
        }
    }

    pub fn node_mut(&mut self, element: usize) -> &mut Node {
        self.nodes[element].as_mut().unwrap()
    }

    /// Add a rendered message entry.
    pub fn add_message(&mut self, role: &str, id: &str, text: &str) -> usize {
        self.add(
            Node::new("div[data-message-author-role]")
                .attr("data-message-author-role", role)
                .attr("data-message-id", id)
                .text(text),
        )
    }

    pub fn push_exchange(&mut self, method: &str, url: &str, body: &str) {
        self.exchanges.push(Exchange {
            method: method.to_string(),
            url: url.to_string(),
            status: Some(200),
            body: Some(body.as_bytes().to_vec()),
        });
    }

    fn matching(&self, selector: &str, parent: Option<usize>) -> Vec<usize> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(index, node)| {
                let node = node.as_ref()?;
                let in_scope = parent.is_none() || node.parent == parent;
                (in_scope && node.selectors.iter().any(|s| s == selector)).then_some(index)
            })
            .collect()
    }

    fn node(&self, element: usize) -> Result<&Node> {
        self.nodes
            .get(element)
            .and_then(Option::as_ref)
            .ok_or_else(|| SessionError::handle(format!("stale element {element}")))
    }
}

/// Factory plus inspection hooks. Clones share state.
#[derive(Clone, Default)]
pub struct FakeBrowser {
    pub page: Arc<Mutex<Page>>,
    pub actions: Arc<Mutex<Vec<Action>>>,
    pub created: Arc<AtomicUsize>,
    pub closed: Arc<AtomicUsize>,
    pub live: Arc<AtomicUsize>,
    pub max_live: Arc<AtomicUsize>,
    pub fail_close: Arc<AtomicBool>,
    /// Milliseconds every traffic read blocks for.
    pub traffic_delay_ms: Arc<AtomicU64>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(&self) -> std::sync::MutexGuard<'_, Page> {
        self.page.lock().unwrap()
    }

    pub fn actions(&self) -> Vec<Action> {
        self.actions.lock().unwrap().clone()
    }

    pub fn clear_actions(&self) {
        self.actions.lock().unwrap().clear();
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn max_live(&self) -> usize {
        self.max_live.load(Ordering::SeqCst)
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Make every traffic read hang for `delay`, like a wedged browser.
    pub fn stall_traffic(&self, delay: Duration) {
        self.traffic_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Input box and send button, as the landing page renders them.
    pub fn with_composer(&self) -> (usize, usize) {
        let mut page = self.page();
        let input = page.add(Node::new("#prompt-textarea"));
        let submit = page.add(Node::new(r#"button[data-testid="send-button"]"#));
        (input, submit)
    }
}

#[async_trait]
impl HandleFactory for FakeBrowser {
    type Handle = FakeHandle;

    async fn create(&self) -> Result<FakeHandle> {
        self.created.fetch_add(1, Ordering::SeqCst);
        let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_live.fetch_max(live, Ordering::SeqCst);
        Ok(FakeHandle {
            browser: self.clone(),
            open: true,
        })
    }
}

pub struct FakeHandle {
    browser: FakeBrowser,
    open: bool,
}

impl FakeHandle {
    fn record(&self, action: Action) {
        self.browser.actions.lock().unwrap().push(action);
    }

    fn page(&self) -> std::sync::MutexGuard<'_, Page> {
        self.browser.page.lock().unwrap()
    }

    async fn stall(&self) {
        let delay = self.browser.traffic_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }

    fn release(&mut self) {
        if self.open {
            self.open = false;
            self.browser.live.fetch_sub(1, Ordering::SeqCst);
            self.browser.closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl Drop for FakeHandle {
    fn drop(&mut self) {
        self.release();
    }
}

#[async_trait]
impl AutomationHandle for FakeHandle {
    type Element = usize;

    async fn navigate(&self, url: &str) -> Result<()> {
        self.record(Action::Navigate(url.to_string()));
        self.page().url = Some(url.to_string());
        Ok(())
    }

    async fn current_url(&self) -> Result<Option<String>> {
        Ok(self.page().url.clone())
    }

    async fn is_document_ready(&self) -> Result<bool> {
        Ok(self.page().ready)
    }

    async fn find_element(&self, selector: &str) -> Result<Option<usize>> {
        Ok(self.page().matching(selector, None).into_iter().next())
    }

    async fn find_elements(&self, selector: &str) -> Result<Vec<usize>> {
        Ok(self.page().matching(selector, None))
    }

    async fn find_child_elements(&self, parent: &usize, selector: &str) -> Result<Vec<usize>> {
        Ok(self.page().matching(selector, Some(*parent)))
    }

    async fn attribute(&self, element: &usize, name: &str) -> Result<Option<String>> {
        Ok(self.page().node(*element)?.attributes.get(name).cloned())
    }

    async fn text(&self, element: &usize) -> Result<String> {
        Ok(self.page().node(*element)?.text.clone())
    }

    async fn hover(&self, element: &usize) -> Result<()> {
        self.record(Action::Hover(*element));
        Ok(())
    }

    async fn click(&self, element: &usize) -> Result<()> {
        self.record(Action::Click(*element));
        Ok(())
    }

    async fn press(&self, element: &usize) -> Result<()> {
        self.record(Action::Press(*element));
        Ok(())
    }

    async fn release(&self, element: &usize) -> Result<()> {
        self.record(Action::Release(*element));
        Ok(())
    }

    async fn set_content(&self, element: &usize, text: &str) -> Result<()> {
        self.record(Action::SetContent(*element, text.to_string()));
        Ok(())
    }

    async fn key_down(&self, key: Key) -> Result<()> {
        self.record(Action::KeyDown(key));
        Ok(())
    }

    async fn key_up(&self, key: Key) -> Result<()> {
        self.record(Action::KeyUp(key));
        Ok(())
    }

    async fn insert_char(&self, ch: char) -> Result<()> {
        self.record(Action::Char(ch));
        Ok(())
    }

    async fn exchange_count(&self) -> Result<usize> {
        self.stall().await;
        Ok(self.page().exchanges.len())
    }

    async fn exchanges_since(&self, mark: usize) -> Result<Vec<Exchange>> {
        self.stall().await;
        let page = self.page();
        Ok(page.exchanges.iter().skip(mark).cloned().collect())
    }

    async fn close(&mut self) -> Result<()> {
        self.release();
        if self.browser.fail_close.load(Ordering::SeqCst) {
            return Err(SessionError::handle("browser already gone"));
        }
        Ok(())
    }
}

pub const POLL: Duration = Duration::from_millis(10);

/// Options with no artificial delays and short waits.
pub fn fast_options() -> SessionOptions {
    SessionOptions {
        input: InputStrategy::Humanized {
            char_delay: DelayRange::zero(),
            chord_delay: DelayRange::zero(),
        },
        completion: CompletionStrategy::Traffic(TrafficSignal {
            method: "POST".into(),
            path: "/backend-api/lat/r".into(),
            status_field: "status".into(),
        }),
        settle: DelayRange::zero(),
        hover_hold: DelayRange::zero(),
        menu_pause: DelayRange::zero(),
        element_timeout: Duration::from_millis(200),
        ready_timeout: Duration::from_millis(200),
        poll_interval: POLL,
        ..SessionOptions::default()
    }
}

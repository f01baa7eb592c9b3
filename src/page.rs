//! Model of the page the console renders.
//!
//! The page holds four elements addressed by identifier (log container, run button,
//! stop button, message container) plus the queue of modal alerts and the
//! diagnostic channel. Controller events are applied here in arrival order; front ends only
//! read from it and translate key presses into clicks.

use crate::model::{ButtonStates, ConsoleEvent, InfoEvent};
use crate::orchestrator::UiCommand;
use std::collections::VecDeque;

pub const LOG_MESSAGES_ID: &str = "logMessages";
pub const RUN_AGENTS_BTN_ID: &str = "runAgentsBtn";
pub const STOP_AGENTS_BTN_ID: &str = "stopAgentsBtn";
pub const MESSAGE_CONTAINER_ID: &str = "message_container";

const MAX_DIAGNOSTICS: usize = 50;

/// A child of the log container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogNode {
    /// One fetched log message, rendered as text.
    Entry(String),
    /// Response text appended after the entries by the run action.
    Raw(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogContainer {
    children: Vec<LogNode>,
}

impl LogContainer {
    pub fn children(&self) -> &[LogNode] {
        &self.children
    }

    /// Texts of the fetched entries, in order.
    pub fn entries(&self) -> Vec<&str> {
        self.children
            .iter()
            .filter_map(|n| match n {
                LogNode::Entry(s) => Some(s.as_str()),
                LogNode::Raw(_) => None,
            })
            .collect()
    }

    fn replace_entries(&mut self, messages: Vec<String>) {
        self.children.clear();
        self.children
            .extend(messages.into_iter().map(LogNode::Entry));
    }

    fn append_raw(&mut self, text: String) {
        self.children.push(LogNode::Raw(text));
    }

    /// Rendered lines: each entry starts a new line, raw text continues the last one.
    pub fn lines(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for node in &self.children {
            match node {
                LogNode::Entry(s) => out.extend(s.split('\n').map(str::to_string)),
                LogNode::Raw(s) => {
                    let mut parts = s.split('\n');
                    if let Some(first) = parts.next() {
                        match out.last_mut() {
                            Some(last) => last.push_str(first),
                            None => out.push(first.to_string()),
                        }
                    }
                    out.extend(parts.map(str::to_string));
                }
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub id: &'static str,
    pub label: &'static str,
    pub disabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonId {
    RunAgents,
    StopAgents,
}

/// Scroll wrapper around the log container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageContainer {
    pub scroll_top: usize,
    /// Rows of log visible at once; 0 when nothing is displayed.
    pub viewport: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub log_messages: LogContainer,
    pub run_button: Button,
    pub stop_button: Button,
    pub message_container: MessageContainer,
    /// Alerts waiting to be acknowledged, oldest first.
    pub alerts: VecDeque<String>,
    pub diagnostics: VecDeque<String>,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            log_messages: LogContainer::default(),
            run_button: Button {
                id: RUN_AGENTS_BTN_ID,
                label: "Run Agents",
                disabled: false,
            },
            stop_button: Button {
                id: STOP_AGENTS_BTN_ID,
                label: "Stop Agents",
                disabled: false,
            },
            message_container: MessageContainer::default(),
            alerts: VecDeque::new(),
            diagnostics: VecDeque::new(),
        }
    }
}

impl Page {
    /// Apply one completed request to the page.
    pub fn apply(&mut self, event: ConsoleEvent) {
        match event {
            ConsoleEvent::LogMessages(messages) => self.log_messages.replace_entries(messages),
            ConsoleEvent::ButtonStates(states) => self.toggle_buttons(states),
            ConsoleEvent::RunAgentsReply(text) => {
                self.log_messages.append_raw(text);
                self.scroll_to_bottom();
            }
            ConsoleEvent::StopAgentsReply(text) => self.alerts.push_back(text),
            ConsoleEvent::Info(info) => self.record(info),
        }
    }

    fn toggle_buttons(&mut self, states: ButtonStates) {
        self.run_button.disabled = !states.start_enabled;
        self.stop_button.disabled = !states.stop_enabled;
        tracing::debug!(
            run_disabled = self.run_button.disabled,
            stop_disabled = self.stop_button.disabled,
            "button states applied"
        );
    }

    fn record(&mut self, info: InfoEvent) {
        self.diagnostics.push_back(info.to_message());
        while self.diagnostics.len() > MAX_DIAGNOSTICS {
            self.diagnostics.pop_front();
        }
    }

    /// Largest offset that still fills the viewport.
    fn max_scroll(&self) -> usize {
        self.log_messages
            .lines()
            .len()
            .saturating_sub(self.message_container.viewport)
    }

    /// Move the message container to its maximum scroll offset.
    pub fn scroll_to_bottom(&mut self) {
        self.message_container.scroll_top = self.max_scroll();
    }

    pub fn scroll_by(&mut self, delta: isize) {
        let max = self.max_scroll();
        let top = self.message_container.scroll_top.min(max) as isize + delta;
        self.message_container.scroll_top = top.clamp(0, max as isize) as usize;
    }

    /// Resize the visible window, keeping the offset reachable.
    pub fn set_viewport(&mut self, rows: usize) {
        self.message_container.viewport = rows;
        let max = self.max_scroll();
        let container = &mut self.message_container;
        container.scroll_top = container.scroll_top.min(max);
    }

    pub fn button(&self, id: ButtonId) -> &Button {
        match id {
            ButtonId::RunAgents => &self.run_button,
            ButtonId::StopAgents => &self.stop_button,
        }
    }

    /// Click a button. Disabled buttons and a pending alert swallow the click.
    pub(crate) fn click(&self, id: ButtonId) -> Option<UiCommand> {
        if !self.alerts.is_empty() || self.button(id).disabled {
            return None;
        }
        Some(match id {
            ButtonId::RunAgents => UiCommand::RunAgents,
            ButtonId::StopAgents => UiCommand::StopAgents,
        })
    }

    /// The alert currently shown, if any.
    pub fn alert(&self) -> Option<&str> {
        self.alerts.front().map(String::as_str)
    }

    /// Acknowledge the shown alert; the next queued one takes its place.
    pub fn dismiss_alert(&mut self) -> Option<String> {
        self.alerts.pop_front()
    }

    pub fn last_diagnostic(&self) -> Option<&str> {
        self.diagnostics.back().map(String::as_str)
    }
}

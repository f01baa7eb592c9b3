//! Console lifecycle controller.
//!
//! Owns the two poll timers and dispatches user actions as fire-and-forget
//! requests whose results are emitted as events for presentation layers.

use super::actions;
use crate::client::BackendClient;
use crate::model::{ConsoleConfig, ConsoleEvent, InfoEvent};
use anyhow::Result;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior};

/// Commands emitted by UI layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UiCommand {
    RunAgents,
    StopAgents,
    Quit,
}

/// Constructed once at startup; polls until torn down.
pub(crate) struct UiController {
    client: Arc<BackendClient>,
    event_tx: UnboundedSender<ConsoleEvent>,
    log_poller: JoinHandle<()>,
    button_poller: JoinHandle<()>,
}

impl UiController {
    /// Fetch logs and button states right away, then every `poll_interval`.
    pub(crate) fn start(
        client: Arc<BackendClient>,
        poll_interval: Duration,
        event_tx: UnboundedSender<ConsoleEvent>,
    ) -> Self {
        let log_poller = spawn_poller(poll_interval, client.clone(), event_tx.clone(), |c, tx| async move {
            actions::refresh_logs(&c, &tx).await
        });
        let button_poller =
            spawn_poller(poll_interval, client.clone(), event_tx.clone(), |c, tx| async move {
                actions::refresh_button_states(&c, &tx).await
            });
        Self {
            client,
            event_tx,
            log_poller,
            button_poller,
        }
    }

    /// Trigger the agents. Overlapping clicks issue overlapping requests.
    pub(crate) fn run_agents(&self) -> JoinHandle<()> {
        let client = self.client.clone();
        let tx = self.event_tx.clone();
        tokio::spawn(async move { actions::run_agents(&client, &tx).await })
    }

    pub(crate) fn stop_agents(&self) -> JoinHandle<()> {
        let client = self.client.clone();
        let tx = self.event_tx.clone();
        tokio::spawn(async move { actions::stop_agents(&client, &tx).await })
    }

    /// Stop both poll timers. Requests already in flight still complete.
    pub(crate) fn teardown(self) {
        tracing::debug!("stopping pollers");
        drop(self);
    }
}

impl Drop for UiController {
    fn drop(&mut self) {
        self.log_poller.abort();
        self.button_poller.abort();
    }
}

/// Tick immediately and then every `period`, spawning one fetch per tick so a slow
/// response never holds back the next tick.
fn spawn_poller<F, Fut>(
    period: Duration,
    client: Arc<BackendClient>,
    event_tx: UnboundedSender<ConsoleEvent>,
    fetch: F,
) -> JoinHandle<()>
where
    F: Fn(Arc<BackendClient>, UnboundedSender<ConsoleEvent>) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            tokio::spawn(fetch(client.clone(), event_tx.clone()));
        }
    })
}

/// Run the console against the backend and turn UI commands into requests.
pub(crate) async fn run_controller(
    cfg: &ConsoleConfig,
    event_tx: UnboundedSender<ConsoleEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let client = Arc::new(BackendClient::new(cfg)?);
    let _ = event_tx.send(ConsoleEvent::Info(InfoEvent::Message(format!(
        "Polling {} every {}",
        client.base_url(),
        humantime::format_duration(cfg.poll_interval)
    ))));
    let controller = UiController::start(client, cfg.poll_interval, event_tx);

    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            UiCommand::RunAgents => {
                controller.run_agents();
            }
            UiCommand::StopAgents => {
                controller.stop_agents();
            }
            UiCommand::Quit => break,
        }
    }

    controller.teardown();
    Ok(())
}

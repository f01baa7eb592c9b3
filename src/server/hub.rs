//! Backend state: the activity log, the button flags and the running agent crew.

use crate::activity::ActivityLog;
use crate::agents::{concrete_agent, crossed_mailboxes};
use crate::model::{ButtonStates, ServeConfig};
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;

pub(crate) const RUN_ACCEPTED: &str = "Accepted the command to invoke the sleeping agents.";
pub(crate) const STOP_ACCEPTED: &str = "Agents have been put to sleep successfully!";
pub(crate) const STOP_FAILED: &str = "Error occurred while stopping agents.";

/// Tasks belonging to one run of the two agents.
struct Crew {
    tasks: Vec<JoinHandle<()>>,
}

impl Crew {
    /// Abort every task and wait for them. Returns how many ended by panicking.
    async fn shut_down(self) -> usize {
        for task in &self.tasks {
            task.abort();
        }
        futures::future::join_all(self.tasks)
            .await
            .into_iter()
            .filter(|r| matches!(r, Err(e) if e.is_panic()))
            .count()
    }
}

pub struct AgentHub {
    log: ActivityLog,
    buttons: Mutex<ButtonStates>,
    crew: tokio::sync::Mutex<Option<Crew>>,
    behavior_period: Duration,
    startup_grace: Duration,
}

impl AgentHub {
    pub fn new(cfg: &ServeConfig) -> Self {
        Self {
            log: ActivityLog::new(),
            buttons: Mutex::new(ButtonStates::idle()),
            crew: tokio::sync::Mutex::new(None),
            behavior_period: cfg.behavior_period,
            startup_grace: cfg.startup_grace,
        }
    }

    pub fn log_messages(&self) -> Vec<String> {
        self.log.snapshot()
    }

    pub fn button_states(&self) -> ButtonStates {
        *self.buttons.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn set_buttons(&self, states: ButtonStates) {
        *self.buttons.lock().unwrap_or_else(|p| p.into_inner()) = states;
    }

    /// Start a fresh pair of agents, replacing any crew still running.
    pub async fn run_agents(&self) -> &'static str {
        self.log.clear();
        {
            let mut crew = self.crew.lock().await;
            if let Some(previous) = crew.take() {
                tracing::info!("replacing running agents");
                previous.shut_down().await;
            }
            *crew = Some(self.launch());
        }
        tokio::time::sleep(self.startup_grace).await;
        // A stop during the grace period has already taken the crew.
        let crew = self.crew.lock().await;
        if crew.is_some() {
            self.set_buttons(ButtonStates::running());
        }
        RUN_ACCEPTED
    }

    fn launch(&self) -> Crew {
        self.log.display("Preparing the agents.");
        let (first_box, second_box) = crossed_mailboxes();

        self.log.display("Starting the agents with:");
        self.log
            .display("behaviour: to generate random 2-word messages.");
        self.log.display(
            "handler: to filters messages for the keyword 'hello' and then print its content.",
        );

        let first = concrete_agent("agent-1", self.log.clone(), self.behavior_period);
        let second = concrete_agent("agent-2", self.log.clone(), self.behavior_period);
        tracing::debug!(first = first.name(), second = second.name(), "spawning agents");
        let mut tasks = first.spawn(first_box);
        tasks.extend(second.spawn(second_box));
        Crew { tasks }
    }

    /// Stop the running crew, if any, and reset the flags.
    pub async fn stop_agents(&self) -> &'static str {
        let crew = self.crew.lock().await.take();
        let panicked = match crew {
            Some(crew) => crew.shut_down().await,
            None => 0,
        };
        self.log.display("All agents have been stopped.");
        self.log.clear();
        self.set_buttons(ButtonStates::idle());
        if panicked > 0 {
            tracing::error!(panicked, "agent tasks panicked before being stopped");
            STOP_FAILED
        } else {
            STOP_ACCEPTED
        }
    }

    #[cfg(test)]
    pub(crate) async fn running_tasks(&self) -> usize {
        self.crew
            .lock()
            .await
            .as_ref()
            .map(|c| c.tasks.iter().filter(|t| !t.is_finished()).count())
            .unwrap_or(0)
    }
}

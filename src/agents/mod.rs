//! Autonomous agents that exchange messages through crossed mailboxes.
//!
//! An agent owns a table of message handlers keyed by message type and a list of
//! behaviors. Running it spawns two tasks: one drains the inbox through the
//! handlers, the other runs every behavior on a fixed period and forwards what they
//! produce to the outbox.

mod concrete;

pub use concrete::concrete_agent;

use crate::model::AgentMessage;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

pub type Handler = Box<dyn Fn(&AgentMessage) + Send + Sync>;
pub type Behavior = Box<dyn FnMut() -> Option<AgentMessage> + Send>;

/// Inbox and outbox of one agent.
pub struct Mailbox {
    pub inbox: UnboundedReceiver<AgentMessage>,
    pub outbox: UnboundedSender<AgentMessage>,
}

/// Two mailboxes where each outbox feeds the other inbox.
pub fn crossed_mailboxes() -> (Mailbox, Mailbox) {
    let (to_a, a_inbox) = mpsc::unbounded_channel();
    let (to_b, b_inbox) = mpsc::unbounded_channel();
    (
        Mailbox {
            inbox: a_inbox,
            outbox: to_b,
        },
        Mailbox {
            inbox: b_inbox,
            outbox: to_a,
        },
    )
}

pub struct AutonomousAgent {
    name: String,
    handlers: HashMap<String, Handler>,
    behaviors: Vec<Behavior>,
    period: Duration,
}

impl AutonomousAgent {
    pub fn new(name: impl Into<String>, period: Duration) -> Self {
        Self {
            name: name.into(),
            handlers: HashMap::new(),
            behaviors: Vec::new(),
            period,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn register_message_handler(&mut self, kind: impl Into<String>, handler: Handler) {
        self.handlers.insert(kind.into(), handler);
    }

    pub fn register_behavior(&mut self, behavior: Behavior) {
        self.behaviors.push(behavior);
    }

    /// Dispatch to the handler registered for the message type; unknown types are dropped.
    pub fn handle_message(&self, message: &AgentMessage) {
        if let Some(handler) = self.handlers.get(&message.kind) {
            handler(message);
        }
    }

    /// Run every behavior once, returning what they emitted.
    #[cfg(test)]
    pub fn run_behaviors_once(&mut self) -> Vec<AgentMessage> {
        run_behaviors(&mut self.behaviors)
    }

    /// Spawn the consumer and behavior tasks. Both end when their channel closes
    /// or the handles are aborted.
    pub fn spawn(mut self, mailbox: Mailbox) -> Vec<JoinHandle<()>> {
        let Mailbox { mut inbox, outbox } = mailbox;
        let mut behaviors = std::mem::take(&mut self.behaviors);
        let name = self.name.clone();
        let period = self.period;

        let consumer = tokio::spawn(async move {
            while let Some(message) = inbox.recv().await {
                self.handle_message(&message);
            }
            tracing::debug!(agent = %self.name, "inbox closed");
        });

        let behavior = tokio::spawn(async move {
            loop {
                for message in run_behaviors(&mut behaviors) {
                    if outbox.send(message).is_err() {
                        tracing::debug!(agent = %name, "outbox closed");
                        return;
                    }
                }
                tokio::time::sleep(period).await;
            }
        });

        vec![consumer, behavior]
    }
}

fn run_behaviors(behaviors: &mut [Behavior]) -> Vec<AgentMessage> {
    behaviors.iter_mut().filter_map(|b| b()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn handle_message_routes_by_type() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut agent = AutonomousAgent::new("a", Duration::from_secs(2));
        let sink = seen.clone();
        agent.register_message_handler(
            "custom",
            Box::new(move |m| sink.lock().unwrap().push(m.content.clone())),
        );

        agent.handle_message(&AgentMessage::custom("hello world"));
        agent.handle_message(&AgentMessage {
            kind: "other".into(),
            content: "ignored".into(),
        });

        assert_eq!(*seen.lock().unwrap(), vec!["hello world".to_string()]);
    }

    #[test]
    fn run_behaviors_once_collects_emitted_messages() {
        let mut agent = AutonomousAgent::new("a", Duration::from_secs(2));
        agent.register_behavior(Box::new(|| Some(AgentMessage::custom("x"))));
        agent.register_behavior(Box::new(|| None));
        assert_eq!(agent.run_behaviors_once(), vec![AgentMessage::custom("x")]);
    }

    #[tokio::test]
    async fn crossed_mailboxes_deliver_both_ways() {
        let (mut a, mut b) = crossed_mailboxes();

        let from_a = AgentMessage::custom("hello world");
        a.outbox.send(from_a.clone()).unwrap();
        assert_eq!(b.inbox.recv().await, Some(from_a));

        let from_b = AgentMessage::custom("foo bar");
        b.outbox.send(from_b.clone()).unwrap();
        assert_eq!(a.inbox.recv().await, Some(from_b));
    }

    #[tokio::test]
    async fn spawned_agents_feed_each_other() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let (ma, mb) = crossed_mailboxes();

        let mut talker = AutonomousAgent::new("talker", Duration::from_millis(10));
        let mut sent = false;
        talker.register_behavior(Box::new(move || {
            if sent {
                None
            } else {
                sent = true;
                Some(AgentMessage::custom("ping"))
            }
        }));

        let mut listener = AutonomousAgent::new("listener", Duration::from_secs(60));
        let sink = received.clone();
        listener.register_message_handler(
            "custom",
            Box::new(move |m| sink.lock().unwrap().push(m.content.clone())),
        );

        let mut handles = talker.spawn(ma);
        handles.extend(listener.spawn(mb));

        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while received.lock().unwrap().is_empty() && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(*received.lock().unwrap(), vec!["ping".to_string()]);

        for h in handles {
            h.abort();
        }
    }
}

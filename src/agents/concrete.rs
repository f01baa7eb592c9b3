use super::AutonomousAgent;
use crate::activity::ActivityLog;
use crate::model::AgentMessage;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::time::Duration;

/// Words the agents build their two-word messages from.
pub const ALPHABET: [&str; 10] = [
    "hello", "sun", "world", "space", "moon", "crypto", "sky", "ocean", "universe", "human",
];

const KEYWORD: &str = "hello";

/// An agent that chatters random two-word messages and reports the ones that greet.
pub fn concrete_agent(name: impl Into<String>, log: ActivityLog, period: Duration) -> AutonomousAgent {
    let mut agent = AutonomousAgent::new(name, period);
    agent.register_message_handler(
        "custom",
        Box::new(move |message| handle_custom_message(&log, message)),
    );
    let mut rng = StdRng::from_entropy();
    agent.register_behavior(Box::new(move || Some(random_message(&mut rng))));
    agent
}

pub(crate) fn handle_custom_message(log: &ActivityLog, message: &AgentMessage) {
    if message.content.contains(KEYWORD) {
        let rendered = serde_json::to_string(message).unwrap_or_else(|_| message.content.clone());
        log.display(format!("Received message: {rendered}"));
    }
}

/// Two distinct words from [`ALPHABET`].
pub(crate) fn random_message<R: Rng + ?Sized>(rng: &mut R) -> AgentMessage {
    let words: Vec<&str> = ALPHABET.choose_multiple(rng, 2).copied().collect();
    AgentMessage::custom(words.join(" "))
}

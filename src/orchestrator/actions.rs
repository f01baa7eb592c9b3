//! One-shot requests and the events they produce.
//!
//! Each operation awaits a single backend call and reports the outcome on the
//! event channel. Failures go to the diagnostic channel and nothing else: the
//! page keeps whatever it showed before.

use crate::client::{BackendClient, FetchError};
use crate::model::{ConsoleEvent, InfoEvent};
use tokio::sync::mpsc::UnboundedSender;

pub(crate) async fn refresh_logs(client: &BackendClient, event_tx: &UnboundedSender<ConsoleEvent>) {
    match client.log_messages().await {
        Ok(messages) => {
            let _ = event_tx.send(ConsoleEvent::LogMessages(messages));
        }
        Err(e) => report(event_tx, e),
    }
}

pub(crate) async fn refresh_button_states(
    client: &BackendClient,
    event_tx: &UnboundedSender<ConsoleEvent>,
) {
    match client.button_states().await {
        Ok(states) => {
            let _ = event_tx.send(ConsoleEvent::ButtonStates(states));
        }
        Err(e) => report(event_tx, e),
    }
}

pub(crate) async fn run_agents(client: &BackendClient, event_tx: &UnboundedSender<ConsoleEvent>) {
    match client.run_agents().await {
        Ok(text) => {
            let _ = event_tx.send(ConsoleEvent::RunAgentsReply(text));
        }
        Err(e) => report(event_tx, e),
    }
}

pub(crate) async fn stop_agents(client: &BackendClient, event_tx: &UnboundedSender<ConsoleEvent>) {
    match client.stop_agents().await {
        Ok(text) => {
            let _ = event_tx.send(ConsoleEvent::StopAgentsReply(text));
        }
        Err(e) => report(event_tx, e),
    }
}

fn report(event_tx: &UnboundedSender<ConsoleEvent>, err: FetchError) {
    let endpoint = err.endpoint();
    tracing::error!(%endpoint, error = %err, "{}", endpoint.failure_label());
    let _ = event_tx.send(ConsoleEvent::Info(InfoEvent::FetchFailed {
        endpoint,
        error: err.to_string(),
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::config_for;
    use crate::model::Endpoint;
    use crate::page::Page;
    use crate::server::spawn_test_server;
    use axum::routing::get;
    use axum::{Json, Router};
    use tokio::sync::mpsc;

    fn drain(rx: &mut mpsc::UnboundedReceiver<ConsoleEvent>, page: &mut Page) -> usize {
        let mut n = 0;
        while let Ok(ev) = rx.try_recv() {
            page.apply(ev);
            n += 1;
        }
        n
    }

    #[tokio::test]
    async fn fetched_logs_and_states_render_onto_page() {
        let router = Router::new()
            .route(
                "/log_messages",
                get(|| async { Json(vec!["agent started", "agent idle"]) }),
            )
            .route(
                "/button_states",
                get(|| async { Json(serde_json::json!({"startEnabled": true, "stopEnabled": false})) }),
            );
        let addr = spawn_test_server(router).await;
        let client = BackendClient::new(&config_for(format!("http://{addr}"))).unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut page = Page::default();

        refresh_logs(&client, &tx).await;
        refresh_button_states(&client, &tx).await;
        assert_eq!(drain(&mut rx, &mut page), 2);

        assert_eq!(page.log_messages.entries(), vec!["agent started", "agent idle"]);
        assert!(!page.run_button.disabled);
        assert!(page.stop_button.disabled);

        let first = page.clone();
        refresh_logs(&client, &tx).await;
        refresh_button_states(&client, &tx).await;
        drain(&mut rx, &mut page);
        assert_eq!(page, first);
    }

    #[tokio::test]
    async fn actions_append_text_and_raise_alert() {
        let router = Router::new()
            .route("/log_messages", get(|| async { Json(vec!["agent idle"]) }))
            .route("/run_agents", get(|| async { "Started." }))
            .route("/stop_agents", get(|| async { "Stopped." }));
        let addr = spawn_test_server(router).await;
        let client = BackendClient::new(&config_for(format!("http://{addr}"))).unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut page = Page::default();

        refresh_logs(&client, &tx).await;
        run_agents(&client, &tx).await;
        drain(&mut rx, &mut page);
        assert_eq!(page.log_messages.entries(), vec!["agent idle"]);
        assert_eq!(page.log_messages.lines(), vec!["agent idleStarted.".to_string()]);
        assert_eq!(page.message_container.scroll_top, 1);

        stop_agents(&client, &tx).await;
        drain(&mut rx, &mut page);
        assert_eq!(page.alert(), Some("Stopped."));
    }

    #[tokio::test]
    async fn failed_fetch_leaves_page_and_records_diagnostic() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client = BackendClient::new(&config_for(format!("http://{addr}"))).unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut page = Page::default();
        page.apply(ConsoleEvent::LogMessages(vec!["before".into()]));
        let before = page.log_messages.clone();

        refresh_logs(&client, &tx).await;
        match rx.try_recv() {
            Ok(ConsoleEvent::Info(InfoEvent::FetchFailed { endpoint, .. })) => {
                assert_eq!(endpoint, Endpoint::LogMessages)
            }
            other => panic!("expected a fetch failure, got {other:?}"),
        }
        refresh_logs(&client, &tx).await;
        drain(&mut rx, &mut page);

        assert_eq!(page.log_messages, before);
        assert!(page
            .last_diagnostic()
            .unwrap()
            .starts_with("Error fetching log messages: "));
    }
}

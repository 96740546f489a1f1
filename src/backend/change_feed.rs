use std::sync::mpsc::Sender;

use tokio::{
    runtime::Handle,
    sync::{broadcast, watch},
};

use crate::{
    domain::{chat_session::SessionToken, events::AppEvent},
    usecases::backend_events::BackendEvent,
};

use super::ChangeEnvelope;

const CHANGE_FEED_MONITOR_STARTED: &str = "CHANGE_FEED_MONITOR_STARTED";
const CHANGE_FEED_MONITOR_STOPPED: &str = "CHANGE_FEED_MONITOR_STOPPED";
const CHANGE_FEED_MONITOR_SHUTDOWN_SIGNALLED: &str = "CHANGE_FEED_MONITOR_SHUTDOWN_SIGNALLED";
const CHANGE_FEED_MONITOR_LAGGED: &str = "CHANGE_FEED_MONITOR_LAGGED";
const CHANGE_FEED_MONITOR_FORWARD_FAILED: &str = "CHANGE_FEED_MONITOR_FORWARD_FAILED";

/// Forwards row changes of one open chat to the shell until dropped.
#[derive(Debug)]
pub struct ChangeFeedMonitor {
    token: SessionToken,
    stop_tx: Option<watch::Sender<bool>>,
}

impl ChangeFeedMonitor {
    pub fn start(
        runtime: &Handle,
        changes: broadcast::Receiver<ChangeEnvelope>,
        token: SessionToken,
        event_tx: Sender<AppEvent>,
    ) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        runtime.spawn(run_monitor(changes, token, event_tx, stop_rx));

        tracing::info!(
            code = CHANGE_FEED_MONITOR_STARTED,
            chat_id = %token.chat_id(),
            generation = token.generation(),
            "change feed subscribed"
        );

        Self {
            token,
            stop_tx: Some(stop_tx),
        }
    }

    pub fn token(&self) -> SessionToken {
        self.token
    }
}

impl Drop for ChangeFeedMonitor {
    fn drop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(true);
            tracing::info!(
                code = CHANGE_FEED_MONITOR_SHUTDOWN_SIGNALLED,
                chat_id = %self.token.chat_id(),
                "change feed unsubscribed"
            );
        }
    }
}

async fn run_monitor(
    mut changes: broadcast::Receiver<ChangeEnvelope>,
    token: SessionToken,
    event_tx: Sender<AppEvent>,
    mut stop_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    tracing::info!(
                        code = CHANGE_FEED_MONITOR_STOPPED,
                        chat_id = %token.chat_id(),
                        "change feed monitor stopped"
                    );
                    return;
                }
            }
            received = changes.recv() => {
                match received {
                    Ok(envelope) => {
                        if envelope.chat_id != token.chat_id() {
                            continue;
                        }

                        tracing::debug!(
                            change = envelope.change.kind(),
                            chat_id = %envelope.chat_id,
                            "row change observed"
                        );

                        let event = AppEvent::Backend(BackendEvent::RowChanged {
                            token,
                            change: envelope.change,
                        });
                        if let Err(error) = event_tx.send(event) {
                            tracing::warn!(
                                code = CHANGE_FEED_MONITOR_FORWARD_FAILED,
                                error = %error,
                                "change feed monitor could not reach the shell"
                            );
                            return;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            code = CHANGE_FEED_MONITOR_LAGGED,
                            skipped,
                            "change feed fell behind; requesting resync"
                        );
                        let event = AppEvent::Backend(BackendEvent::FeedLagged { token, skipped });
                        if event_tx.send(event).is_err() {
                            return;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!(
                            code = CHANGE_FEED_MONITOR_STOPPED,
                            chat_id = %token.chat_id(),
                            "change feed closed by backend"
                        );
                        return;
                    }
                }
            }
        }
    }
}

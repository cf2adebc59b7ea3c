use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use circular_logging::{chat_error, chat_info};

use crate::{
    ChannelObserver, ChatError, ChatTurn, ClientEvent, ClientSettings, HealthStatus, JobPoller,
    QueryApi, QueryOptions, ReqwestQueryApi, SubmissionTag,
};

enum ClientCommand {
    Submit {
        tag: SubmissionTag,
        query: String,
        history: Vec<ChatTurn>,
        options: QueryOptions,
    },
    Cancel,
    Health {
        reply: mpsc::Sender<Result<HealthStatus, ChatError>>,
    },
    Shutdown,
}

/// Synchronous front for a [`JobPoller`] living on a background runtime.
///
/// Commands are taken in order on one thread. The network part of a
/// submission runs on the runtime, so a later cancel or submission takes
/// effect while the earlier one is still in flight. Events are drained with
/// [`ClientHandle::try_recv`] and carry the tag given to
/// [`ClientHandle::submit`].
pub struct ClientHandle {
    cmd_tx: mpsc::Sender<ClientCommand>,
    event_rx: mpsc::Receiver<ClientEvent>,
    worker: Option<thread::JoinHandle<()>>,
}

impl ClientHandle {
    pub fn new(settings: &ClientSettings) -> Result<Self, ChatError> {
        let api = Arc::new(ReqwestQueryApi::new(settings)?);
        Self::with_api(api, settings.poll_interval)
    }

    pub fn with_api(api: Arc<dyn QueryApi>, poll_interval: Duration) -> Result<Self, ChatError> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Runtime::new()
            .map_err(|err| ChatError::Runtime(err.to_string()))?;

        let worker = thread::Builder::new()
            .name("circular-client".to_string())
            .spawn(move || {
                let observer = Arc::new(ChannelObserver::new(event_tx));
                let poller = Arc::new(JobPoller::new(api.clone(), observer.clone(), poll_interval));
                while let Ok(command) = cmd_rx.recv() {
                    match command {
                        ClientCommand::Submit {
                            tag,
                            query,
                            history,
                            options,
                        } => {
                            let ticket = poller.begin_submit();
                            observer.set_submission(tag);
                            let poller = poller.clone();
                            runtime.spawn(async move {
                                poller.finish_submit(ticket, &query, &history, &options).await;
                            });
                        }
                        ClientCommand::Cancel => poller.cancel(),
                        ClientCommand::Health { reply } => {
                            let api = api.clone();
                            runtime.spawn(async move {
                                let _ = reply.send(api.health_check().await);
                            });
                        }
                        ClientCommand::Shutdown => break,
                    }
                }
                poller.destroy();
                chat_info!("Client worker stopped");
            })
            .map_err(|err| ChatError::Runtime(err.to_string()))?;

        Ok(Self {
            cmd_tx,
            event_rx,
            worker: Some(worker),
        })
    }

    /// Submits a query, abandoning whatever was submitted before. Every event
    /// it causes carries `tag`.
    pub fn submit(
        &self,
        tag: impl Into<SubmissionTag>,
        query: impl Into<String>,
        history: Vec<ChatTurn>,
        options: QueryOptions,
    ) {
        self.send(ClientCommand::Submit {
            tag: tag.into(),
            query: query.into(),
            history,
            options,
        });
    }

    pub fn cancel(&self) {
        self.send(ClientCommand::Cancel);
    }

    /// Blocks until the service answered the health check.
    pub fn health_check(&self) -> Result<HealthStatus, ChatError> {
        let (reply, rx) = mpsc::channel();
        self.send(ClientCommand::Health { reply });
        rx.recv()
            .map_err(|_| ChatError::Runtime("client worker stopped".to_string()))?
    }

    pub fn try_recv(&self) -> Option<ClientEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<ClientEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    fn send(&self, command: ClientCommand) {
        if self.cmd_tx.send(command).is_err() {
            chat_error!("Client worker is gone; command dropped");
        }
    }
}

impl Drop for ClientHandle {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(ClientCommand::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

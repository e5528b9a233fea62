// src/store/server.rs — Async message passing for Store

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use super::sqlite::Store;
use super::{FinalWalkRecord, NewWalkRecord, SessionStore, StoredWalk, WalkSummary};
use crate::infra::errors::WalkError;
use crate::session::types::{SessionId, SessionStatus, WalkMoment};

#[derive(Debug)]
pub enum StoreCommand {
    InsertWalk {
        record: NewWalkRecord,
        resp: oneshot::Sender<anyhow::Result<SessionId>>,
    },
    UpdateStatus {
        id: SessionId,
        status: SessionStatus,
        resp: oneshot::Sender<anyhow::Result<()>>,
    },
    FinalizeWalk {
        id: SessionId,
        record: FinalWalkRecord,
        resp: oneshot::Sender<anyhow::Result<()>>,
    },
    InsertMoments {
        walk_id: SessionId,
        moments: Vec<WalkMoment>,
        resp: oneshot::Sender<anyhow::Result<usize>>,
    },
    ListWalks {
        user_id: String,
        limit: u32,
        resp: oneshot::Sender<anyhow::Result<Vec<WalkSummary>>>,
    },
    GetWalk {
        id: SessionId,
        resp: oneshot::Sender<anyhow::Result<Option<StoredWalk>>>,
    },
    DeleteWalk {
        id: SessionId,
        resp: oneshot::Sender<anyhow::Result<bool>>,
    },
}

/// A handle to the Store that uses message passing.
#[derive(Clone)]
pub struct StoreHandle {
    tx: mpsc::Sender<StoreCommand>,
}

impl StoreHandle {
    pub fn new(tx: mpsc::Sender<StoreCommand>) -> Self {
        Self { tx }
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<anyhow::Result<T>>) -> StoreCommand,
    ) -> Result<T, WalkError> {
        let (resp_tx, resp_rx) = oneshot::channel();
        self.tx
            .send(make(resp_tx))
            .await
            .map_err(|_| WalkError::persistence("store server is not running"))?;
        resp_rx
            .await
            .map_err(|_| WalkError::persistence("store server dropped the request"))?
            .map_err(|e| WalkError::persistence(e.to_string()))
    }
}

#[async_trait]
impl SessionStore for StoreHandle {
    async fn insert_session(&self, record: &NewWalkRecord) -> Result<SessionId, WalkError> {
        let record = record.clone();
        self.request(|resp| StoreCommand::InsertWalk { record, resp })
            .await
    }

    async fn update_session_status(
        &self,
        id: SessionId,
        status: SessionStatus,
    ) -> Result<(), WalkError> {
        self.request(|resp| StoreCommand::UpdateStatus { id, status, resp })
            .await
    }

    async fn finalize_session(
        &self,
        id: SessionId,
        record: &FinalWalkRecord,
    ) -> Result<(), WalkError> {
        let record = record.clone();
        self.request(|resp| StoreCommand::FinalizeWalk { id, record, resp })
            .await
    }

    async fn insert_moments(
        &self,
        session_id: SessionId,
        moments: &[WalkMoment],
    ) -> Result<usize, WalkError> {
        let moments = moments.to_vec();
        self.request(|resp| StoreCommand::InsertMoments {
            walk_id: session_id,
            moments,
            resp,
        })
        .await
    }

    async fn list_sessions(&self, user_id: &str, limit: u32) -> Result<Vec<WalkSummary>, WalkError> {
        let user_id = user_id.to_string();
        self.request(|resp| StoreCommand::ListWalks {
            user_id,
            limit,
            resp,
        })
        .await
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<StoredWalk>, WalkError> {
        self.request(|resp| StoreCommand::GetWalk { id, resp }).await
    }

    async fn delete_session(&self, id: SessionId) -> Result<bool, WalkError> {
        self.request(|resp| StoreCommand::DeleteWalk { id, resp })
            .await
    }
}

/// Spawn the store server task.
pub fn spawn_store_server(store: Store) -> (StoreHandle, tokio::task::JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(100);
    let handle = StoreHandle::new(tx);
    let join_handle = tokio::spawn(run_store_server(store, rx));
    (handle, join_handle)
}

/// The background task that owns the Store.
pub async fn run_store_server(store: Store, mut rx: mpsc::Receiver<StoreCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            StoreCommand::InsertWalk { record, resp } => {
                let _ = resp.send(store.insert_walk(&record));
            }
            StoreCommand::UpdateStatus { id, status, resp } => {
                let _ = resp.send(store.update_walk_status(id, status));
            }
            StoreCommand::FinalizeWalk { id, record, resp } => {
                let _ = resp.send(store.finalize_walk(id, &record));
            }
            StoreCommand::InsertMoments {
                walk_id,
                moments,
                resp,
            } => {
                let _ = resp.send(store.insert_moments(walk_id, &moments));
            }
            StoreCommand::ListWalks {
                user_id,
                limit,
                resp,
            } => {
                let _ = resp.send(store.list_walks(&user_id, limit));
            }
            StoreCommand::GetWalk { id, resp } => {
                let _ = resp.send(store.get_walk(id));
            }
            StoreCommand::DeleteWalk { id, resp } => {
                let _ = resp.send(store.delete_walk(id));
            }
        }
    }
    tracing::debug!("Store server stopped");
}

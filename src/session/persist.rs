// src/session/persist.rs — Ordered background writes for the walk engine
//
// Jobs run one at a time in submission order so a status update can never
// overtake the insert it refers to. Results come back to the engine as
// events; the final save also answers the caller directly.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use super::types::{SaveReport, SessionId, SessionStatus, WalkMoment};
use crate::infra::errors::WalkError;
use crate::store::{FinalWalkRecord, NewWalkRecord, SessionStore};

pub type SaveReply = oneshot::Sender<Result<Option<SaveReport>, WalkError>>;

pub enum PersistJob {
    /// Initial record for a walk that just started.
    Open { key: Uuid, record: NewWalkRecord },
    Status { key: Uuid, status: SessionStatus },
    /// Completed walk plus its moments. `record` is used if the open never landed.
    Finalize {
        key: Uuid,
        record: NewWalkRecord,
        final_record: FinalWalkRecord,
        moments: Vec<WalkMoment>,
        reply: Option<SaveReply>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum PersistEvent {
    Opened { key: Uuid, id: SessionId },
    Failed { key: Uuid, error: WalkError },
    Finalized {
        key: Uuid,
        result: Result<SaveReport, WalkError>,
    },
}

/// Sending side of the worker queue.
#[derive(Clone)]
pub struct PersistQueue {
    tx: mpsc::UnboundedSender<PersistJob>,
}

impl PersistQueue {
    pub fn submit(&self, job: PersistJob) {
        if let Err(mpsc::error::SendError(job)) = self.tx.send(job) {
            // Worker gone: answer a waiting caller instead of leaving it hanging.
            if let PersistJob::Finalize {
                reply: Some(reply), ..
            } = job
            {
                let _ = reply.send(Err(WalkError::persistence("persistence worker stopped")));
            }
            tracing::warn!("Persistence worker stopped; dropping job");
        }
    }
}

pub fn spawn_persist_worker(
    store: Arc<dyn SessionStore>,
    timeout: Duration,
    events: mpsc::UnboundedSender<PersistEvent>,
) -> (PersistQueue, tokio::task::JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let worker = PersistWorker {
        store,
        timeout,
        events,
        ids: HashMap::new(),
    };
    let join = tokio::spawn(worker.run(rx));
    (PersistQueue { tx }, join)
}

struct PersistWorker {
    store: Arc<dyn SessionStore>,
    timeout: Duration,
    events: mpsc::UnboundedSender<PersistEvent>,
    /// Engine-local walk key -> durable id.
    ids: HashMap<Uuid, SessionId>,
}

impl PersistWorker {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<PersistJob>) {
        while let Some(job) = rx.recv().await {
            match job {
                PersistJob::Open { key, record } => self.open(key, &record).await,
                PersistJob::Status { key, status } => self.status(key, status).await,
                PersistJob::Finalize {
                    key,
                    record,
                    final_record,
                    moments,
                    reply,
                } => {
                    let result = self.finalize(key, &record, &final_record, &moments).await;
                    if let Some(reply) = reply {
                        let _ = reply.send(result.clone().map(Some));
                    }
                    let _ = self.events.send(PersistEvent::Finalized { key, result });
                }
            }
        }
    }

    async fn bounded<T>(
        &self,
        what: &str,
        fut: impl Future<Output = Result<T, WalkError>>,
    ) -> Result<T, WalkError> {
        tokio::time::timeout(self.timeout, fut).await.map_err(|_| {
            WalkError::network(format!(
                "store did not answer {what} within {}s",
                self.timeout.as_secs()
            ))
        })?
    }

    async fn insert(&mut self, key: Uuid, record: &NewWalkRecord) -> Result<SessionId, WalkError> {
        let id = self
            .bounded("insert", self.store.insert_session(record))
            .await?;
        self.ids.insert(key, id);
        Ok(id)
    }

    async fn open(&mut self, key: Uuid, record: &NewWalkRecord) {
        match self.insert(key, record).await {
            Ok(id) => {
                tracing::info!(session_id = id, "Walk record created");
                let _ = self.events.send(PersistEvent::Opened { key, id });
            }
            Err(error) => {
                tracing::warn!("Failed to create walk record: {}", error);
                let _ = self.events.send(PersistEvent::Failed { key, error });
            }
        }
    }

    async fn status(&mut self, key: Uuid, status: SessionStatus) {
        let Some(&id) = self.ids.get(&key) else {
            // Initial insert failed; the final save will create the row.
            tracing::debug!(%status, "Skipping status update for unsaved walk");
            return;
        };
        if let Err(error) = self
            .bounded("status update", self.store.update_session_status(id, status))
            .await
        {
            tracing::warn!(session_id = id, %status, "Failed to update walk status: {}", error);
            let _ = self.events.send(PersistEvent::Failed { key, error });
        }
    }

    async fn finalize(
        &mut self,
        key: Uuid,
        record: &NewWalkRecord,
        final_record: &FinalWalkRecord,
        moments: &[WalkMoment],
    ) -> Result<SaveReport, WalkError> {
        let id = match self.ids.get(&key) {
            Some(&id) => id,
            None => self.insert(key, record).await?,
        };

        self.bounded("finalize", self.store.finalize_session(id, final_record))
            .await
            .inspect_err(|e| tracing::warn!(session_id = id, "Failed to save walk: {}", e))?;
        // Completed walks take no further jobs.
        self.ids.remove(&key);

        tracing::info!(
            session_id = id,
            distance_m = final_record.total_distance as u64,
            duration_s = final_record.total_duration,
            "Walk saved"
        );

        let mut report = SaveReport {
            session_id: id,
            moments_saved: 0,
            moment_error: None,
        };

        if !moments.is_empty() {
            match self
                .bounded("moment insert", self.store.insert_moments(id, moments))
                .await
            {
                Ok(n) => report.moments_saved = n,
                Err(e) => {
                    // The walk stays saved; moments are not retried.
                    tracing::warn!(
                        session_id = id,
                        moments = moments.len(),
                        "Failed to save moments: {}",
                        e
                    );
                    report.moment_error = Some(e);
                }
            }
        }

        Ok(report)
    }
}

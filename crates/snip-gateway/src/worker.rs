use snip_core::{Repository, Token};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use typed_builder::TypedBuilder;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteJob {
    pub user_id: String,
    pub tokens: Vec<Token>,
}

#[derive(Debug, Clone, TypedBuilder)]
pub struct DeletePoolConfig {
    #[builder(default = 4)]
    workers: usize,
    #[builder(default = 64)]
    queue_capacity: usize,
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("delete queue is closed")]
    Closed,
}

/// Submission side of the delete pool.
///
/// Jobs for one user always land on the same worker, so they apply in the
/// order they were submitted.
#[derive(Debug, Clone)]
pub struct DeleteQueue {
    senders: Arc<[mpsc::Sender<DeleteJob>]>,
}

impl DeleteQueue {
    /// Enqueues `job`, waiting while the worker's queue is full.
    pub async fn submit(&self, job: DeleteJob) -> Result<(), WorkerError> {
        let shard = shard_for(&job.user_id, self.senders.len());
        self.senders[shard]
            .send(job)
            .await
            .map_err(|_| WorkerError::Closed)
    }

    pub fn workers(&self) -> usize {
        self.senders.len()
    }
}

fn shard_for(user_id: &str, shards: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    user_id.hash(&mut hasher);
    (hasher.finish() % shards as u64) as usize
}

/// Handles of the running workers.
#[derive(Debug)]
pub struct DeleteWorkers {
    handles: Vec<JoinHandle<()>>,
}

impl DeleteWorkers {
    /// Waits for every worker to drain its queue.
    ///
    /// Workers stop once every [`DeleteQueue`] clone has been dropped.
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(err) = handle.await {
                error!(error = %err, "delete worker panicked");
            }
        }
        info!("delete workers stopped");
    }
}

/// Starts the pool against `repository`.
pub fn spawn<R: Repository>(repository: Arc<R>, config: DeletePoolConfig) -> (DeleteQueue, DeleteWorkers) {
    let workers = config.workers.max(1);
    let capacity = config.queue_capacity.max(1);

    let mut senders = Vec::with_capacity(workers);
    let mut handles = Vec::with_capacity(workers);

    for id in 0..workers {
        let (tx, rx) = mpsc::channel(capacity);
        senders.push(tx);
        handles.push(tokio::spawn(run(id, Arc::clone(&repository), rx)));
    }

    debug!(workers, capacity, "delete workers started");
    (
        DeleteQueue {
            senders: senders.into(),
        },
        DeleteWorkers { handles },
    )
}

async fn run<R: Repository>(id: usize, repository: Arc<R>, mut rx: mpsc::Receiver<DeleteJob>) {
    while let Some(job) = rx.recv().await {
        match repository.delete_urls(&job.user_id, &job.tokens).await {
            Ok(()) => debug!(
                worker = id,
                user_id = %job.user_id,
                tokens = job.tokens.len(),
                "deleted urls"
            ),
            Err(err) => error!(
                worker = id,
                user_id = %job.user_id,
                tokens = job.tokens.len(),
                error = %err,
                "failed to delete urls"
            ),
        }
    }
}

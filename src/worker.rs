//! Rasterizer adapters: synchronous inline and threaded worker pool

use std::sync::Arc;

use crate::request::{RasterJob, RasterOutput, RasterReply, Rasterizer, RenderError, ReplySender};

/// Rasterizer that completes every job before `dispatch` returns.
///
/// For single-threaded hosts and deterministic tests; the reply is in the
/// pipeline's channel by the time `dispatch` returns and is picked up on the
/// next tick.
pub struct InlineRasterizer<F> {
    raster: F,
}

impl<F> InlineRasterizer<F> {
    pub fn new(raster: F) -> Self {
        Self { raster }
    }
}

impl<P, S, F> Rasterizer<P, S> for InlineRasterizer<F>
where
    F: FnMut(&P, f32) -> Result<RasterOutput<S>, RenderError>,
{
    fn dispatch(&mut self, job: RasterJob<P>, replies: ReplySender<S>) {
        let result = (self.raster)(&job.page, job.scale);
        let _ = replies.send(RasterReply {
            ticket: job.ticket,
            result,
        });
    }
}

/// Raster function run by pool workers
pub type RasterFn<P, S> = dyn Fn(&P, f32) -> Result<RasterOutput<S>, RenderError> + Send + Sync;

enum WorkerMessage<P, S> {
    Job {
        job: RasterJob<P>,
        replies: ReplySender<S>,
    },
    Shutdown,
}

/// Threaded rasterizer running a raster function on a pool of workers.
///
/// Jobs fan out over a shared flume channel. We use flume because it is MPMC:
/// std and tokio mpsc receivers cannot be cloned, and every worker here pulls
/// from the same job queue.
pub struct WorkerPool<P, S> {
    job_tx: flume::Sender<WorkerMessage<P, S>>,
    workers: usize,
}

impl<P, S> WorkerPool<P, S>
where
    P: Send + 'static,
    S: Send + 'static,
{
    /// Spawn `workers` threads running `raster`
    #[must_use]
    pub fn new(workers: usize, raster: Arc<RasterFn<P, S>>) -> Self {
        let workers = workers.max(1);
        let (job_tx, job_rx) = flume::unbounded::<WorkerMessage<P, S>>();

        for _ in 0..workers {
            let rx = job_rx.clone();
            let raster = Arc::clone(&raster);
            std::thread::spawn(move || worker_loop(&rx, raster.as_ref()));
        }

        Self { job_tx, workers }
    }
}

impl<P, S> WorkerPool<P, S> {
    /// Ask every worker to exit once pending jobs are done.
    pub fn shutdown(&self) {
        for _ in 0..self.workers {
            let _ = self.job_tx.send(WorkerMessage::Shutdown);
        }
    }
}

impl<P, S> Rasterizer<P, S> for WorkerPool<P, S> {
    fn dispatch(&mut self, job: RasterJob<P>, replies: ReplySender<S>) {
        let _ = self.job_tx.send(WorkerMessage::Job { job, replies });
    }
}

impl<P, S> Drop for WorkerPool<P, S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop<P, S>(jobs: &flume::Receiver<WorkerMessage<P, S>>, raster: &RasterFn<P, S>) {
    for message in jobs.iter() {
        match message {
            WorkerMessage::Job { job, replies } => {
                let result = raster(&job.page, job.scale);
                if let Err(ref error) = result {
                    log::debug!("worker: page {} failed: {error}", job.page_number);
                }
                let _ = replies.send(RasterReply {
                    ticket: job.ticket,
                    result,
                });
            }
            WorkerMessage::Shutdown => break,
        }
    }
}

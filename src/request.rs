//! Render request, reply, and error types plus the rasterizer boundary

use crate::surface::Viewport;

/// Unique identifier for render requests
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

impl RequestId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Errors surfaced through completion callbacks
#[derive(Clone, Debug, thiserror::Error)]
pub enum RenderError {
    /// The rasterizer failed for this entry. Failures are isolated: other
    /// queued and in-flight entries are unaffected.
    #[error("rasterizer: {detail}")]
    Rasterization { detail: String },

    /// The entry was dropped from the queue before dispatch.
    #[error("render request cancelled")]
    Cancelled,

    /// The pipeline was destroyed.
    #[error("pipeline destroyed")]
    Destroyed,
}

impl RenderError {
    pub fn rasterization(msg: impl Into<String>) -> Self {
        Self::Rasterization { detail: msg.into() }
    }
}

/// Completion callback, invoked exactly once per queued request
pub type CompletionCallback = Box<dyn FnOnce(Result<(), RenderError>)>;

/// A single rasterization job handed to a [`Rasterizer`]
#[derive(Debug)]
pub struct RasterJob<P> {
    /// Request this job belongs to
    pub ticket: RequestId,
    /// Opaque source page handle supplied by the caller
    pub page: P,
    /// Page number, for logging and diagnostics
    pub page_number: usize,
    /// Requested scale factor
    pub scale: f32,
}

/// Output of a successful rasterization
#[derive(Debug)]
pub struct RasterOutput<S> {
    pub surface: S,
    pub viewport: Viewport,
}

/// Reply sent back to the pipeline when a job finishes
#[derive(Debug)]
pub struct RasterReply<S> {
    pub ticket: RequestId,
    pub result: Result<RasterOutput<S>, RenderError>,
}

/// Channel end a rasterizer sends replies on
pub type ReplySender<S> = flume::Sender<RasterReply<S>>;

/// Asynchronous page rasterizer boundary.
///
/// `dispatch` must not block. Implementations either complete the job
/// synchronously by sending the reply before returning, or hand it off to
/// their own workers. The pipeline never has more than its configured
/// concurrency cap of unanswered jobs outstanding, and must receive exactly
/// one reply per job.
pub trait Rasterizer<P, S> {
    fn dispatch(&mut self, job: RasterJob<P>, replies: ReplySender<S>);
}

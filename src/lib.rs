//! Render scheduling and cache pipeline for paginated document viewers.
//!
//! Sits between a viewer and an external page rasterizer. For the stream of
//! render requests produced by scrolling and navigation it decides which
//! page to rasterize next (highest priority first, FIFO among equals), caps
//! how many rasterizations run at once, paces dispatch against the display
//! refresh interval, and keeps a bounded, time-limited cache of finished
//! surfaces so scrolling back does not re-rasterize.
//!
//! The rasterizer is injected behind the [`Rasterizer`] trait:
//! [`WorkerPool`] runs a raster function on worker threads,
//! [`InlineRasterizer`] completes synchronously for single-threaded hosts
//! and tests.
//!
//! ```
//! use std::sync::Arc;
//!
//! use pageflow::{
//!     Pipeline, PipelineOptions, PixelSurface, RasterFn, RasterOutput, Viewport, WorkerPool,
//!     shared,
//! };
//!
//! let raster: Arc<RasterFn<usize, PixelSurface>> = Arc::new(|_page, scale| {
//!     Ok(RasterOutput {
//!         surface: PixelSurface::new(640, 480),
//!         viewport: Viewport::new(640, 480, scale),
//!     })
//! });
//!
//! let mut pipeline = Pipeline::new(WorkerPool::new(2, raster), PipelineOptions::default());
//!
//! let target = shared(PixelSurface::new(1, 1));
//! pipeline.queue_render(3usize, 3, target, 1.0, 10, |result| {
//!     assert!(result.is_ok());
//! });
//! pipeline.run_until_idle();
//! ```

pub mod cache;
pub mod clock;
pub mod gate;
pub mod pipeline;
pub mod queue;
pub mod request;
pub mod surface;
pub mod worker;

pub use cache::{CacheKey, CacheStats, SurfaceCache};
#[cfg(any(test, feature = "test-utils"))]
pub use clock::ManualClock;
pub use clock::{Clock, MonotonicClock};
pub use gate::ConcurrencyGate;
pub use pipeline::{
    DEFAULT_CACHE_SIZE, DEFAULT_CACHE_TTL, DEFAULT_CONCURRENT_RENDERS, DEFAULT_THROTTLE_DELAY,
    Pipeline, PipelineOptions, TickStatus,
};
pub use queue::{QueueEntry, QueueStats, RenderQueue};
pub use request::{
    CompletionCallback, RasterJob, RasterOutput, RasterReply, Rasterizer, RenderError,
    ReplySender, RequestId,
};
pub use surface::{PixelSurface, RenderSurface, SharedSurface, Viewport, shared};
pub use worker::{InlineRasterizer, RasterFn, WorkerPool};

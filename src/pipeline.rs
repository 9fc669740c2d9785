//! Pipeline facade and the frame-paced scheduler tick

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::cache::{CacheKey, CacheStats, SurfaceCache};
use crate::clock::{Clock, MonotonicClock};
use crate::gate::ConcurrencyGate;
use crate::queue::{QueueEntry, QueueStats, RenderQueue};
use crate::request::{
    CompletionCallback, RasterJob, RasterReply, Rasterizer, RenderError, RequestId,
};
use crate::surface::{RenderSurface, SharedSurface, Viewport};

/// Default cache capacity
pub const DEFAULT_CACHE_SIZE: usize = 10;
/// Default cache entry time-to-live
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
/// Default concurrency cap
pub const DEFAULT_CONCURRENT_RENDERS: usize = 2;
/// Default minimum interval between dispatching ticks (one 60Hz frame)
pub const DEFAULT_THROTTLE_DELAY: Duration = Duration::from_millis(16);

/// How long `run_until_idle` waits for a rasterizer reply per round
const REPLY_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Pipeline construction options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PipelineOptions {
    /// Maximum number of cached surfaces
    pub max_cache_size: usize,
    /// Age after which a cached surface is treated as a miss
    pub cache_ttl: Duration,
    /// Maximum simultaneously dispatched rasterizations
    pub max_concurrent_renders: usize,
    /// Minimum interval between scheduling ticks that dispatch work
    pub throttle_delay: Duration,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_cache_size: DEFAULT_CACHE_SIZE,
            cache_ttl: DEFAULT_CACHE_TTL,
            max_concurrent_renders: DEFAULT_CONCURRENT_RENDERS,
            throttle_delay: DEFAULT_THROTTLE_DELAY,
        }
    }
}

/// Outcome of a scheduling tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickStatus {
    /// Queue and in-flight set are both empty; no further ticks needed
    Idle,
    /// Work remains; tick again on the next frame
    Busy,
    /// Inside the frame-pacing window; tick again after `retry_in`
    Throttled { retry_in: Duration },
}

struct InFlight<S> {
    key: CacheKey,
    page_number: usize,
    target: SharedSurface<S>,
    callback: CompletionCallback,
}

/// Render scheduling and cache pipeline.
///
/// Accepts render requests from a viewer, serves repeats out of a bounded
/// TTL cache, and schedules misses against an injected [`Rasterizer`]:
/// highest priority first, FIFO among equals, never more than
/// `max_concurrent_renders` in flight, dispatching at most once per
/// `throttle_delay`.
///
/// The pipeline is single-threaded and cooperative. The host drives it by
/// calling [`tick`](Self::tick) while [`is_processing`](Self::is_processing)
/// returns true (typically from a UI frame callback), or by calling
/// [`run_until_idle`](Self::run_until_idle) in headless settings. Completion
/// callbacks always run on the host's thread, from within `queue_render`
/// (cache hits), `tick`, `run_until_idle`, or a cancellation call.
///
/// Cancellation is cooperative and queue-side only: in-flight renders run to
/// completion and still populate the cache. There is no per-render timeout;
/// a rasterizer that never replies holds one concurrency slot indefinitely.
pub struct Pipeline<P, S: RenderSurface, R: Rasterizer<P, S>> {
    options: PipelineOptions,
    cache: SurfaceCache<S>,
    queue: RenderQueue<P, S>,
    gate: ConcurrencyGate,
    rasterizer: R,
    reply_tx: flume::Sender<RasterReply<S>>,
    reply_rx: flume::Receiver<RasterReply<S>>,
    in_flight: HashMap<RequestId, InFlight<S>>,
    next_request_id: u64,
    last_dispatch: Option<Instant>,
    destroyed: bool,
    clock: Box<dyn Clock>,
}

impl<P, S: RenderSurface, R: Rasterizer<P, S>> Pipeline<P, S, R> {
    /// Create a pipeline over the system monotonic clock
    #[must_use]
    pub fn new(rasterizer: R, options: PipelineOptions) -> Self {
        Self::with_clock(rasterizer, options, Box::new(MonotonicClock))
    }

    /// Create a pipeline with an injected time source
    #[must_use]
    pub fn with_clock(rasterizer: R, options: PipelineOptions, clock: Box<dyn Clock>) -> Self {
        let (reply_tx, reply_rx) = flume::unbounded();

        Self {
            cache: SurfaceCache::new(options.max_cache_size, options.cache_ttl),
            queue: RenderQueue::new(),
            gate: ConcurrencyGate::new(options.max_concurrent_renders),
            rasterizer,
            reply_tx,
            reply_rx,
            in_flight: HashMap::new(),
            next_request_id: 1,
            last_dispatch: None,
            destroyed: false,
            clock,
            options,
        }
    }

    /// Request a render of `page` at `scale` into `target`.
    ///
    /// On a valid cache hit the surface is copied into `target` and
    /// `callback` fires before this returns; the queue and scheduler are
    /// never touched. Otherwise the request is enqueued at `priority`
    /// (higher renders sooner) and the callback fires exactly once when the
    /// render completes, fails, or is cancelled.
    ///
    /// Repeated requests for the same (page, scale) are not deduplicated;
    /// each queued entry dispatches independently.
    pub fn queue_render(
        &mut self,
        page: P,
        page_number: usize,
        target: SharedSurface<S>,
        scale: f32,
        priority: i32,
        callback: impl FnOnce(Result<(), RenderError>) + 'static,
    ) -> RequestId {
        let id = self.next_id();

        if self.destroyed {
            callback(Err(RenderError::Destroyed));
            return id;
        }

        let key = CacheKey::new(page_number, scale);
        let now = self.clock.now();
        if let Some((surface, _viewport)) = self.cache.get(&key, now) {
            target.borrow_mut().copy_from(surface);
            callback(Ok(()));
            log::trace!("pipeline: page {page_number} served from cache");
            return id;
        }

        log::trace!("pipeline: page {page_number} queued at priority {priority}");
        self.queue.push(QueueEntry {
            id,
            page,
            page_number,
            target,
            scale,
            priority,
            callback: Box::new(callback),
        });
        id
    }

    /// Run one scheduling tick.
    ///
    /// Processes any completed rasterizations, then — unless inside the
    /// throttle window — dispatches queued entries until the concurrency
    /// gate is full. Returns what the host should do next.
    pub fn tick(&mut self) -> TickStatus {
        if self.destroyed {
            return TickStatus::Idle;
        }

        self.drain_replies();

        if self.queue.is_empty() && self.gate.active() == 0 {
            return TickStatus::Idle;
        }

        let now = self.clock.now();
        if let Some(last) = self.last_dispatch {
            let elapsed = now.duration_since(last);
            if elapsed < self.options.throttle_delay {
                return TickStatus::Throttled {
                    retry_in: self.options.throttle_delay - elapsed,
                };
            }
        }

        while !self.queue.is_empty() && self.gate.try_acquire() {
            if let Some(entry) = self.queue.pop_front() {
                self.dispatch(entry);
            }
        }
        self.last_dispatch = Some(now);

        if self.queue.is_empty() && self.gate.active() == 0 {
            TickStatus::Idle
        } else {
            TickStatus::Busy
        }
    }

    /// Drive ticks until the queue and in-flight set are both empty.
    ///
    /// Blocks the calling thread between ticks, waiting on rasterizer
    /// replies. Frame pacing sleeps in real time, so use a zero
    /// `throttle_delay` when the pipeline runs on a manual test clock.
    pub fn run_until_idle(&mut self) {
        loop {
            match self.tick() {
                TickStatus::Idle => break,
                TickStatus::Throttled { retry_in } => std::thread::sleep(retry_in),
                TickStatus::Busy => {
                    if let Ok(reply) = self.reply_rx.recv_timeout(REPLY_POLL_INTERVAL) {
                        self.finish(reply);
                    }
                }
            }
        }
    }

    /// Whether the scheduler has work queued or in flight
    #[must_use]
    pub fn is_processing(&self) -> bool {
        !self.destroyed && (!self.queue.is_empty() || self.gate.active() > 0)
    }

    /// Read-only cache probe with the same TTL semantics as a render
    /// request; returns an independent copy the caller owns.
    #[must_use]
    pub fn cached_surface(&mut self, page_number: usize, scale: f32) -> Option<(S, Viewport)> {
        let key = CacheKey::new(page_number, scale);
        let now = self.clock.now();
        self.cache
            .get(&key, now)
            .map(|(surface, viewport)| (surface.clone_surface(), *viewport))
    }

    /// Release every cached surface. Queued entries are unaffected.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Release cached surfaces for one page, at every scale.
    pub fn clear_page_cache(&mut self, page_number: usize) {
        self.cache.evict_page(page_number);
    }

    /// Drop every queued entry, failing its callback with
    /// [`RenderError::Cancelled`]. In-flight renders complete normally.
    pub fn cancel_all(&mut self) {
        let drained = self.queue.drain_all();
        if !drained.is_empty() {
            log::debug!("pipeline: cancelled {} queued renders", drained.len());
        }
        for entry in drained {
            (entry.callback)(Err(RenderError::Cancelled));
        }
    }

    /// Drop queued entries for one page; other pages keep their order.
    pub fn cancel_page(&mut self, page_number: usize) {
        let drained = self.queue.drain_page(page_number);
        if !drained.is_empty() {
            log::debug!(
                "pipeline: cancelled {} queued renders for page {page_number}",
                drained.len()
            );
        }
        for entry in drained {
            (entry.callback)(Err(RenderError::Cancelled));
        }
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    #[must_use]
    pub fn queue_stats(&self) -> QueueStats {
        QueueStats {
            pending: self.queue.len(),
            active: self.gate.active(),
            max_concurrent: self.gate.limit(),
        }
    }

    #[must_use]
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Tear the pipeline down: cancel queued entries, fail in-flight
    /// callbacks with [`RenderError::Cancelled`], release the cache, and
    /// halt the scheduler permanently. Idempotent.
    ///
    /// Replies from renders that were in flight arrive after the halt; their
    /// surfaces are released when the reply is seen or on drop.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }

        self.cancel_all();
        for (_, pending) in self.in_flight.drain() {
            (pending.callback)(Err(RenderError::Cancelled));
        }
        self.gate.reset();
        self.cache.clear();
        self.destroyed = true;
        log::debug!("pipeline: destroyed");
    }

    fn drain_replies(&mut self) {
        while let Ok(reply) = self.reply_rx.try_recv() {
            self.finish(reply);
        }
    }

    fn finish(&mut self, reply: RasterReply<S>) {
        let Some(pending) = self.in_flight.remove(&reply.ticket) else {
            // Reply for a request already failed by destroy(); the surface
            // is ours to release.
            if let Ok(mut output) = reply.result {
                output.surface.release();
            }
            return;
        };

        self.gate.release();

        match reply.result {
            Ok(output) => {
                pending.target.borrow_mut().copy_from(&output.surface);
                let now = self.clock.now();
                self.cache
                    .insert(pending.key, output.surface, output.viewport, now);
                (pending.callback)(Ok(()));
            }
            Err(error) => {
                log::debug!(
                    "pipeline: page {} render failed: {error}",
                    pending.page_number
                );
                (pending.callback)(Err(error));
            }
        }
    }

    fn dispatch(&mut self, entry: QueueEntry<P, S>) {
        log::trace!(
            "pipeline: dispatching page {} at scale {}",
            entry.page_number,
            entry.scale
        );

        let job = RasterJob {
            ticket: entry.id,
            page: entry.page,
            page_number: entry.page_number,
            scale: entry.scale,
        };
        self.in_flight.insert(
            entry.id,
            InFlight {
                key: CacheKey::new(entry.page_number, entry.scale),
                page_number: entry.page_number,
                target: entry.target,
                callback: entry.callback,
            },
        );
        self.rasterizer.dispatch(job, self.reply_tx.clone());
    }

    fn next_id(&mut self) -> RequestId {
        let id = RequestId::new(self.next_request_id);
        self.next_request_id += 1;
        id
    }
}

impl<P, S: RenderSurface, R: Rasterizer<P, S>> Drop for Pipeline<P, S, R> {
    fn drop(&mut self) {
        self.destroy();
        while let Ok(reply) = self.reply_rx.try_recv() {
            if let Ok(mut output) = reply.result {
                output.surface.release();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::clock::ManualClock;
    use crate::request::RasterOutput;
    use crate::surface::shared;
    use crate::worker::InlineRasterizer;

    #[derive(Clone, Debug)]
    struct TestSurface {
        label: String,
        releases: Rc<RefCell<Vec<String>>>,
    }

    impl TestSurface {
        fn new(label: &str, releases: &Rc<RefCell<Vec<String>>>) -> Self {
            Self {
                label: label.to_string(),
                releases: Rc::clone(releases),
            }
        }
    }

    impl RenderSurface for TestSurface {
        fn clone_surface(&self) -> Self {
            self.clone()
        }

        fn copy_from(&mut self, source: &Self) {
            self.label = source.label.clone();
        }

        fn release(&mut self) {
            self.releases.borrow_mut().push(self.label.clone());
        }
    }

    type Releases = Rc<RefCell<Vec<String>>>;
    type Rendered = Rc<RefCell<Vec<usize>>>;
    type Results = Rc<RefCell<Vec<(usize, Result<(), RenderError>)>>>;

    fn ok_raster(
        rendered: &Rendered,
        releases: &Releases,
    ) -> impl FnMut(&usize, f32) -> Result<RasterOutput<TestSurface>, RenderError> + use<> {
        let rendered = Rc::clone(rendered);
        let releases = Rc::clone(releases);
        move |page, scale| {
            rendered.borrow_mut().push(*page);
            Ok(RasterOutput {
                surface: TestSurface::new(&format!("page{page}"), &releases),
                viewport: Viewport::new(100, 140, scale),
            })
        }
    }

    fn pipeline_with<F>(
        options: PipelineOptions,
        clock: &ManualClock,
        raster: F,
    ) -> Pipeline<usize, TestSurface, InlineRasterizer<F>>
    where
        F: FnMut(&usize, f32) -> Result<RasterOutput<TestSurface>, RenderError>,
    {
        Pipeline::with_clock(InlineRasterizer::new(raster), options, Box::new(clock.clone()))
    }

    fn opts(max_concurrent: usize, throttle: Duration) -> PipelineOptions {
        PipelineOptions {
            max_concurrent_renders: max_concurrent,
            throttle_delay: throttle,
            ..PipelineOptions::default()
        }
    }

    fn recording_callback(
        results: &Results,
        page_number: usize,
    ) -> impl FnOnce(Result<(), RenderError>) + 'static {
        let results = Rc::clone(results);
        move |result| results.borrow_mut().push((page_number, result))
    }

    fn queue_page(
        pipeline: &mut Pipeline<
            usize,
            TestSurface,
            impl Rasterizer<usize, TestSurface>,
        >,
        releases: &Releases,
        results: &Results,
        page: usize,
        priority: i32,
    ) {
        let target = shared(TestSurface::new("target", releases));
        pipeline.queue_render(
            page,
            page,
            target,
            1.0,
            priority,
            recording_callback(results, page),
        );
    }

    #[test]
    fn cache_hit_short_circuits_synchronously() {
        let releases: Releases = Rc::default();
        let rendered: Rendered = Rc::default();
        let results: Results = Rc::default();
        let clock = ManualClock::new();
        let mut pipeline =
            pipeline_with(opts(2, Duration::ZERO), &clock, ok_raster(&rendered, &releases));

        queue_page(&mut pipeline, &releases, &results, 7, 0);
        pipeline.run_until_idle();
        assert_eq!(*rendered.borrow(), vec![7]);

        let target = shared(TestSurface::new("target", &releases));
        pipeline.queue_render(7, 7, Rc::clone(&target), 1.0, 0, recording_callback(&results, 7));

        // Callback fired before queue_render returned, no second render,
        // nothing queued
        assert_eq!(results.borrow().len(), 2);
        assert_eq!(*rendered.borrow(), vec![7]);
        assert_eq!(pipeline.queue_stats().pending, 0);
        assert_eq!(target.borrow().label, "page7");
        assert!(!pipeline.is_processing());
    }

    #[test]
    fn priority_order_with_single_slot() {
        let releases: Releases = Rc::default();
        let rendered: Rendered = Rc::default();
        let results: Results = Rc::default();
        let clock = ManualClock::new();
        let mut pipeline =
            pipeline_with(opts(1, Duration::ZERO), &clock, ok_raster(&rendered, &releases));

        for (page, priority) in [(5, 5), (10, 10), (1, 1)] {
            queue_page(&mut pipeline, &releases, &results, page, priority);
        }
        pipeline.run_until_idle();

        assert_eq!(*rendered.borrow(), vec![10, 5, 1]);
    }

    #[test]
    fn equal_priorities_dispatch_fifo() {
        let releases: Releases = Rc::default();
        let rendered: Rendered = Rc::default();
        let results: Results = Rc::default();
        let clock = ManualClock::new();
        let mut pipeline =
            pipeline_with(opts(1, Duration::ZERO), &clock, ok_raster(&rendered, &releases));

        for page in [4, 2, 9] {
            queue_page(&mut pipeline, &releases, &results, page, 3);
        }
        pipeline.run_until_idle();

        assert_eq!(*rendered.borrow(), vec![4, 2, 9]);
    }

    #[test]
    fn gate_caps_in_flight_renders() {
        let releases: Releases = Rc::default();
        let rendered: Rendered = Rc::default();
        let results: Results = Rc::default();
        let clock = ManualClock::new();
        let mut pipeline =
            pipeline_with(opts(2, Duration::ZERO), &clock, ok_raster(&rendered, &releases));

        for page in 0..5 {
            queue_page(&mut pipeline, &releases, &results, page, 0);
        }

        assert_eq!(pipeline.tick(), TickStatus::Busy);
        assert_eq!(pipeline.queue_stats().active, 2);
        assert_eq!(pipeline.queue_stats().pending, 3);

        pipeline.run_until_idle();
        assert_eq!(pipeline.queue_stats().active, 0);
        assert_eq!(results.borrow().len(), 5);
    }

    #[test]
    fn throttle_defers_dispatch_until_window_elapses() {
        let releases: Releases = Rc::default();
        let rendered: Rendered = Rc::default();
        let results: Results = Rc::default();
        let clock = ManualClock::new();
        let throttle = Duration::from_millis(16);
        let mut pipeline =
            pipeline_with(opts(1, throttle), &clock, ok_raster(&rendered, &releases));

        queue_page(&mut pipeline, &releases, &results, 1, 0);
        queue_page(&mut pipeline, &releases, &results, 2, 0);

        assert_eq!(pipeline.tick(), TickStatus::Busy);
        assert_eq!(*rendered.borrow(), vec![1]);

        // Same instant: inside the pacing window, nothing dispatched
        assert_eq!(
            pipeline.tick(),
            TickStatus::Throttled { retry_in: throttle }
        );
        assert_eq!(*rendered.borrow(), vec![1]);

        clock.advance(throttle);
        assert_eq!(pipeline.tick(), TickStatus::Busy);
        assert_eq!(*rendered.borrow(), vec![1, 2]);

        clock.advance(throttle);
        assert_eq!(pipeline.tick(), TickStatus::Idle);
        assert_eq!(results.borrow().len(), 2);
    }

    #[test]
    fn cancel_page_spares_other_pages_and_their_order() {
        let releases: Releases = Rc::default();
        let rendered: Rendered = Rc::default();
        let results: Results = Rc::default();
        let clock = ManualClock::new();
        let mut pipeline =
            pipeline_with(opts(1, Duration::ZERO), &clock, ok_raster(&rendered, &releases));

        for page in [3, 4, 5] {
            queue_page(&mut pipeline, &releases, &results, page, 0);
        }

        pipeline.cancel_page(3);

        {
            let results = results.borrow();
            assert_eq!(results.len(), 1);
            assert_eq!(results[0].0, 3);
            assert!(matches!(results[0].1, Err(RenderError::Cancelled)));
        }
        assert_eq!(pipeline.queue_stats().pending, 2);

        pipeline.run_until_idle();
        assert_eq!(*rendered.borrow(), vec![4, 5]);
    }

    #[test]
    fn cancel_all_leaves_in_flight_render_to_complete() {
        let releases: Releases = Rc::default();
        let rendered: Rendered = Rc::default();
        let results: Results = Rc::default();
        let clock = ManualClock::new();
        let mut pipeline =
            pipeline_with(opts(1, Duration::ZERO), &clock, ok_raster(&rendered, &releases));

        queue_page(&mut pipeline, &releases, &results, 1, 0);
        queue_page(&mut pipeline, &releases, &results, 2, 0);

        assert_eq!(pipeline.tick(), TickStatus::Busy);
        pipeline.cancel_all();
        pipeline.run_until_idle();

        // Page 1 was already in flight: it completed and was cached. Page 2
        // was only queued: it was cancelled and never rendered.
        assert_eq!(*rendered.borrow(), vec![1]);
        assert_eq!(pipeline.cache_stats().entries, 1);
        let results = results.borrow();
        assert!(matches!(results[0], (2, Err(RenderError::Cancelled))));
        assert!(matches!(results[1], (1, Ok(()))));
    }

    #[test]
    fn duplicate_requests_both_dispatch() {
        let releases: Releases = Rc::default();
        let rendered: Rendered = Rc::default();
        let results: Results = Rc::default();
        let clock = ManualClock::new();
        let mut pipeline =
            pipeline_with(opts(1, Duration::ZERO), &clock, ok_raster(&rendered, &releases));

        for page in [1, 2, 3] {
            queue_page(&mut pipeline, &releases, &results, page, 0);
        }
        queue_page(&mut pipeline, &releases, &results, 2, 10);

        pipeline.run_until_idle();

        // The late high-priority request jumps the line; the original page 2
        // entry still dispatches (no deduplication)
        assert_eq!(*rendered.borrow(), vec![2, 1, 2, 3]);
        assert_eq!(results.borrow().len(), 4);
        assert!(results.borrow().iter().all(|(_, r)| r.is_ok()));

        // Second page-2 insert replaced the first cache entry
        assert_eq!(pipeline.cache_stats().entries, 3);
        assert_eq!(*releases.borrow(), vec!["page2".to_string()]);
    }

    #[test]
    fn failed_render_is_isolated() {
        let releases: Releases = Rc::default();
        let rendered: Rendered = Rc::default();
        let results: Results = Rc::default();
        let clock = ManualClock::new();

        let raster = {
            let mut ok = ok_raster(&rendered, &releases);
            move |page: &usize, scale: f32| {
                if *page == 13 {
                    Err(RenderError::rasterization("unlucky page"))
                } else {
                    ok(page, scale)
                }
            }
        };
        let mut pipeline = pipeline_with(opts(1, Duration::ZERO), &clock, raster);

        for page in [12, 13, 14] {
            queue_page(&mut pipeline, &releases, &results, page, 0);
        }
        pipeline.run_until_idle();

        let results = results.borrow();
        assert!(matches!(results[0], (12, Ok(()))));
        assert!(matches!(
            results[1],
            (13, Err(RenderError::Rasterization { .. }))
        ));
        assert!(matches!(results[2], (14, Ok(()))));
        assert_eq!(pipeline.cache_stats().entries, 2);
    }

    #[test]
    fn ttl_expiry_forces_rerender() {
        let releases: Releases = Rc::default();
        let rendered: Rendered = Rc::default();
        let results: Results = Rc::default();
        let clock = ManualClock::new();
        let mut pipeline =
            pipeline_with(opts(1, Duration::ZERO), &clock, ok_raster(&rendered, &releases));

        queue_page(&mut pipeline, &releases, &results, 1, 0);
        pipeline.run_until_idle();
        assert_eq!(*rendered.borrow(), vec![1]);

        clock.advance(pipeline.options().cache_ttl + Duration::from_millis(1));

        queue_page(&mut pipeline, &releases, &results, 1, 0);
        pipeline.run_until_idle();

        assert_eq!(*rendered.borrow(), vec![1, 1]);
        assert_eq!(*releases.borrow(), vec!["page1".to_string()]);
    }

    #[test]
    fn destroy_is_idempotent_and_final() {
        let releases: Releases = Rc::default();
        let rendered: Rendered = Rc::default();
        let results: Results = Rc::default();
        let clock = ManualClock::new();
        let mut pipeline =
            pipeline_with(opts(2, Duration::ZERO), &clock, ok_raster(&rendered, &releases));

        queue_page(&mut pipeline, &releases, &results, 1, 0);
        queue_page(&mut pipeline, &releases, &results, 2, 0);

        pipeline.destroy();
        pipeline.destroy();

        assert_eq!(results.borrow().len(), 2);
        assert!(results
            .borrow()
            .iter()
            .all(|(_, r)| matches!(r, Err(RenderError::Cancelled))));
        assert_eq!(pipeline.cache_stats().entries, 0);
        assert_eq!(pipeline.queue_stats().pending, 0);
        assert!(!pipeline.is_processing());
        assert_eq!(pipeline.tick(), TickStatus::Idle);

        queue_page(&mut pipeline, &releases, &results, 3, 0);
        assert!(matches!(
            results.borrow().last(),
            Some((3, Err(RenderError::Destroyed)))
        ));
    }

    #[test]
    fn destroy_fails_in_flight_and_drop_releases_its_surface() {
        let releases: Releases = Rc::default();
        let rendered: Rendered = Rc::default();
        let results: Results = Rc::default();
        let clock = ManualClock::new();
        let mut pipeline =
            pipeline_with(opts(1, Duration::ZERO), &clock, ok_raster(&rendered, &releases));

        queue_page(&mut pipeline, &releases, &results, 1, 0);
        assert_eq!(pipeline.tick(), TickStatus::Busy);

        pipeline.destroy();
        assert!(matches!(
            results.borrow()[0],
            (1, Err(RenderError::Cancelled))
        ));

        drop(pipeline);
        assert_eq!(*releases.borrow(), vec!["page1".to_string()]);
    }
}

//! Render surface abstraction and the concrete RGB pixel surface

use std::cell::RefCell;
use std::rc::Rc;

/// Opaque handle to a rasterized page image.
///
/// The cache owns the surfaces it stores; viewer-owned targets are only ever
/// written into. `release` must be called exactly once on every surface the
/// pipeline owns before it is discarded, so implementations backed by native
/// resources (GPU textures, shared memory regions) can free them promptly
/// instead of waiting on drop order. Release failures are logged by the
/// implementation and never surfaced to pipeline callers.
pub trait RenderSurface {
    /// Create an independent copy of this surface.
    fn clone_surface(&self) -> Self
    where
        Self: Sized;

    /// Overwrite this surface's content with `source`'s.
    fn copy_from(&mut self, source: &Self);

    /// Free backing resources.
    fn release(&mut self);
}

/// Caller-owned render target the pipeline writes completed renders into.
pub type SharedSurface<S> = Rc<RefCell<S>>;

/// Wrap a surface for use as a render target.
pub fn shared<S: RenderSurface>(surface: S) -> SharedSurface<S> {
    Rc::new(RefCell::new(surface))
}

/// Viewport metadata captured alongside a rasterized surface
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    /// Surface width in pixels
    pub width_px: u32,
    /// Surface height in pixels
    pub height_px: u32,
    /// Scale factor the page was rasterized at
    pub scale: f32,
}

impl Viewport {
    #[must_use]
    pub const fn new(width_px: u32, height_px: u32, scale: f32) -> Self {
        Self {
            width_px,
            height_px,
            scale,
        }
    }
}

/// Raw RGB render surface (3 bytes per pixel).
///
/// The in-memory reference implementation of [`RenderSurface`]. Rendering
/// backends with native resources provide their own implementations.
pub struct PixelSurface {
    pixels: Vec<u8>,
    width_px: u32,
    height_px: u32,
    released: bool,
}

impl PixelSurface {
    /// Create a zeroed surface of the given dimensions
    #[must_use]
    pub fn new(width_px: u32, height_px: u32) -> Self {
        Self {
            pixels: vec![0; width_px as usize * height_px as usize * 3],
            width_px,
            height_px,
            released: false,
        }
    }

    /// Wrap an existing RGB pixel buffer
    #[must_use]
    pub fn from_pixels(pixels: Vec<u8>, width_px: u32, height_px: u32) -> Self {
        Self {
            pixels,
            width_px,
            height_px,
            released: false,
        }
    }

    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    #[must_use]
    pub fn width_px(&self) -> u32 {
        self.width_px
    }

    #[must_use]
    pub fn height_px(&self) -> u32 {
        self.height_px
    }

    /// Whether `release` has been called on this surface
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl RenderSurface for PixelSurface {
    fn clone_surface(&self) -> Self {
        Self {
            pixels: self.pixels.clone(),
            width_px: self.width_px,
            height_px: self.height_px,
            released: false,
        }
    }

    fn copy_from(&mut self, source: &Self) {
        self.pixels.clear();
        self.pixels.extend_from_slice(&source.pixels);
        self.width_px = source.width_px;
        self.height_px = source.height_px;
    }

    fn release(&mut self) {
        if self.released {
            log::warn!("pixel surface released twice");
            return;
        }
        self.released = true;
        self.pixels = Vec::new();
    }
}

impl std::fmt::Debug for PixelSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelSurface")
            .field("width_px", &self.width_px)
            .field("height_px", &self.height_px)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

//! The render engine contract.
//!
//! The engine is whatever synthesizes audio. It is owned by the
//! [`BufferBridge`](crate::BufferBridge) and only ever called from the render
//! thread, so implementations are free to allocate and take their time.

mod tone;

pub use tone::ToneEngine;

use crate::error::RenderError;

/// A source of interleaved stereo audio.
pub trait RenderEngine: Send + 'static {
    /// Prepare for rendering at `sample_rate`. Called exactly once per
    /// session, before the first `render_block`.
    fn init(&mut self, sample_rate: f32);

    /// Effect mix and stereo width, both in `0.0..=1.0`.
    fn set_parameters(&mut self, wet: f32, width: f32);

    /// Fill `out` with `out.len() / 2` interleaved left/right frames.
    ///
    /// Every sample must be written. An `Err` means nothing in `out` is
    /// usable; the block is dropped and the callback plays silence instead.
    fn render_block(&mut self, out: &mut [f32]) -> Result<(), RenderError>;
}

impl<E: RenderEngine + ?Sized> RenderEngine for Box<E> {
    fn init(&mut self, sample_rate: f32) {
        (**self).init(sample_rate)
    }

    fn set_parameters(&mut self, wet: f32, width: f32) {
        (**self).set_parameters(wet, width)
    }

    fn render_block(&mut self, out: &mut [f32]) -> Result<(), RenderError> {
        (**self).render_block(out)
    }
}

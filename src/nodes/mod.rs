//! Built-in signal chain nodes.
//!
//! - [`Tap`] - Feeds the spectrum analyser, passes audio through unchanged
//! - [`Filter`] - Resonant low-pass with smoothed cutoff and Q
//! - [`Gain`] - Volume control, immediate or smoothed
//!
//! # Message Types
//!
//! - [`FilterMessage`] - Control [`Filter`] cutoff and resonance
//! - [`GainMessage`] - Set the [`Gain`] level
//!
//! [`Tap`] has no parameters and uses `()` as its message type.

mod filter;
mod gain;
mod tap;

pub use filter::{Filter, FilterMessage};
pub use gain::{Gain, GainMessage};
pub use tap::Tap;

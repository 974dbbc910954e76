//! muso - block streaming from a render thread into a real-time audio callback
//!
//! Design principles:
//! - The audio callback never allocates, blocks, or fails; when audio is late
//!   it plays silence and asks again
//! - Rendered blocks move between threads by value through SPSC ring buffers,
//!   and spent blocks travel back for reuse
//! - Chain nodes get their parameters as queued messages and share no state
//!   with the controller
//! - No locks anywhere on the audio path
//! - The spectrum tap sits first in the chain and sees the unfiltered signal
//!
//! # Headless use
//!
//! ```
//! use muso::{assemble, SessionConfig, ToneEngine};
//!
//! let config = SessionConfig::default();
//! let mut parts = assemble(&config, 48_000, ToneEngine::default()).unwrap();
//! parts.prime().unwrap();
//!
//! parts.controller.set_cutoff(1_000.0);
//! let (left, right) = parts.driver.process_quantum();
//! assert_eq!(left.len(), config.quantum);
//! assert_eq!(right.len(), config.quantum);
//! ```

mod bridge;
mod config;
mod consumer;
mod controller;
#[cfg(feature = "cpal_sink")]
mod device;
mod driver;
pub mod engine;
mod error;
mod graph;
mod node;
pub mod nodes;
pub mod param;
pub mod protocol;
mod session;
pub mod spectrum;

pub use bridge::{BridgeReport, BridgeThread, BufferBridge};
pub use config::{InitialParams, SessionConfig, MAX_PULL_FRAMES};
pub use consumer::{CallbackConsumer, ConsumerState, ConsumerStats, StatsSnapshot};
pub use controller::GraphController;
#[cfg(feature = "cpal_sink")]
pub use device::OutputDevice;
pub use driver::QuantumDriver;
pub use engine::{RenderEngine, ToneEngine};
pub use error::{BridgeError, Error, RenderError, Result};
pub use graph::{GraphNode, NodeHandle, SignalChain, Slot};
pub use node::{AudioNode, NodeKind, ProcessContext};
pub use protocol::{AudioBlock, BridgeMessage, ConsumerMessage, EngineParams};
#[cfg(feature = "cpal_sink")]
pub use session::Session;
pub use session::{assemble, SessionParts};
pub use spectrum::SpectrumAnalyser;

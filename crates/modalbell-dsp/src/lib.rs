//! ModalBell DSP library: modal resonator engine for struck objects.
//!
//! Pure DSP math with no audio framework dependencies.

// Core engine
pub mod bank;
pub mod engine;
pub mod error;
pub mod excitation;
pub mod model;

// Control surface
pub mod control;
pub mod sliders;

// Model I/O and diagnostics
pub mod dump;
pub mod presets;
pub mod sy;

pub use control::{ParamChange, ParameterSink, SliderMap};
pub use engine::{ModalEngine, DEFAULT_SAMPLE_RATE};
pub use error::{ModalError, Result};
pub use model::{GainTable, ModalModel, Scales};

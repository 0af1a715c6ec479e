//! daw-core: shared types, identifiers, and the error taxonomy used across
//! the FluxForge DAW core (mixer, automation, render).

mod decibels;
mod error;
mod ids;
mod sample;
mod time;

pub use decibels::Decibels;
pub use error::{DawError, DawResult};
pub use ids::{BusId, ParameterId, ParameterKind};
pub use sample::{AudioBuffer, Sample};
pub use time::{BufferSize, SampleRate};

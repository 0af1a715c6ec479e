//! daw-automation: automation curves and lanes, per-block scheduling
//! engine, lane factories, and the recorder subsystem (spec §4.D-F).

mod container;
mod curve;
mod engine;
mod factories;
mod lane;
mod point;
mod recorder;
mod target;

pub use container::AutomationDataContainer;
pub use curve::CurveType;
pub use engine::{new_shared_lane, AutomationEngine, EnginePerfCounters, SharedLane};
pub use factories::{auto_pan, build_up_drop, exponential_fade, gate_pattern, lfo_points, linear_ramp, LfoGenerator, LfoShape};
pub use lane::AutomationLane;
pub use point::AutomationPoint;
pub use recorder::{AutomationRecorder, IncomingEvent, MappingEntry, RecorderConfig, RecorderState, RecordingMode};
pub use target::{map_value, AutomationTarget, TargetRegistration};

//! daw-mixer: the dynamic bus graph, plugin delay compensation, and
//! solo/mute arbitration (spec §4.G-H).

mod bus;
mod effect;
mod manager;
mod pdc;
mod route;
mod source;

pub use bus::{Bus, BusKind};
pub use effect::{Effect, EffectChain, EffectSlot};
pub use manager::BusManager;
pub use pdc::PdcDelayLine;
pub use route::{RouteDestination, RouteSend};
pub use source::TrackSource;

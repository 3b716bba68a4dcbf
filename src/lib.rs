//! Shuttle GW - Contour Shuttle surface gateway
//!
//! Turns ShuttleXpress / ShuttlePro input (buttons, jog wheel, spring-loaded
//! shuttle ring) into host events: key down/up, rotate left/right and two
//! continuous value channels. Holding the shuttle ring off-center produces
//! repeating rotate events that speed up with displacement.

pub mod config;
pub mod console;
pub mod context;
pub mod error;
pub mod geometry;
pub mod instance;
pub mod script;
pub mod shuttle;

pub use config::AppConfig;
pub use context::{ChannelContext, Rotation, SurfaceContext, SurfaceEvent};
pub use error::DeviceError;
pub use geometry::{DeviceGeometry, PositionId, ShuttleModel};
pub use instance::{DeviceEvent, SurfaceHandle, SurfaceInstance};
pub use shuttle::ShuttleRing;

//! Host-facing surface context
//!
//! The surface instance reports everything it produces through a
//! [`SurfaceContext`]. All methods are fire-and-forget: a host that rejects
//! an event is not retried.

use tokio::sync::mpsc;

use crate::error::DeviceError;
use crate::geometry::PositionId;

/// Abstract events delivered to the host
pub trait SurfaceContext: Send + Sync {
    fn key_down(&self, id: PositionId);
    fn key_up(&self, id: PositionId);
    fn rotate_left(&self, id: PositionId);
    fn rotate_right(&self, id: PositionId);
    /// Update a continuous value channel (jog / shuttle value)
    fn send_variable_value(&self, variable: &str, value: i32);
    /// Called once after internal cleanup when the device goes away
    fn disconnect(&self, cause: DeviceError);
}

/// Rotation direction of a rotate event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Left,
    Right,
}

impl Rotation {
    /// Emit a rotate event in this direction
    pub fn emit(self, ctx: &dyn SurfaceContext, id: PositionId) {
        match self {
            Self::Left => ctx.rotate_left(id),
            Self::Right => ctx.rotate_right(id),
        }
    }
}

/// One call made on a [`SurfaceContext`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    KeyDown(PositionId),
    KeyUp(PositionId),
    RotateLeft(PositionId),
    RotateRight(PositionId),
    Variable { name: String, value: i32 },
    Disconnect(DeviceError),
}

/// Context that forwards every call into an unbounded channel
#[derive(Clone)]
pub struct ChannelContext {
    tx: mpsc::UnboundedSender<SurfaceEvent>,
}

impl ChannelContext {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SurfaceEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: SurfaceEvent) {
        let _ = self.tx.send(event);
    }
}

impl SurfaceContext for ChannelContext {
    fn key_down(&self, id: PositionId) {
        self.send(SurfaceEvent::KeyDown(id));
    }

    fn key_up(&self, id: PositionId) {
        self.send(SurfaceEvent::KeyUp(id));
    }

    fn rotate_left(&self, id: PositionId) {
        self.send(SurfaceEvent::RotateLeft(id));
    }

    fn rotate_right(&self, id: PositionId) {
        self.send(SurfaceEvent::RotateRight(id));
    }

    fn send_variable_value(&self, variable: &str, value: i32) {
        self.send(SurfaceEvent::Variable {
            name: variable.to_string(),
            value,
        });
    }

    fn disconnect(&self, cause: DeviceError) {
        self.send(SurfaceEvent::Disconnect(cause));
    }
}

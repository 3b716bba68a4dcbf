//! Per-device surface instance
//!
//! One tokio task per open device. Device samples, shuttle repeat ticks, jog
//! pulse resets and the close request are all serialized through a single
//! `select!` loop, so the ring state never needs a lock and a new sample is
//! always handled in full before the next tick can run.

use anyhow::{Context, Result};
use std::collections::VecDeque;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::context::{Rotation, SurfaceContext};
use crate::error::DeviceError;
use crate::geometry::{DeviceGeometry, ShuttleModel};
use crate::shuttle::ShuttleRing;


/// Already-decoded input from the device transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    ButtonDown(usize),
    ButtonUp(usize),
    /// Always ±1
    Jog(i8),
    /// Ring displacement, 0 = centered
    Shuttle(i8),
    Disconnected,
    Error(String),
}

/// Capacity of the transport → instance channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// State owned by the instance task
pub struct SurfaceInstance {
    surface_id: String,
    model: ShuttleModel,
    geometry: &'static DeviceGeometry,
    ctx: Arc<dyn SurfaceContext>,
    ring: ShuttleRing,
    jog_variable: String,
    jog_pulse: Duration,
    /// One pending return-to-0 per jog sample, oldest first
    jog_resets: VecDeque<Instant>,
}

/// Host-side handle to a running instance
///
/// Dropping the handle closes the instance just like [`SurfaceHandle::close`],
/// without waiting for the task to finish.
pub struct SurfaceHandle {
    surface_id: String,
    close_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl SurfaceInstance {
    pub fn new(config: &AppConfig, ctx: Arc<dyn SurfaceContext>) -> Self {
        let model = config.surface.model;
        let geometry = model.geometry();

        Self {
            surface_id: config.surface.id.clone(),
            model,
            geometry,
            ctx,
            ring: ShuttleRing::new(geometry, config.variables.shuttle.clone()),
            jog_variable: config.variables.jog.clone(),
            jog_pulse: config.jog.pulse(),
            jog_resets: VecDeque::new(),
        }
    }

    /// Start the instance task
    ///
    /// Returns the host handle and the sender the transport pushes device
    /// events into. Dropping every sender counts as a device disconnect.
    pub fn spawn(self) -> (SurfaceHandle, mpsc::Sender<DeviceEvent>) {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (close_tx, close_rx) = oneshot::channel();
        let surface_id = self.surface_id.clone();

        info!(
            "Opening {} ({})",
            self.surface_id,
            self.model.product_name()
        );

        let task = tokio::spawn(self.run(events_rx, close_rx));

        (
            SurfaceHandle {
                surface_id,
                close_tx,
                task,
            },
            events_tx,
        )
    }

    async fn run(
        mut self,
        mut events: mpsc::Receiver<DeviceEvent>,
        mut close_rx: oneshot::Receiver<()>,
    ) {
        loop {
            let repeat_due = self.ring.next_due();
            let jog_due = self.jog_resets.front().copied();

            tokio::select! {
                biased;

                // A dropped handle closes as well
                _ = &mut close_rx => {
                    self.cancel_pending();
                    info!("Closed {}", self.surface_id);
                    break;
                }

                event = events.recv() => {
                    let flow = match event {
                        Some(event) => self.handle_event(event),
                        None => self.fail(DeviceError::Disconnected),
                    };
                    if flow.is_break() {
                        break;
                    }
                }

                _ = sleep_until_some(repeat_due) => {
                    self.ring.fire_repeat(Instant::now(), self.ctx.as_ref());
                }

                _ = sleep_until_some(jog_due) => {
                    self.jog_resets.pop_front();
                    self.ctx.send_variable_value(&self.jog_variable, 0);
                }
            }
        }
    }

    fn handle_event(&mut self, event: DeviceEvent) -> ControlFlow<()> {
        match event {
            DeviceEvent::ButtonDown(index) => match self.geometry.button_position(index) {
                Some(id) => self.ctx.key_down(id),
                None => debug!("Ignoring press of unmapped button {}", index),
            },
            DeviceEvent::ButtonUp(index) => match self.geometry.button_position(index) {
                Some(id) => self.ctx.key_up(id),
                None => debug!("Ignoring release of unmapped button {}", index),
            },
            DeviceEvent::Jog(delta) => self.on_jog(delta),
            DeviceEvent::Shuttle(value) => self.ring.on_sample(value, self.ctx.as_ref()),
            DeviceEvent::Disconnected => return self.fail(DeviceError::Disconnected),
            DeviceEvent::Error(message) => return self.fail(DeviceError::Fault(message)),
        }
        ControlFlow::Continue(())
    }

    fn on_jog(&mut self, delta: i8) {
        debug!("Setting jog variable to {}", delta);
        self.ctx.send_variable_value(&self.jog_variable, delta.into());
        self.jog_resets.push_back(Instant::now() + self.jog_pulse);

        let direction = if delta == 1 {
            Rotation::Right
        } else {
            Rotation::Left
        };
        direction.emit(self.ctx.as_ref(), self.geometry.jog_position());
    }

    /// Stop the repeat schedule and any pending jog resets
    fn cancel_pending(&mut self) {
        if self.ring.cancel() {
            debug!("Cancelled shuttle repeat for {}", self.surface_id);
        }
        self.jog_resets.clear();
    }

    /// Terminal device fault: clean up, then tell the host once
    fn fail(&mut self, cause: DeviceError) -> ControlFlow<()> {
        warn!("{}: {}", self.surface_id, cause);
        self.cancel_pending();
        self.ctx.disconnect(cause);
        ControlFlow::Break(())
    }
}

impl SurfaceHandle {
    pub fn surface_id(&self) -> &str {
        &self.surface_id
    }

    /// Whether the instance task has stopped
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the instance and wait until it can no longer emit events
    ///
    /// Closing an instance that already stopped after a disconnect is fine.
    pub async fn close(self) -> Result<()> {
        let SurfaceHandle {
            surface_id,
            close_tx,
            task,
        } = self;

        // Err only means the task already stopped
        let _ = close_tx.send(());

        task.await
            .with_context(|| format!("Surface task for {} failed", surface_id))
    }
}

async fn sleep_until_some(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

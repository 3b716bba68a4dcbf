//! Shuttle ring repeat engine
//!
//! The shuttle is a spring-loaded ring with bounded travel. Every sample
//! produces one rotate event on the shuttle control. While the ring is held
//! off-center, a repeat schedule keeps emitting rotate events on the repeat
//! control, faster the further the ring is turned.
//!
//! "Right"/"left" mean the positive/negative side of zero, not the direction
//! the ring is currently moving. A release (value 0) keeps the direction of
//! the side the ring just came back from.

pub mod accel;

use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::context::{Rotation, SurfaceContext};
use crate::geometry::{DeviceGeometry, PositionId};

pub use accel::{accel, repeat_period, MAX_SHUTTLE_MAGNITUDE};

/// Active repeat schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatSchedule {
    pub direction: Rotation,
    pub period: Duration,
    pub next_due: Instant,
}

/// Per-device shuttle ring state
#[derive(Debug)]
pub struct ShuttleRing {
    primary: PositionId,
    repeat_target: PositionId,
    variable: String,
    value: i8,
    /// At most one schedule; replacing it cancels the previous one
    repeat: Option<RepeatSchedule>,
}

impl ShuttleRing {
    /// Create a ring at rest for the given geometry
    ///
    /// `variable` names the continuous value channel that mirrors every sample.
    pub fn new(geometry: &DeviceGeometry, variable: impl Into<String>) -> Self {
        Self {
            primary: geometry.shuttle_position(),
            repeat_target: geometry.shuttle_repeat_position(),
            variable: variable.into(),
            value: 0,
            repeat: None,
        }
    }

    /// Last observed displacement
    pub fn value(&self) -> i8 {
        self.value
    }

    /// The active repeat schedule, if any
    pub fn schedule(&self) -> Option<&RepeatSchedule> {
        self.repeat.as_ref()
    }

    /// Whether a repeat schedule is active
    pub fn is_repeating(&self) -> bool {
        self.repeat.is_some()
    }

    /// When the next repeat tick is due, if a schedule is active
    pub fn next_due(&self) -> Option<Instant> {
        self.repeat.map(|schedule| schedule.next_due)
    }

    /// Handle a shuttle displacement sample observed now
    pub fn on_sample(&mut self, new_value: i8, ctx: &dyn SurfaceContext) {
        self.on_sample_at(new_value, Instant::now(), ctx);
    }

    /// Handle a shuttle displacement sample observed at `now`
    pub fn on_sample_at(&mut self, new_value: i8, now: Instant, ctx: &dyn SurfaceContext) {
        debug!("Setting shuttle variable to {}", new_value);
        ctx.send_variable_value(&self.variable, new_value.into());

        let direction = if new_value > 0 || (new_value == 0 && self.value > 0) {
            Rotation::Right
        } else {
            Rotation::Left
        };

        // Must be read before the schedule is cancelled
        let first_action = self.repeat.is_none();
        self.cancel();

        direction.emit(ctx, self.primary);

        if first_action {
            // Leaving center: the first repeat fires right away
            direction.emit(ctx, self.repeat_target);
        }

        if new_value != 0 {
            let magnitude = new_value.unsigned_abs();
            if magnitude > MAX_SHUTTLE_MAGNITUDE {
                warn!(
                    "Shuttle value {} outside ±{}, repeating at the top rate",
                    new_value, MAX_SHUTTLE_MAGNITUDE
                );
            }

            let period = repeat_period(magnitude);
            self.repeat = Some(RepeatSchedule {
                direction,
                period,
                next_due: now + period,
            });
            trace!("Shuttle repeat armed: {:?} every {:?}", direction, period);
        }

        self.value = new_value;
    }

    /// Emit one repeat tick if the schedule is due at `now`
    ///
    /// The next tick is armed one period after `now`, so a late tick never
    /// bursts to catch up. Returns whether a tick was emitted.
    pub fn fire_repeat(&mut self, now: Instant, ctx: &dyn SurfaceContext) -> bool {
        let Some(schedule) = self.repeat.as_mut() else {
            return false;
        };
        if now < schedule.next_due {
            return false;
        }

        schedule.next_due = now + schedule.period;
        schedule.direction.emit(ctx, self.repeat_target);
        true
    }

    /// Stop repeating; a no-op when nothing is scheduled
    ///
    /// Returns whether a schedule was active.
    pub fn cancel(&mut self) -> bool {
        self.repeat.take().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ChannelContext, SurfaceEvent};
    use crate::geometry::ShuttleModel;
    use proptest::prelude::*;
    use tokio::sync::mpsc::UnboundedReceiver;

    const VAR: &str = "shuttleValueVariable";

    fn shuttle() -> PositionId {
        ShuttleModel::ShuttleProV2.geometry().shuttle_position()
    }

    fn repeat() -> PositionId {
        ShuttleModel::ShuttleProV2.geometry().shuttle_repeat_position()
    }

    fn make_ring() -> (ShuttleRing, ChannelContext, UnboundedReceiver<SurfaceEvent>) {
        let (ctx, rx) = ChannelContext::new();
        (ShuttleRing::new(ShuttleModel::ShuttleProV2.geometry(), VAR), ctx, rx)
    }

    fn drain(rx: &mut UnboundedReceiver<SurfaceEvent>) -> Vec<SurfaceEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn var(value: i32) -> SurfaceEvent {
        SurfaceEvent::Variable {
            name: VAR.to_string(),
            value,
        }
    }

    #[test]
    fn test_first_action_emits_two_rotations() {
        let (mut ring, ctx, mut rx) = make_ring();
        let t0 = Instant::now();

        ring.on_sample_at(3, t0, &ctx);

        assert_eq!(
            drain(&mut rx),
            vec![
                var(3),
                SurfaceEvent::RotateRight(shuttle()),
                SurfaceEvent::RotateRight(repeat()),
            ]
        );
        let schedule = ring.schedule().copied().unwrap();
        assert_eq!(schedule.direction, Rotation::Right);
        assert_eq!(schedule.period, Duration::from_secs(1) / 3);
        assert_eq!(schedule.next_due, t0 + Duration::from_secs(1) / 3);
        assert_eq!(ring.value(), 3);
    }

    #[test]
    fn test_repeat_ticks_only_when_due() {
        let (mut ring, ctx, mut rx) = make_ring();
        let t0 = Instant::now();
        ring.on_sample_at(-2, t0, &ctx);
        drain(&mut rx);

        assert!(!ring.fire_repeat(t0 + Duration::from_millis(499), &ctx));
        assert!(ring.fire_repeat(t0 + Duration::from_millis(500), &ctx));
        assert_eq!(ring.next_due(), Some(t0 + Duration::from_millis(1000)));

        // Late tick re-arms from the time it actually fired
        assert!(ring.fire_repeat(t0 + Duration::from_millis(1700), &ctx));
        assert_eq!(ring.next_due(), Some(t0 + Duration::from_millis(2200)));

        assert_eq!(
            drain(&mut rx),
            vec![
                SurfaceEvent::RotateLeft(repeat()),
                SurfaceEvent::RotateLeft(repeat()),
            ]
        );
    }

    #[test]
    fn test_held_sample_reschedules_without_duplicate() {
        let (mut ring, ctx, mut rx) = make_ring();
        let t0 = Instant::now();
        ring.on_sample_at(3, t0, &ctx);
        drain(&mut rx);

        let t1 = t0 + Duration::from_millis(100);
        ring.on_sample_at(3, t1, &ctx);

        // Schedule was active: only the primary rotation, no immediate repeat
        assert_eq!(
            drain(&mut rx),
            vec![var(3), SurfaceEvent::RotateRight(shuttle())]
        );
        assert_eq!(ring.next_due(), Some(t1 + Duration::from_secs(1) / 3));
    }

    #[test]
    fn test_release_uses_previous_side() {
        let (mut ring, ctx, mut rx) = make_ring();
        let t0 = Instant::now();

        ring.on_sample_at(5, t0, &ctx);
        drain(&mut rx);
        ring.on_sample_at(0, t0, &ctx);
        assert_eq!(
            drain(&mut rx),
            vec![var(0), SurfaceEvent::RotateRight(shuttle())]
        );
        assert!(!ring.is_repeating());

        ring.on_sample_at(-1, t0, &ctx);
        drain(&mut rx);
        ring.on_sample_at(0, t0, &ctx);
        assert_eq!(
            drain(&mut rx),
            vec![var(0), SurfaceEvent::RotateLeft(shuttle())]
        );
        assert!(!ring.is_repeating());
    }

    #[test]
    fn test_zero_at_rest_still_emits_primary_and_first_repeat() {
        let (mut ring, ctx, mut rx) = make_ring();

        ring.on_sample_at(0, Instant::now(), &ctx);

        // At rest the schedule is inactive, so this counts as a first action
        assert_eq!(
            drain(&mut rx),
            vec![
                var(0),
                SurfaceEvent::RotateLeft(shuttle()),
                SurfaceEvent::RotateLeft(repeat()),
            ]
        );
        assert!(!ring.is_repeating());
    }

    #[test]
    fn test_reversal_through_zero_flips_direction() {
        let (mut ring, ctx, mut rx) = make_ring();
        let t0 = Instant::now();

        ring.on_sample_at(2, t0, &ctx);
        ring.on_sample_at(-2, t0, &ctx);
        drain(&mut rx);

        let schedule = ring.schedule().copied().unwrap();
        assert_eq!(schedule.direction, Rotation::Left);

        assert!(ring.fire_repeat(t0 + Duration::from_millis(500), &ctx));
        assert_eq!(drain(&mut rx), vec![SurfaceEvent::RotateLeft(repeat())]);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let (mut ring, ctx, mut rx) = make_ring();

        assert!(!ring.cancel());
        assert!(!ring.cancel());
        assert!(!ring.fire_repeat(Instant::now(), &ctx));
        assert!(drain(&mut rx).is_empty());

        ring.on_sample_at(1, Instant::now(), &ctx);
        assert!(ring.cancel());
        assert!(!ring.cancel());
        assert!(!ring.is_repeating());
    }

    #[test]
    fn test_out_of_range_value_uses_top_rate() {
        let (mut ring, ctx, _rx) = make_ring();

        ring.on_sample_at(i8::MIN, Instant::now(), &ctx);

        let schedule = ring.schedule().copied().unwrap();
        assert_eq!(schedule.direction, Rotation::Left);
        assert_eq!(schedule.period, Duration::from_secs(1) / 21);
    }

    proptest! {
        #[test]
        fn prop_schedule_tracks_last_value(values in proptest::collection::vec(-7i8..=7, 1..40)) {
            let (mut ring, ctx, mut rx) = make_ring();
            let t0 = Instant::now();

            for value in values {
                let was_repeating = ring.is_repeating();
                ring.on_sample_at(value, t0, &ctx);

                // Variable + primary, plus the immediate repeat when leaving rest
                let expected = if was_repeating { 2 } else { 3 };
                prop_assert_eq!(drain(&mut rx).len(), expected);

                prop_assert_eq!(ring.is_repeating(), value != 0);
                prop_assert_eq!(ring.value(), value);
                if let Some(schedule) = ring.schedule() {
                    prop_assert_eq!(schedule.period, repeat_period(value.unsigned_abs()));
                    let expected_direction = if value > 0 { Rotation::Right } else { Rotation::Left };
                    prop_assert_eq!(schedule.direction, expected_direction);
                }
            }
        }
    }
}

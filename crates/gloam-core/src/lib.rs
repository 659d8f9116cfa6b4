pub mod geometry;
pub mod outbox;
pub mod simulation;
pub mod time;
pub mod timer;

pub use geometry::{Aabb, RayHit, Size, Vec2};
pub use outbox::Outbox;
pub use simulation::Simulation;
pub use timer::{Cooldown, Countdown};

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use crate::simulation::Simulation;
    use crate::time::NOMINAL_FRAME_MS;

    /// Run `n` nominal frames starting at `start_ms`, returning every event
    /// and the timestamp of the frame after the last one.
    pub fn run_frames<S: Simulation + ?Sized>(
        sim: &mut S,
        n: usize,
        start_ms: f64,
    ) -> (Vec<S::Event>, f64) {
        run_frames_with(sim, n, start_ms, NOMINAL_FRAME_MS, |_, _| {})
    }

    /// Run `n` frames of `delta_ms`, calling `before_frame(sim, now_ms)` ahead of
    /// each update so tests can script commands.
    pub fn run_frames_with<S: Simulation + ?Sized>(
        sim: &mut S,
        n: usize,
        start_ms: f64,
        delta_ms: f32,
        mut before_frame: impl FnMut(&mut S, f64),
    ) -> (Vec<S::Event>, f64) {
        let mut now = start_ms;
        let mut events = Vec::new();
        for _ in 0..n {
            before_frame(sim, now);
            events.extend(sim.update(delta_ms, now));
            now += f64::from(delta_ms);
        }
        (events, now)
    }

    /// Assert that the simulation's serialized state differs from `before`.
    pub fn assert_state_changed<S: Simulation + ?Sized>(sim: &S, before: &[u8]) {
        let after = sim.serialize_state();
        assert_ne!(
            before,
            after.as_slice(),
            "state should change after update"
        );
    }

    /// Assert that two simulations serialize to identical state.
    pub fn assert_same_state<S: Simulation + ?Sized>(a: &S, b: &S) {
        assert_eq!(
            a.serialize_state(),
            b.serialize_state(),
            "simulations diverged"
        );
    }
}

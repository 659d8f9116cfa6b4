/// Contract between a frame-driven host (UI, replay tool, headless runner)
/// and a deterministic simulation.
///
/// The host owns the clock: it passes the frame delta and the current time
/// explicitly, so identical (state, delta, time) always yields the same next
/// state. The simulation never reads wall-clock time and never blocks.
pub trait Simulation {
    /// One-shot notifications produced during a tick.
    type Event;

    /// Read-only view a renderer needs to draw the current frame.
    type Snapshot: ?Sized;

    /// Advance one frame. Returns everything the tick queued, drained once.
    fn update(&mut self, delta_ms: f32, now_ms: f64) -> Vec<Self::Event>;

    fn snapshot(&self) -> &Self::Snapshot;

    /// Serialize the full live state (replays, debugging, divergence checks).
    fn serialize_state(&self) -> Vec<u8>;

    /// Replace the live state with a previously serialized one. Malformed
    /// input is ignored.
    fn apply_state(&mut self, state: &[u8]);

    /// Suspend updates while a modal is open.
    fn pause(&mut self);

    fn resume(&mut self);

    /// Whether the current level has ended (complete, lost, or won).
    fn is_finished(&self) -> bool;
}

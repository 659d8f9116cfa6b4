/// Nominal display frame in milliseconds (60 Hz).
pub const NOMINAL_FRAME_MS: f32 = 16.67;

/// Largest delta a single update may integrate, as a multiple of the nominal frame.
pub const MAX_FRAME_MULTIPLE: f32 = 2.0;

/// Sanitize a host-supplied frame delta: non-finite or negative values become
/// zero, long frames are clamped to `max_multiple` nominal frames.
pub fn clamp_delta_ms(delta_ms: f32, nominal_ms: f32, max_multiple: f32) -> f32 {
    if !delta_ms.is_finite() || delta_ms <= 0.0 {
        if !delta_ms.is_finite() {
            tracing::debug!(delta_ms, "Dropped non-finite frame delta");
        }
        return 0.0;
    }
    delta_ms.min(nominal_ms * max_multiple)
}

/// [`clamp_delta_ms`] with the default frame constants.
pub fn clamp_frame_delta(delta_ms: f32) -> f32 {
    clamp_delta_ms(delta_ms, NOMINAL_FRAME_MS, MAX_FRAME_MULTIPLE)
}

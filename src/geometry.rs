//! Small 2D helpers for the stamping interaction.

/// Signed angle, in degrees, between the vectors `pivot → from` and
/// `pivot → to`, normalized into `(-180, 180]`.
///
/// If either point coincides with the pivot there is no defined direction,
/// so the delta is zero.
pub fn rotation_delta(pivot: (f32, f32), from: (f32, f32), to: (f32, f32)) -> f32 {
    let va = (from.0 - pivot.0, from.1 - pivot.1);
    let vb = (to.0 - pivot.0, to.1 - pivot.1);
    if (va.0 == 0.0 && va.1 == 0.0) || (vb.0 == 0.0 && vb.1 == 0.0) {
        return 0.0;
    }

    let mut delta = (vb.1.atan2(vb.0) - va.1.atan2(va.0)).to_degrees();
    while delta > 180.0 {
        delta -= 360.0;
    }
    while delta <= -180.0 {
        delta += 360.0;
    }
    delta
}

/// Scale `(src_w, src_h)` uniformly so it fits inside `(max_w, max_h)`,
/// keeping the aspect ratio. Degenerate inputs collapse to `(0, 0)`.
pub fn fit_size(src_w: f32, src_h: f32, max_w: f32, max_h: f32) -> (f32, f32) {
    if src_w <= 0.0 || src_h <= 0.0 || max_w <= 0.0 || max_h <= 0.0 {
        return (0.0, 0.0);
    }
    let ratio = (max_w / src_w).min(max_h / src_h);
    (src_w * ratio, src_h * ratio)
}

//! Linear interpolation between captured history entries.

use lib_types::HistoryEntry;

/// Straight line through `(t0, y0)` and `(t1, y1)`, evaluated at `t`.
#[inline]
pub fn lerp(t: f64, t0: f64, y0: f64, t1: f64, y1: f64) -> f64 {
    y0 + (t - t0) * (y1 - y0) / (t1 - t0)
}

/// Interpolate the real outputs of two entries at time `t`.
///
/// Requires `prev.time < next.time` and equal output counts. Integer,
/// boolean and string outputs are copied from whichever entry is nearer
/// to `t`; the midpoint goes to `next`.
pub fn interpolate_entry(prev: &HistoryEntry, next: &HistoryEntry, t: f64) -> HistoryEntry {
    let nearest = if t - prev.time < next.time - t { prev } else { next };

    let reals = prev
        .reals
        .iter()
        .zip(&next.reals)
        .map(|(&y0, &y1)| lerp(t, prev.time, y0, next.time, y1))
        .collect();

    HistoryEntry {
        time: t,
        reals,
        integers: nearest.integers.clone(),
        booleans: nearest.booleans.clone(),
        strings: nearest.strings.clone(),
    }
}

/// Outputs at `t` given the bracketing entries.
///
/// An entry whose time matches `t` within `tolerance` is returned
/// verbatim. Outside the bracket the nearest entry is held; values are
/// never extrapolated.
pub fn select_entry(
    prev: Option<&HistoryEntry>,
    next: &HistoryEntry,
    t: f64,
    tolerance: f64,
) -> HistoryEntry {
    if (t - next.time).abs() <= tolerance {
        return next.clone();
    }

    match prev.filter(|p| p.is_valid() && p.time < next.time) {
        Some(prev) if (t - prev.time).abs() <= tolerance => prev.clone(),
        Some(prev) if t > prev.time && t < next.time => interpolate_entry(prev, next, t),
        Some(prev) if t < prev.time => prev.clone(),
        _ => next.clone(),
    }
}

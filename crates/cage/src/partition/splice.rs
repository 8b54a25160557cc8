//! Split point search on a cross-sectional occupancy profile.
//!
//! A good place to cut a shape is a waist: a local minimum of the profile
//! next to a steep rise. Every minimum is scored by the steepest slope to any
//! local maximum on either side, and the best positive score wins.

/// Local maxima and minima of `profile`.
///
/// An interior index is a minimum when it is no greater than both
/// neighbours and strictly below at least one of them; maxima are defined
/// the same way with the comparisons reversed. Boundary indices can only be
/// maxima. Minima closer than `margin` to either end are dropped.
pub fn local_extrema(profile: &[u32], margin: usize) -> (Vec<usize>, Vec<usize>) {
    let len = profile.len();
    let mut maxima = Vec::new();
    let mut minima = Vec::new();

    match len {
        0 => return (maxima, minima),
        1 => {
            maxima.push(0);
            return (maxima, minima);
        }
        _ => {}
    }

    if profile[0] >= profile[1] {
        maxima.push(0);
    }

    for i in 1..len - 1 {
        let (prev, here, next) = (profile[i - 1], profile[i], profile[i + 1]);

        if here >= prev && here >= next && (here > prev || here > next) {
            maxima.push(i);
        } else if here <= prev
            && here <= next
            && (here < prev || here < next)
            && i >= margin
            && i + margin < len
        {
            minima.push(i);
        }
    }

    if profile[len - 1] >= profile[len - 2] {
        maxima.push(len - 1);
    }

    (maxima, minima)
}

/// Index of the best split in `profile`, or `None` when the profile has no
/// usable waist.
pub fn search_splice_index(profile: &[u32], margin: usize) -> Option<usize> {
    let (maxima, minima) = local_extrema(profile, margin);
    if minima.is_empty() {
        return None;
    }

    let mut best: Option<(usize, f32)> = None;
    for &min in &minima {
        let slope = maxima
            .iter()
            .map(|&max| {
                let rise = profile[max] as f32 - profile[min] as f32;
                rise / max.abs_diff(min) as f32
            })
            .fold(f32::NEG_INFINITY, f32::max);

        if slope > 0.0 && best.is_none_or(|(_, s)| slope > s) {
            best = Some((min, slope));
        }
    }

    best.map(|(index, _)| index)
}

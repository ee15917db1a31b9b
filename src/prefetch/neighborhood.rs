/// Candidate indices around a cursor position, nearest first.
///
/// Distances alternate above and below: `+1, -1, +2, -2, ...` out to
/// `radius`. Candidates falling outside `[0, extent)` are dropped, not
/// clamped, so no index is ever produced twice and the cursor position
/// itself is never a candidate.
pub fn prefetch_neighborhood(origin: usize, radius: usize, extent: usize) -> Vec<usize> {
    let mut candidates = Vec::with_capacity(radius * 2);
    for step in 1..=radius {
        if let Some(above) = origin.checked_add(step) {
            if above < extent {
                candidates.push(above);
            }
        }
        if let Some(below) = origin.checked_sub(step) {
            if below < extent {
                candidates.push(below);
            }
        }
    }
    candidates
}

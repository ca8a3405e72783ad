use std::ops::Range;

/// Contiguous slice of the global point sequence owned by `rank`.
///
/// The base chunk is `total / workers` and the first `total % workers`
/// ranks take one extra point, so the ranges tile `[0, total)` with no
/// gaps or overlaps and no two slices differ in length by more than one.
pub fn partition_range(total: usize, workers: usize, rank: usize) -> Range<usize> {
    debug_assert!(workers >= 1);
    debug_assert!(rank < workers);

    let chunk = total / workers;
    let extra = total % workers;
    let start = rank * chunk + rank.min(extra);
    let end = start + chunk + usize::from(rank < extra);
    start..end
}

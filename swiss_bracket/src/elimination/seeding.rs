//! Single-elimination seeding map.

/// Number of slots in a bracket for `qualifiers` entrants (next power of two)
pub fn bracket_size(qualifiers: usize) -> usize {
    qualifiers.max(1).next_power_of_two()
}

/// Number of elimination rounds for `qualifiers` entrants
pub fn bracket_rounds(qualifiers: usize) -> u32 {
    bracket_size(qualifiers).trailing_zeros()
}

/// Seed numbers (1-based) in bracket-slot order.
///
/// Built by doubling from `[1, 2]`: every seed `d` is followed by its mirror
/// `len + 1 - d`, where `len` is the length of the layer being built. The
/// result pairs 1 v N, and keeps seeds 1 and 2 in opposite halves so they can
/// only meet in the final.
///
/// `size` is rounded up to a power of two.
pub fn generate_seeding_map(size: usize) -> Vec<usize> {
    if size <= 1 {
        return vec![1; size];
    }
    let size = size.next_power_of_two();
    let mut map = vec![1, 2];
    while map.len() < size {
        let len = map.len() * 2;
        map = map.iter().flat_map(|&d| [d, len + 1 - d]).collect();
    }
    map
}

/// Round (1-based) in which the entrants in 0-based slots `a` and `b` would
/// meet if both keep winning
pub fn meeting_round(a: usize, b: usize) -> u32 {
    let diff = a ^ b;
    if diff == 0 {
        0
    } else {
        usize::BITS - diff.leading_zeros()
    }
}

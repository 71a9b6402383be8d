//! History comparison.

/// How two ordered histories relate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryRelation {
    /// Both histories are identical.
    Equal,
    /// The first history extends the second.
    Ahead,
    /// The second history extends the first.
    Behind,
    /// Neither is a prefix of the other.
    Diverged,
}

/// Returns the first index at which `a` and `b` disagree.
///
/// A missing element disagrees with anything, so if one sequence is a
/// prefix of the other the result is the shorter length.
pub fn fork_point<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    a.iter()
        .zip(b)
        .position(|(x, y)| x != y)
        .unwrap_or_else(|| a.len().min(b.len()))
}

/// Classifies `a` relative to `b`.
pub fn relation<T: PartialEq>(a: &[T], b: &[T]) -> HistoryRelation {
    let fp = fork_point(a, b);
    match (fp == a.len(), fp == b.len()) {
        (true, true) => HistoryRelation::Equal,
        (false, true) => HistoryRelation::Ahead,
        (true, false) => HistoryRelation::Behind,
        (false, false) => HistoryRelation::Diverged,
    }
}

use std::collections::BTreeSet;

/// Groups positive block numbers into ascending runs of consecutive values.
///
/// Duplicates collapse and non-positive entries (unused pointer slots) are
/// dropped, so `[7, 5, 6, 10, 11, 0, -1]` becomes `[[5, 6, 7], [10, 11]]`.
pub fn contiguous_runs(blocks: &[i64]) -> Vec<Vec<i64>> {
    let unique = blocks
        .iter()
        .copied()
        .filter(|block| *block > 0)
        .collect::<BTreeSet<_>>();

    let mut runs: Vec<Vec<i64>> = Vec::new();
    for block in unique {
        match runs.last_mut() {
            Some(run) if run.last().is_some_and(|last| last + 1 == block) => run.push(block),
            _ => runs.push(vec![block]),
        }
    }
    runs
}

/// `5-7, 10-11, 14` style summary of [`contiguous_runs`].
pub fn format_runs(runs: &[Vec<i64>]) -> String {
    runs.iter()
        .filter_map(|run| match (run.first(), run.last()) {
            (Some(first), Some(last)) if first == last => Some(first.to_string()),
            (Some(first), Some(last)) => Some(format!("{first}-{last}")),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(", ")
}

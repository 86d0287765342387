//! Splitting a field selection across decoder handles.

use itertools::Itertools;

/// Split `fields` into contiguous subsets, one per decoder handle used
///
/// At most `min(handle_count, fields.len())` subsets are produced. Each holds
/// `fields.len() / concurrency` fields and the remainder goes to the last one,
/// so concatenating the subsets gives back the original order. An empty
/// selection yields a single empty subset.
#[must_use]
pub fn partition<T: Clone>(fields: &[T], handle_count: usize) -> Vec<Vec<T>> {
    let concurrency = handle_count.min(fields.len());
    if concurrency == 0 {
        return vec![Vec::new()];
    }

    let chunk_size = fields.len() / concurrency;
    let (head, last) = fields.split_at(chunk_size * (concurrency - 1));

    head.chunks(chunk_size)
        .map(<[T]>::to_vec)
        .chain(std::iter::once(last.to_vec()))
        .collect_vec()
}

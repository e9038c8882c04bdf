pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Splits `ids` into consecutive batches of `batch_size`; the last batch holds
/// the remainder. Order is preserved and empty input yields no batches.
pub fn partition(ids: &[u32], batch_size: usize) -> Vec<Vec<u32>> {
    ids.chunks(batch_size.max(1))
        .map(|chunk| chunk.to_vec())
        .collect()
}

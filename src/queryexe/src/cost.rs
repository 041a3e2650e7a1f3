//! Block access estimates for the join strategies.
//!
//! Plans report `blocks_accessed` through these functions and the planner
//! uses the same functions to compare candidates before building any of
//! them. All arithmetic saturates.

fn div_ceil(n: usize, d: usize) -> usize {
    let d = d.max(1);
    n / d + if n % d == 0 { 0 } else { 1 }
}

/// Blocks taken by `records` records stored `records_per_block` to a block.
pub fn materialized_blocks(records: usize, records_per_block: usize) -> usize {
    div_ceil(records, records_per_block)
}

/// Multi-buffer product: the materialized `outer` side is read once and
/// the `inner` side once per chunk of `available - 2` blocks.
pub fn product_cost(outer_blocks: usize, inner_blocks: usize, available: usize) -> usize {
    let chunks = div_ceil(outer_blocks, available.saturating_sub(2));
    outer_blocks.saturating_add(chunks.saturating_mul(inner_blocks))
}

/// Block nested loop with chunks of `chunk_size` outer blocks.
pub fn nested_cost(outer_blocks: usize, inner_blocks: usize, chunk_size: usize) -> usize {
    let chunks = div_ceil(outer_blocks, chunk_size);
    outer_blocks.saturating_add(chunks.saturating_mul(inner_blocks))
}

/// Hash partition join: each side is read, partitioned and read again.
pub fn hash_cost(blocks1: usize, blocks2: usize) -> usize {
    blocks1.saturating_add(blocks2).saturating_mul(3)
}

/// Merge of two sorted inputs. Sorting them is not counted.
pub fn merge_cost(sorted_blocks1: usize, sorted_blocks2: usize) -> usize {
    sorted_blocks1.saturating_add(sorted_blocks2)
}

/// Index join: the outer side is read once and probed once per record.
pub fn index_join_cost(outer_blocks: usize, outer_records: usize, probe_cost: usize) -> usize {
    outer_blocks.saturating_add(outer_records.saturating_mul(probe_cost))
}

/// Index select: one probe, then one block per matching record.
pub fn index_select_cost(probe_cost: usize, records_output: usize) -> usize {
    probe_cost.saturating_add(records_output)
}

/// Output size of an equi-join whose join fields have `v1` and `v2`
/// distinct values.
pub fn join_records(r1: usize, r2: usize, v1: usize, v2: usize) -> usize {
    r1.saturating_mul(r2) / v1.max(v2).max(1)
}

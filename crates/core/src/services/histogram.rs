//! Impact histogram: equal-population buckets per sign.
//!
//! Negative and non-negative values are ranked separately. Negatives are
//! ranked from the largest magnitude down, non-negatives from zero up, and
//! each rank maps to `floor(rank / len * buckets)`. The scale therefore
//! depends on the whole population it is computed over.

use crate::models::{GroupedTransfer, HistogramInput};

/// Default number of impact buckets.
pub const NUM_BUCKETS: usize = 5;

/// Bucket assigned to one histogram input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketAssignment {
    pub index: usize,
    pub value: f64,
    pub bucket: usize,
}

/// Rank `data` into `num_buckets` buckets per sign.
///
/// Returns negatives first (largest magnitude first), then non-negatives
/// (smallest first). Ties keep input order.
pub fn compute_histogram(data: &[HistogramInput], num_buckets: usize) -> Vec<BucketAssignment> {
    let num_buckets = num_buckets.max(1);

    let (mut negative, mut non_negative): (Vec<HistogramInput>, Vec<HistogramInput>) =
        data.iter().copied().partition(|d| d.value < 0.0);

    negative.sort_by(|a, b| a.value.total_cmp(&b.value));
    non_negative.sort_by(|a, b| a.value.total_cmp(&b.value));

    let assign = |subset: Vec<HistogramInput>| {
        let len = subset.len();
        subset
            .into_iter()
            .enumerate()
            .map(move |(rank, d)| BucketAssignment {
                index: d.index,
                value: d.value,
                bucket: rank * num_buckets / len,
            })
    };

    assign(negative).chain(assign(non_negative)).collect()
}

/// Write each transfer's impact bucket in place.
pub fn assign_impact_buckets(transfers: &mut [GroupedTransfer], num_buckets: usize) {
    let inputs: Vec<HistogramInput> = transfers
        .iter()
        .enumerate()
        .map(|(index, t)| HistogramInput {
            index,
            value: t.delta_quantity.to_f64(),
        })
        .collect();

    for assignment in compute_histogram(&inputs, num_buckets) {
        transfers[assignment.index].impact_bucket = assignment.bucket;
    }
}

use crate::record::NormalizedRecord;

/// Stable split by exact author match: `(primary, secondary)`.
///
/// Records whose author equals `sentinel` go to `secondary`; everything else,
/// including records without an author, stays in `primary`. Relative order is
/// preserved on both sides.
pub fn partition_by_special_author(
    records: Vec<NormalizedRecord>,
    sentinel: &str,
) -> (Vec<NormalizedRecord>, Vec<NormalizedRecord>) {
    records
        .into_iter()
        .partition(|record| record.author.as_deref() != Some(sentinel))
}

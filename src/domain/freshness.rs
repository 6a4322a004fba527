//! Read-time reconciliation of duplicate stored records.

use crate::domain::price::StoredRecord;
use std::collections::BTreeMap;

/// The record with the greatest write timestamp.
///
/// Ties keep the earliest record in input order. Returns `None` only for an
/// empty slice.
pub fn pick_freshest(records: &[StoredRecord]) -> Option<&StoredRecord> {
    let mut iter = records.iter();
    let first = iter.next()?;
    Some(iter.fold(first, |best, candidate| {
        if candidate.written_at > best.written_at {
            candidate
        } else {
            best
        }
    }))
}

/// Collapse records to one per `(symbol, date)`, ordered by symbol then date.
pub fn reconcile_all(records: &[StoredRecord]) -> Vec<StoredRecord> {
    let mut groups: BTreeMap<(&str, chrono::NaiveDate), Vec<StoredRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.key()).or_default().push(record.clone());
    }

    groups
        .values()
        .filter_map(|group| pick_freshest(group).cloned())
        .collect()
}

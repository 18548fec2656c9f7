/*!
 * Change detection between successive property snapshots.
 */
use miioflow_core::types::{PropertySnapshot, Value};

/// Result of comparing a new snapshot with the previous one
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// There was no previous snapshot
    Baseline,
    /// At least one key present in both snapshots differs
    Changed(Vec<String>),
    /// No shared key differs
    Unchanged,
}

impl Change {
    /// Whether the comparison found a delta
    pub fn is_changed(&self) -> bool {
        matches!(self, Change::Changed(_))
    }
}

/// Compare two snapshots over the keys present in both
///
/// Keys that appear or disappear between snapshots are not a change.
/// Numbers compare by value, so `25` and `25.0` are the same reading.
pub fn detect(previous: Option<&PropertySnapshot>, current: &PropertySnapshot) -> Change {
    let Some(previous) = previous else {
        return Change::Baseline;
    };

    let changed: Vec<String> = current
        .properties()
        .iter()
        .filter(|(key, value)| matches!(previous.get(key), Some(old) if !same_value(old, value)))
        .map(|(key, _)| key.clone())
        .collect();

    if changed.is_empty() {
        Change::Unchanged
    } else {
        Change::Changed(changed)
    }
}

fn same_value(old: &Value, new: &Value) -> bool {
    match (old, new) {
        (Value::Integer(a), Value::Integer(b)) => a == b,
        (a, b) if a.is_numeric() && b.is_numeric() => a.as_float() == b.as_float(),
        (a, b) => a == b,
    }
}

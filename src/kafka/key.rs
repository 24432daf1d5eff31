use crate::audit::AuditEntry;

/// Sits between bucket and object in a partition key.
pub const KEY_SEPARATOR: &str = "/";

/// Derives the partition key for an entry: `<bucket>/<object>`.
///
/// All events for one object land on the same partition. Missing bucket or
/// object names count as empty, so an entry without either still gets the
/// key `/`.
pub fn partition_key(entry: &AuditEntry) -> String {
    let bucket = entry.bucket();
    let object = entry.object();

    let mut key = String::with_capacity(bucket.len() + KEY_SEPARATOR.len() + object.len());
    key.push_str(bucket);
    key.push_str(KEY_SEPARATOR);
    key.push_str(object);
    key
}

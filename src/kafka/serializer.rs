use crate::{audit::AuditEntry, Result};

/// Converts audit entries to and from their JSON wire form.
pub struct JsonSerializer;

impl JsonSerializer {
    pub fn serialize(entry: &AuditEntry) -> Result<Vec<u8>> {
        serde_json::to_vec(entry).map_err(Into::into)
    }

    /// Decodes the first JSON value in `payload`. Anything after it is left
    /// unread.
    pub fn deserialize(payload: &[u8]) -> Result<AuditEntry> {
        match serde_json::Deserializer::from_slice(payload)
            .into_iter::<AuditEntry>()
            .next()
        {
            Some(entry) => entry.map_err(Into::into),
            // Nothing but whitespace: report it as the EOF error
            None => serde_json::from_slice(payload).map_err(Into::into),
        }
    }
}

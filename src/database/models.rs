/*!
 * Database row types.
 */

use serde::{Deserialize, Serialize};

/// One cached external term set, as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermCacheRow {
    /// SHA-256 of the normalized production key
    pub key_fingerprint: String,
    /// Production title as supplied
    pub title: String,
    /// Production year
    pub year: i32,
    /// Serialized `TermSet`
    pub terms_json: String,
    /// Fetch time, unix milliseconds
    pub fetched_at_ms: i64,
    /// Time-to-live in seconds
    pub ttl_secs: i64,
}

/// Term cache table statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermCacheTableStats {
    /// Number of stored records
    pub total_records: i64,
    /// Total size of the serialized term sets, in bytes
    pub total_bytes: i64,
}

//! Quick consistency check used before trusting an existing file

use rusqlite::Connection;
use tracing::debug;

/// Run `PRAGMA quick_check` and reduce the result to intact / not intact
///
/// Only a first row equal to `ok` (any case) counts as intact. Query errors
/// are logged and reported as `false`.
pub fn is_intact(conn: &Connection) -> bool {
    match conn.query_row("PRAGMA quick_check", [], |row| row.get::<_, String>(0)) {
        Ok(result) if result.eq_ignore_ascii_case("ok") => true,
        Ok(result) => {
            debug!("quick_check reported: {}", result);
            false
        }
        Err(e) => {
            debug!("quick_check failed: {}", e);
            false
        }
    }
}

//! Database initialization and table definitions
//!
//! This module handles the setup of the embedded redb database. Every record
//! collection lives in its own table so that each operation touches only the
//! records it needs, inside a single transaction.
//!
//! All tables map string keys to string values; record values are JSON.

use redb::{Database, TableDefinition};

/// Users keyed by user id
///
/// Example:
/// - Key: "user_1705501234567"
/// - Value: '{"id":"user_1705501234567","email":"a@x.com",...}'
pub const TABLE_USERS: TableDefinition<&str, &str> = TableDefinition::new("users_v1");

/// Unique email index
///
/// Key: email exactly as registered
/// Value: user id
pub const TABLE_USER_EMAILS: TableDefinition<&str, &str> = TableDefinition::new("user_emails_v1");

/// Links keyed by link id
pub const TABLE_LINKS: TableDefinition<&str, &str> = TableDefinition::new("links_v1");

/// Unique short code index
///
/// Key: short code (e.g. "abc123")
/// Value: link id
pub const TABLE_LINK_CODES: TableDefinition<&str, &str> = TableDefinition::new("link_codes_v1");

/// Index of links per owner
///
/// Key: composite key in format "{user_id}:{link_id}"
/// Value: link id
///
/// Link ids embed their creation time with a fixed number of digits, so a
/// range scan over "{user_id}:" yields the links in creation order.
pub const TABLE_USER_LINKS: TableDefinition<&str, &str> = TableDefinition::new("user_links_v1");

/// QR codes keyed by QR id
pub const TABLE_QR_CODES: TableDefinition<&str, &str> = TableDefinition::new("qr_codes_v1");

/// Index of QR codes per owner, same key layout as [`TABLE_USER_LINKS`]
pub const TABLE_USER_QR_CODES: TableDefinition<&str, &str> =
    TableDefinition::new("user_qr_codes_v1");

/// Sessions keyed by bearer token
pub const TABLE_SESSIONS: TableDefinition<&str, &str> = TableDefinition::new("sessions_v1");

/// Builds the key of a per-owner index entry
pub fn owner_key(user_id: &str, record_id: &str) -> String {
    format!("{}:{}", user_id, record_id)
}

/// Key range covering every index entry of one owner
///
/// The character '{' is lexicographically right after ':' so "{user_id}:{"
/// bounds the range from above.
pub fn owner_range(user_id: &str) -> (String, String) {
    (format!("{}:", user_id), format!("{}:{{", user_id))
}

/// Initializes the embedded database and creates required tables
///
/// # Arguments
///
/// * `db_path` - File path where the database should be stored (e.g., "data.db")
///
/// # Example
///
/// ```no_run
/// # use qrlink::database::init_db;
/// let db = init_db("data.db").expect("Failed to initialize database");
/// ```
pub fn init_db(db_path: &str) -> Result<Database, redb::Error> {
    let db = Database::create(db_path)?;

    let write_txn = db.begin_write()?;
    {
        write_txn.open_table(TABLE_USERS)?;
        write_txn.open_table(TABLE_USER_EMAILS)?;
        write_txn.open_table(TABLE_LINKS)?;
        write_txn.open_table(TABLE_LINK_CODES)?;
        write_txn.open_table(TABLE_USER_LINKS)?;
        write_txn.open_table(TABLE_QR_CODES)?;
        write_txn.open_table(TABLE_USER_QR_CODES)?;
        write_txn.open_table(TABLE_SESSIONS)?;
    }

    // Commit so the table structures exist for the first read transaction
    write_txn.commit()?;

    Ok(db)
}

//! Record store for users, links, QR codes and sessions
//!
//! [`RecordStore`] is the interface the HTTP layer depends on. [`RedbStore`]
//! implements it on top of the embedded redb database: every operation runs in
//! a single transaction and redb admits one write transaction at a time, so
//! concurrent read-modify-write cycles (e.g. two clicks on the same link) are
//! serialized instead of overwriting each other.

use std::sync::Arc;

use chrono::Utc;
use redb::{Database, ReadTransaction, ReadableDatabase, ReadableTable, Table};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use crate::analytics;
use crate::database::{
    init_db, owner_key, owner_range, TABLE_LINKS, TABLE_LINK_CODES, TABLE_QR_CODES,
    TABLE_SESSIONS, TABLE_USERS, TABLE_USER_EMAILS, TABLE_USER_LINKS, TABLE_USER_QR_CODES,
};
use crate::document::StoreDocument;
use crate::error::StoreError;
use crate::model::{
    Analytics, ClickEvent, Link, NewLink, NewQrCode, NewUser, QrCode, Session, User, UserStats,
    DEFAULT_PLAN, STAT_TOTAL_CLICKS, STAT_TOTAL_QR_CODES, STAT_TOTAL_URLS,
};
use crate::password::{generate_token, hash_password, verify_password};

/// Operations over the persisted collections
///
/// Lookups that miss return `Ok(None)` (or an empty list); only the failures
/// listed on each method are reported as errors, besides storage failures.
pub trait RecordStore: Send + Sync {
    /// Registers a user. Fails with `DuplicateEmail` if the email is taken.
    fn create_user(&self, new_user: NewUser) -> Result<User, StoreError>;

    /// Verifies credentials and stamps `last_login`.
    /// Fails with `NotFound` for an unknown email and `InvalidCredentials`
    /// for a wrong password.
    fn authenticate_user(&self, email: &str, password: &str) -> Result<User, StoreError>;

    fn get_user(&self, user_id: &str) -> Result<Option<User>, StoreError>;

    /// Adds each `(counter, amount)` pair to the user's stats.
    /// Returns `None` without writing if the user does not exist.
    fn update_user_stats(
        &self,
        user_id: &str,
        increments: &[(&str, u64)],
    ) -> Result<Option<User>, StoreError>;

    /// Stores a link for an existing user and bumps their `totalUrls`.
    /// Fails with `NotFound` for an unknown user and `DuplicateCode` if the
    /// short code is in use.
    fn create_link(&self, user_id: &str, new_link: NewLink) -> Result<Link, StoreError>;

    /// Appends a click event, bumps the link's counter and the owner's
    /// `totalClicks`.
    fn record_link_click(&self, link_id: &str) -> Result<Option<Link>, StoreError>;

    fn get_link(&self, link_id: &str) -> Result<Option<Link>, StoreError>;

    fn get_link_by_code(&self, short_code: &str) -> Result<Option<Link>, StoreError>;

    /// Active links of the user in creation order
    fn get_links_by_user(&self, user_id: &str) -> Result<Vec<Link>, StoreError>;

    /// Soft delete: the link stays stored with `active = false`
    fn deactivate_link(&self, link_id: &str) -> Result<Option<Link>, StoreError>;

    /// Stores QR metadata for an existing user and bumps their `totalQRCodes`.
    fn create_qr_code(&self, user_id: &str, new_qr: NewQrCode) -> Result<QrCode, StoreError>;

    fn get_qr_code(&self, qr_id: &str) -> Result<Option<QrCode>, StoreError>;

    /// All QR codes of the user in creation order
    fn get_qr_codes_by_user(&self, user_id: &str) -> Result<Vec<QrCode>, StoreError>;

    fn record_qr_download(&self, qr_id: &str) -> Result<Option<QrCode>, StoreError>;

    fn get_user_analytics(
        &self,
        user_id: &str,
        days: u32,
        recent_limit: usize,
    ) -> Result<Analytics, StoreError>;

    /// Opens a session for an existing user
    fn create_session(&self, user_id: &str) -> Result<Session, StoreError>;

    fn get_session(&self, token: &str) -> Result<Option<Session>, StoreError>;

    /// Returns whether a session was removed
    fn delete_session(&self, token: &str) -> Result<bool, StoreError>;

    /// Dumps users, links and QR codes into the single-document format
    fn export_document(&self) -> Result<StoreDocument, StoreError>;

    /// Upserts every record of `document` and rebuilds the indexes.
    /// Emails and short codes may be exchanged between records of the same
    /// document. Nothing is written if an email or short code clashes with a
    /// record that has a different id.
    fn import_document(&self, document: &StoreDocument) -> Result<(), StoreError>;
}

type StrTable<'txn> = Table<'txn, &'static str, &'static str>;

fn load<T, R>(table: &R, key: &str) -> Result<Option<T>, StoreError>
where
    T: DeserializeOwned,
    R: ReadableTable<&'static str, &'static str>,
{
    match table.get(key)? {
        Some(guard) => Ok(Some(serde_json::from_str(guard.value())?)),
        None => Ok(None),
    }
}

fn lookup<R>(table: &R, key: &str) -> Result<Option<String>, StoreError>
where
    R: ReadableTable<&'static str, &'static str>,
{
    Ok(table.get(key)?.map(|guard| guard.value().to_string()))
}

fn save<T: Serialize>(table: &mut StrTable<'_>, key: &str, record: &T) -> Result<(), StoreError> {
    let json = serde_json::to_string(record)?;
    table.insert(key, json.as_str())?;
    Ok(())
}

fn load_all<T, R>(table: &R) -> Result<Vec<T>, StoreError>
where
    T: DeserializeOwned,
    R: ReadableTable<&'static str, &'static str>,
{
    let mut records = Vec::new();
    for entry in table.iter()? {
        let (_, value) = entry?;
        records.push(serde_json::from_str(value.value())?);
    }
    Ok(records)
}

/// Ids listed under `user_id` in a per-owner index, oldest first
fn owned_ids<R>(index: &R, user_id: &str) -> Result<Vec<String>, StoreError>
where
    R: ReadableTable<&'static str, &'static str>,
{
    let (start, end) = owner_range(user_id);
    let mut ids = Vec::new();
    for entry in index.range(start.as_str()..end.as_str())? {
        let (_, value) = entry?;
        ids.push(value.value().to_string());
    }
    Ok(ids)
}

/// Generates `"{prefix}_{epoch millis}"`, moving to the next millisecond
/// while the id is taken
fn next_id<R>(table: &R, prefix: &str) -> Result<String, StoreError>
where
    R: ReadableTable<&'static str, &'static str>,
{
    let mut millis = Utc::now().timestamp_millis();
    loop {
        let id = format!("{}_{}", prefix, millis);
        if table.get(id.as_str())?.is_none() {
            return Ok(id);
        }
        millis += 1;
    }
}

fn bump_stats(
    users: &mut StrTable<'_>,
    user_id: &str,
    increments: &[(&str, u64)],
) -> Result<Option<User>, StoreError> {
    let Some(mut user) = load::<User, _>(&*users, user_id)? else {
        return Ok(None);
    };
    for (name, amount) in increments {
        user.stats.add(name, *amount);
    }
    save(users, user_id, &user)?;
    Ok(Some(user))
}

fn links_of(txn: &ReadTransaction, user_id: &str) -> Result<Vec<Link>, StoreError> {
    let index = txn.open_table(TABLE_USER_LINKS)?;
    let links = txn.open_table(TABLE_LINKS)?;

    let mut result = Vec::new();
    for id in owned_ids(&index, user_id)? {
        if let Some(link) = load::<Link, _>(&links, &id)? {
            if link.active {
                result.push(link);
            }
        }
    }
    Ok(result)
}

fn qr_codes_of(txn: &ReadTransaction, user_id: &str) -> Result<Vec<QrCode>, StoreError> {
    let index = txn.open_table(TABLE_USER_QR_CODES)?;
    let qr_codes = txn.open_table(TABLE_QR_CODES)?;

    let mut result = Vec::new();
    for id in owned_ids(&index, user_id)? {
        if let Some(qr) = load::<QrCode, _>(&qr_codes, &id)? {
            result.push(qr);
        }
    }
    Ok(result)
}

/// [`RecordStore`] backed by an embedded redb database
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
    bcrypt_cost: u32,
}

impl RedbStore {
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(db),
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }

    /// Opens (or creates) the database file and its tables
    pub fn open(db_path: &str) -> Result<Self, StoreError> {
        Ok(Self::new(init_db(db_path)?))
    }

    /// Overrides the bcrypt work factor used for new passwords
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let emails = read_txn.open_table(TABLE_USER_EMAILS)?;
        let Some(user_id) = lookup(&emails, email)? else {
            return Ok(None);
        };
        let users = read_txn.open_table(TABLE_USERS)?;
        load(&users, &user_id)
    }
}

impl RecordStore for RedbStore {
    fn create_user(&self, new_user: NewUser) -> Result<User, StoreError> {
        // bcrypt runs before the write transaction starts
        let password = hash_password(&new_user.password, self.bcrypt_cost)?;

        let write_txn = self.db.begin_write()?;
        let user = {
            let mut emails = write_txn.open_table(TABLE_USER_EMAILS)?;
            if emails.get(new_user.email.as_str())?.is_some() {
                warn!(email = %new_user.email, "Signup rejected: email already registered");
                return Err(StoreError::DuplicateEmail);
            }

            let mut users = write_txn.open_table(TABLE_USERS)?;
            let now = Utc::now();
            let user = User {
                id: next_id(&users, "user")?,
                email: new_user.email,
                name: new_user.name,
                password,
                created_at: now,
                last_login: now,
                plan: DEFAULT_PLAN.to_string(),
                stats: UserStats::default(),
            };

            save(&mut users, &user.id, &user)?;
            emails.insert(user.email.as_str(), user.id.as_str())?;
            user
        };
        write_txn.commit()?;

        info!(user_id = %user.id, "User created");
        Ok(user)
    }

    fn authenticate_user(&self, email: &str, password: &str) -> Result<User, StoreError> {
        let Some(user) = self.find_user_by_email(email)? else {
            warn!(email = %email, "Login failed: unknown email");
            return Err(StoreError::NotFound("User".to_string()));
        };

        if !verify_password(password, &user.password) {
            warn!(user_id = %user.id, "Login failed: wrong password");
            return Err(StoreError::InvalidCredentials);
        }

        let write_txn = self.db.begin_write()?;
        let user = {
            let mut users = write_txn.open_table(TABLE_USERS)?;
            let mut current: User = load(&users, &user.id)?
                .ok_or_else(|| StoreError::NotFound("User".to_string()))?;
            current.last_login = Utc::now();
            save(&mut users, &current.id, &current)?;
            current
        };
        write_txn.commit()?;

        info!(user_id = %user.id, "User logged in");
        Ok(user)
    }

    fn get_user(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let users = read_txn.open_table(TABLE_USERS)?;
        load(&users, user_id)
    }

    fn update_user_stats(
        &self,
        user_id: &str,
        increments: &[(&str, u64)],
    ) -> Result<Option<User>, StoreError> {
        let write_txn = self.db.begin_write()?;
        let user = {
            let mut users = write_txn.open_table(TABLE_USERS)?;
            bump_stats(&mut users, user_id, increments)?
        };
        write_txn.commit()?;
        Ok(user)
    }

    fn create_link(&self, user_id: &str, new_link: NewLink) -> Result<Link, StoreError> {
        let write_txn = self.db.begin_write()?;
        let link = {
            let mut users = write_txn.open_table(TABLE_USERS)?;
            if users.get(user_id)?.is_none() {
                return Err(StoreError::NotFound("User".to_string()));
            }

            let mut codes = write_txn.open_table(TABLE_LINK_CODES)?;
            if codes.get(new_link.short_code.as_str())?.is_some() {
                return Err(StoreError::DuplicateCode(new_link.short_code));
            }

            let mut links = write_txn.open_table(TABLE_LINKS)?;
            let link = Link {
                id: next_id(&links, "link")?,
                user_id: user_id.to_string(),
                long_url: new_link.long_url,
                short_url: new_link.short_url,
                short_code: new_link.short_code,
                custom_alias: new_link.custom_alias,
                created_at: Utc::now(),
                clicks: 0,
                click_events: Vec::new(),
                active: true,
            };
            save(&mut links, &link.id, &link)?;
            codes.insert(link.short_code.as_str(), link.id.as_str())?;

            let mut index = write_txn.open_table(TABLE_USER_LINKS)?;
            index.insert(owner_key(user_id, &link.id).as_str(), link.id.as_str())?;

            bump_stats(&mut users, user_id, &[(STAT_TOTAL_URLS, 1)])?;
            link
        };
        write_txn.commit()?;

        info!(link_id = %link.id, short_code = %link.short_code, "Link created");
        Ok(link)
    }

    fn record_link_click(&self, link_id: &str) -> Result<Option<Link>, StoreError> {
        let write_txn = self.db.begin_write()?;
        let link = {
            let mut links = write_txn.open_table(TABLE_LINKS)?;
            let Some(mut link) = load::<Link, _>(&links, link_id)? else {
                debug!(link_id = %link_id, "Click on unknown link ignored");
                return Ok(None);
            };

            link.clicks += 1;
            link.click_events.push(ClickEvent::at(Utc::now()));
            save(&mut links, &link.id, &link)?;

            let mut users = write_txn.open_table(TABLE_USERS)?;
            bump_stats(&mut users, &link.user_id, &[(STAT_TOTAL_CLICKS, 1)])?;
            link
        };
        write_txn.commit()?;

        debug!(link_id = %link.id, clicks = link.clicks, "Click recorded");
        Ok(Some(link))
    }

    fn get_link(&self, link_id: &str) -> Result<Option<Link>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let links = read_txn.open_table(TABLE_LINKS)?;
        load(&links, link_id)
    }

    fn get_link_by_code(&self, short_code: &str) -> Result<Option<Link>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let codes = read_txn.open_table(TABLE_LINK_CODES)?;
        let Some(link_id) = lookup(&codes, short_code)? else {
            return Ok(None);
        };
        let links = read_txn.open_table(TABLE_LINKS)?;
        load(&links, &link_id)
    }

    fn get_links_by_user(&self, user_id: &str) -> Result<Vec<Link>, StoreError> {
        let read_txn = self.db.begin_read()?;
        links_of(&read_txn, user_id)
    }

    fn deactivate_link(&self, link_id: &str) -> Result<Option<Link>, StoreError> {
        let write_txn = self.db.begin_write()?;
        let link = {
            let mut links = write_txn.open_table(TABLE_LINKS)?;
            let Some(mut link) = load::<Link, _>(&links, link_id)? else {
                return Ok(None);
            };
            link.active = false;
            save(&mut links, &link.id, &link)?;
            link
        };
        write_txn.commit()?;

        info!(link_id = %link.id, "Link deactivated");
        Ok(Some(link))
    }

    fn create_qr_code(&self, user_id: &str, new_qr: NewQrCode) -> Result<QrCode, StoreError> {
        let write_txn = self.db.begin_write()?;
        let qr = {
            let mut users = write_txn.open_table(TABLE_USERS)?;
            if users.get(user_id)?.is_none() {
                return Err(StoreError::NotFound("User".to_string()));
            }

            let mut qr_codes = write_txn.open_table(TABLE_QR_CODES)?;
            let qr = QrCode {
                id: next_id(&qr_codes, "qr")?,
                user_id: user_id.to_string(),
                url: new_qr.url,
                size: new_qr.size,
                format: new_qr.format,
                image_data: new_qr.image_data,
                created_at: Utc::now(),
                downloads: 0,
            };
            save(&mut qr_codes, &qr.id, &qr)?;

            let mut index = write_txn.open_table(TABLE_USER_QR_CODES)?;
            index.insert(owner_key(user_id, &qr.id).as_str(), qr.id.as_str())?;

            bump_stats(&mut users, user_id, &[(STAT_TOTAL_QR_CODES, 1)])?;
            qr
        };
        write_txn.commit()?;

        info!(qr_id = %qr.id, "QR code stored");
        Ok(qr)
    }

    fn get_qr_code(&self, qr_id: &str) -> Result<Option<QrCode>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let qr_codes = read_txn.open_table(TABLE_QR_CODES)?;
        load(&qr_codes, qr_id)
    }

    fn get_qr_codes_by_user(&self, user_id: &str) -> Result<Vec<QrCode>, StoreError> {
        let read_txn = self.db.begin_read()?;
        qr_codes_of(&read_txn, user_id)
    }

    fn record_qr_download(&self, qr_id: &str) -> Result<Option<QrCode>, StoreError> {
        let write_txn = self.db.begin_write()?;
        let qr = {
            let mut qr_codes = write_txn.open_table(TABLE_QR_CODES)?;
            let Some(mut qr) = load::<QrCode, _>(&qr_codes, qr_id)? else {
                return Ok(None);
            };
            qr.downloads += 1;
            save(&mut qr_codes, &qr.id, &qr)?;
            qr
        };
        write_txn.commit()?;
        Ok(Some(qr))
    }

    fn get_user_analytics(
        &self,
        user_id: &str,
        days: u32,
        recent_limit: usize,
    ) -> Result<Analytics, StoreError> {
        // One read transaction so links and QR codes come from the same snapshot
        let read_txn = self.db.begin_read()?;
        let links = links_of(&read_txn, user_id)?;
        let qr_codes = qr_codes_of(&read_txn, user_id)?;

        Ok(analytics::summarize(
            &links,
            &qr_codes,
            days,
            recent_limit,
            Utc::now().date_naive(),
        ))
    }

    fn create_session(&self, user_id: &str) -> Result<Session, StoreError> {
        let write_txn = self.db.begin_write()?;
        let session = {
            let users = write_txn.open_table(TABLE_USERS)?;
            if users.get(user_id)?.is_none() {
                return Err(StoreError::NotFound("User".to_string()));
            }

            let session = Session {
                token: generate_token(),
                user_id: user_id.to_string(),
                created_at: Utc::now(),
            };
            let mut sessions = write_txn.open_table(TABLE_SESSIONS)?;
            save(&mut sessions, &session.token, &session)?;
            session
        };
        write_txn.commit()?;
        Ok(session)
    }

    fn get_session(&self, token: &str) -> Result<Option<Session>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let sessions = read_txn.open_table(TABLE_SESSIONS)?;
        load(&sessions, token)
    }

    fn delete_session(&self, token: &str) -> Result<bool, StoreError> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut sessions = write_txn.open_table(TABLE_SESSIONS)?;
            let removed = sessions.remove(token)?.is_some();
            removed
        };
        write_txn.commit()?;
        Ok(removed)
    }

    fn export_document(&self) -> Result<StoreDocument, StoreError> {
        let read_txn = self.db.begin_read()?;
        Ok(StoreDocument {
            users: load_all(&read_txn.open_table(TABLE_USERS)?)?,
            links: load_all(&read_txn.open_table(TABLE_LINKS)?)?,
            qr_codes: load_all(&read_txn.open_table(TABLE_QR_CODES)?)?,
            analytics: Vec::new(),
        })
    }

    fn import_document(&self, document: &StoreDocument) -> Result<(), StoreError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut users = write_txn.open_table(TABLE_USERS)?;
            let mut emails = write_txn.open_table(TABLE_USER_EMAILS)?;
            // Release the indexed emails of imported users first so they can
            // move between users of the same document
            for user in &document.users {
                if let Some(previous) = load::<User, _>(&users, &user.id)? {
                    emails.remove(previous.email.as_str())?;
                }
            }
            for user in &document.users {
                if let Some(owner) = lookup(&emails, &user.email)? {
                    if owner != user.id {
                        return Err(StoreError::DuplicateEmail);
                    }
                }
                save(&mut users, &user.id, user)?;
                emails.insert(user.email.as_str(), user.id.as_str())?;
            }

            let mut links = write_txn.open_table(TABLE_LINKS)?;
            let mut codes = write_txn.open_table(TABLE_LINK_CODES)?;
            let mut user_links = write_txn.open_table(TABLE_USER_LINKS)?;
            for link in &document.links {
                if let Some(previous) = load::<Link, _>(&links, &link.id)? {
                    codes.remove(previous.short_code.as_str())?;
                    user_links.remove(owner_key(&previous.user_id, &previous.id).as_str())?;
                }
            }
            for link in &document.links {
                if let Some(owner) = lookup(&codes, &link.short_code)? {
                    if owner != link.id {
                        return Err(StoreError::DuplicateCode(link.short_code.clone()));
                    }
                }
                save(&mut links, &link.id, link)?;
                codes.insert(link.short_code.as_str(), link.id.as_str())?;
                user_links.insert(owner_key(&link.user_id, &link.id).as_str(), link.id.as_str())?;
            }

            let mut qr_codes = write_txn.open_table(TABLE_QR_CODES)?;
            let mut user_qr_codes = write_txn.open_table(TABLE_USER_QR_CODES)?;
            for qr in &document.qr_codes {
                if let Some(previous) = load::<QrCode, _>(&qr_codes, &qr.id)? {
                    user_qr_codes.remove(owner_key(&previous.user_id, &previous.id).as_str())?;
                }
                save(&mut qr_codes, &qr.id, qr)?;
                user_qr_codes.insert(owner_key(&qr.user_id, &qr.id).as_str(), qr.id.as_str())?;
            }
        }
        write_txn.commit()?;

        info!(
            users = document.users.len(),
            links = document.links.len(),
            qr_codes = document.qr_codes.len(),
            "Document imported"
        );
        Ok(())
    }
}

//! SQLite-backed document store
//!
//! Documents live as JSON in a `doc` column with the fields needed for
//! queries mirrored into indexed columns. WAL mode keeps concurrent
//! readers cheap; the unread-counter and read-flag mutations run inside
//! explicit transactions so partial application is never observable.

use super::models::*;
use super::traits::{ConversationLinks, DocumentStore};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use uuid::Uuid;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS profiles (
        id TEXT PRIMARY KEY,
        doc TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS needs (
        id TEXT PRIMARY KEY,
        creator_id TEXT NOT NULL,
        status TEXT NOT NULL,
        doc TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_needs_creator ON needs (creator_id)",
    "CREATE INDEX IF NOT EXISTS idx_needs_status ON needs (status)",
    "CREATE TABLE IF NOT EXISTS applications (
        id TEXT PRIMARY KEY,
        executive_id TEXT NOT NULL,
        need_id TEXT NOT NULL,
        status TEXT NOT NULL,
        applied_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_applications_executive ON applications (executive_id)",
    "CREATE INDEX IF NOT EXISTS idx_applications_need ON applications (need_id)",
    "CREATE TABLE IF NOT EXISTS saved_opportunities (
        executive_id TEXT NOT NULL,
        need_id TEXT NOT NULL,
        saved_at TEXT NOT NULL,
        PRIMARY KEY (executive_id, need_id)
    )",
    "CREATE TABLE IF NOT EXISTS shortlisted_executives (
        startup_id TEXT NOT NULL,
        executive_id TEXT NOT NULL,
        shortlisted_at TEXT NOT NULL,
        PRIMARY KEY (startup_id, executive_id)
    )",
    "CREATE TABLE IF NOT EXISTS conversations (
        id TEXT PRIMARY KEY,
        participant_lo TEXT NOT NULL,
        participant_hi TEXT NOT NULL,
        is_support_channel INTEGER NOT NULL,
        startup_id TEXT,
        executive_id TEXT,
        need_id TEXT,
        unread_counts TEXT NOT NULL,
        last_message_text TEXT,
        last_message_at TEXT,
        last_message_sender_id TEXT,
        created_at TEXT NOT NULL,
        UNIQUE (participant_lo, participant_hi, is_support_channel)
    )",
    "CREATE INDEX IF NOT EXISTS idx_conversations_lo ON conversations (participant_lo)",
    "CREATE INDEX IF NOT EXISTS idx_conversations_hi ON conversations (participant_hi)",
    "CREATE TABLE IF NOT EXISTS messages (
        id TEXT PRIMARY KEY,
        conversation_id TEXT NOT NULL,
        sender_id TEXT NOT NULL,
        body TEXT NOT NULL,
        created_at TEXT NOT NULL,
        is_read_by_recipient INTEGER NOT NULL DEFAULT 0,
        is_broadcast INTEGER NOT NULL DEFAULT 0,
        status TEXT NOT NULL DEFAULT 'delivered'
    )",
    "CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages (conversation_id)",
    "CREATE TABLE IF NOT EXISTS broadcasts (
        id TEXT PRIMARY KEY,
        sender_id TEXT NOT NULL,
        body TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        display_name TEXT NOT NULL,
        email TEXT NOT NULL,
        role TEXT,
        avatar_url TEXT,
        created_at TEXT NOT NULL
    )",
];

/// SQLite-backed [`DocumentStore`].
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database file and apply the schema.
    pub async fn new(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent).await.ok();
        }
        let opts =
            SqliteConnectOptions::from_str(&format!("sqlite://{}?mode=rwc", db_path.display()))?
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
                .create_if_missing(true);

        let pool = SqlitePool::connect_with(opts).await?;
        Self::migrate(&pool).await?;
        Ok(Self { pool })
    }

    /// In-memory database for tests. Capped at one connection so every
    /// query sees the same memory-backed database.
    pub async fn new_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::migrate(&pool).await?;
        Ok(Self { pool })
    }

    async fn migrate(pool: &SqlitePool) -> Result<()> {
        for stmt in SCHEMA {
            sqlx::query(stmt)
                .execute(pool)
                .await
                .context("Failed to apply schema statement")?;
        }
        Ok(())
    }
}

// ============================================================================
// Row types and mapping
// ============================================================================

#[derive(sqlx::FromRow)]
struct DocRow {
    doc: String,
}

#[derive(sqlx::FromRow)]
struct ApplicationRow {
    id: String,
    executive_id: String,
    need_id: String,
    status: String,
    applied_at: String,
    updated_at: String,
}

#[derive(sqlx::FromRow)]
struct ConversationRow {
    id: String,
    participant_lo: String,
    participant_hi: String,
    is_support_channel: bool,
    startup_id: Option<String>,
    executive_id: Option<String>,
    need_id: Option<String>,
    unread_counts: String,
    last_message_text: Option<String>,
    last_message_at: Option<String>,
    last_message_sender_id: Option<String>,
    created_at: String,
}

#[derive(sqlx::FromRow)]
struct MessageRow {
    id: String,
    conversation_id: String,
    sender_id: String,
    body: String,
    created_at: String,
    is_read_by_recipient: bool,
    is_broadcast: bool,
    status: String,
}

#[derive(sqlx::FromRow)]
struct BroadcastRow {
    id: String,
    sender_id: String,
    body: String,
    created_at: String,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    display_name: String,
    email: String,
    role: Option<String>,
    avatar_url: Option<String>,
    created_at: String,
}

#[derive(sqlx::FromRow)]
struct SavedRow {
    executive_id: String,
    need_id: String,
    saved_at: String,
}

#[derive(sqlx::FromRow)]
struct ShortlistRow {
    startup_id: String,
    executive_id: String,
    shortlisted_at: String,
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("Invalid timestamp in store: {}", raw))
}

fn parse_uuid(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).with_context(|| format!("Invalid uuid in store: {}", raw))
}

impl TryFrom<ApplicationRow> for Application {
    type Error = anyhow::Error;

    fn try_from(row: ApplicationRow) -> Result<Self> {
        Ok(Application {
            id: row.id,
            executive_id: row.executive_id,
            need_id: parse_uuid(&row.need_id)?,
            status: row
                .status
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))?,
            applied_at: parse_ts(&row.applied_at)?,
            updated_at: parse_ts(&row.updated_at)?,
        })
    }
}

impl TryFrom<ConversationRow> for Conversation {
    type Error = anyhow::Error;

    fn try_from(row: ConversationRow) -> Result<Self> {
        let unread_counts: HashMap<String, u32> = serde_json::from_str(&row.unread_counts)
            .context("Invalid unread_counts JSON in store")?;
        Ok(Conversation {
            id: parse_uuid(&row.id)?,
            participants: [row.participant_lo, row.participant_hi],
            is_support_channel: row.is_support_channel,
            startup_id: row.startup_id,
            executive_id: row.executive_id,
            need_id: row.need_id.as_deref().map(parse_uuid).transpose()?,
            unread_counts,
            last_message_text: row.last_message_text,
            last_message_at: row.last_message_at.as_deref().map(parse_ts).transpose()?,
            last_message_sender_id: row.last_message_sender_id,
            created_at: parse_ts(&row.created_at)?,
        })
    }
}

impl TryFrom<MessageRow> for Message {
    type Error = anyhow::Error;

    fn try_from(row: MessageRow) -> Result<Self> {
        Ok(Message {
            id: parse_uuid(&row.id)?,
            conversation_id: parse_uuid(&row.conversation_id)?,
            sender_id: row.sender_id,
            text: row.body,
            created_at: parse_ts(&row.created_at)?,
            is_read_by_recipient: row.is_read_by_recipient,
            is_broadcast: row.is_broadcast,
            status: row.status,
        })
    }
}

impl TryFrom<BroadcastRow> for Broadcast {
    type Error = anyhow::Error;

    fn try_from(row: BroadcastRow) -> Result<Self> {
        Ok(Broadcast {
            id: parse_uuid(&row.id)?,
            sender_id: row.sender_id,
            text: row.body,
            created_at: parse_ts(&row.created_at)?,
        })
    }
}

impl TryFrom<UserRow> for UserRecord {
    type Error = anyhow::Error;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(UserRecord {
            id: row.id,
            display_name: row.display_name,
            email: row.email,
            role: row
                .role
                .as_deref()
                .map(|r| r.parse().map_err(|e: String| anyhow::anyhow!(e)))
                .transpose()?,
            avatar_url: row.avatar_url,
            created_at: parse_ts(&row.created_at)?,
        })
    }
}

fn collect<R, T>(rows: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = anyhow::Error>,
{
    rows.into_iter().map(T::try_from).collect()
}

// ============================================================================
// DocumentStore implementation
// ============================================================================

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn upsert_profile(&self, profile: &ExecutiveProfile) -> Result<()> {
        let doc = serde_json::to_string(profile)?;
        sqlx::query(
            "INSERT INTO profiles (id, doc, updated_at) VALUES (?, ?, ?)
             ON CONFLICT (id) DO UPDATE SET doc = excluded.doc, updated_at = excluded.updated_at",
        )
        .bind(&profile.id)
        .bind(&doc)
        .bind(profile.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_profile(&self, id: &str) -> Result<Option<ExecutiveProfile>> {
        let row: Option<DocRow> = sqlx::query_as("SELECT doc FROM profiles WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| serde_json::from_str(&r.doc).context("Invalid profile document"))
            .transpose()
    }

    async fn list_profiles(&self) -> Result<Vec<ExecutiveProfile>> {
        let rows: Vec<DocRow> =
            sqlx::query_as("SELECT doc FROM profiles ORDER BY updated_at DESC")
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter()
            .map(|r| serde_json::from_str(&r.doc).context("Invalid profile document"))
            .collect()
    }

    async fn upsert_need(&self, need: &StartupNeed) -> Result<()> {
        let doc = serde_json::to_string(need)?;
        sqlx::query(
            "INSERT INTO needs (id, creator_id, status, doc, updated_at) VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (id) DO UPDATE SET creator_id = excluded.creator_id,
                 status = excluded.status, doc = excluded.doc, updated_at = excluded.updated_at",
        )
        .bind(need.id.to_string())
        .bind(&need.creator_id)
        .bind(need.status.to_string())
        .bind(&doc)
        .bind(need.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_need(&self, id: Uuid) -> Result<Option<StartupNeed>> {
        let row: Option<DocRow> = sqlx::query_as("SELECT doc FROM needs WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| serde_json::from_str(&r.doc).context("Invalid need document"))
            .transpose()
    }

    async fn list_active_needs(&self) -> Result<Vec<StartupNeed>> {
        let rows: Vec<DocRow> = sqlx::query_as(
            "SELECT doc FROM needs WHERE status = 'active' ORDER BY updated_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|r| serde_json::from_str(&r.doc).context("Invalid need document"))
            .collect()
    }

    async fn list_needs_by_creator(&self, creator_id: &str) -> Result<Vec<StartupNeed>> {
        let rows: Vec<DocRow> = sqlx::query_as(
            "SELECT doc FROM needs WHERE creator_id = ? ORDER BY updated_at DESC",
        )
        .bind(creator_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|r| serde_json::from_str(&r.doc).context("Invalid need document"))
            .collect()
    }

    async fn delete_need(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM needs WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_application_if_absent(&self, application: &Application) -> Result<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO applications
                 (id, executive_id, need_id, status, applied_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&application.id)
        .bind(&application.executive_id)
        .bind(application.need_id.to_string())
        .bind(application.status.to_string())
        .bind(application.applied_at.to_rfc3339())
        .bind(application.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn get_application(&self, id: &str) -> Result<Option<Application>> {
        let row: Option<ApplicationRow> =
            sqlx::query_as("SELECT * FROM applications WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(Application::try_from).transpose()
    }

    async fn list_applications_for_executive(
        &self,
        executive_id: &str,
    ) -> Result<Vec<Application>> {
        let rows: Vec<ApplicationRow> = sqlx::query_as(
            "SELECT * FROM applications WHERE executive_id = ? ORDER BY applied_at DESC",
        )
        .bind(executive_id)
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    async fn list_applications_for_need(&self, need_id: Uuid) -> Result<Vec<Application>> {
        let rows: Vec<ApplicationRow> = sqlx::query_as(
            "SELECT * FROM applications WHERE need_id = ? ORDER BY applied_at DESC",
        )
        .bind(need_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    async fn list_all_applications(&self) -> Result<Vec<Application>> {
        let rows: Vec<ApplicationRow> =
            sqlx::query_as("SELECT * FROM applications ORDER BY applied_at DESC")
                .fetch_all(&self.pool)
                .await?;
        collect(rows)
    }

    async fn set_application_status(
        &self,
        id: &str,
        status: ApplicationStatus,
    ) -> Result<Option<Application>> {
        sqlx::query("UPDATE applications SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.to_string())
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await?;
        self.get_application(id).await
    }

    async fn add_saved_opportunity(&self, executive_id: &str, need_id: Uuid) -> Result<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO saved_opportunities (executive_id, need_id, saved_at)
             VALUES (?, ?, ?)",
        )
        .bind(executive_id)
        .bind(need_id.to_string())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_saved_opportunity(&self, executive_id: &str, need_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM saved_opportunities WHERE executive_id = ? AND need_id = ?")
            .bind(executive_id)
            .bind(need_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_saved_opportunities(
        &self,
        executive_id: &str,
    ) -> Result<Vec<SavedOpportunity>> {
        let rows: Vec<SavedRow> = sqlx::query_as(
            "SELECT * FROM saved_opportunities WHERE executive_id = ? ORDER BY saved_at DESC",
        )
        .bind(executive_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|r| {
                Ok(SavedOpportunity {
                    executive_id: r.executive_id,
                    need_id: parse_uuid(&r.need_id)?,
                    saved_at: parse_ts(&r.saved_at)?,
                })
            })
            .collect()
    }

    async fn add_shortlisted_executive(
        &self,
        startup_id: &str,
        executive_id: &str,
    ) -> Result<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO shortlisted_executives (startup_id, executive_id, shortlisted_at)
             VALUES (?, ?, ?)",
        )
        .bind(startup_id)
        .bind(executive_id)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_shortlisted_executive(
        &self,
        startup_id: &str,
        executive_id: &str,
    ) -> Result<()> {
        sqlx::query(
            "DELETE FROM shortlisted_executives WHERE startup_id = ? AND executive_id = ?",
        )
        .bind(startup_id)
        .bind(executive_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_shortlisted_executives(
        &self,
        startup_id: &str,
    ) -> Result<Vec<ShortlistedExecutive>> {
        let rows: Vec<ShortlistRow> = sqlx::query_as(
            "SELECT * FROM shortlisted_executives WHERE startup_id = ? ORDER BY shortlisted_at DESC",
        )
        .bind(startup_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|r| {
                Ok(ShortlistedExecutive {
                    startup_id: r.startup_id,
                    executive_id: r.executive_id,
                    shortlisted_at: parse_ts(&r.shortlisted_at)?,
                })
            })
            .collect()
    }

    async fn list_all_shortlists(&self) -> Result<Vec<ShortlistedExecutive>> {
        let rows: Vec<ShortlistRow> =
            sqlx::query_as("SELECT * FROM shortlisted_executives ORDER BY shortlisted_at DESC")
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter()
            .map(|r| {
                Ok(ShortlistedExecutive {
                    startup_id: r.startup_id,
                    executive_id: r.executive_id,
                    shortlisted_at: parse_ts(&r.shortlisted_at)?,
                })
            })
            .collect()
    }

    async fn find_or_create_conversation(
        &self,
        user_a: &str,
        user_b: &str,
        kind: ChannelKind,
        links: ConversationLinks,
    ) -> Result<Conversation> {
        let (lo, hi) = Conversation::normalize_pair(user_a, user_b);
        let mut unread = HashMap::new();
        unread.insert(lo.clone(), 0u32);
        unread.insert(hi.clone(), 0u32);

        // The unique index on (lo, hi, kind) arbitrates concurrent
        // first-contact: whichever insert lands second is a no-op and the
        // follow-up select returns the surviving document.
        sqlx::query(
            "INSERT OR IGNORE INTO conversations
                 (id, participant_lo, participant_hi, is_support_channel,
                  startup_id, executive_id, need_id, unread_counts, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&lo)
        .bind(&hi)
        .bind(kind.is_support())
        .bind(&links.startup_id)
        .bind(&links.executive_id)
        .bind(links.need_id.map(|id| id.to_string()))
        .bind(serde_json::to_string(&unread)?)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        let row: ConversationRow = sqlx::query_as(
            "SELECT * FROM conversations
             WHERE participant_lo = ? AND participant_hi = ? AND is_support_channel = ?",
        )
        .bind(&lo)
        .bind(&hi)
        .bind(kind.is_support())
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn get_conversation(&self, id: Uuid) -> Result<Option<Conversation>> {
        let row: Option<ConversationRow> =
            sqlx::query_as("SELECT * FROM conversations WHERE id = ?")
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;
        row.map(Conversation::try_from).transpose()
    }

    async fn conversations_for_user(&self, user_id: &str) -> Result<Vec<Conversation>> {
        let rows: Vec<ConversationRow> = sqlx::query_as(
            "SELECT * FROM conversations WHERE participant_lo = ? OR participant_hi = ?",
        )
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    async fn append_message(
        &self,
        conversation_id: Uuid,
        sender_id: &str,
        text: &str,
    ) -> Result<Message> {
        let now = Utc::now();
        let message_id = Uuid::new_v4();
        let mut tx = self.pool.begin().await?;

        let row: Option<ConversationRow> =
            sqlx::query_as("SELECT * FROM conversations WHERE id = ?")
                .bind(conversation_id.to_string())
                .fetch_optional(&mut *tx)
                .await?;
        let conv: Conversation = row
            .context("conversation not found")?
            .try_into()?;
        let recipient = conv
            .other_participant(sender_id)
            .context("sender is not a participant of the conversation")?
            .to_string();

        sqlx::query(
            "INSERT INTO messages
                 (id, conversation_id, sender_id, body, created_at,
                  is_read_by_recipient, is_broadcast, status)
             VALUES (?, ?, ?, ?, ?, 0, 0, 'delivered')",
        )
        .bind(message_id.to_string())
        .bind(conversation_id.to_string())
        .bind(sender_id)
        .bind(text)
        .bind(now.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        let mut unread = conv.unread_counts.clone();
        unread.insert(sender_id.to_string(), 0);
        *unread.entry(recipient).or_insert(0) += 1;

        sqlx::query(
            "UPDATE conversations SET unread_counts = ?, last_message_text = ?,
                 last_message_at = ?, last_message_sender_id = ?
             WHERE id = ?",
        )
        .bind(serde_json::to_string(&unread)?)
        .bind(message_preview(text))
        .bind(now.to_rfc3339())
        .bind(sender_id)
        .bind(conversation_id.to_string())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Message {
            id: message_id,
            conversation_id,
            sender_id: sender_id.to_string(),
            text: text.to_string(),
            created_at: now,
            is_read_by_recipient: false,
            is_broadcast: false,
            status: "delivered".to_string(),
        })
    }

    async fn mark_read(&self, conversation_id: Uuid, user_id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let row: Option<ConversationRow> =
            sqlx::query_as("SELECT * FROM conversations WHERE id = ?")
                .bind(conversation_id.to_string())
                .fetch_optional(&mut *tx)
                .await?;
        let conv: Conversation = row
            .context("conversation not found")?
            .try_into()?;
        if !conv.has_participant(user_id) {
            anyhow::bail!("user is not a participant of the conversation");
        }

        let mut unread = conv.unread_counts.clone();
        unread.insert(user_id.to_string(), 0);

        sqlx::query("UPDATE conversations SET unread_counts = ? WHERE id = ?")
            .bind(serde_json::to_string(&unread)?)
            .bind(conversation_id.to_string())
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "UPDATE messages SET is_read_by_recipient = 1
             WHERE conversation_id = ? AND sender_id != ? AND is_read_by_recipient = 0",
        )
        .bind(conversation_id.to_string())
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<Message>> {
        // rowid breaks created_at ties in insertion order
        let rows: Vec<MessageRow> = sqlx::query_as(
            "SELECT id, conversation_id, sender_id, body, created_at,
                    is_read_by_recipient, is_broadcast, status
             FROM messages WHERE conversation_id = ? ORDER BY created_at ASC, rowid ASC",
        )
        .bind(conversation_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    async fn create_broadcast(&self, broadcast: &Broadcast) -> Result<()> {
        sqlx::query("INSERT INTO broadcasts (id, sender_id, body, created_at) VALUES (?, ?, ?, ?)")
            .bind(broadcast.id.to_string())
            .bind(&broadcast.sender_id)
            .bind(&broadcast.text)
            .bind(broadcast.created_at.to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_broadcasts(&self) -> Result<Vec<Broadcast>> {
        let rows: Vec<BroadcastRow> =
            sqlx::query_as("SELECT * FROM broadcasts ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?;
        collect(rows)
    }

    async fn upsert_user(&self, user: &UserRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO users (id, display_name, email, role, avatar_url, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT (id) DO UPDATE SET display_name = excluded.display_name,
                 email = excluded.email, role = excluded.role,
                 avatar_url = excluded.avatar_url",
        )
        .bind(&user.id)
        .bind(&user.display_name)
        .bind(&user.email)
        .bind(user.role.map(|r| r.to_string()))
        .bind(&user.avatar_url)
        .bind(user.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_user(&self, id: &str) -> Result<Option<UserRecord>> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(UserRecord::try_from).transpose()
    }

    async fn get_users_by_ids(&self, ids: &[String]) -> Result<Vec<UserRecord>> {
        let mut users = Vec::with_capacity(ids.len());
        // IN lookups are capped by the provider; chunk and stitch.
        for chunk in ids.chunks(ID_LOOKUP_BATCH_SIZE) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!("SELECT * FROM users WHERE id IN ({})", placeholders);
            let mut query = sqlx::query_as::<_, UserRow>(&sql);
            for id in chunk {
                query = query.bind(id);
            }
            let rows = query.fetch_all(&self.pool).await?;
            for row in rows {
                users.push(row.try_into()?);
            }
        }
        Ok(users)
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>> {
        let rows: Vec<UserRow> = sqlx::query_as("SELECT * FROM users ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await?;
        collect(rows)
    }

    async fn set_user_role(&self, id: &str, role: Role) -> Result<Option<UserRecord>> {
        sqlx::query("UPDATE users SET role = ? WHERE id = ?")
            .bind(role.to_string())
            .bind(id)
            .execute(&self.pool)
            .await?;
        self.get_user(id).await
    }

    async fn health_check(&self) -> Result<bool> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{test_need, test_profile, test_user};

    async fn store() -> SqliteStore {
        SqliteStore::new_in_memory().await.expect("store init")
    }

    #[tokio::test]
    async fn test_profile_roundtrip_and_listing() {
        let store = store().await;
        let profile = test_profile("exec-1", "Go-to-market strategy");
        store.upsert_profile(&profile).await.unwrap();

        let loaded = store.get_profile("exec-1").await.unwrap().unwrap();
        assert_eq!(loaded.expertise, "Go-to-market strategy");
        assert_eq!(store.list_profiles().await.unwrap().len(), 1);
        assert!(store.get_profile("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_application_conditional_insert() {
        let store = store().await;
        let need_id = Uuid::new_v4();
        let app = Application::new("exec-1", need_id);

        assert!(store.insert_application_if_absent(&app).await.unwrap());
        // Second insert is rejected and leaves applied_at untouched.
        let dup = Application::new("exec-1", need_id);
        assert!(!store.insert_application_if_absent(&dup).await.unwrap());

        let stored = store.get_application(&app.id).await.unwrap().unwrap();
        assert_eq!(stored.applied_at, app.applied_at);
    }

    #[tokio::test]
    async fn test_find_or_create_conversation_is_stable() {
        let store = store().await;
        let first = store
            .find_or_create_conversation(
                "bob",
                "alice",
                ChannelKind::Direct,
                ConversationLinks::default(),
            )
            .await
            .unwrap();
        // Reversed pair, same channel kind → same document.
        let second = store
            .find_or_create_conversation(
                "alice",
                "bob",
                ChannelKind::Direct,
                ConversationLinks::default(),
            )
            .await
            .unwrap();
        assert_eq!(first.id, second.id);

        // A support channel between the same two users is a distinct
        // conversation.
        let support = store
            .find_or_create_conversation(
                "alice",
                "bob",
                ChannelKind::Support,
                ConversationLinks::default(),
            )
            .await
            .unwrap();
        assert_ne!(first.id, support.id);
    }

    #[tokio::test]
    async fn test_append_message_updates_counters_and_summary() {
        let store = store().await;
        let conv = store
            .find_or_create_conversation(
                "alice",
                "bob",
                ChannelKind::Direct,
                ConversationLinks::default(),
            )
            .await
            .unwrap();

        store.append_message(conv.id, "alice", "hi bob").await.unwrap();
        store.append_message(conv.id, "alice", "you there?").await.unwrap();

        let conv = store.get_conversation(conv.id).await.unwrap().unwrap();
        assert_eq!(conv.unread_for("bob"), 2);
        assert_eq!(conv.unread_for("alice"), 0);
        assert_eq!(conv.last_message_text.as_deref(), Some("you there?"));
        assert_eq!(conv.last_message_sender_id.as_deref(), Some("alice"));

        // Reply resets the replier's counter.
        store.append_message(conv.id, "bob", "here").await.unwrap();
        let conv = store.get_conversation(conv.id).await.unwrap().unwrap();
        assert_eq!(conv.unread_for("bob"), 0);
        assert_eq!(conv.unread_for("alice"), 1);
    }

    #[tokio::test]
    async fn test_append_message_rejects_non_participant() {
        let store = store().await;
        let conv = store
            .find_or_create_conversation(
                "alice",
                "bob",
                ChannelKind::Direct,
                ConversationLinks::default(),
            )
            .await
            .unwrap();
        assert!(store.append_message(conv.id, "mallory", "hi").await.is_err());
        // Nothing was persisted.
        assert!(store.list_messages(conv.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mark_read_flips_only_other_senders_messages() {
        let store = store().await;
        let conv = store
            .find_or_create_conversation(
                "alice",
                "bob",
                ChannelKind::Direct,
                ConversationLinks::default(),
            )
            .await
            .unwrap();
        store.append_message(conv.id, "alice", "one").await.unwrap();
        store.append_message(conv.id, "bob", "two").await.unwrap();
        store.append_message(conv.id, "alice", "three").await.unwrap();

        store.mark_read(conv.id, "bob").await.unwrap();

        let conv_after = store.get_conversation(conv.id).await.unwrap().unwrap();
        assert_eq!(conv_after.unread_for("bob"), 0);

        let messages = store.list_messages(conv.id).await.unwrap();
        for msg in &messages {
            if msg.sender_id == "alice" {
                assert!(msg.is_read_by_recipient, "alice's messages read by bob");
            } else {
                assert!(!msg.is_read_by_recipient, "bob's own message untouched");
            }
        }
    }

    #[tokio::test]
    async fn test_messages_ordered_ascending() {
        let store = store().await;
        let conv = store
            .find_or_create_conversation(
                "alice",
                "bob",
                ChannelKind::Direct,
                ConversationLinks::default(),
            )
            .await
            .unwrap();
        for text in ["first", "second", "third"] {
            store.append_message(conv.id, "alice", text).await.unwrap();
        }
        let messages = store.list_messages(conv.id).await.unwrap();
        let texts: Vec<&str> = messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_users_by_ids_chunks_past_batch_cap() {
        let store = store().await;
        let count = ID_LOOKUP_BATCH_SIZE * 2 + 5;
        let mut ids = Vec::new();
        for i in 0..count {
            let user = test_user(&format!("user-{}", i), None);
            store.upsert_user(&user).await.unwrap();
            ids.push(user.id);
        }
        ids.push("unknown-user".to_string());

        let users = store.get_users_by_ids(&ids).await.unwrap();
        assert_eq!(users.len(), count);
    }

    #[tokio::test]
    async fn test_legacy_comma_joined_expertise_normalizes_on_read() {
        let store = store().await;
        let need = test_need(Uuid::new_v4(), "startup-1");

        // Simulate a legacy document shape written before the list migration.
        let mut doc = serde_json::to_value(&need).unwrap();
        doc["required_expertise"] = serde_json::json!("finance, fundraising");
        sqlx::query("INSERT INTO needs (id, creator_id, status, doc, updated_at) VALUES (?, ?, ?, ?, ?)")
            .bind(need.id.to_string())
            .bind(&need.creator_id)
            .bind(need.status.to_string())
            .bind(doc.to_string())
            .bind(need.updated_at.to_rfc3339())
            .execute(&store.pool)
            .await
            .unwrap();

        let loaded = store.get_need(need.id).await.unwrap().unwrap();
        assert_eq!(loaded.required_expertise, vec!["finance", "fundraising"]);
    }
}

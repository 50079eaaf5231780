//! Marketplace document models
//!
//! Canonical in-memory shapes for every document the store manages.
//! Loosely-typed legacy shapes (e.g. `required_expertise` stored as a
//! comma-joined string) are normalized here, at the persistence boundary,
//! so downstream logic only ever sees one representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Maximum length of the conversation-level message preview.
pub const MESSAGE_PREVIEW_LEN: usize = 80;

/// Provider cap on multi-id lookups; larger sets are chunked at this size.
pub const ID_LOOKUP_BATCH_SIZE: usize = 30;

// ============================================================================
// Core Enums
// ============================================================================

/// Platform role, resolved from the identity directory.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Startup,
    Executive,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Startup => write!(f, "startup"),
            Self::Executive => write!(f, "executive"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "startup" => Ok(Self::Startup),
            "executive" => Ok(Self::Executive),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// Engagement model an executive is open to.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    FullTime,
    #[default]
    Fractional,
    Advisory,
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FullTime => write!(f, "full_time"),
            Self::Fractional => write!(f, "fractional"),
            Self::Advisory => write!(f, "advisory"),
        }
    }
}

impl FromStr for Availability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full_time" | "full-time" => Ok(Self::FullTime),
            "fractional" => Ok(Self::Fractional),
            "advisory" => Ok(Self::Advisory),
            _ => Err(format!("Unknown availability: {}", s)),
        }
    }
}

/// Lifecycle status of a role posting. Only Active needs participate
/// in matching.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NeedStatus {
    #[default]
    Active,
    Inactive,
}

impl fmt::Display for NeedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Inactive => write!(f, "inactive"),
        }
    }
}

impl FromStr for NeedStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            _ => Err(format!("Unknown need status: {}", s)),
        }
    }
}

/// Application pipeline status. Forward-only in practice, but any status
/// may be set to any other; no transition rules are enforced.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ApplicationStatus {
    #[default]
    Applied,
    InReview,
    Hired,
    Rejected,
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applied => write!(f, "applied"),
            Self::InReview => write!(f, "in-review"),
            Self::Hired => write!(f, "hired"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "applied" => Ok(Self::Applied),
            "in-review" | "in_review" => Ok(Self::InReview),
            "hired" => Ok(Self::Hired),
            "rejected" => Ok(Self::Rejected),
            _ => Err(format!("Unknown application status: {}", s)),
        }
    }
}

/// Kind of conversation between two participants. The same pair may hold
/// at most one conversation of each kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Direct,
    Support,
}

impl ChannelKind {
    pub fn is_support(&self) -> bool {
        matches!(self, Self::Support)
    }

    pub fn from_support_flag(is_support: bool) -> Self {
        if is_support {
            Self::Support
        } else {
            Self::Direct
        }
    }
}

// ============================================================================
// Profiles and needs
// ============================================================================

/// An executive's profile document. Owned by the executive; mutated only
/// by that executive's save action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutiveProfile {
    pub id: String,
    pub name: String,
    /// Free-text summary of functional expertise.
    pub expertise: String,
    /// Ordered list of industries/skills; order is for display only.
    #[serde(default)]
    pub industry_experience: Vec<String>,
    #[serde(default)]
    pub key_accomplishments: Vec<String>,
    #[serde(default)]
    pub availability: Availability,
    #[serde(default)]
    pub compensation: String,
    #[serde(default)]
    pub location: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A startup's posted fractional-executive role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartupNeed {
    pub id: Uuid,
    pub creator_id: String,
    #[serde(default)]
    pub company_name: String,
    pub role_summary: String,
    #[serde(default)]
    pub key_deliverables: String,
    #[serde(default)]
    pub key_challenges: String,
    /// Tolerates both a JSON array and a legacy comma-joined string on
    /// read; always a list in memory.
    #[serde(default, deserialize_with = "string_or_list")]
    pub required_expertise: Vec<String>,
    #[serde(default)]
    pub budget: String,
    #[serde(default)]
    pub stage: String,
    #[serde(default)]
    pub status: NeedStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Accepts `["a", "b"]` or `"a, b"` and yields a trimmed, non-empty list.
fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<String>),
        Joined(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::List(items) => items
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Raw::Joined(s) => s
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
    })
}

// ============================================================================
// Applications and join records
// ============================================================================

/// An executive's application to a need. The document's existence is the
/// sole source of truth for "has this executive applied to this need".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    /// `{executive_id}_{need_id}`; at most one application per pair.
    pub id: String,
    pub executive_id: String,
    pub need_id: Uuid,
    pub status: ApplicationStatus,
    /// Set once on creation, never mutated afterwards.
    pub applied_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Application {
    /// Natural composite key for an (executive, need) pair.
    pub fn composite_id(executive_id: &str, need_id: Uuid) -> String {
        format!("{}_{}", executive_id, need_id)
    }

    pub fn new(executive_id: &str, need_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Self::composite_id(executive_id, need_id),
            executive_id: executive_id.to_string(),
            need_id,
            status: ApplicationStatus::Applied,
            applied_at: now,
            updated_at: now,
        }
    }
}

/// Existence-as-boolean relation: an executive saved a need for later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedOpportunity {
    pub executive_id: String,
    pub need_id: Uuid,
    pub saved_at: DateTime<Utc>,
}

/// Existence-as-boolean relation: a startup shortlisted an executive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortlistedExecutive {
    pub startup_id: String,
    pub executive_id: String,
    pub shortlisted_at: DateTime<Utc>,
}

// ============================================================================
// Conversations and messages
// ============================================================================

/// A two-participant conversation. Participants are stored normalized
/// (sorted) so the unordered pair plus channel kind forms a unique key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    /// Sorted pair of user ids.
    pub participants: [String; 2],
    pub is_support_channel: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub startup_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executive_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub need_id: Option<Uuid>,
    /// Per-participant count of messages not yet read by that participant.
    pub unread_counts: HashMap<String, u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message_sender_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Normalize an unordered participant pair into its canonical
    /// (sorted) form.
    pub fn normalize_pair(a: &str, b: &str) -> (String, String) {
        if a <= b {
            (a.to_string(), b.to_string())
        } else {
            (b.to_string(), a.to_string())
        }
    }

    /// The participant that is not `user_id`, if `user_id` participates.
    pub fn other_participant(&self, user_id: &str) -> Option<&str> {
        match (&self.participants[0], &self.participants[1]) {
            (a, b) if a == user_id => Some(b),
            (a, b) if b == user_id => Some(a),
            _ => None,
        }
    }

    pub fn has_participant(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p == user_id)
    }

    pub fn unread_for(&self, user_id: &str) -> u32 {
        self.unread_counts.get(user_id).copied().unwrap_or(0)
    }
}

/// A single message, append-only. Never edited or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    /// Mutated only by the recipient's read action, never by the sender.
    pub is_read_by_recipient: bool,
    pub is_broadcast: bool,
    pub status: String,
}

/// A platform-wide announcement. Top-level (not nested in a conversation)
/// and always treated as already read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Broadcast {
    pub id: Uuid,
    pub sender_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Broadcast {
    /// Synthetic conversation id under which this broadcast appears in
    /// inboxes.
    pub fn synthetic_conversation_id(&self) -> String {
        format!("broadcast_{}", self.id)
    }
}

/// Truncate message text to a preview suitable for conversation lists,
/// respecting char boundaries.
pub fn message_preview(text: &str) -> String {
    if text.chars().count() <= MESSAGE_PREVIEW_LEN {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(MESSAGE_PREVIEW_LEN).collect();
        format!("{}…", truncated)
    }
}

// ============================================================================
// Identity directory
// ============================================================================

/// A user as known to the identity directory. `role` is the custom claim
/// resolved server-side; absent for users that never completed onboarding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub display_name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

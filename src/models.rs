use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub id: Uuid,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Persona {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub personality: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewPersona {
    pub name: String,
    pub description: Option<String>,
    pub personality: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PersonaUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub personality: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    Active,
    Paused,
    Ended,
}

impl ConversationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ConversationStatus::Active => "active",
            ConversationStatus::Paused => "paused",
            ConversationStatus::Ended => "ended",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Conversation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub persona_id: Option<Uuid>,
    pub title: String,
    pub scammer_handle: Option<String>,
    pub status: ConversationStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewConversation {
    pub persona_id: Option<Uuid>,
    pub title: String,
    pub scammer_handle: Option<String>,
    pub status: ConversationStatus,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversationUpdate {
    pub title: Option<String>,
    pub status: Option<ConversationStatus>,
    pub persona_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Persona,
    Scammer,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: Uuid,
    pub user_id: Uuid,
    pub conversation_id: Option<Uuid>,
    pub sender: Sender,
    pub content: String,
    pub is_scam: Option<bool>,
    pub scam_type: Option<String>,
    pub confidence: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    pub conversation_id: Option<Uuid>,
    pub sender: Sender,
    pub content: String,
    pub is_scam: Option<bool>,
    pub scam_type: Option<String>,
    pub confidence: Option<f64>,
}

/// The slice of a message the dashboard aggregates over.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DetectionEvent {
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_scam: Option<bool>,
    #[serde(default)]
    pub scam_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntelligenceEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub conversation_id: Option<Uuid>,
    pub entry_type: String,
    pub value: String,
    pub confidence: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewIntelligenceEntry {
    pub conversation_id: Option<Uuid>,
    pub entry_type: String,
    pub value: String,
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SystemLog {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub level: LogLevel,
    pub message: String,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct DashboardStats {
    pub total_messages: i64,
    pub scams_detected: i64,
    pub active_conversations: i64,
    pub intelligence_gathered: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TypeBucket {
    pub scam_type: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DailyBucket {
    pub date: NaiveDate,
    pub count: u64,
}

use std::path::Path;

use anyhow::Context;
use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::db;
use crate::models::{
    ConversationStatus, NewConversation, NewIntelligenceEntry, NewMessage, NewPersona, Sender,
};
use crate::session::Session;
use crate::store::Table;

/// Loads demo data for the caller. Skipped when the caller already has
/// personas; returns whether anything was written.
pub async fn seed(session: &Session<'_>) -> anyhow::Result<bool> {
    let caller = session.require_caller()?;
    if !db::list_personas(session).await?.is_empty() {
        return Ok(false);
    }

    let persona = db::create_persona(
        session,
        &NewPersona {
            name: "Grandma Rose".to_string(),
            description: Some("Retired teacher, trusting, easily confused by tech".to_string()),
            personality: Some("chatty".to_string()),
            is_active: true,
        },
    )
    .await?;

    let conversation = db::create_conversation(
        session,
        &NewConversation {
            persona_id: Some(persona.id),
            title: "Gift card refund".to_string(),
            scammer_handle: Some("+1 555 0142".to_string()),
            status: ConversationStatus::Active,
        },
    )
    .await?;

    let messages = [
        (0, "scammer", "Your account is locked, verify now", Some(true), Some("phishing")),
        (0, "persona", "Oh dear, which account is that?", Some(false), None),
        (1, "scammer", "Buy three gift cards to unlock your refund", Some(true), Some("gift_card")),
        (3, "scammer", "I fell in love with your profile", Some(true), Some("romance")),
        (3, "scammer", "Click this link to confirm", Some(true), Some("phishing")),
        (5, "user", "Is this message legit?", None, None),
    ];

    let now = Utc::now();
    for (days_ago, sender, content, is_scam, scam_type) in messages {
        session
            .store()
            .insert(
                Table::Messages,
                json!({
                    "user_id": caller.to_string(),
                    "conversation_id": conversation.id.to_string(),
                    "sender": sender,
                    "content": content,
                    "is_scam": is_scam,
                    "scam_type": scam_type,
                    "created_at": (now - Duration::days(days_ago)).to_rfc3339(),
                }),
            )
            .await?;
    }

    let leads = [
        ("phone_number", "+1 555 0142"),
        ("url", "http://refund-center.example"),
    ];
    for (entry_type, value) in leads {
        db::create_intelligence_entry(
            session,
            &NewIntelligenceEntry {
                conversation_id: Some(conversation.id),
                entry_type: entry_type.to_string(),
                value: value.to_string(),
                confidence: Some(0.9),
            },
        )
        .await?;
    }

    Ok(true)
}

/// Imports detection messages from a CSV file with the columns
/// `conversation_id,sender,content,is_scam,scam_type,confidence`.
pub async fn import_csv(session: &Session<'_>, csv_path: &Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        conversation_id: Option<Uuid>,
        sender: Sender,
        content: String,
        is_scam: Option<bool>,
        scam_type: Option<String>,
        confidence: Option<f64>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut inserted = 0usize;

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("invalid CSV record {}", line + 1))?;
        db::create_message(
            session,
            &NewMessage {
                conversation_id: row.conversation_id,
                sender: row.sender,
                content: row.content,
                is_scam: row.is_scam,
                scam_type: row.scam_type,
                confidence: row.confidence,
            },
        )
        .await?;
        inserted += 1;
    }

    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard;
    use crate::session::CallerId;
    use crate::store::memory::MemoryStore;
    use std::io::Write;

    #[tokio::test]
    async fn seed_populates_dashboard_once() {
        let store = MemoryStore::new();
        let session = Session::new(&store, Some(CallerId::from(Uuid::new_v4())));

        assert!(seed(&session).await.unwrap());
        assert!(!seed(&session).await.unwrap());

        let stats = dashboard::get_stats(&session).await.unwrap();
        assert_eq!(stats.total_messages, 6);
        assert_eq!(stats.scams_detected, 4);
        assert_eq!(stats.active_conversations, 1);
        assert_eq!(stats.intelligence_gathered, 2);

        let distribution = dashboard::get_scam_type_distribution(&session).await.unwrap();
        assert_eq!(distribution[0].scam_type, "phishing");
        assert_eq!(distribution[0].count, 2);
    }

    #[tokio::test]
    async fn seed_requires_a_caller() {
        let store = MemoryStore::new();
        let session = Session::new(&store, None);
        assert!(seed(&session).await.is_err());
    }

    #[tokio::test]
    async fn csv_rows_become_messages() {
        let store = MemoryStore::new();
        let session = Session::new(&store, Some(CallerId::from(Uuid::new_v4())));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "conversation_id,sender,content,is_scam,scam_type,confidence").unwrap();
        writeln!(file, ",scammer,Send bitcoin now,true,crypto,0.97").unwrap();
        writeln!(file, ",user,See you at lunch,false,,").unwrap();
        file.flush().unwrap();

        let inserted = import_csv(&session, file.path()).await.unwrap();
        assert_eq!(inserted, 2);

        let stats = dashboard::get_stats(&session).await.unwrap();
        assert_eq!(stats.total_messages, 2);
        assert_eq!(stats.scams_detected, 1);
    }
}

//! Dashboard aggregation over a caller's detection events.

use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::error::StoreError;
use crate::models::{DailyBucket, DashboardStats, DetectionEvent, TypeBucket};
use crate::session::{owned_by, Session};
use crate::store::{decode_rows, Filter, Query, Table};

/// Trailing window used when no day count is given.
pub const DEFAULT_DAILY_WINDOW: u32 = 7;

/// Longest trailing window accepted, about a century of days.
pub const MAX_DAILY_WINDOW: u32 = 36_600;

/// Headline counts for the caller. Without a caller this is all zeros and
/// the store is not touched. The four counts run concurrently and the first
/// failure fails the whole call.
pub async fn get_stats(session: &Session<'_>) -> Result<DashboardStats, StoreError> {
    let Some(caller) = session.caller() else {
        return Ok(DashboardStats::default());
    };
    let store = session.store();

    let owned = [owned_by(caller)];
    let scams = [owned_by(caller), Filter::eq("is_scam", true)];
    let active = [owned_by(caller), Filter::eq("status", "active")];

    let (total_messages, scams_detected, active_conversations, intelligence_gathered) =
        tokio::try_join!(
            store.count(Table::Messages, &owned),
            store.count(Table::Messages, &scams),
            store.count(Table::Conversations, &active),
            store.count(Table::Intelligence, &owned),
        )?;

    Ok(DashboardStats {
        total_messages: total_messages.unwrap_or(0),
        scams_detected: scams_detected.unwrap_or(0),
        active_conversations: active_conversations.unwrap_or(0),
        intelligence_gathered: intelligence_gathered.unwrap_or(0),
    })
}

/// Scam-flagged events grouped by label, in order of first appearance.
pub async fn get_scam_type_distribution(
    session: &Session<'_>,
) -> Result<Vec<TypeBucket>, StoreError> {
    let Some(caller) = session.caller() else {
        return Ok(Vec::new());
    };

    let query = Query::new(Table::Messages)
        .filter(owned_by(caller))
        .filter(Filter::eq("is_scam", true))
        .filter(Filter::not_null("scam_type"));
    let events: Vec<DetectionEvent> = decode_rows(session.store().query(&query).await?)?;

    Ok(group_by_type(&events))
}

/// One bucket per UTC calendar day for the trailing `days` days, oldest
/// first and ending today. Windows longer than [`MAX_DAILY_WINDOW`] are
/// rejected with `InvalidInput` before the store is queried.
pub async fn get_daily_detections(
    session: &Session<'_>,
    days: u32,
) -> Result<Vec<DailyBucket>, StoreError> {
    daily_detections_at(session, days, Utc::now()).await
}

async fn daily_detections_at(
    session: &Session<'_>,
    days: u32,
    now: DateTime<Utc>,
) -> Result<Vec<DailyBucket>, StoreError> {
    let Some(caller) = session.caller() else {
        return Ok(Vec::new());
    };
    if days == 0 {
        return Ok(Vec::new());
    }
    if days > MAX_DAILY_WINDOW {
        return Err(StoreError::InvalidInput(format!(
            "daily window of {days} days exceeds the {MAX_DAILY_WINDOW} day limit"
        )));
    }

    let query = Query::new(Table::Messages)
        .filter(owned_by(caller))
        .filter(Filter::eq("is_scam", true))
        .filter(Filter::gte("created_at", cutoff(now, days)?));
    let events: Vec<DetectionEvent> = decode_rows(session.store().query(&query).await?)?;

    bucket_daily(&events, now.date_naive(), days)
}

pub fn cutoff(now: DateTime<Utc>, days: u32) -> Result<DateTime<Utc>, StoreError> {
    now.checked_sub_signed(Duration::days(i64::from(days)))
        .ok_or_else(|| out_of_range(days))
}

fn out_of_range(days: u32) -> StoreError {
    StoreError::InvalidInput(format!(
        "daily window of {days} days reaches past the supported date range"
    ))
}

pub fn group_by_type(events: &[DetectionEvent]) -> Vec<TypeBucket> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut buckets: Vec<TypeBucket> = Vec::new();

    for scam_type in events.iter().filter_map(|e| e.scam_type.as_deref()) {
        match index.get(scam_type) {
            Some(&slot) => buckets[slot].count += 1,
            None => {
                index.insert(scam_type, buckets.len());
                buckets.push(TypeBucket {
                    scam_type: scam_type.to_string(),
                    count: 1,
                });
            }
        }
    }

    buckets
}

/// Zero-filled per-day counts for `today - (days - 1) ..= today`. Events
/// outside that range are ignored.
pub fn bucket_daily(
    events: &[DetectionEvent],
    today: NaiveDate,
    days: u32,
) -> Result<Vec<DailyBucket>, StoreError> {
    let mut counts: HashMap<NaiveDate, u64> = HashMap::new();
    for event in events {
        *counts.entry(event.created_at.date_naive()).or_insert(0) += 1;
    }

    (0..i64::from(days))
        .rev()
        .map(|offset| {
            let date = today
                .checked_sub_signed(Duration::days(offset))
                .ok_or_else(|| out_of_range(days))?;
            Ok(DailyBucket {
                date,
                count: counts.get(&date).copied().unwrap_or(0),
            })
        })
        .collect()
}

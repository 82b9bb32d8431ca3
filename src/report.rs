use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::{DailyBucket, DashboardStats, TypeBucket};

pub fn build_dashboard_report(
    stats: &DashboardStats,
    distribution: &[TypeBucket],
    daily: &[DailyBucket],
    generated_on: NaiveDate,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Scam Watch Dashboard");
    let _ = writeln!(output, "Generated on {}", generated_on);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Overview");
    let _ = writeln!(output, "- Messages analysed: {}", stats.total_messages);
    let _ = writeln!(output, "- Scams detected: {}", stats.scams_detected);
    let _ = writeln!(
        output,
        "- Active conversations: {}",
        stats.active_conversations
    );
    let _ = writeln!(
        output,
        "- Intelligence gathered: {}",
        stats.intelligence_gathered
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Scam Types");

    if distribution.is_empty() {
        let _ = writeln!(output, "No scam types recorded.");
    } else {
        let total: u64 = distribution.iter().map(|b| b.count).sum();
        for bucket in distribution {
            let share = bucket.count as f64 * 100.0 / total as f64;
            let _ = writeln!(
                output,
                "- {}: {} ({:.1}%)",
                bucket.scam_type, bucket.count, share
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Daily Detections");

    if daily.is_empty() {
        let _ = writeln!(output, "No days requested.");
    } else {
        for bucket in daily {
            let _ = writeln!(output, "- {}: {}", bucket.date, bucket.count);
        }
    }

    output
}

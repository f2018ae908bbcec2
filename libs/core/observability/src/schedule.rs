//! Counters for schedule mutations and CSV transfers.

use metrics::{counter, histogram};
use std::time::Duration;

/// Entity kinds used as the `entity` label
pub const EVENT: &str = "event";
pub const LOCATION: &str = "location";
pub const TAG: &str = "tag";

pub struct ScheduleMetrics;

impl ScheduleMetrics {
    /// One merge of `entity`; `created` picks the `outcome` label.
    pub fn record_merge(entity: &'static str, created: bool) {
        let outcome = if created { "created" } else { "updated" };
        counter!("schedule_merges_total", "entity" => entity, "outcome" => outcome).increment(1);
    }

    pub fn record_delete(entity: &'static str) {
        counter!("schedule_deletes_total", "entity" => entity).increment(1);
    }

    pub fn record_import(created: u64, updated: u64, skipped: u64, elapsed: Duration) {
        counter!("schedule_import_rows_total", "outcome" => "created").increment(created);
        counter!("schedule_import_rows_total", "outcome" => "updated").increment(updated);
        counter!("schedule_import_rows_total", "outcome" => "skipped").increment(skipped);
        histogram!("schedule_import_duration_seconds").record(elapsed.as_secs_f64());

        tracing::debug!(
            created,
            updated,
            skipped,
            duration_ms = elapsed.as_millis() as u64,
            "Recorded import metrics"
        );
    }

    pub fn record_export(rows: usize) {
        counter!("schedule_exports_total").increment(1);
        tracing::debug!(rows, "Recorded export metrics");
    }
}

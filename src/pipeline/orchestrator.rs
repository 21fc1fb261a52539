use chrono::NaiveDateTime;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument};

use super::columns::ColumnDetector;
use super::interval::{compute_interval, IntervalResult};
use super::preview::Preview;
use super::resolver::RedirectResolver;
use crate::app::ports::HttpClientPort;
use crate::config::Config;
use crate::constants::{
    AFTER_TIMESTAMP_COLUMN, BEFORE_TIMESTAMP_COLUMN, INTERVAL_LABEL_COLUMN, RAW_MINUTES_COLUMN,
};
use crate::error::{AppError, Result};
use crate::observability::metrics;
use crate::types::{Cell, DetectedColumns, Table};

pub const DETECTION_FAILURE_MESSAGE: &str =
    "Не найдены два столбца со ссылками на фото (столбцы 'Фото ДО' и 'Фото ПОСЛЕ').";

/// Counters describing one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineSummary {
    pub rows: usize,
    pub intervals: usize,
    pub incomplete: usize,
    pub inverted: usize,
    pub fetches: u64,
    pub cache_hits: u64,
}

/// Everything a run produces
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Input columns plus the four derived ones, in input row order
    pub table: Table,
    pub columns: DetectedColumns,
    pub preview: Preview,
    /// Raw minute counts per row, `None` where no interval could be computed
    pub raw_minutes: Vec<Option<i64>>,
    pub summary: PipelineSummary,
}

impl PipelineOutput {
    /// The table as exported to a file: the raw-minutes helper column is dropped
    pub fn export_table(&self) -> Table {
        self.table.without_column(RAW_MINUTES_COLUMN)
    }
}

struct RowResult {
    before: Option<NaiveDateTime>,
    after: Option<NaiveDateTime>,
    interval: IntervalResult,
}

pub struct PipelineOrchestrator {
    http: Arc<dyn HttpClientPort>,
    detector: ColumnDetector,
    preview_rows: usize,
}

impl PipelineOrchestrator {
    pub fn new(http: Arc<dyn HttpClientPort>, config: &Config) -> Self {
        Self {
            http,
            detector: ColumnDetector::new(&config.columns),
            preview_rows: config.preview.max_rows,
        }
    }

    /// Process a table with a fresh resolution cache
    pub async fn run(&self, table: &Table) -> Result<PipelineOutput> {
        let mut resolver = RedirectResolver::new(self.http.clone());
        self.run_with_resolver(table, &mut resolver).await
    }

    /// Process a table using a caller-owned resolver (and its cache)
    #[instrument(skip_all, fields(rows = table.len()))]
    pub async fn run_with_resolver(
        &self,
        table: &Table,
        resolver: &mut RedirectResolver,
    ) -> Result<PipelineOutput> {
        metrics::pipeline::run_started();
        let started = Instant::now();

        let Some(columns) = self.detector.detect(table) else {
            error!("Photo columns not found");
            metrics::pipeline::detection_failed();
            return Err(AppError::Detection(DETECTION_FAILURE_MESSAGE.to_string()));
        };
        info!(before = %columns.before.name, after = %columns.after.name, "Detected photo columns");

        let fetches_before = resolver.fetches();
        let hits_before = resolver.cache().hits();

        let mut results = Vec::with_capacity(table.len());
        for row in table.rows() {
            let before = resolver.resolve(&row[columns.before.index]).await;
            let after = resolver.resolve(&row[columns.after.index]).await;
            let interval = compute_interval(before, after);
            if interval.is_inverted() {
                metrics::pipeline::interval_inversion();
            }
            results.push(RowResult { before, after, interval });
        }

        let summary = PipelineSummary {
            rows: results.len(),
            intervals: results.iter().filter(|r| r.interval.minutes.is_some()).count(),
            incomplete: results.iter().filter(|r| r.before.is_none() || r.after.is_none()).count(),
            inverted: results.iter().filter(|r| r.interval.is_inverted()).count(),
            fetches: resolver.fetches() - fetches_before,
            cache_hits: resolver.cache().hits() - hits_before,
        };
        let raw_minutes: Vec<Option<i64>> = results.iter().map(|r| r.interval.minutes).collect();

        let mut augmented = table.clone();
        augmented.set_column(
            BEFORE_TIMESTAMP_COLUMN,
            results.iter().map(|r| Cell::from_timestamp(r.before)).collect(),
        );
        augmented.set_column(
            AFTER_TIMESTAMP_COLUMN,
            results.iter().map(|r| Cell::from_timestamp(r.after)).collect(),
        );
        augmented.set_column(
            INTERVAL_LABEL_COLUMN,
            results.iter().map(|r| Cell::Text(r.interval.label.clone())).collect(),
        );
        augmented.set_column(
            RAW_MINUTES_COLUMN,
            raw_minutes.iter().map(|m| m.map(Cell::Int).unwrap_or(Cell::Empty)).collect(),
        );

        let preview = self.build_preview(&augmented, &columns);

        metrics::pipeline::rows_processed(summary.rows);
        metrics::pipeline::duration(started.elapsed().as_secs_f64());
        info!(
            rows = summary.rows,
            intervals = summary.intervals,
            incomplete = summary.incomplete,
            inverted = summary.inverted,
            fetches = summary.fetches,
            cache_hits = summary.cache_hits,
            "Pipeline finished"
        );

        Ok(PipelineOutput { table: augmented, columns, preview, raw_minutes, summary })
    }

    /// First rows of the photo columns and the derived display columns,
    /// timestamps formatted and empty when unresolved
    fn build_preview(&self, table: &Table, columns: &DetectedColumns) -> Preview {
        let mut indices = vec![columns.before.index, columns.after.index];
        indices.extend(
            [BEFORE_TIMESTAMP_COLUMN, AFTER_TIMESTAMP_COLUMN, INTERVAL_LABEL_COLUMN]
                .iter()
                .filter_map(|name| table.column_index(name)),
        );

        let headers = indices.iter().map(|&i| table.headers()[i].clone()).collect();
        let rows = table
            .rows()
            .iter()
            .take(self.preview_rows)
            .map(|row| indices.iter().map(|&i| row[i].to_string()).collect())
            .collect();
        Preview { headers, rows }
    }
}

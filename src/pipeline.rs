//! Ingestion orchestration: fetch -> normalize -> analyze -> persist.
//!
//! Each entity and each source runs in isolation. A failed fetch or a
//! malformed table short-circuits that unit only; the batch always produces
//! one report per unit in the caller's order, never a single aggregate
//! pass/fail flag.

use chrono::{NaiveDate, Utc};
use tracing::{debug, error, warn};

use crate::constants::{MACRO_LOOKBACK_DAYS, MARKET_LOOKBACK_DAYS, VIX_SYMBOL};
use crate::error::{AppError, Result};
use crate::models::{
    indicators, DerivedRecord, EntityOutcome, EntityReport, PricePoint, PriceSeries,
    RawObservation, SourceOutcome, SourceReport, TrendState,
};
use crate::services::normalize;
use crate::services::{
    MacroSource, MarketDataSource, MarketStore, NarrativeSummarizer, SheetSource, TableSpec,
    SENTIMENT_TABLE, VIX_TABLE,
};

/// Sheet columns expected by the sentiment table, in persistence order,
/// with their percentage flag. Header names are compared after
/// canonicalization.
const SENTIMENT_SOURCE_COLUMNS: &[(&str, bool)] = &[
    ("bullish", true),
    ("neutral", true),
    ("bearish", true),
    ("bull_bear_spread", false),
    ("s&p500_weekly_close", false),
];

const SENTIMENT_DATE_COLUMN: &str = "reported_date";
const SENTIMENT_DATE_FORMAT: &str = "%m-%d-%y";

/// Build a price series from raw observations, dropping rows without a
/// usable close. Sorting and date dedup happen in the series constructor.
pub fn build_series(entity: &str, observations: &[RawObservation]) -> PriceSeries {
    let mut points = Vec::with_capacity(observations.len());
    for observation in observations {
        let close = observation
            .field("close")
            .and_then(|v| normalize::parse_value(v, false));
        let Some(close) = close else {
            debug!("{}: no close for {}, dropping row", entity, observation.date);
            continue;
        };
        let open = observation
            .field("open")
            .and_then(|v| normalize::parse_value(v, false));
        points.push(PricePoint {
            date: observation.date,
            open,
            close,
        });
    }
    PriceSeries::new(entity, points)
}

/// Analyze every entity in caller order. One bad entity never aborts the
/// batch; the result has exactly one entry per input entity.
pub async fn analyze_market<M: MarketDataSource>(
    source: &M,
    entities: &[String],
) -> Vec<EntityReport> {
    let mut reports = Vec::with_capacity(entities.len());
    for entity in entities {
        let outcome = analyze_entity(source, entity).await;
        if let EntityOutcome::Failed(reason) = &outcome {
            error!("{}: analysis failed: {}", entity, reason);
        }
        reports.push(EntityReport {
            entity: entity.clone(),
            outcome,
        });
    }
    reports
}

async fn analyze_entity<M: MarketDataSource>(source: &M, entity: &str) -> EntityOutcome {
    let observations = match source.fetch_history(entity, MARKET_LOOKBACK_DAYS).await {
        Ok(observations) => observations,
        Err(e) => return EntityOutcome::Failed(e.to_string()),
    };
    if observations.is_empty() {
        return EntityOutcome::Skipped("no history returned".into());
    }

    let series = build_series(entity, &observations);
    if series.is_empty() {
        return EntityOutcome::Skipped("no usable closing prices".into());
    }

    EntityOutcome::Analyzed(indicators::analyze(&series))
}

/// One sentence per entity with a classified trend; unknowns are omitted.
pub fn format_trend_summary(reports: &[EntityReport]) -> String {
    let mut sentences = Vec::new();
    for report in reports {
        if let EntityOutcome::Analyzed(snapshot) = &report.outcome {
            let sentence = match snapshot.trend {
                TrendState::Rising => format!("{} is trending higher.", report.entity),
                TrendState::Falling => format!("{} is trending lower.", report.entity),
                TrendState::Neutral => {
                    format!("{} shows no significant movement.", report.entity)
                }
                TrendState::Unknown => continue,
            };
            sentences.push(sentence);
        }
    }
    if sentences.is_empty() {
        "The market is currently showing no significant movements.".to_string()
    } else {
        sentences.join(" ")
    }
}

pub fn build_overview_prompt(trend_summary: &str) -> String {
    format!(
        "Based on the following current market data and detected trends:\n\n\
         {}\n\n\
         Write a short, concise analysis (at most 3-4 sentences) of the global \
         market picture. Summarize the broad trends without naming individual \
         indices or values, highlight only the most important cross-market \
         moves, offer one deeper insight that may not be obvious to retail \
         investors, and give a brief outlook where possible.",
        trend_summary
    )
}

/// Orchestrates the per-source runs against one store handle. The store is
/// acquired and released by the caller, exactly once per run.
pub struct IngestionPipeline<'a> {
    store: &'a MarketStore,
}

impl<'a> IngestionPipeline<'a> {
    pub fn new(store: &'a MarketStore) -> Self {
        Self { store }
    }

    /// Fetch, analyze, summarize, and append the market overview. Entity
    /// reports are returned even when the summarizer or the store fails.
    pub async fn run_market_overview<M, N>(
        &self,
        source: &M,
        summarizer: &N,
        entities: &[String],
    ) -> SourceReport
    where
        M: MarketDataSource,
        N: NarrativeSummarizer,
    {
        let entity_reports = analyze_market(source, entities).await;
        let prompt = build_overview_prompt(&format_trend_summary(&entity_reports));

        let narrative = match summarizer.summarize(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                return SourceReport {
                    source: "market_overview",
                    outcome: SourceOutcome::Failed(format!("summarizer: {}", e)),
                    entities: entity_reports,
                }
            }
        };

        let outcome = match self.store.append_overview(&narrative).await {
            Ok(()) => SourceOutcome::Succeeded {
                written: 1,
                failed: 0,
            },
            Err(e) => SourceOutcome::Failed(format!("store: {}", e)),
        };
        SourceReport {
            source: "market_overview",
            outcome,
            entities: entity_reports,
        }
    }

    /// Fetch the sentiment sheet, map its header, and upsert one record per
    /// reporting date.
    pub async fn run_sentiment<S: SheetSource>(&self, sheet: &S) -> SourceReport {
        let name = SENTIMENT_TABLE.name;
        let rows = match sheet.fetch_rows().await {
            Ok(rows) => rows,
            Err(e) => return SourceReport::failed(name, e.to_string()),
        };
        if rows.is_empty() {
            return SourceReport::skipped(name, "no rows returned");
        }

        let records = match parse_sentiment_rows(&rows) {
            Ok(records) => records,
            Err(e) => return SourceReport::failed(name, e.to_string()),
        };
        if records.is_empty() {
            return SourceReport::skipped(name, "no parsable data rows");
        }

        self.apply_records(&SENTIMENT_TABLE, &records).await
    }

    /// Fetch a macro series over the two-year lookback window and upsert
    /// every observation that carries a value.
    pub async fn run_macro_series<F: MacroSource>(
        &self,
        source: &F,
        series_id: &str,
        spec: &TableSpec,
    ) -> SourceReport {
        let end = Utc::now().date_naive();
        let start = end - chrono::Duration::days(MACRO_LOOKBACK_DAYS);

        let observations = match source.fetch_observations(series_id, start, end).await {
            Ok(observations) => observations,
            Err(e) => return SourceReport::failed(spec.name, e.to_string()),
        };
        if observations.is_empty() {
            return SourceReport::skipped(spec.name, "no observations returned");
        }

        let mut records = Vec::with_capacity(observations.len());
        let mut missing = 0usize;
        for observation in &observations {
            match normalize::parse_numeric(&observation.value, false) {
                Some(value) => {
                    records.push(DerivedRecord::new(observation.date, vec![Some(value)]))
                }
                None => missing += 1,
            }
        }
        if missing > 0 {
            warn!("{}: {} observations had no usable value", series_id, missing);
        }
        if records.is_empty() {
            return SourceReport::skipped(spec.name, "all observations missing");
        }

        self.apply_records(spec, &records).await
    }

    /// Upsert the latest volatility index close, keyed by the quote's own
    /// date.
    pub async fn run_vix<M: MarketDataSource>(&self, source: &M) -> SourceReport {
        let name = VIX_TABLE.name;
        let quote = match source.fetch_latest_quote(VIX_SYMBOL).await {
            Ok(quote) => quote,
            Err(e) => return SourceReport::failed(name, e.to_string()),
        };
        let Some(observation) = quote else {
            return SourceReport::skipped(name, "no quote returned");
        };

        let close = observation
            .field("close")
            .and_then(|v| normalize::parse_value(v, false));
        let Some(close) = close else {
            return SourceReport::skipped(name, "latest quote has no close");
        };

        let record = DerivedRecord::new(observation.date, vec![Some(close)]);
        self.apply_records(&VIX_TABLE, &[record]).await
    }

    async fn apply_records(&self, spec: &TableSpec, records: &[DerivedRecord]) -> SourceReport {
        match self.store.upsert(spec, records).await {
            Ok(report) => {
                for (date, reason) in &report.failures {
                    warn!("{}: row for {} not written: {}", spec.name, date, reason);
                }
                SourceReport {
                    source: spec.name,
                    outcome: SourceOutcome::Succeeded {
                        written: report.written,
                        failed: report.failures.len(),
                    },
                    entities: Vec::new(),
                }
            }
            Err(e) => SourceReport::failed(spec.name, e.to_string()),
        }
    }
}

/// Map the header row and convert data rows into sentiment records, sorted
/// by reporting date. A missing expected column is a schema mismatch for
/// the whole table, distinct from "no rows".
pub fn parse_sentiment_rows(rows: &[Vec<String>]) -> Result<Vec<DerivedRecord>> {
    let Some(header_row) = rows.first() else {
        return Ok(Vec::new());
    };
    let header: Vec<String> = header_row
        .iter()
        .map(|cell| normalize::normalize_header(cell))
        .collect();

    let column_index = |name: &str| -> Result<usize> {
        header
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| AppError::Schema(format!("column '{}' not found in sheet header", name)))
    };

    let date_index = column_index(SENTIMENT_DATE_COLUMN)?;
    let mut value_indexes = Vec::with_capacity(SENTIMENT_SOURCE_COLUMNS.len());
    for (name, is_percentage) in SENTIMENT_SOURCE_COLUMNS {
        value_indexes.push((column_index(name)?, *is_percentage));
    }

    let mut records = Vec::with_capacity(rows.len() - 1);
    for (row_number, row) in rows.iter().enumerate().skip(1) {
        let raw_date = row.get(date_index).map(String::as_str).unwrap_or_default();
        let Ok(date) = NaiveDate::parse_from_str(raw_date.trim(), SENTIMENT_DATE_FORMAT) else {
            warn!(
                "sentiment row {}: unparsable date '{}', skipping row",
                row_number, raw_date
            );
            continue;
        };

        let values = value_indexes
            .iter()
            .map(|&(index, is_percentage)| {
                let cell = row.get(index).map(String::as_str).unwrap_or_default();
                normalize::parse_numeric(cell, is_percentage)
            })
            .collect();
        records.push(DerivedRecord::new(date, values));
    }

    records.sort_by_key(|record| record.date);
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MovingAverageSet;
    use crate::services::MacroObservation;
    use serde_json::{json, Value};
    use std::collections::{HashMap, HashSet};
    use tempfile::tempdir;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn quote(entity: &str, day: u32, open: Option<f64>, close: Option<f64>) -> RawObservation {
        RawObservation::new(entity, date(day))
            .with_field("open", open.map(|v| json!(v)).unwrap_or(Value::Null))
            .with_field("close", close.map(|v| json!(v)).unwrap_or(Value::Null))
    }

    #[derive(Default)]
    struct MockMarket {
        histories: HashMap<String, Vec<RawObservation>>,
        failing: HashSet<String>,
    }

    impl MarketDataSource for MockMarket {
        async fn fetch_history(
            &self,
            entity: &str,
            _lookback_days: u32,
        ) -> Result<Vec<RawObservation>> {
            if self.failing.contains(entity) {
                return Err(AppError::Network(format!("{} unreachable", entity)));
            }
            Ok(self.histories.get(entity).cloned().unwrap_or_default())
        }

        async fn fetch_latest_quote(&self, entity: &str) -> Result<Option<RawObservation>> {
            if self.failing.contains(entity) {
                return Err(AppError::Network(format!("{} unreachable", entity)));
            }
            Ok(self
                .histories
                .get(entity)
                .and_then(|observations| observations.last().cloned()))
        }
    }

    struct MockSummarizer {
        response: Result<String>,
    }

    impl NarrativeSummarizer for MockSummarizer {
        async fn summarize(&self, _prompt: &str) -> Result<String> {
            match &self.response {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(AppError::Network(e.to_string())),
            }
        }
    }

    struct MockSheet {
        rows: Result<Vec<Vec<String>>>,
    }

    impl SheetSource for MockSheet {
        async fn fetch_rows(&self) -> Result<Vec<Vec<String>>> {
            match &self.rows {
                Ok(rows) => Ok(rows.clone()),
                Err(e) => Err(AppError::Network(e.to_string())),
            }
        }
    }

    struct MockMacro {
        observations: Vec<MacroObservation>,
    }

    impl MacroSource for MockMacro {
        async fn fetch_observations(
            &self,
            _series_id: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<Vec<MacroObservation>> {
            Ok(self.observations.clone())
        }
    }

    fn rising_history(entity: &str) -> Vec<RawObservation> {
        (1..=25)
            .map(|day| quote(entity, day, Some(day as f64), Some(day as f64 + 0.5)))
            .collect()
    }

    #[tokio::test]
    async fn one_failing_entity_does_not_abort_the_batch() {
        let mut source = MockMarket::default();
        source
            .histories
            .insert("^GSPC".into(), rising_history("^GSPC"));
        source.histories.insert("^DJI".into(), rising_history("^DJI"));
        source.failing.insert("^IXIC".into());

        let entities: Vec<String> =
            vec!["^GSPC".into(), "^IXIC".into(), "^DJI".into()];
        let reports = analyze_market(&source, &entities).await;

        assert_eq!(reports.len(), 3);
        // Order preserved, exactly one failure
        assert_eq!(reports[1].entity, "^IXIC");
        assert!(matches!(reports[1].outcome, EntityOutcome::Failed(_)));
        assert!(matches!(reports[0].outcome, EntityOutcome::Analyzed(_)));
        assert!(matches!(reports[2].outcome, EntityOutcome::Analyzed(_)));
    }

    #[tokio::test]
    async fn empty_history_is_skipped_not_failed() {
        let mut source = MockMarket::default();
        source.histories.insert("GC=F".into(), Vec::new());
        let reports = analyze_market(&source, &["GC=F".to_string()]).await;
        assert!(matches!(reports[0].outcome, EntityOutcome::Skipped(_)));
    }

    #[test]
    fn series_drops_rows_without_close() {
        let observations = vec![
            quote("X", 1, Some(10.0), Some(11.0)),
            quote("X", 2, Some(10.0), None),
            quote("X", 3, None, Some(12.0)),
        ];
        let series = build_series("X", &observations);
        assert_eq!(series.len(), 2);
        assert_eq!(series.latest().unwrap().close, 12.0);
        assert_eq!(series.latest().unwrap().open, None);
    }

    #[tokio::test]
    async fn six_point_history_reports_unknown_trend() {
        let closes = [10.0, 10.0, 10.0, 10.0, 10.0, 12.0];
        let observations: Vec<RawObservation> = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| quote("^GSPC", i as u32 + 1, Some(close), Some(close)))
            .collect();
        let mut source = MockMarket::default();
        source.histories.insert("^GSPC".into(), observations);

        let reports = analyze_market(&source, &["^GSPC".to_string()]).await;
        let EntityOutcome::Analyzed(snapshot) = &reports[0].outcome else {
            panic!("expected analysis");
        };
        assert_eq!(
            snapshot.averages,
            MovingAverageSet {
                ma5: Some(10.4),
                ma20: None,
                ma50: None
            }
        );
        assert_eq!(snapshot.trend, TrendState::Unknown);
    }

    #[test]
    fn trend_summary_falls_back_to_default_text() {
        assert_eq!(
            format_trend_summary(&[]),
            "The market is currently showing no significant movements."
        );
    }

    fn sentiment_rows() -> Vec<Vec<String>> {
        vec![
            vec![
                "Reported Date".into(),
                "Bullish".into(),
                "Neutral".into(),
                "Bearish".into(),
                "Bull Bear Spread".into(),
                "S&P500 Weekly Close".into(),
            ],
            vec![
                "01-11-24".into(),
                "48,6%".into(),
                "27,2%".into(),
                "24,2%".into(),
                "24,4".into(),
                "4.783,45".into(),
            ],
            vec![
                "01-04-24".into(),
                "46,3%".into(),
                "28,6%".into(),
                "25,1%".into(),
                "#N/A".into(),
                "4.697,24".into(),
            ],
        ]
    }

    #[test]
    fn sentiment_rows_parse_and_sort_by_date() {
        let records = parse_sentiment_rows(&sentiment_rows()).unwrap();
        assert_eq!(records.len(), 2);
        // Sorted ascending even though the sheet is newest-first
        assert_eq!(records[0].date, date(4));
        let bullish = records[0].values[0].unwrap();
        assert!((bullish - 0.463).abs() < 1e-9);
        assert_eq!(records[0].values[3], None);
        assert_eq!(records[0].values[4], Some(4697.24));
        assert_eq!(records[1].date, date(11));
    }

    #[test]
    fn missing_date_column_is_a_schema_mismatch() {
        let rows = vec![vec!["Bullish".to_string()], vec!["48,6%".to_string()]];
        let err = parse_sentiment_rows(&rows).unwrap_err();
        assert!(matches!(err, AppError::Schema(_)));
    }

    #[test]
    fn unparsable_dates_skip_the_row_only() {
        let mut rows = sentiment_rows();
        rows[1][0] = "not a date".into();
        let records = parse_sentiment_rows(&rows).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date, date(4));
    }

    #[tokio::test]
    async fn sentiment_run_persists_latest_values() {
        let dir = tempdir().unwrap();
        let store = MarketStore::connect(&dir.path().join("test.db")).await.unwrap();
        let pipeline = IngestionPipeline::new(&store);

        let report = pipeline
            .run_sentiment(&MockSheet {
                rows: Ok(sentiment_rows()),
            })
            .await;
        assert!(matches!(
            report.outcome,
            SourceOutcome::Succeeded { written: 2, failed: 0 }
        ));
        assert_eq!(store.row_count("aaii_sentiment_data").await.unwrap(), 2);
        store.close().await;
    }

    #[tokio::test]
    async fn macro_run_skips_missing_observations() {
        let dir = tempdir().unwrap();
        let store = MarketStore::connect(&dir.path().join("test.db")).await.unwrap();
        let pipeline = IngestionPipeline::new(&store);

        let source = MockMacro {
            observations: vec![
                MacroObservation {
                    date: date(1),
                    value: "3.9".into(),
                },
                MacroObservation {
                    date: date(2),
                    value: ".".into(),
                },
            ],
        };
        let report = pipeline
            .run_macro_series(&source, "UNRATE", &crate::services::UNEMPLOYMENT_TABLE)
            .await;
        assert!(matches!(
            report.outcome,
            SourceOutcome::Succeeded { written: 1, failed: 0 }
        ));
        assert_eq!(store.row_count("unemployment_data").await.unwrap(), 1);
        store.close().await;
    }

    #[tokio::test]
    async fn vix_reruns_leave_one_row_per_date() {
        let dir = tempdir().unwrap();
        let store = MarketStore::connect(&dir.path().join("test.db")).await.unwrap();
        let pipeline = IngestionPipeline::new(&store);

        let mut source = MockMarket::default();
        source
            .histories
            .insert(VIX_SYMBOL.into(), vec![quote(VIX_SYMBOL, 5, Some(13.0), Some(3.9))]);
        pipeline.run_vix(&source).await;

        source
            .histories
            .insert(VIX_SYMBOL.into(), vec![quote(VIX_SYMBOL, 5, Some(13.0), Some(4.1))]);
        let report = pipeline.run_vix(&source).await;

        assert!(matches!(
            report.outcome,
            SourceOutcome::Succeeded { written: 1, failed: 0 }
        ));
        assert_eq!(store.row_count("vix_data").await.unwrap(), 1);
        store.close().await;
    }

    #[tokio::test]
    async fn vix_with_missing_close_is_skipped() {
        let dir = tempdir().unwrap();
        let store = MarketStore::connect(&dir.path().join("test.db")).await.unwrap();
        let pipeline = IngestionPipeline::new(&store);

        let mut source = MockMarket::default();
        source
            .histories
            .insert(VIX_SYMBOL.into(), vec![quote(VIX_SYMBOL, 5, Some(13.0), None)]);
        let report = pipeline.run_vix(&source).await;
        assert!(matches!(report.outcome, SourceOutcome::Skipped(_)));
        store.close().await;
    }

    #[tokio::test]
    async fn summarizer_failure_keeps_entity_reports() {
        let dir = tempdir().unwrap();
        let store = MarketStore::connect(&dir.path().join("test.db")).await.unwrap();
        let pipeline = IngestionPipeline::new(&store);

        let mut source = MockMarket::default();
        source
            .histories
            .insert("^GSPC".into(), rising_history("^GSPC"));
        let summarizer = MockSummarizer {
            response: Err(AppError::Network("completion timed out".into())),
        };

        let report = pipeline
            .run_market_overview(&source, &summarizer, &["^GSPC".to_string()])
            .await;
        assert!(matches!(report.outcome, SourceOutcome::Failed(_)));
        assert_eq!(report.entities.len(), 1);
        store.close().await;
    }

    #[tokio::test]
    async fn overview_run_appends_the_narrative() {
        let dir = tempdir().unwrap();
        let store = MarketStore::connect(&dir.path().join("test.db")).await.unwrap();
        let pipeline = IngestionPipeline::new(&store);

        let mut source = MockMarket::default();
        source
            .histories
            .insert("^GSPC".into(), rising_history("^GSPC"));
        let summarizer = MockSummarizer {
            response: Ok("Broad indices continued to climb.".into()),
        };

        let report = pipeline
            .run_market_overview(&source, &summarizer, &["^GSPC".to_string()])
            .await;
        assert!(matches!(
            report.outcome,
            SourceOutcome::Succeeded { written: 1, failed: 0 }
        ));
        assert_eq!(store.row_count("market_overview").await.unwrap(), 1);
        store.close().await;
    }
}

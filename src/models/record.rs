use chrono::NaiveDate;

use crate::models::TrendSnapshot;

/// The unit of persistence: one date-keyed row for a target table.
///
/// Values are positional against the table's declared value columns; a
/// `None` persists as SQL NULL, never as zero.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedRecord {
    pub date: NaiveDate,
    pub values: Vec<Option<f64>>,
}

impl DerivedRecord {
    pub fn new(date: NaiveDate, values: Vec<Option<f64>>) -> Self {
        Self { date, values }
    }
}

/// Per-entity outcome within a market analysis batch.
#[derive(Debug)]
pub enum EntityOutcome {
    Analyzed(TrendSnapshot),
    Skipped(String),
    Failed(String),
}

#[derive(Debug)]
pub struct EntityReport {
    pub entity: String,
    pub outcome: EntityOutcome,
}

/// Outcome of one data source's run. A batch never collapses into a single
/// pass/fail flag; callers receive one report per source.
#[derive(Debug)]
pub enum SourceOutcome {
    Succeeded { written: usize, failed: usize },
    Skipped(String),
    Failed(String),
}

#[derive(Debug)]
pub struct SourceReport {
    pub source: &'static str,
    pub outcome: SourceOutcome,
    /// Per-entity detail, populated by the market overview run.
    pub entities: Vec<EntityReport>,
}

impl SourceReport {
    pub fn failed(source: &'static str, reason: impl Into<String>) -> Self {
        Self {
            source,
            outcome: SourceOutcome::Failed(reason.into()),
            entities: Vec::new(),
        }
    }

    pub fn skipped(source: &'static str, reason: impl Into<String>) -> Self {
        Self {
            source,
            outcome: SourceOutcome::Skipped(reason.into()),
            entities: Vec::new(),
        }
    }
}

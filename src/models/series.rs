use chrono::NaiveDate;
use std::collections::BTreeMap;

/// One normalized price observation. The close is required; the open may be
/// missing, in which case change metrics for that point stay undefined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub close: f64,
}

/// Time-ordered closing prices for one entity.
///
/// Construction enforces the series invariants: strictly increasing dates
/// and no duplicates. When the input carries two points for the same date,
/// the later one wins.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    pub entity: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(entity: impl Into<String>, points: Vec<PricePoint>) -> Self {
        let mut by_date: BTreeMap<NaiveDate, PricePoint> = BTreeMap::new();
        for point in points {
            by_date.insert(point.date, point);
        }
        Self {
            entity: entity.into(),
            points: by_date.into_values().collect(),
        }
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn latest(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

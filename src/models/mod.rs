mod observation;
mod record;
mod series;
pub mod indicators;

pub use indicators::{MovingAverageSet, TrendSnapshot, TrendState};
pub use observation::RawObservation;
pub use record::{DerivedRecord, EntityOutcome, EntityReport, SourceOutcome, SourceReport};
pub use series::{PricePoint, PriceSeries};

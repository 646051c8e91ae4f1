pub mod macro_series;
pub mod overview;
pub mod pull;
pub mod sentiment;
pub mod status;
pub mod vix;

use crate::models::{EntityOutcome, SourceOutcome, SourceReport};

pub(crate) fn print_source_report(report: &SourceReport) {
    match &report.outcome {
        SourceOutcome::Succeeded { written, failed } => {
            if *failed == 0 {
                println!("✅ {}: {} rows written", report.source, written);
            } else {
                println!(
                    "⚠️  {}: {} rows written, {} failed",
                    report.source, written, failed
                );
            }
        }
        SourceOutcome::Skipped(reason) => {
            println!("⏭️  {}: skipped ({})", report.source, reason);
        }
        SourceOutcome::Failed(reason) => {
            println!("❌ {}: {}", report.source, reason);
        }
    }

    for entity in &report.entities {
        match &entity.outcome {
            EntityOutcome::Analyzed(snapshot) => {
                let format_value =
                    |value: Option<f64>| value.map_or("n/a".to_string(), |v| format!("{:.2}", v));
                println!(
                    "   {} close={} change={} ma5={} ma20={} ma50={} trend={}",
                    entity.entity,
                    format_value(snapshot.close),
                    format_value(snapshot.change),
                    format_value(snapshot.averages.ma5),
                    format_value(snapshot.averages.ma20),
                    format_value(snapshot.averages.ma50),
                    snapshot.trend
                );
            }
            EntityOutcome::Skipped(reason) => {
                println!("   {} skipped: {}", entity.entity, reason);
            }
            EntityOutcome::Failed(reason) => {
                println!("   {} failed: {}", entity.entity, reason);
            }
        }
    }
}

pub(crate) fn print_reports(reports: &[SourceReport]) {
    for report in reports {
        print_source_report(report);
    }
}

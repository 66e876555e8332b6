use std::fmt::Write;
use std::io;

use serde::Serialize;

use crate::change::calculate_change;
use crate::format::format_value;
use crate::metrics::{MetricKey, MetricsSnapshot};
use crate::models::{Collection, TimeWindow};
use crate::period::ComparisonPeriod;
use crate::widget::WidgetSummary;

#[derive(Debug, Serialize)]
struct ComparisonRow {
    metric: MetricKey,
    current: f64,
    previous: f64,
    change: String,
    change_type: &'static str,
}

fn comparison_rows<'a>(
    current: &'a MetricsSnapshot,
    previous: &'a MetricsSnapshot,
) -> impl Iterator<Item = ComparisonRow> + 'a {
    MetricKey::ALL.into_iter().map(move |key| {
        let now = current.get(key);
        let before = previous.get(key);
        let change = calculate_change(now, before);
        ComparisonRow {
            metric: key,
            current: now,
            previous: before,
            change: change.change,
            change_type: change.change_type.as_str(),
        }
    })
}

pub fn write_comparison_csv<W: io::Write>(
    writer: W,
    current: &MetricsSnapshot,
    previous: &MetricsSnapshot,
) -> anyhow::Result<usize> {
    let mut writer = csv::Writer::from_writer(writer);
    let mut written = 0usize;

    for row in comparison_rows(current, previous) {
        writer.serialize(row)?;
        written += 1;
    }

    writer.flush()?;
    Ok(written)
}

pub fn build_report(
    period: ComparisonPeriod,
    current_window: TimeWindow,
    previous_window: TimeWindow,
    current: &MetricsSnapshot,
    previous: &MetricsSnapshot,
    widgets: &[WidgetSummary],
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Community Dashboard Report");
    let _ = writeln!(
        output,
        "Comparing {} ({}) against {}",
        current_window,
        period.label(),
        previous_window
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Metrics");

    for row in comparison_rows(current, previous) {
        let format = row.metric.display_format();
        let _ = writeln!(
            output,
            "- {}: {} (previous {}, {} {})",
            row.metric,
            format_value(row.current, format),
            format_value(row.previous, format),
            row.change,
            row.change_type
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Collection Activity");

    let mut active = Collection::ALL
        .into_iter()
        .map(|collection| (collection, current.raw_count(collection)))
        .filter(|(_, count)| *count > 0)
        .peekable();

    if active.peek().is_none() {
        let _ = writeln!(output, "No records created in this window.");
    } else {
        for (collection, count) in active {
            let _ = writeln!(output, "- {}: {} records", collection, count);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Widgets");

    if widgets.is_empty() {
        let _ = writeln!(output, "No active widgets configured.");
    } else {
        for widget in widgets {
            let _ = write!(
                output,
                "- {}: {} ({})",
                widget.title, widget.value, widget.change.change
            );
            if let Some(subtitle) = &widget.subtitle {
                let _ = write!(output, " - {}", subtitle);
            }
            let _ = writeln!(output);
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::{ChangeResult, ChangeType};
    use crate::models::Record;
    use chrono::{TimeZone, Utc};

    fn sample_snapshots() -> (MetricsSnapshot, MetricsSnapshot) {
        let current = MetricsSnapshot::partial([
            (MetricKey::DonationsAmount, 1500.0),
            (MetricKey::EventsCount, 3.0),
        ])
        .with_raw(
            Collection::Events,
            vec![Record::new(Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap())],
        );
        let previous = MetricsSnapshot::partial([
            (MetricKey::DonationsAmount, 1000.0),
            (MetricKey::EventsCount, 3.0),
        ]);
        (current, previous)
    }

    fn sample_windows() -> (TimeWindow, TimeWindow) {
        let now = Utc.with_ymd_and_hms(2026, 3, 15, 0, 0, 0).unwrap();
        (
            ComparisonPeriod::Monthly.current_window(now),
            ComparisonPeriod::Monthly.previous_window(now),
        )
    }

    #[test]
    fn report_lists_metrics_activity_and_widgets() {
        let (current, previous) = sample_snapshots();
        let (current_window, previous_window) = sample_windows();
        let widgets = vec![WidgetSummary {
            title: "Raised".to_string(),
            subtitle: Some("approved only".to_string()),
            section: None,
            current: 1500.0,
            previous: 1000.0,
            value: "$1,500.00".to_string(),
            change: ChangeResult {
                change: "+50.0%".to_string(),
                change_type: ChangeType::Positive,
            },
        }];

        let report = build_report(
            ComparisonPeriod::Monthly,
            current_window,
            previous_window,
            &current,
            &previous,
            &widgets,
        );

        assert!(report.starts_with("# Community Dashboard Report"));
        assert!(report.contains("Comparing 2026-03-01 to 2026-03-31 (month-over-month)"));
        assert!(report.contains(
            "- donations_amount: $1,500.00 (previous $1,000.00, +50.0% positive)"
        ));
        assert!(report.contains("- events_count: 3 (previous 3, 0% neutral)"));
        assert!(report.contains("- events: 1 records"));
        assert!(report.contains("- Raised: $1,500.00 (+50.0%) - approved only"));
    }

    #[test]
    fn report_handles_empty_sections() {
        let snapshot = MetricsSnapshot::default();
        let (current_window, previous_window) = sample_windows();
        let report = build_report(
            ComparisonPeriod::Yearly,
            current_window,
            previous_window,
            &snapshot,
            &snapshot,
            &[],
        );
        assert!(report.contains("No records created in this window."));
        assert!(report.contains("No active widgets configured."));
    }

    #[test]
    fn csv_has_one_row_per_metric() {
        let (current, previous) = sample_snapshots();
        let mut buffer = Vec::new();
        let written = write_comparison_csv(&mut buffer, &current, &previous).unwrap();
        assert_eq!(written, MetricKey::ALL.len());

        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("metric,current,previous,change,change_type"));
        assert_eq!(lines.next(), Some("donations_count,0.0,0.0,0%,neutral"));
        assert!(text.contains("donations_amount,1500.0,1000.0,+50.0%,positive"));
        assert_eq!(text.lines().count(), MetricKey::ALL.len() + 1);
    }
}

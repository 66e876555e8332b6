use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::metrics::{MetricKey, MetricsSnapshot};
use crate::models::{ApprovalState, Collection, Record, TimeWindow};
use crate::store::{DataSourceError, RecordQuery, RecordStore};

/// Keys a previous-period snapshot carries; everything else stays zero.
pub const PREVIOUS_PERIOD_KEYS: [MetricKey; 3] = [
    MetricKey::DonationsAmount,
    MetricKey::ScholarshipsCount,
    MetricKey::EventsCount,
];

const DONATION_AMOUNT_FIELD: &str = "amount_raised";
const SCHOLARSHIP_AMOUNT_FIELD: &str = "amount";

async fn fetch_logged(
    store: &dyn RecordStore,
    collection: Collection,
    query: RecordQuery,
) -> Result<Vec<Record>, DataSourceError> {
    match store.fetch(collection, query).await {
        Ok(records) => {
            log::debug!(
                "fetched {} {collection} records (approved_only={}) for {}",
                records.len(),
                query.approved_only,
                query.window
            );
            Ok(records)
        }
        Err(err) => {
            log::warn!("{collection} query failed: {err}");
            Err(err)
        }
    }
}

fn sum_amounts(records: &[Record], field: &str) -> f64 {
    records
        .iter()
        .map(|record| record.amount(field))
        .sum::<Decimal>()
        .to_f64()
        .unwrap_or(0.0)
}

fn count_pending(records: &[Record]) -> f64 {
    records
        .iter()
        .filter(|record| record.approval_state() == ApprovalState::Pending)
        .count() as f64
}

fn count(records: &[Record]) -> f64 {
    records.len() as f64
}

/// Builds the full snapshot for `window`. Any failed query fails the whole
/// aggregation; no partial snapshot is returned.
pub async fn aggregate_metrics(
    store: &dyn RecordStore,
    window: TimeWindow,
) -> Result<MetricsSnapshot, DataSourceError> {
    let all = RecordQuery::in_window(window);
    let approved = RecordQuery::approved(window);

    let (
        donations,
        approved_donations,
        requests,
        approved_requests,
        scholarships,
        approved_scholarships,
        events,
        approved_events,
    ) = tokio::try_join!(
        fetch_logged(store, Collection::Donations, all),
        fetch_logged(store, Collection::Donations, approved),
        fetch_logged(store, Collection::Requests, all),
        fetch_logged(store, Collection::Requests, approved),
        fetch_logged(store, Collection::Scholarships, all),
        fetch_logged(store, Collection::Scholarships, approved),
        fetch_logged(store, Collection::Events, all),
        fetch_logged(store, Collection::Events, approved),
    )?;

    let (organizations, users, volunteers, comments) = tokio::try_join!(
        fetch_logged(store, Collection::Organizations, all),
        fetch_logged(store, Collection::Users, all),
        fetch_logged(store, Collection::Volunteers, all),
        fetch_logged(store, Collection::Comments, all),
    )?;

    let completed_requests = requests
        .iter()
        .filter(|record| record.has_status("completed"))
        .count() as f64;

    let snapshot = MetricsSnapshot::default()
        .with(MetricKey::DonationsCount, count(&donations))
        .with(
            MetricKey::DonationsAmount,
            sum_amounts(&approved_donations, DONATION_AMOUNT_FIELD),
        )
        .with(MetricKey::DonationsApproved, count(&approved_donations))
        .with(MetricKey::DonationsPending, count_pending(&donations))
        .with(MetricKey::RequestsCount, count(&requests))
        .with(MetricKey::RequestsApproved, count(&approved_requests))
        .with(MetricKey::RequestsPending, count_pending(&requests))
        .with(MetricKey::RequestsCompleted, completed_requests)
        .with(MetricKey::ScholarshipsCount, count(&scholarships))
        .with(
            MetricKey::ScholarshipsAmount,
            sum_amounts(&approved_scholarships, SCHOLARSHIP_AMOUNT_FIELD),
        )
        .with(MetricKey::ScholarshipsApproved, count(&approved_scholarships))
        .with(MetricKey::ScholarshipsPending, count_pending(&scholarships))
        .with(MetricKey::EventsCount, count(&events))
        .with(MetricKey::EventsApproved, count(&approved_events))
        .with(MetricKey::EventsPending, count_pending(&events))
        .with_raw(Collection::Donations, donations)
        .with_raw(Collection::Requests, requests)
        .with_raw(Collection::Scholarships, scholarships)
        .with_raw(Collection::Events, events)
        .with_raw(Collection::Organizations, organizations)
        .with_raw(Collection::Users, users)
        .with_raw(Collection::Volunteers, volunteers)
        .with_raw(Collection::Comments, comments);

    Ok(snapshot)
}

/// Builds the sparse snapshot used as the comparison baseline. Only
/// [`PREVIOUS_PERIOD_KEYS`] are populated.
pub async fn aggregate_previous_metrics(
    store: &dyn RecordStore,
    window: TimeWindow,
) -> Result<MetricsSnapshot, DataSourceError> {
    let (approved_donations, scholarships, events) = tokio::try_join!(
        fetch_logged(store, Collection::Donations, RecordQuery::approved(window)),
        fetch_logged(store, Collection::Scholarships, RecordQuery::in_window(window)),
        fetch_logged(store, Collection::Events, RecordQuery::in_window(window)),
    )?;

    let snapshot = MetricsSnapshot::partial([
        (
            MetricKey::DonationsAmount,
            sum_amounts(&approved_donations, DONATION_AMOUNT_FIELD),
        ),
        (MetricKey::ScholarshipsCount, count(&scholarships)),
        (MetricKey::EventsCount, count(&events)),
    ])
    .with_raw(Collection::Donations, approved_donations)
    .with_raw(Collection::Scholarships, scholarships)
    .with_raw(Collection::Events, events);

    Ok(snapshot)
}

pub mod aggregate;
pub mod change;
pub mod db;
pub mod equation;
pub mod format;
pub mod metrics;
pub mod models;
pub mod period;
pub mod report;
pub mod store;
pub mod widget;

pub use aggregate::{aggregate_metrics, aggregate_previous_metrics};
pub use change::{calculate_absolute_change, calculate_change, ChangeResult, ChangeType};
pub use equation::{evaluate_equation, EquationToken, Operator};
pub use format::{format_value, DisplayFormat};
pub use metrics::{MetricKey, MetricsSnapshot};
pub use models::{Collection, Record, TimeWindow};
pub use store::{DataSourceError, MemoryStore, RecordStore};

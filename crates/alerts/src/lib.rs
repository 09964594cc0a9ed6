//! `bloodline-alerts`
//!
//! **Responsibility:** turn risky forecasts into donor alerts.
//!
//! - Marks each forecast alerted at most once, before any delivery starts.
//! - Hands composed [`Alert`] values to an injected [`NotificationSink`].
//! - Delivery failures are logged and counted, never propagated.

pub mod alert;
pub mod dispatcher;
pub mod ports;

pub use alert::{Alert, CALL_TO_ACTION};
pub use dispatcher::{AlertDispatcher, AlertTarget, DispatcherConfig};
pub use ports::{
    Donor, DonorDirectory, InMemoryDonorDirectory, InMemoryNotificationSink, NotificationSink, NotifyError,
    TracingNotificationSink,
};

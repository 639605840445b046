//! Review scheduling
//!
//! Decides when each memory must be shown again and delivers due memories
//! to their owners.
//!
//! ## Interval growth:
//! - Base days `[1, 3, 7, 14, 30]`, then doubling per extra review
//! - Up to +50% for emotionally weighted memories
//! - `1 + priority` while a consolidation boost is live

mod dispatch;
mod interval;

pub use dispatch::{
    Delivery, DeliveryError, DispatchConfig, DispatchReport, Messenger, ReviewCard,
    ReviewDispatcher,
};
pub use interval::{
    DEFAULT_BASE_INTERVALS_DAYS, ReviewCalculator, ReviewScheduleConfig, ScheduleConfigError,
    URGENT_RETENTION_THRESHOLD,
};

use chrono::{FixedOffset, NaiveDate, Utc};
use uuid::Uuid;

/// Identity of one reconciliation run. Built once at startup and passed
/// into every component; nothing in the engine reads the clock or the
/// process timezone on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunContext {
    pub run_id: Uuid,
    pub run_date: NaiveDate,
    pub utc_offset: FixedOffset,
}

impl RunContext {
    pub fn new(run_id: Uuid, run_date: NaiveDate, utc_offset: FixedOffset) -> Self {
        Self {
            run_id,
            run_date,
            utc_offset,
        }
    }

    /// Fresh run id with today's date in the given offset.
    pub fn today(utc_offset: FixedOffset) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            run_date: Utc::now().with_timezone(&utc_offset).date_naive(),
            utc_offset,
        }
    }
}

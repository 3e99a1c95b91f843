//! Common free time across several users.

use futures::future::join_all;
use tracing::instrument;

use crate::client::BusySource;
use crate::error::CalendarError;
use crate::intervals::{free_slots, merge_intervals, to_window_interval};
use crate::types::{BusyInterval, FreeSlot, FreeSlotQuery};

pub struct FreeBusyResolver<S> {
    source: S,
}

impl<S: BusySource> FreeBusyResolver<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Free slots of at least `min_duration_minutes`, earliest first.
    ///
    /// Users whose lookup fails are treated as having no busy time. A rejected
    /// token is retried once per user; authentication failures and a token
    /// rejected twice abort the search.
    #[instrument(skip(self, query), fields(users = query.user_ids.len(), date = %query.date), level = "info")]
    pub async fn find_free_slots(
        &self,
        query: &FreeSlotQuery,
    ) -> Result<Vec<FreeSlot>, CalendarError> {
        let merged = self.merged_busy(query).await?;
        let (window_start, window_end) = query.window_minutes();

        let slots = free_slots(
            &merged,
            window_start,
            window_end,
            query.min_duration_minutes,
        );
        tracing::info!(slots = slots.len(), "Free slot search finished");
        Ok(slots)
    }

    /// Busy time of all users inside the window, merged and sorted.
    pub async fn merged_busy(
        &self,
        query: &FreeSlotQuery,
    ) -> Result<Vec<BusyInterval>, CalendarError> {
        query.validate()?;
        let midnight = query.midnight()?;
        let time_min = query.time_min()?;
        let time_max = query.time_max()?;
        let window = query.window_minutes();

        let lookups = query.user_ids.iter().map(|user_id| async move {
            let periods = match self.source.busy_periods(user_id, time_min, time_max).await {
                Err(e) if e.should_refresh_token() => {
                    tracing::debug!(user_id = %user_id, "Token rejected, retrying once");
                    self.source.busy_periods(user_id, time_min, time_max).await
                }
                other => other,
            };

            let intervals = periods.and_then(|periods| {
                periods
                    .iter()
                    .map(|period| to_window_interval(period, midnight, window))
                    .collect::<Result<Vec<_>, _>>()
            });
            (user_id, intervals)
        });

        let mut busy = Vec::new();
        for (user_id, intervals) in join_all(lookups).await {
            match intervals {
                Ok(intervals) => busy.extend(intervals.into_iter().flatten()),
                Err(e @ (CalendarError::Auth(_) | CalendarError::TokenExpired)) => return Err(e),
                Err(e) => {
                    tracing::warn!(user_id = %user_id, "Ignoring busy times for user: {}", e);
                }
            }
        }

        Ok(merge_intervals(busy))
    }
}

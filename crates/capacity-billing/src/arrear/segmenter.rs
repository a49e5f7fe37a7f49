//! Splits the billable span of a subscription into contiguous sub-intervals.
//!
//! Boundaries fall on every billing event and on every bill-cycle date of the
//! usage's billing period. The sequence always tiles `[first event, end)`
//! exactly, where `end` is the target date or an earlier termination.

use crate::arrear::cycle::BillCycle;
use crate::domain::events::BillingEvent;
use crate::domain::types::{BillingPeriod, DateRange};
use crate::error::{BillingError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One immutable slice of the billable span, with the plan in effect over it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubInterval {
    pub range: DateRange,
    pub plan_name: String,
    pub phase_name: String,
    /// Ends on the target date rather than on a cycle date or event.
    pub open: bool,
}

impl SubInterval {
    pub fn start(&self) -> NaiveDate {
        self.range.start
    }

    pub fn end(&self) -> NaiveDate {
        self.range.end
    }
}

/// Validated billing events of one subscription, as seen from a target date
#[derive(Debug, Clone)]
pub struct BillingTimeline<'a> {
    events: &'a [BillingEvent],
    billing_period: BillingPeriod,
    target_date: NaiveDate,
}

impl<'a> BillingTimeline<'a> {
    pub fn new(
        events: &'a [BillingEvent],
        billing_period: BillingPeriod,
        target_date: NaiveDate,
    ) -> Result<Self> {
        let first = events.first().ok_or_else(|| BillingError::InvalidBillingEvents {
            message: "no billing events".to_string(),
        })?;

        for (index, pair) in events.windows(2).enumerate() {
            if pair[1].effective_day() < pair[0].effective_day() {
                return Err(BillingError::InvalidBillingEvents {
                    message: format!(
                        "event {} ({}) on {} precedes event {} on {}",
                        index + 1,
                        pair[1].kind,
                        pair[1].effective_day(),
                        index,
                        pair[0].effective_day()
                    ),
                });
            }
            if pair[0].is_termination() {
                return Err(BillingError::InvalidBillingEvents {
                    message: format!(
                        "event {} ({}) follows a termination",
                        index + 1,
                        pair[1].kind
                    ),
                });
            }
        }

        let start_date = first.effective_day();
        if target_date < start_date {
            return Err(BillingError::TargetDateBeforeStart {
                target_date,
                start_date,
            });
        }

        Ok(Self {
            events,
            billing_period,
            target_date,
        })
    }

    pub fn events(&self) -> &'a [BillingEvent] {
        self.events
    }

    pub fn target_date(&self) -> NaiveDate {
        self.target_date
    }

    pub fn start_date(&self) -> NaiveDate {
        self.events[0].effective_day()
    }

    pub fn termination_date(&self) -> Option<NaiveDate> {
        self.events
            .last()
            .filter(|event| event.is_termination())
            .map(BillingEvent::effective_day)
    }

    /// Last day the evaluation bills up to: the target date, or an earlier termination
    pub fn end_date(&self) -> NaiveDate {
        match self.termination_date() {
            Some(termination) if termination < self.target_date => termination,
            _ => self.target_date,
        }
    }

    /// Event in effect on `date`: the last one effective on or before it
    pub fn event_in_effect(&self, date: NaiveDate) -> &'a BillingEvent {
        self.events
            .iter()
            .rev()
            .find(|event| event.effective_day() <= date)
            .unwrap_or(&self.events[0])
    }

    pub fn cycle_for(&self, event: &BillingEvent) -> Result<BillCycle> {
        BillCycle::starting_on_or_after(
            self.billing_period,
            event.bill_cycle_day,
            event.effective_day(),
        )
    }

    /// Ordered, gap-free sub-intervals covering `[start_date, end_date)`
    pub fn sub_intervals(&self) -> Result<Vec<SubInterval>> {
        let end = self.end_date();
        let mut intervals = Vec::new();

        for (index, event) in self.events.iter().enumerate() {
            let segment_start = event.effective_day();
            if segment_start >= end {
                break;
            }

            let next_event_day = self
                .events
                .get(index + 1)
                .map(BillingEvent::effective_day)
                .filter(|day| *day <= end);
            let segment_end = next_event_day.unwrap_or(end);
            if segment_start == segment_end {
                // A later event on the same day supersedes this one.
                continue;
            }

            let cycle = self.cycle_for(event)?;
            let (cycle_dates, ends_on_cycle) = cycle.dates_between(segment_start, segment_end)?;
            let ends_on_event = next_event_day.is_some()
                || self.termination_date() == Some(segment_end);

            let mut boundaries = Vec::with_capacity(cycle_dates.len() + 2);
            boundaries.push(segment_start);
            boundaries.extend(cycle_dates);
            boundaries.push(segment_end);

            let last = boundaries.len() - 2;
            for (position, pair) in boundaries.windows(2).enumerate() {
                intervals.push(SubInterval {
                    range: DateRange::new(pair[0], pair[1]),
                    plan_name: event.plan_name.clone(),
                    phase_name: event.phase_name.clone(),
                    open: position == last && !ends_on_cycle && !ends_on_event,
                });
            }
        }

        debug!(
            "Segmented [{}, {}) into {} sub-intervals",
            self.start_date(),
            end,
            intervals.len()
        );

        Ok(intervals)
    }
}

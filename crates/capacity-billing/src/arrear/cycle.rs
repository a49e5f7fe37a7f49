use crate::domain::types::{add_days, add_months, anchored_date, BillingPeriod};
use crate::error::{BillingError, Result};
use chrono::{Datelike, NaiveDate};

/// Recurring bill-cycle dates of one billing period, anchored on a bill-cycle day.
///
/// Calendar periods land on the anchor day of the month (clamped to short
/// months); fixed-length periods step from the date the cycle starts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillCycle {
    period: BillingPeriod,
    anchor_day: u32,
    first: NaiveDate,
}

impl BillCycle {
    /// Cycle whose first date is the earliest cycle date on or after `from`
    pub fn starting_on_or_after(
        period: BillingPeriod,
        anchor_day: u32,
        from: NaiveDate,
    ) -> Result<Self> {
        if !(1..=31).contains(&anchor_day) {
            return Err(BillingError::ValidationError {
                field: "bill_cycle_day".to_string(),
                message: format!("{} is not a day of month", anchor_day),
            });
        }

        let first = match period.months() {
            Some(_) => {
                let candidate = anchored_date(from.year(), from.month(), anchor_day)
                    .ok_or(BillingError::DateOutOfRange { from })?;
                if candidate >= from {
                    candidate
                } else {
                    let (year, month) = add_months(from.year(), from.month(), 1);
                    anchored_date(year, month, anchor_day)
                        .ok_or(BillingError::DateOutOfRange { from })?
                }
            }
            None => from,
        };

        Ok(Self {
            period,
            anchor_day,
            first,
        })
    }

    /// The `n`-th cycle date, `0` being the first
    pub fn nth(&self, n: u32) -> Result<NaiveDate> {
        let out_of_range = || BillingError::DateOutOfRange { from: self.first };

        if let Some(step) = self.period.months() {
            let months = n.checked_mul(step).ok_or_else(out_of_range)?;
            let (year, month) = add_months(self.first.year(), self.first.month(), months);
            return anchored_date(year, month, self.anchor_day).ok_or_else(out_of_range);
        }

        let step = self.period.days().unwrap_or(1);
        let days = u64::from(n).checked_mul(step).ok_or_else(out_of_range)?;
        add_days(self.first, days).ok_or_else(out_of_range)
    }

    /// Cycle dates strictly inside `(after, before)`, plus whether `before` is itself a cycle date
    pub fn dates_between(&self, after: NaiveDate, before: NaiveDate) -> Result<(Vec<NaiveDate>, bool)> {
        let mut dates = Vec::new();
        let mut n = 0;
        loop {
            let date = self.nth(n)?;
            if date >= before {
                return Ok((dates, date == before));
            }
            if date > after {
                dates.push(date);
            }
            n += 1;
        }
    }

    /// First cycle date strictly after `date`
    pub fn next_after(&self, date: NaiveDate) -> Result<NaiveDate> {
        let mut n = 0;
        loop {
            let candidate = self.nth(n)?;
            if candidate > date {
                return Ok(candidate);
            }
            n += 1;
        }
    }
}

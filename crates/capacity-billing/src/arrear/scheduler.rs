use crate::arrear::segmenter::BillingTimeline;
use crate::error::Result;
use chrono::NaiveDate;
use tracing::debug;

/// Next date the evaluation has to run again, or `None` once the subscription
/// has terminated on or before the target date.
///
/// This is the earliest of the next bill-cycle date after the target date and
/// the next billing event (plan change, termination) after it.
pub fn next_notification_date(timeline: &BillingTimeline<'_>) -> Result<Option<NaiveDate>> {
    let target_date = timeline.target_date();

    if let Some(termination) = timeline.termination_date() {
        if termination <= target_date {
            debug!(
                "Subscription terminated on {}, no further notification",
                termination
            );
            return Ok(None);
        }
    }

    let in_effect = timeline.event_in_effect(target_date);
    let next_cycle_date = timeline.cycle_for(in_effect)?.next_after(target_date)?;

    let next_event_date = timeline
        .events()
        .iter()
        .map(|event| event.effective_day())
        .find(|day| *day > target_date);

    let next = match next_event_date {
        Some(event_date) if event_date < next_cycle_date => event_date,
        _ => next_cycle_date,
    };

    Ok(Some(next))
}

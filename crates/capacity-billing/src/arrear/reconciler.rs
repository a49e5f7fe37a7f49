//! Diffs freshly priced sub-intervals against what was already invoiced.
//!
//! Existing items are joined to sub-intervals on exact boundaries; items left
//! by earlier runs (aggregates, open periods) are spread over the intervals
//! they started on. Only the unbilled delta is emitted, so re-running after
//! the emitted items are persisted produces nothing.

use crate::arrear::segmenter::SubInterval;
use crate::config::UsageDetailMode;
use crate::domain::invoice::{serialize_details, InvoiceItem, InvoicingContext, UsageInArrearDetail};
use crate::domain::types::DateRange;
use crate::error::Result;
use rust_decimal::Decimal;
use tracing::debug;

/// A sub-interval together with its freshly computed charge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputedInterval {
    pub interval: SubInterval,
    pub amount: Decimal,
    pub details: Vec<UsageInArrearDetail>,
}

pub struct Reconciler<'a> {
    context: &'a InvoicingContext,
    usage_name: &'a str,
    mode: UsageDetailMode,
}

impl<'a> Reconciler<'a> {
    pub fn new(context: &'a InvoicingContext, usage_name: &'a str, mode: UsageDetailMode) -> Self {
        Self {
            context,
            usage_name,
            mode,
        }
    }

    fn is_billed_under(&self, item: &InvoiceItem, interval: &SubInterval) -> bool {
        item.belongs_to(self.context, self.usage_name)
            && item.plan_name == interval.plan_name
            && item.phase_name == interval.phase_name
    }

    /// Existing items billed for exactly `[start_date, end_date)` under this usage
    pub fn billed_items<'i>(
        &'i self,
        interval: &'i SubInterval,
        existing: &'i [InvoiceItem],
    ) -> impl Iterator<Item = &'i InvoiceItem> + 'i {
        existing.iter().filter(move |item| {
            item.range() == Some(interval.range) && self.is_billed_under(item, interval)
        })
    }

    /// Already-billed amount per computed interval
    fn billed_amounts(&self, computed: &[ComputedInterval], existing: &[InvoiceItem]) -> Vec<Decimal> {
        let mut billed: Vec<Decimal> = computed
            .iter()
            .map(|c| billed_amount(self.billed_items(&c.interval, existing)))
            .collect();

        // Items that are not an exact match but start on a computed boundary
        // are spread in order over the intervals they cover: earlier aggregate
        // output spans several intervals, earlier open-period output ends
        // inside the interval that has since grown.
        for item in existing {
            let Some(range) = item.range() else { continue };
            let Some((first, last)) = covered_intervals(computed, range) else {
                continue;
            };
            if (first == last && computed[last].interval.range == range)
                || !self.is_billed_under(item, &computed[last].interval)
            {
                continue;
            }

            let mut remaining = item.amount;
            for index in first..last {
                let unbilled = (computed[index].amount - billed[index]).max(Decimal::ZERO);
                let share = remaining.max(Decimal::ZERO).min(unbilled);
                billed[index] += share;
                remaining -= share;
            }
            billed[last] += remaining;
        }

        billed
    }

    /// Items owed on top of `existing` for the computed intervals
    pub fn missing_items(
        &self,
        computed: &[ComputedInterval],
        existing: &[InvoiceItem],
    ) -> Result<Vec<InvoiceItem>> {
        let billed = self.billed_amounts(computed, existing);

        let deltas: Vec<(&ComputedInterval, Decimal)> = computed
            .iter()
            .zip(billed)
            .map(|(c, already)| (c, c.amount - already))
            .filter(|(c, delta)| {
                if delta.is_zero() {
                    debug!("Interval {} fully billed", c.interval.range);
                }
                !delta.is_zero()
            })
            .collect();

        match self.mode {
            UsageDetailMode::Detail => deltas
                .into_iter()
                .map(|(c, delta)| {
                    debug!("Interval {} owes {}", c.interval.range, delta);
                    self.item(&c.interval, c.interval.range, delta, &c.details)
                })
                .collect(),
            UsageDetailMode::Aggregate => {
                let (Some((first, _)), Some((last, _))) = (deltas.first(), deltas.last()) else {
                    return Ok(Vec::new());
                };

                let amount: Decimal = deltas.iter().map(|(_, delta)| *delta).sum();
                if amount.is_zero() {
                    debug!("Interval deltas cancel out, nothing to aggregate");
                    return Ok(Vec::new());
                }

                let details: Vec<UsageInArrearDetail> = deltas
                    .iter()
                    .flat_map(|(c, _)| c.details.iter().cloned())
                    .collect();
                let span = DateRange::new(first.interval.start(), last.interval.end());
                debug!("Aggregated {} intervals over {} owing {}", deltas.len(), span, amount);

                Ok(vec![self.item(&last.interval, span, amount, &details)?])
            }
        }
    }

    fn item(
        &self,
        interval: &SubInterval,
        range: DateRange,
        amount: Decimal,
        details: &[UsageInArrearDetail],
    ) -> Result<InvoiceItem> {
        Ok(InvoiceItem::usage(
            self.context,
            &interval.plan_name,
            &interval.phase_name,
            self.usage_name,
            range,
            amount,
            Some(serialize_details(details)?),
        ))
    }
}

/// Sum of the amounts already billed by `items`
pub fn billed_amount<'i>(items: impl IntoIterator<Item = &'i InvoiceItem>) -> Decimal {
    items.into_iter().map(|item| item.amount).sum()
}

/// First and last computed interval covered by `range`. It has to start on an
/// interval start and end after that start, no later than the last interval.
fn covered_intervals(computed: &[ComputedInterval], range: DateRange) -> Option<(usize, usize)> {
    let first = computed
        .iter()
        .position(|c| c.interval.start() == range.start)?;
    let last = computed
        .iter()
        .position(|c| c.interval.start() < range.end && range.end <= c.interval.end())?;
    (last >= first).then_some((first, last))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::Unit;
    use crate::domain::invoice::{parse_details, InvoiceItemKind};
    use crate::domain::types::{AccountId, BundleId, Currency, InvoiceId, SubscriptionId};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn context() -> InvoicingContext {
        InvoicingContext {
            account_id: AccountId::new(),
            bundle_id: BundleId::new(),
            subscription_id: SubscriptionId::new(),
            invoice_id: Some(InvoiceId::new()),
            currency: Currency::new("BTC"),
        }
    }

    fn interval(start: NaiveDate, end: NaiveDate) -> SubInterval {
        SubInterval {
            range: DateRange::new(start, end),
            plan_name: "plan".to_string(),
            phase_name: "phase".to_string(),
            open: false,
        }
    }

    fn computed(start: NaiveDate, end: NaiveDate, amount: Decimal) -> ComputedInterval {
        ComputedInterval {
            interval: interval(start, end),
            amount,
            details: vec![UsageInArrearDetail::new(1, Unit::new("unit"), amount, 1)],
        }
    }

    fn existing(
        context: &InvoicingContext,
        usage: &str,
        start: NaiveDate,
        end: NaiveDate,
        amount: Decimal,
    ) -> InvoiceItem {
        InvoiceItem::usage(
            context,
            "plan",
            "phase",
            usage,
            DateRange::new(start, end),
            amount,
            None,
        )
    }

    #[test]
    fn test_billed_items_require_exact_match() {
        let context = context();
        let (start, end) = (date(2014, 3, 20), date(2014, 4, 20));

        let mut fixed = existing(&context, "capacity", start, end, dec!(10));
        fixed.kind = InvoiceItemKind::Fixed;
        fixed.end_date = None;

        let items = vec![
            existing(&context, "capacity", start, end, dec!(10)),
            existing(&context, "capacity", start, end, dec!(10)),
            existing(&context, "capacity", start.pred_opt().unwrap(), end, dec!(10)),
            existing(&context, "other", start, end, dec!(10)),
            fixed,
        ];

        let reconciler = Reconciler::new(&context, "capacity", UsageDetailMode::Detail);
        let target = interval(start, end);
        assert_eq!(billed_amount(reconciler.billed_items(&target, &items)), dec!(20));
    }

    #[test]
    fn test_items_from_another_context_are_ignored() {
        let context = context();
        let (start, end) = (date(2014, 3, 20), date(2014, 4, 15));

        let mut other_currency = existing(&context, "capacity", start, end, dec!(1));
        other_currency.currency = Currency::usd();
        let mut other_phase = existing(&context, "capacity", start, end, dec!(1));
        other_phase.phase_name = "trial".to_string();
        let mut other_subscription = existing(&context, "capacity", start, end, dec!(1));
        other_subscription.subscription_id = SubscriptionId::new();

        let reconciler = Reconciler::new(&context, "capacity", UsageDetailMode::Detail);
        let items = reconciler
            .missing_items(
                &[computed(start, end, dec!(10))],
                &[other_currency, other_phase, other_subscription],
            )
            .unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].amount, dec!(10));
    }

    #[test]
    fn test_detail_mode_emits_delta_per_interval() {
        let context = context();
        let (a, b, c) = (date(2014, 3, 20), date(2014, 4, 15), date(2014, 5, 15));

        let computed = vec![computed(a, b, dec!(10)), computed(b, c, dec!(10))];
        let existing = vec![
            existing(&context, "capacity", a, b, dec!(1)),
            existing(&context, "capacity", b, c, dec!(10)),
        ];

        let reconciler = Reconciler::new(&context, "capacity", UsageDetailMode::Detail);
        let items = reconciler.missing_items(&computed, &existing).unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].amount, dec!(9));
        assert_eq!(items[0].range(), Some(DateRange::new(a, b)));
        assert_eq!(
            parse_details(items[0].item_details.as_deref().unwrap()).unwrap(),
            computed[0].details
        );
    }

    #[test]
    fn test_overbilled_interval_emits_negative_delta() {
        let context = context();
        let (a, b) = (date(2014, 3, 20), date(2014, 4, 15));

        let reconciler = Reconciler::new(&context, "capacity", UsageDetailMode::Detail);
        let items = reconciler
            .missing_items(
                &[computed(a, b, dec!(10))],
                &[existing(&context, "capacity", a, b, dec!(20))],
            )
            .unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].amount, dec!(-10));
    }

    #[test]
    fn test_aggregate_mode_merges_intervals() {
        let context = context();
        let (a, b, c) = (date(2014, 3, 20), date(2014, 4, 15), date(2014, 5, 15));

        let computed = vec![computed(a, b, dec!(10)), computed(b, c, dec!(20))];
        let reconciler = Reconciler::new(&context, "capacity", UsageDetailMode::Aggregate);
        let items = reconciler.missing_items(&computed, &[]).unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].amount, dec!(30));
        assert_eq!(items[0].range(), Some(DateRange::new(a, c)));
        assert_eq!(items[0].details().unwrap().len(), 2);

        // The merged item spans both intervals and settles both of them.
        let again = reconciler.missing_items(&computed, &items).unwrap();
        assert!(again.is_empty());

        let detail = Reconciler::new(&context, "capacity", UsageDetailMode::Detail);
        assert!(detail.missing_items(&computed, &items).unwrap().is_empty());
    }

    #[test]
    fn test_aggregate_span_is_limited_to_owing_intervals() {
        let context = context();
        let (a, b, c) = (date(2014, 3, 20), date(2014, 4, 15), date(2014, 5, 15));

        let computed = vec![computed(a, b, dec!(10)), computed(b, c, Decimal::ZERO)];
        let reconciler = Reconciler::new(&context, "capacity", UsageDetailMode::Aggregate);
        let items = reconciler.missing_items(&computed, &[]).unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].range(), Some(DateRange::new(a, b)));
    }

    #[test]
    fn test_misaligned_span_contributes_nothing() {
        let context = context();
        let (a, b, c) = (date(2014, 3, 20), date(2014, 4, 15), date(2014, 5, 15));

        let computed = vec![computed(a, b, dec!(10)), computed(b, c, dec!(10))];
        let existing = vec![existing(
            &context,
            "capacity",
            a,
            c.succ_opt().unwrap(),
            dec!(20),
        )];

        let reconciler = Reconciler::new(&context, "capacity", UsageDetailMode::Detail);
        let items = reconciler.missing_items(&computed, &existing).unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_fully_billed_intervals_emit_nothing() {
        let context = context();
        let (a, b) = (date(2014, 3, 20), date(2014, 4, 15));

        for mode in [UsageDetailMode::Detail, UsageDetailMode::Aggregate] {
            let reconciler = Reconciler::new(&context, "capacity", mode);
            let items = reconciler
                .missing_items(
                    &[computed(a, b, dec!(10))],
                    &[
                        existing(&context, "capacity", a, b, dec!(4)),
                        existing(&context, "capacity", a, b, dec!(6)),
                    ],
                )
                .unwrap();
            assert!(items.is_empty());
        }
    }

    #[test]
    fn test_open_period_item_counts_against_grown_interval() {
        let context = context();
        let (a, b, c) = (date(2014, 3, 20), date(2014, 4, 15), date(2014, 5, 15));
        let earlier_target = date(2014, 4, 20);

        let computed = vec![computed(a, b, dec!(10)), computed(b, c, dec!(30))];

        let detail = Reconciler::new(&context, "capacity", UsageDetailMode::Detail);
        let items = detail
            .missing_items(
                &computed,
                &[
                    existing(&context, "capacity", a, b, dec!(10)),
                    existing(&context, "capacity", b, earlier_target, dec!(10)),
                ],
            )
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].amount, dec!(20));
        assert_eq!(items[0].range(), Some(DateRange::new(b, c)));

        let aggregate = Reconciler::new(&context, "capacity", UsageDetailMode::Aggregate);
        let items = aggregate
            .missing_items(
                &computed,
                &[existing(&context, "capacity", a, earlier_target, dec!(20))],
            )
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].amount, dec!(20));
    }

    #[test]
    fn test_aggregate_with_mixed_deltas_is_idempotent() {
        let context = context();
        let (a, b, c) = (date(2014, 3, 20), date(2014, 4, 15), date(2014, 5, 15));

        let computed = vec![computed(a, b, dec!(10)), computed(b, c, dec!(20))];
        let mut existing = vec![existing(&context, "capacity", a, b, dec!(15))];

        let reconciler = Reconciler::new(&context, "capacity", UsageDetailMode::Aggregate);
        let items = reconciler.missing_items(&computed, &existing).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].amount, dec!(15));
        assert_eq!(items[0].range(), Some(DateRange::new(a, c)));

        existing.extend(items);
        assert!(reconciler.missing_items(&computed, &existing).unwrap().is_empty());
    }
}

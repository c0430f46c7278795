//! Profitability metric arithmetic.
//!
//! Every ratio divides two totals and yields zero when the denominator is
//! zero. Multi-day figures are always recomputed from summed totals; a
//! range's ROAS is not the average of its days' ROAS.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

/// Summed inputs for one day or one date range.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Totals {
    /// Storefront orders.
    pub orders: i64,
    /// Orders with at least one linked supplier order.
    pub linked_orders: i64,
    /// Sum of storefront order totals.
    pub revenue: Decimal,
    /// Sum of linked supplier order totals.
    pub actual_cost: Decimal,
    /// Actual cost plus the historical average for each unlinked order.
    pub estimated_cost: Decimal,
    /// Advertising spend.
    pub ad_spend: Decimal,
    pub impressions: i64,
    pub clicks: i64,
}

impl Totals {
    /// Accumulate another day's totals into this one.
    pub fn absorb(&mut self, other: &Self) {
        self.orders += other.orders;
        self.linked_orders += other.linked_orders;
        self.revenue += other.revenue;
        self.actual_cost += other.actual_cost;
        self.estimated_cost += other.estimated_cost;
        self.ad_spend += other.ad_spend;
        self.impressions += other.impressions;
        self.clicks += other.clicks;
    }
}

/// Derived profitability figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProfitMetrics {
    /// Revenue minus actual supplier cost.
    pub net_before_ads: Decimal,
    /// Net before ads, minus ad spend.
    pub net_after_ads: Decimal,
    /// Revenue minus estimated cost.
    pub estimated_net_before_ads: Decimal,
    /// Estimated net before ads, minus ad spend.
    pub estimated_net_after_ads: Decimal,
    /// Revenue / ad spend.
    pub roas: Decimal,
    /// Net before ads / ad spend.
    pub breakeven_roas: Decimal,
    /// Estimated net before ads / ad spend.
    pub estimated_breakeven_roas: Decimal,
    /// Actual cost as a percentage of revenue.
    pub cost_percent: Decimal,
    /// Ad spend as a percentage of revenue.
    pub ad_percent: Decimal,
    /// Net after ads as a percentage of revenue.
    pub margin_percent: Decimal,
    /// Estimated net after ads as a percentage of revenue.
    pub estimated_margin_percent: Decimal,
    /// Revenue per order.
    pub average_order_value: Decimal,
    /// Actual cost per linked order.
    pub average_fulfillment_cost: Decimal,
}

impl ProfitMetrics {
    /// Compute every metric from summed totals.
    #[must_use]
    pub fn from_totals(t: &Totals) -> Self {
        let net_before_ads = t.revenue - t.actual_cost;
        let net_after_ads = net_before_ads - t.ad_spend;
        let estimated_net_before_ads = t.revenue - t.estimated_cost;
        let estimated_net_after_ads = estimated_net_before_ads - t.ad_spend;
        let hundred = Decimal::ONE_HUNDRED;

        Self {
            net_before_ads,
            net_after_ads,
            estimated_net_before_ads,
            estimated_net_after_ads,
            roas: safe_div(t.revenue, t.ad_spend),
            breakeven_roas: safe_div(net_before_ads, t.ad_spend),
            estimated_breakeven_roas: safe_div(estimated_net_before_ads, t.ad_spend),
            cost_percent: safe_div(t.actual_cost * hundred, t.revenue),
            ad_percent: safe_div(t.ad_spend * hundred, t.revenue),
            margin_percent: safe_div(net_after_ads * hundred, t.revenue),
            estimated_margin_percent: safe_div(estimated_net_after_ads * hundred, t.revenue),
            average_order_value: safe_div(t.revenue, Decimal::from(t.orders)),
            average_fulfillment_cost: safe_div(t.actual_cost, Decimal::from(t.linked_orders)),
        }
    }
}

/// A zero denominator yields zero, never an error or infinity.
fn safe_div(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        Decimal::ZERO
    } else {
        numerator / denominator
    }
}

/// Metrics for one calendar day.
#[derive(Debug, Clone, Serialize)]
pub struct DailyReport {
    pub date: NaiveDate,
    pub totals: Totals,
    pub metrics: ProfitMetrics,
}

/// Metrics for an inclusive date range, with the per-day breakdown.
#[derive(Debug, Clone, Serialize)]
pub struct RangeReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub days: Vec<DailyReport>,
    /// Summed over every day in the range.
    pub totals: Totals,
    /// Recomputed from the summed totals.
    pub metrics: ProfitMetrics,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_metrics_from_totals() {
        let totals = Totals {
            orders: 2,
            linked_orders: 1,
            revenue: dec!(175.00),
            actual_cost: dec!(40.00),
            estimated_cost: dec!(60.00),
            ad_spend: dec!(20.00),
            impressions: 15000,
            clicks: 320,
        };
        let m = ProfitMetrics::from_totals(&totals);

        assert_eq!(m.net_before_ads, dec!(135.00));
        assert_eq!(m.net_after_ads, dec!(115.00));
        assert_eq!(m.estimated_net_before_ads, dec!(115.00));
        assert_eq!(m.estimated_net_after_ads, dec!(95.00));
        assert_eq!(m.roas, dec!(8.75));
        assert_eq!(m.breakeven_roas, dec!(6.75));
        assert_eq!(m.average_order_value, dec!(87.50));
        assert_eq!(m.average_fulfillment_cost, dec!(40.00));
    }

    #[test]
    fn test_zero_spend_yields_zero_ratios() {
        let totals = Totals {
            orders: 1,
            linked_orders: 1,
            revenue: dec!(100.00),
            actual_cost: dec!(30.00),
            estimated_cost: dec!(30.00),
            ad_spend: Decimal::ZERO,
            impressions: 0,
            clicks: 0,
        };
        let m = ProfitMetrics::from_totals(&totals);

        assert_eq!(m.roas, Decimal::ZERO);
        assert_eq!(m.breakeven_roas, Decimal::ZERO);
        assert_eq!(m.estimated_breakeven_roas, Decimal::ZERO);
        assert_eq!(m.ad_percent, Decimal::ZERO);
        // Subtraction still applies even when ratios guard.
        assert_eq!(m.net_after_ads, dec!(70.00));
    }

    #[test]
    fn test_empty_day_is_all_zeros() {
        let m = ProfitMetrics::from_totals(&Totals::default());
        assert_eq!(m.roas, Decimal::ZERO);
        assert_eq!(m.average_order_value, Decimal::ZERO);
        assert_eq!(m.average_fulfillment_cost, Decimal::ZERO);
        assert_eq!(m.margin_percent, Decimal::ZERO);
    }

    #[test]
    fn test_range_ratios_come_from_sums_not_averaged_days() {
        // Day 1: revenue 100, spend 10 (ROAS 10). Day 2: revenue 30, spend
        // 30 (ROAS 1). Averaging days would give 5.5; the range ROAS is
        // 130/40.
        let mut totals = Totals {
            orders: 1,
            linked_orders: 1,
            revenue: dec!(100.00),
            actual_cost: dec!(20.00),
            estimated_cost: dec!(20.00),
            ad_spend: dec!(10.00),
            impressions: 0,
            clicks: 0,
        };
        totals.absorb(&Totals {
            orders: 1,
            linked_orders: 1,
            revenue: dec!(30.00),
            actual_cost: dec!(10.00),
            estimated_cost: dec!(10.00),
            ad_spend: dec!(30.00),
            impressions: 0,
            clicks: 0,
        });

        let m = ProfitMetrics::from_totals(&totals);
        assert_eq!(m.roas, dec!(3.25));
    }
}

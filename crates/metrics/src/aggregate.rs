//! Aggregation of raw ad records into the fixed-shape totals record a
//! formula is evaluated against.

use adpulse_core::types::{AdRecord, FunnelTotals};

/// Sum a funnel's records into totals and derived averages.
///
/// Every rate carries an explicit zero guard so an empty funnel (or one
/// with no purchases/clicks/impressions) aggregates to zeros, never NaN.
/// `avg_ctr` is a percentage; `avg_cpm` is cost per thousand impressions.
pub fn aggregate(records: &[AdRecord]) -> FunnelTotals {
    let total_spent: f64 = records.iter().map(|r| r.spend).sum();
    let total_revenue: f64 = records.iter().map(|r| r.revenue).sum();
    let total_reach: f64 = records.iter().map(|r| r.reach as f64).sum();
    let total_impressions: f64 = records.iter().map(|r| r.impressions as f64).sum();
    let total_clicks: f64 = records.iter().map(|r| r.clicks as f64).sum();
    let total_link_clicks: f64 = records.iter().map(|r| r.link_clicks as f64).sum();
    let total_purchases: f64 = records.iter().map(|r| r.purchases as f64).sum();

    let ratio = |num: f64, den: f64| if den > 0.0 { num / den } else { 0.0 };

    FunnelTotals {
        total_spent,
        total_revenue,
        total_reach,
        total_impressions,
        total_clicks,
        total_link_clicks,
        total_purchases,
        avg_cpa: ratio(total_spent, total_purchases),
        avg_cpc: ratio(total_spent, total_clicks),
        avg_cpm: ratio(total_spent, total_impressions) * 1000.0,
        avg_ctr: ratio(total_clicks, total_impressions) * 100.0,
        avg_roas: ratio(total_revenue, total_spent),
    }
}

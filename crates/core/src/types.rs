use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Where a performance row was ingested from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AdProvider {
    Meta,
    Google,
    Sheets,
}

/// One row of ad-performance data for a single ad on a single day.
/// The six string fields are the only ones funnel filters read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdRecord {
    pub workspace_id: Uuid,
    pub provider: AdProvider,
    pub date: NaiveDate,
    pub campaign_name: String,
    pub campaign_id: String,
    pub adset_name: String,
    pub adset_id: String,
    pub ad_name: String,
    pub ad_id: String,
    pub spend: f64,
    pub revenue: f64,
    pub reach: u64,
    pub impressions: u64,
    pub clicks: u64,
    pub link_clicks: u64,
    pub purchases: u64,
}

/// Aggregate totals for one funnel over one reporting period. This is the
/// fixed-shape record custom-metric formulas are evaluated against.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FunnelTotals {
    pub total_spent: f64,
    pub total_revenue: f64,
    pub total_reach: f64,
    pub total_impressions: f64,
    pub total_clicks: f64,
    pub total_link_clicks: f64,
    pub total_purchases: f64,
    pub avg_cpa: f64,
    pub avg_cpc: f64,
    pub avg_cpm: f64,
    pub avg_ctr: f64,
    pub avg_roas: f64,
}

impl FunnelTotals {
    /// The camelCase names formulas use to reference each total.
    pub const ENV_KEYS: [&'static str; 12] = [
        "totalSpent",
        "totalRevenue",
        "totalReach",
        "totalImpressions",
        "totalClicks",
        "totalLinkClicks",
        "totalPurchases",
        "avgCpa",
        "avgCpc",
        "avgCpm",
        "avgCtr",
        "avgRoas",
    ];

    /// Build the numeric environment a formula is evaluated against.
    /// Every key in [`Self::ENV_KEYS`] is present; formulas referencing
    /// anything else fail with an unknown-identifier error.
    pub fn to_env(&self) -> HashMap<String, f64> {
        let values = [
            self.total_spent,
            self.total_revenue,
            self.total_reach,
            self.total_impressions,
            self.total_clicks,
            self.total_link_clicks,
            self.total_purchases,
            self.avg_cpa,
            self.avg_cpc,
            self.avg_cpm,
            self.avg_ctr,
            self.avg_roas,
        ];
        Self::ENV_KEYS
            .iter()
            .zip(values)
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }
}

/// Display format stored on a custom metric. Formatting itself happens in
/// the rendering layer; the core only carries the tag through.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MetricFormat {
    Currency,
    Percentage,
    Number,
    Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_covers_every_total() {
        let totals = FunnelTotals {
            total_spent: 120.5,
            total_revenue: 300.0,
            ..Default::default()
        };
        let env = totals.to_env();
        assert_eq!(env.len(), FunnelTotals::ENV_KEYS.len());
        assert_eq!(env["totalSpent"], 120.5);
        assert_eq!(env["totalRevenue"], 300.0);
        assert_eq!(env["avgRoas"], 0.0);
    }

    #[test]
    fn ad_record_round_trips_through_json() {
        let record = AdRecord {
            workspace_id: Uuid::new_v4(),
            provider: AdProvider::Meta,
            date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            campaign_name: "Black Friday Sale".to_string(),
            campaign_id: "c-1".to_string(),
            adset_name: "Lookalike 1%".to_string(),
            adset_id: "as-1".to_string(),
            ad_name: "Video A".to_string(),
            ad_id: "ad-1".to_string(),
            spend: 45.0,
            revenue: 180.0,
            reach: 1000,
            impressions: 1500,
            clicks: 90,
            link_clicks: 70,
            purchases: 6,
        };
        let json = serde_json::to_string(&record).unwrap();
        let back: AdRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.campaign_name, "Black Friday Sale");
        assert_eq!(back.provider, AdProvider::Meta);
        assert_eq!(back.purchases, 6);
    }
}

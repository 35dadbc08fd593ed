use std::fmt::Display;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Days billed per plan month.
pub const DAYS_PER_MONTH: i64 = 30;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionPlan {
    Basic,
    Premium,
    Enterprise,
}

impl SubscriptionPlan {
    pub const ALL: [SubscriptionPlan; 3] = [
        SubscriptionPlan::Basic,
        SubscriptionPlan::Premium,
        SubscriptionPlan::Enterprise,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionPlan::Basic => "basic",
            SubscriptionPlan::Premium => "premium",
            SubscriptionPlan::Enterprise => "enterprise",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "basic" => Some(SubscriptionPlan::Basic),
            "premium" => Some(SubscriptionPlan::Premium),
            "enterprise" => Some(SubscriptionPlan::Enterprise),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SubscriptionPlan::Basic => "Basic Plan",
            SubscriptionPlan::Premium => "Premium Plan",
            SubscriptionPlan::Enterprise => "Enterprise Plan",
        }
    }

    pub fn price_minor(&self) -> i32 {
        match self {
            SubscriptionPlan::Basic => 2_999,
            SubscriptionPlan::Premium => 19_999,
            SubscriptionPlan::Enterprise => 49_999,
        }
    }

    pub fn duration_months(&self) -> i64 {
        match self {
            SubscriptionPlan::Basic => 1,
            SubscriptionPlan::Premium | SubscriptionPlan::Enterprise => 12,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::days(DAYS_PER_MONTH * self.duration_months())
    }

    /// Access window for a subscription bought at `starts_at`.
    pub fn period_from(&self, starts_at: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        (starts_at, starts_at + self.duration())
    }
}

impl Display for SubscriptionPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

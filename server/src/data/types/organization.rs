//! Organisation model and subscription tiers

use serde::{Deserialize, Serialize};

/// Subscription tier; limits resolve from the tier table when the
/// organisation carries no override
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    #[default]
    Free,
    Trial,
    Pro,
    Enterprise,
}

impl SubscriptionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Trial => "trial",
            Self::Pro => "pro",
            Self::Enterprise => "enterprise",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "trial" => Self::Trial,
            "pro" => Self::Pro,
            "enterprise" => Self::Enterprise,
            _ => Self::Free,
        }
    }

    /// Default span-ingestion quota per hour
    pub fn rate_limit_per_hour(&self) -> i64 {
        match self {
            Self::Free => 100,
            Self::Trial | Self::Pro => 1000,
            Self::Enterprise => 10_000,
        }
    }

    pub fn retention_days(&self) -> i64 {
        match self {
            Self::Free => 7,
            Self::Trial => 14,
            Self::Pro => 30,
            Self::Enterprise => 90,
        }
    }

    pub fn max_datasets(&self) -> i64 {
        match self {
            Self::Free => 5,
            Self::Trial => 10,
            Self::Pro => 100,
            Self::Enterprise => 1000,
        }
    }
}

/// Tenant record; optional fields override the tier defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub subscription: SubscriptionTier,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit_per_hour: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_days: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_members: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_datasets: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiment_retention_days: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_examples_per_dataset: Option<i64>,
    pub created: i64,
    pub updated: i64,
}

impl Organization {
    /// Effective ingestion quota: the org override never raises the tier cap
    pub fn effective_rate_limit(&self) -> i64 {
        let tier_default = self.subscription.rate_limit_per_hour();
        match self.rate_limit_per_hour {
            Some(limit) => limit.min(tier_default),
            None => tier_default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_defaults() {
        assert_eq!(SubscriptionTier::Free.rate_limit_per_hour(), 100);
        assert_eq!(SubscriptionTier::Trial.rate_limit_per_hour(), 1000);
        assert_eq!(SubscriptionTier::Pro.rate_limit_per_hour(), 1000);
        assert_eq!(SubscriptionTier::Enterprise.rate_limit_per_hour(), 10_000);
    }

    #[test]
    fn test_effective_rate_limit_uses_min() {
        let mut org = Organization {
            subscription: SubscriptionTier::Pro,
            ..Default::default()
        };
        assert_eq!(org.effective_rate_limit(), 1000);

        org.rate_limit_per_hour = Some(500);
        assert_eq!(org.effective_rate_limit(), 500);

        // An override above the tier cap is clamped down
        org.rate_limit_per_hour = Some(50_000);
        assert_eq!(org.effective_rate_limit(), 1000);
    }

    #[test]
    fn test_tier_parse() {
        assert_eq!(SubscriptionTier::parse("enterprise"), SubscriptionTier::Enterprise);
        assert_eq!(SubscriptionTier::parse("unknown"), SubscriptionTier::Free);
    }
}

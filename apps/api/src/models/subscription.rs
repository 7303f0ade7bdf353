use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A user's entitlement to run analyses: either an active monthly
/// subscription or purchased one-time credits.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SubscriptionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    /// "active", "canceled", or "past_due".
    pub status: String,
    /// "subscription" for the monthly plan, "one-time" for credit purchases.
    pub plan: String,
    pub credits_remaining: i32,
    pub stripe_customer_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubscriptionRow {
    /// Whether this row entitles the user to run one more analysis.
    pub fn can_analyze(&self) -> bool {
        match self.plan.as_str() {
            "subscription" => self.status == "active",
            "one-time" => self.status == "active" && self.credits_remaining > 0,
            _ => false,
        }
    }

    /// Whether completing an analysis should consume a credit.
    pub fn consumes_credit(&self) -> bool {
        self.plan == "one-time"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(plan: &str, status: &str, credits: i32) -> SubscriptionRow {
        SubscriptionRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            status: status.to_string(),
            plan: plan.to_string(),
            credits_remaining: credits,
            stripe_customer_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_active_subscription_can_analyze() {
        assert!(row("subscription", "active", 0).can_analyze());
        assert!(!row("subscription", "canceled", 0).can_analyze());
        assert!(!row("subscription", "past_due", 0).can_analyze());
    }

    #[test]
    fn test_one_time_plan_requires_credits() {
        assert!(row("one-time", "active", 1).can_analyze());
        assert!(!row("one-time", "active", 0).can_analyze());
        assert!(!row("one-time", "canceled", 3).can_analyze());
    }

    #[test]
    fn test_only_one_time_plan_consumes_credits() {
        assert!(row("one-time", "active", 1).consumes_credit());
        assert!(!row("subscription", "active", 0).consumes_credit());
    }
}

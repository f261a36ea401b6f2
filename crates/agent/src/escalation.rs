use std::collections::BTreeSet;

use supportdesk_core::config::EscalationConfig;
use supportdesk_core::intent::IntentCategory;

pub const ESCALATION_MESSAGE: &str = "I am escalating your request to a human agent because it involves a sensitive or complex matter.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EscalationDecision {
    HandledAutonomously {
        category: IntentCategory,
    },
    EscalateToHuman {
        category: IntentCategory,
        reason_code: &'static str,
        user_message: String,
    },
}

impl EscalationDecision {
    pub fn category(&self) -> IntentCategory {
        match self {
            Self::HandledAutonomously { category } | Self::EscalateToHuman { category, .. } => {
                *category
            }
        }
    }

    pub fn is_escalation(&self) -> bool {
        matches!(self, Self::EscalateToHuman { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EscalationPolicy {
    sensitive: BTreeSet<IntentCategory>,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self::new(IntentCategory::ALL.into_iter().filter(IntentCategory::sensitive_by_default))
    }
}

impl EscalationPolicy {
    pub fn new(sensitive: impl IntoIterator<Item = IntentCategory>) -> Self {
        Self { sensitive: sensitive.into_iter().collect() }
    }

    pub fn from_config(config: &EscalationConfig) -> Self {
        Self::new(config.sensitive_categories.iter().copied())
    }

    pub fn is_sensitive(&self, category: IntentCategory) -> bool {
        self.sensitive.contains(&category)
    }

    pub fn evaluate(&self, category: IntentCategory) -> EscalationDecision {
        if self.is_sensitive(category) {
            return EscalationDecision::EscalateToHuman {
                category,
                reason_code: "sensitive_category",
                user_message: ESCALATION_MESSAGE.to_string(),
            };
        }

        EscalationDecision::HandledAutonomously { category }
    }
}

#[cfg(test)]
mod tests {
    use supportdesk_core::config::EscalationConfig;
    use supportdesk_core::intent::IntentCategory;

    use super::{EscalationDecision, EscalationPolicy, ESCALATION_MESSAGE};

    #[test]
    fn tech_support_escalates_by_default() {
        let policy = EscalationPolicy::default();
        let decision = policy.evaluate(IntentCategory::TechSupport);

        let (category, reason_code, user_message) = match decision {
            EscalationDecision::EscalateToHuman { category, reason_code, user_message } => {
                (Some(category), reason_code, user_message)
            }
            _ => (None, "", String::new()),
        };

        assert_eq!(category, Some(IntentCategory::TechSupport));
        assert_eq!(reason_code, "sensitive_category");
        assert_eq!(user_message, ESCALATION_MESSAGE);
    }

    #[test]
    fn non_sensitive_categories_never_escalate() {
        let policy = EscalationPolicy::default();

        let autonomous =
            [IntentCategory::Billing, IntentCategory::Refund, IntentCategory::GeneralInfo];

        for category in autonomous {
            assert_eq!(
                policy.evaluate(category),
                EscalationDecision::HandledAutonomously { category }
            );
        }
    }

    #[test]
    fn evaluation_is_pure() {
        let policy = EscalationPolicy::default();

        for category in IntentCategory::ALL {
            let first = policy.evaluate(category);
            for _ in 0..3 {
                assert_eq!(policy.evaluate(category), first);
            }
            assert_eq!(first.category(), category);
        }
    }

    #[test]
    fn configured_set_replaces_default() {
        let policy = EscalationPolicy::from_config(&EscalationConfig {
            sensitive_categories: vec![IntentCategory::Refund],
        });

        assert!(policy.evaluate(IntentCategory::Refund).is_escalation());
        assert!(!policy.evaluate(IntentCategory::TechSupport).is_escalation());
    }

    #[test]
    fn empty_set_never_escalates() {
        let policy = EscalationPolicy::new([]);

        assert!(IntentCategory::ALL.into_iter().all(|category| !policy.is_sensitive(category)));
    }
}

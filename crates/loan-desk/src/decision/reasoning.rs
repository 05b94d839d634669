use serde::{Deserialize, Serialize};

use super::features::{FeatureField, FeatureVector};

/// Heuristic explanation attached to a rejected application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionExplanation {
    pub reason: String,
    pub tip: String,
    pub estimated_time: String,
}

/// Which rule in the table produced an explanation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionRule {
    LowCreditScore,
    ExcessiveLoanAmount,
    InsufficientIncome,
    GeneralCriteria,
}

pub(crate) struct RuleEntry {
    pub rule: RejectionRule,
    pub applies: fn(&FeatureVector) -> bool,
    pub reason: &'static str,
    pub tip: &'static str,
    pub estimated_time: &'static str,
}

const MINIMUM_CREDIT_SCORE: f64 = 600.0;
const MAXIMUM_LOAN_AMOUNT: f64 = 500_000.0;
const MINIMUM_INCOME: f64 = 2_000.0;

/// Evaluated top to bottom; the last entry always applies.
pub(crate) static REJECTION_RULES: [RuleEntry; 4] = [
    RuleEntry {
        rule: RejectionRule::LowCreditScore,
        applies: |vector| vector.get(FeatureField::CreditScore) < MINIMUM_CREDIT_SCORE,
        reason: "Credit score is too low.",
        tip: "Pay bills on time, reduce credit card usage, and maintain older accounts.",
        estimated_time: "3-6 months",
    },
    RuleEntry {
        rule: RejectionRule::ExcessiveLoanAmount,
        applies: |vector| vector.get(FeatureField::LoanAmount) > MAXIMUM_LOAN_AMOUNT,
        reason: "Loan amount requested is too high.",
        tip: "Consider reducing the loan amount or improving your income profile.",
        estimated_time: "1-3 months",
    },
    RuleEntry {
        rule: RejectionRule::InsufficientIncome,
        applies: |vector| vector.get(FeatureField::Income) < MINIMUM_INCOME,
        reason: "Income is below acceptable threshold.",
        tip: "Increase stable income or add co-applicant with income.",
        estimated_time: "2-4 months",
    },
    RuleEntry {
        rule: RejectionRule::GeneralCriteria,
        applies: |_| true,
        reason: "One or more inputs do not meet the bank's requirements.",
        tip: "Review inputs or consult with a financial advisor.",
        estimated_time: "Varies",
    },
];

/// First matching rule for the vector.
pub fn matching_rule(vector: &FeatureVector) -> RejectionRule {
    select(vector).rule
}

/// Explain a rejection. Only meaningful once the model has already rejected the vector.
pub fn explain(vector: &FeatureVector) -> RejectionExplanation {
    let entry = select(vector);
    RejectionExplanation {
        reason: entry.reason.to_string(),
        tip: entry.tip.to_string(),
        estimated_time: entry.estimated_time.to_string(),
    }
}

fn select(vector: &FeatureVector) -> &'static RuleEntry {
    REJECTION_RULES
        .iter()
        .find(|entry| (entry.applies)(vector))
        .unwrap_or(&REJECTION_RULES[REJECTION_RULES.len() - 1])
}

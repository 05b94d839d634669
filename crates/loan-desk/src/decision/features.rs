use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Number of applicant attributes the scoring model consumes.
pub const FEATURE_COUNT: usize = 11;

/// Applicant attributes in the order the scoring model expects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureField {
    Income,
    CoapplicantIncome,
    LoanAmount,
    LoanTerm,
    CreditScore,
    Dependents,
    Gender,
    Married,
    Education,
    SelfEmployed,
    PropertyArea,
}

impl FeatureField {
    pub const ORDERED: [FeatureField; FEATURE_COUNT] = [
        FeatureField::Income,
        FeatureField::CoapplicantIncome,
        FeatureField::LoanAmount,
        FeatureField::LoanTerm,
        FeatureField::CreditScore,
        FeatureField::Dependents,
        FeatureField::Gender,
        FeatureField::Married,
        FeatureField::Education,
        FeatureField::SelfEmployed,
        FeatureField::PropertyArea,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            FeatureField::Income => "income",
            FeatureField::CoapplicantIncome => "coapplicant_income",
            FeatureField::LoanAmount => "loan_amount",
            FeatureField::LoanTerm => "loan_term",
            FeatureField::CreditScore => "credit_score",
            FeatureField::Dependents => "dependents",
            FeatureField::Gender => "gender",
            FeatureField::Married => "married",
            FeatureField::Education => "education",
            FeatureField::SelfEmployed => "self_employed",
            FeatureField::PropertyArea => "property_area",
        }
    }

    /// Position of the field inside a [`FeatureVector`].
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for FeatureField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Raw applicant fields as submitted by a caller, keyed by field name.
///
/// JSON numbers are accepted alongside strings and kept in their textual form so that the
/// builder applies a single parsing rule regardless of transport.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawFields(BTreeMap<String, String>);

impl RawFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

impl<K, V> FromIterator<(K, V)> for RawFields
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

impl<'de> Deserialize<'de> for RawFields {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let values = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
        let fields = values
            .into_iter()
            .map(|(key, value)| {
                let text = match value {
                    serde_json::Value::String(text) => text,
                    serde_json::Value::Number(number) => number.to_string(),
                    other => other.to_string(),
                };
                (key, text)
            })
            .collect();
        Ok(Self(fields))
    }
}

/// Fixed-order numeric encoding of an applicant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn new(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    pub fn get(&self, field: FeatureField) -> f64 {
        self.0[field.index()]
    }

    pub fn as_array(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }
}

/// Caller-correctable problem with the submitted fields.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidInputError {
    #[error("missing required field '{0}'")]
    MissingField(FeatureField),
    #[error("field '{field}' must be numeric (got '{value}')")]
    NotNumeric { field: FeatureField, value: String },
}

/// Parse the raw fields into a [`FeatureVector`], reporting the first offending field.
pub fn build(raw: &RawFields) -> Result<FeatureVector, InvalidInputError> {
    let mut values = [0.0; FEATURE_COUNT];

    for field in FeatureField::ORDERED {
        let text = raw
            .get(field.key())
            .ok_or(InvalidInputError::MissingField(field))?;
        let value = text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| InvalidInputError::NotNumeric {
                field,
                value: text.to_string(),
            })?;
        values[field.index()] = value;
    }

    Ok(FeatureVector(values))
}

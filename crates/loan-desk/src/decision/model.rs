use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::features::FEATURE_COUNT;
use super::scoring::{ScoringCapability, ScoringError};

/// Per-feature standardisation: `(x - mean) / scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: [f64; FEATURE_COUNT],
    pub scale: [f64; FEATURE_COUNT],
}

/// Logistic regression over the scaled features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticClassifier {
    pub coefficients: [f64; FEATURE_COUNT],
    pub intercept: f64,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

fn default_threshold() -> f64 {
    0.5
}

impl LogisticClassifier {
    pub fn probability(&self, scaled: &[f64; FEATURE_COUNT]) -> f64 {
        let logit = self
            .coefficients
            .iter()
            .zip(scaled.iter())
            .map(|(weight, value)| weight * value)
            .sum::<f64>()
            + self.intercept;
        1.0 / (1.0 + (-logit).exp())
    }
}

/// Model artifact pairing the scaler with the classifier it was trained against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearScoringModel {
    pub scaler: StandardScaler,
    pub classifier: LogisticClassifier,
}

#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    #[error("failed to open model artifact {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("model artifact is not valid JSON: {0}")]
    Format(#[from] serde_json::Error),
    #[error("scaler entry {index} has zero or non-finite scale")]
    DegenerateScale { index: usize },
}

impl LinearScoringModel {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ModelLoadError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ModelLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ModelLoadError> {
        let model: Self = serde_json::from_reader(reader)?;
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<(), ModelLoadError> {
        match self
            .scaler
            .scale
            .iter()
            .position(|scale| *scale == 0.0 || !scale.is_finite())
        {
            Some(index) => Err(ModelLoadError::DegenerateScale { index }),
            None => Ok(()),
        }
    }
}

impl ScoringCapability for LinearScoringModel {
    fn scale(&self, features: &[f64; FEATURE_COUNT]) -> Result<[f64; FEATURE_COUNT], ScoringError> {
        let mut scaled = [0.0; FEATURE_COUNT];
        for (index, value) in features.iter().enumerate() {
            scaled[index] = (value - self.scaler.mean[index]) / self.scaler.scale[index];
        }
        Ok(scaled)
    }

    fn predict(&self, scaled: &[f64; FEATURE_COUNT]) -> Result<i64, ScoringError> {
        let probability = self.classifier.probability(scaled);
        if probability.is_nan() {
            return Err(ScoringError::Capability(
                "classifier produced a NaN probability".to_string(),
            ));
        }
        Ok(i64::from(probability >= self.classifier.threshold))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact() -> &'static str {
        r#"{
            "scaler": {
                "mean": [5000, 1500, 150000, 360, 680, 1, 0.5, 0.5, 0.5, 0.2, 1],
                "scale": [3000, 1500, 100000, 60, 60, 1, 0.5, 0.5, 0.5, 0.4, 0.8]
            },
            "classifier": {
                "coefficients": [0.6, 0.3, -0.8, -0.1, 2.2, -0.1, 0.0, 0.1, 0.2, -0.1, 0.1],
                "intercept": 0.4
            }
        }"#
    }

    #[test]
    fn loads_artifact_with_default_threshold() {
        let model = LinearScoringModel::from_reader(artifact().as_bytes()).expect("model loads");
        assert_eq!(model.classifier.threshold, 0.5);
        assert_eq!(model.scaler.mean[4], 680.0);
    }

    #[test]
    fn rejects_zero_scale() {
        let raw = artifact().replace("[3000, 1500", "[3000, 0");
        match LinearScoringModel::from_reader(raw.as_bytes()) {
            Err(ModelLoadError::DegenerateScale { index }) => assert_eq!(index, 1),
            other => panic!("expected degenerate scale error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_wrong_feature_count() {
        let raw = artifact().replace("0.4, 0.8]", "0.4]");
        assert!(matches!(
            LinearScoringModel::from_reader(raw.as_bytes()),
            Err(ModelLoadError::Format(_))
        ));
    }

    #[test]
    fn scales_features_around_the_mean() {
        let model = LinearScoringModel::from_reader(artifact().as_bytes()).expect("model loads");
        let mean = model.scaler.mean;
        let scaled = model.scale(&mean).expect("scales");
        assert!(scaled.iter().all(|value| value.abs() < f64::EPSILON));
    }

    #[test]
    fn strong_credit_is_labelled_approved() {
        let model = LinearScoringModel::from_reader(artifact().as_bytes()).expect("model loads");
        let strong = [8000.0, 2000.0, 120000.0, 360.0, 780.0, 0.0, 1.0, 1.0, 1.0, 0.0, 2.0];
        let weak = [1500.0, 0.0, 400000.0, 360.0, 520.0, 3.0, 0.0, 0.0, 0.0, 1.0, 0.0];

        let strong_label = model
            .predict(&model.scale(&strong).expect("scales"))
            .expect("predicts");
        let weak_label = model
            .predict(&model.scale(&weak).expect("scales"))
            .expect("predicts");

        assert_eq!(strong_label, 1);
        assert_eq!(weak_label, 0);
    }
}

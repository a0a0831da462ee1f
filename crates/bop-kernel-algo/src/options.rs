//! Settings shared by the filler and the builder.

use bop_kernel_intersect::State;
use serde::{Deserialize, Serialize};

/// Options of a Boolean operation.
///
/// Every field has a default, so a TOML document only needs the keys it
/// changes:
///
/// ```
/// use bop_kernel_algo::BopOptions;
///
/// let options = BopOptions::from_toml_str("fuzzy_value = 1e-4\nstrict = true").unwrap();
/// assert_eq!(options.fuzzy_value, 1e-4);
/// assert!(options.run_parallel);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BopOptions {
    /// Extra tolerance added to every proximity test.
    pub fuzzy_value: f64,
    /// Run bounding boxes, pairwise intersection and splitting on the rayon pool.
    pub run_parallel: bool,
    /// Drop internal edges, vertices and faces instead of keeping them as `Internal`.
    pub avoid_internal_shapes: bool,
    /// Largest accepted tolerance growth of a merged vertex, `None` for no limit.
    pub max_tolerance_growth: Option<f64>,
    /// Turn tolerance conflicts into errors instead of warnings.
    pub strict: bool,
    /// How ambiguous point classifications are resolved.
    pub classification: ClassificationPolicy,
}

impl Default for BopOptions {
    fn default() -> Self {
        Self {
            fuzzy_value: 0.0,
            run_parallel: true,
            avoid_internal_shapes: false,
            max_tolerance_growth: None,
            strict: false,
            classification: ClassificationPolicy::default(),
        }
    }
}

impl BopOptions {
    /// Parse options from a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        let mut options: BopOptions = toml::from_str(text)?;
        options.fuzzy_value = options.fuzzy_value.max(0.0);
        Ok(options)
    }

    /// Fuzzy value, clamped to be non-negative.
    pub fn fuzzy(&self) -> f64 {
        self.fuzzy_value.max(0.0)
    }
}

/// Resolution of classifications that disagree across sample points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationPolicy {
    /// States from most to least preferred when samples disagree.
    pub priority: Vec<State>,
    /// Number of sample points tried per piece.
    pub samples: usize,
}

impl Default for ClassificationPolicy {
    fn default() -> Self {
        Self {
            priority: vec![State::In, State::On, State::Out],
            samples: 3,
        }
    }
}

impl ClassificationPolicy {
    /// Combine sampled states into one.
    ///
    /// `Unknown` samples are ignored. Returns the state and whether the
    /// samples disagreed.
    pub fn resolve(&self, states: &[State]) -> (State, bool) {
        let mut seen: Vec<State> = Vec::new();
        for s in states {
            if *s != State::Unknown && !seen.contains(s) {
                seen.push(*s);
            }
        }
        match seen.as_slice() {
            [] => (State::Unknown, false),
            [only] => (*only, false),
            _ => {
                let picked = self
                    .priority
                    .iter()
                    .find(|p| seen.contains(p))
                    .copied()
                    .unwrap_or(seen[0]);
                (picked, true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_toml() {
        let options = BopOptions::from_toml_str("").unwrap();
        assert_eq!(options, BopOptions::default());
    }

    #[test]
    fn test_nested_classification_table() {
        let text = r#"
            avoid_internal_shapes = true
            max_tolerance_growth = 0.01

            [classification]
            priority = ["Out", "On", "In"]
            samples = 5
        "#;
        let options = BopOptions::from_toml_str(text).unwrap();
        assert!(options.avoid_internal_shapes);
        assert_eq!(options.max_tolerance_growth, Some(0.01));
        assert_eq!(options.classification.samples, 5);
        assert_eq!(options.classification.priority[0], State::Out);
    }

    #[test]
    fn test_negative_fuzzy_is_clamped() {
        let options = BopOptions::from_toml_str("fuzzy_value = -1.0").unwrap();
        assert_eq!(options.fuzzy_value, 0.0);
    }

    #[test]
    fn test_resolve_by_priority() {
        let policy = ClassificationPolicy::default();
        assert_eq!(policy.resolve(&[State::Out, State::Out]), (State::Out, false));
        assert_eq!(policy.resolve(&[State::Out, State::In]), (State::In, true));
        assert_eq!(policy.resolve(&[State::On, State::Out]), (State::On, true));
        assert_eq!(policy.resolve(&[State::Unknown]), (State::Unknown, false));
    }
}

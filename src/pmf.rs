/*! Discrete probability mass functions and the distribution registry.

A [Pmf] describes a discrete random variable over the crate's time
domain, such as the computation time or the inter-arrival time of a
task. Distributions can be configured by name through [registry()];
the standard types are `degenerate`, `uniform` and `discrete`.
*/

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::config::ConfigNode;
use crate::error::{Error, Result};
use crate::registry::{downcast_parameters, Builder, ParameterBundle, Registry};
use crate::time::Time;

/// Tolerance used when checking that a configured distribution sums to one.
pub const NORMALIZATION_TOLERANCE: f64 = 1e-6;

/// The largest support a uniform distribution may be built over.
pub const MAX_UNIFORM_SUPPORT: u64 = 1 << 20;

const CONTEXT: &str = "distribution";

/// A probability mass function over [Time] values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pmf {
    masses: BTreeMap<Time, f64>,
}

impl Pmf {
    /// An empty mass function (no value has positive probability yet).
    pub fn new() -> Self {
        Self::default()
    }

    /// A distribution concentrated on `value` (probability one).
    pub fn degenerate(value: Time) -> Self {
        Pmf {
            masses: BTreeMap::from([(value, 1.0)]),
        }
    }

    /// The uniform distribution over all integers in `[min, max]`.
    pub fn uniform(min: Time, max: Time) -> Result<Self> {
        if min > max {
            return Err(Error::invalid_argument(
                CONTEXT,
                format!("uniform bounds inverted ({} > {})", min, max),
            ));
        }
        let support = (max - min)
            .checked_add(1)
            .filter(|n| *n <= MAX_UNIFORM_SUPPORT)
            .ok_or_else(|| {
                Error::invalid_argument(
                    CONTEXT,
                    format!(
                        "uniform support [{}, {}] exceeds {} values",
                        min, max, MAX_UNIFORM_SUPPORT
                    ),
                )
            })?;
        let mass = 1.0 / support as f64;
        Ok(Pmf {
            masses: (min..=max).map(|v| (v, mass)).collect(),
        })
    }

    /// Build a distribution from `(value, probability)` pairs. Masses
    /// of repeated values accumulate.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Time, f64)>) -> Result<Self> {
        let mut pmf = Pmf::new();
        for (value, probability) in pairs {
            let current = pmf.probability(value);
            pmf.set(value, current + probability)?;
        }
        Ok(pmf)
    }

    /// Assign `probability` to `value`, replacing any previous mass.
    pub fn set(&mut self, value: Time, probability: f64) -> Result<()> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(Error::invalid_argument(
                CONTEXT,
                format!("probability {} of value {} outside [0, 1]", probability, value),
            ));
        }
        self.masses.insert(value, probability);
        Ok(())
    }

    /// The probability of `value` (zero for values not in the support).
    pub fn probability(&self, value: Time) -> f64 {
        self.masses.get(&value).copied().unwrap_or(0.0)
    }

    /// The smallest value with an assigned mass.
    pub fn min(&self) -> Option<Time> {
        self.masses.keys().next().copied()
    }

    /// The largest value with an assigned mass.
    pub fn max(&self) -> Option<Time> {
        self.masses.keys().next_back().copied()
    }

    /// The expected value.
    pub fn mean(&self) -> f64 {
        self.masses.iter().map(|(v, p)| *v as f64 * p).sum()
    }

    pub fn total_mass(&self) -> f64 {
        self.masses.values().sum()
    }

    /// Check whether the masses sum to one within `epsilon`.
    pub fn is_normalized(&self, epsilon: f64) -> bool {
        (self.total_mass() - 1.0).abs() <= epsilon
    }

    pub fn len(&self) -> usize {
        self.masses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masses.is_empty()
    }

    /// Iterate over `(value, probability)` pairs in ascending order of value.
    pub fn iter(&self) -> impl Iterator<Item = (Time, f64)> + '_ {
        self.masses.iter().map(|(v, p)| (*v, *p))
    }
}

/// Parameters of the `degenerate` distribution type.
#[derive(Debug, Clone, PartialEq)]
pub struct DegenerateParameters {
    pub value: Time,
}

/// Parameters of the `uniform` distribution type.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformParameters {
    pub min: Time,
    pub max: Time,
}

/// Parameters of the `discrete` distribution type.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscreteParameters {
    pub masses: Vec<(Time, f64)>,
}

/// Builds the `degenerate` distribution type: `{ value }`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DegenerateBuilder;

impl Builder<Pmf> for DegenerateBuilder {
    fn parse_parameters(&self, config: &ConfigNode<'_>) -> Result<ParameterBundle> {
        Ok(Box::new(DegenerateParameters {
            value: config.required_u64("value")?,
        }))
    }

    fn create_instance(&self, parameters: &(dyn Any + Send + Sync)) -> Result<Box<Pmf>> {
        let p: &DegenerateParameters = downcast_parameters(parameters, CONTEXT, "degenerate")?;
        Ok(Box::new(Pmf::degenerate(p.value)))
    }
}

/// Builds the `uniform` distribution type: `{ min, max }`.
#[derive(Debug, Default, Clone, Copy)]
pub struct UniformBuilder;

impl Builder<Pmf> for UniformBuilder {
    fn parse_parameters(&self, config: &ConfigNode<'_>) -> Result<ParameterBundle> {
        Ok(Box::new(UniformParameters {
            min: config.required_u64("min")?,
            max: config.required_u64("max")?,
        }))
    }

    fn create_instance(&self, parameters: &(dyn Any + Send + Sync)) -> Result<Box<Pmf>> {
        let p: &UniformParameters = downcast_parameters(parameters, CONTEXT, "uniform")?;
        Pmf::uniform(p.min, p.max).map(Box::new)
    }
}

/// Builds the `discrete` distribution type:
/// `{ values: [ { value, probability }, ... ] }`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscreteBuilder;

impl Builder<Pmf> for DiscreteBuilder {
    fn parse_parameters(&self, config: &ConfigNode<'_>) -> Result<ParameterBundle> {
        let masses = config
            .children("values")?
            .iter()
            .map(|entry| -> Result<(Time, f64)> {
                Ok((entry.required_u64("value")?, entry.required_f64("probability")?))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Box::new(DiscreteParameters { masses }))
    }

    fn create_instance(&self, parameters: &(dyn Any + Send + Sync)) -> Result<Box<Pmf>> {
        let p: &DiscreteParameters = downcast_parameters(parameters, CONTEXT, "discrete")?;
        let pmf = Pmf::from_pairs(p.masses.iter().copied())?;
        if pmf.is_empty() {
            return Err(Error::invalid_argument(CONTEXT, "no values given"));
        }
        if !pmf.is_normalized(NORMALIZATION_TOLERANCE) {
            return Err(Error::invalid_argument(
                CONTEXT,
                format!("probabilities sum to {} instead of 1", pmf.total_mass()),
            ));
        }
        Ok(Box::new(pmf))
    }
}

/// Register the standard distribution types with `registry`.
pub fn register_standard_types(registry: &Registry<Pmf>) {
    registry.register_type("degenerate", DegenerateBuilder);
    registry.register_type("uniform", UniformBuilder);
    registry.register_type("discrete", DiscreteBuilder);
}

/// The process-wide distribution registry, holding the standard types
/// from the first access on.
pub fn registry() -> &'static Registry<Pmf> {
    static REGISTRY: OnceLock<Registry<Pmf>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let registry = Registry::new(CONTEXT);
        register_standard_types(&registry);
        registry
    })
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;

    use super::{registry, Pmf, MAX_UNIFORM_SUPPORT};
    use crate::config::Document;
    use crate::error::ErrorKind;

    #[test]
    fn degenerate_and_uniform() {
        let p = Pmf::degenerate(10);
        assert_eq!(p.probability(10), 1.0);
        assert_eq!(p.probability(9), 0.0);
        assert_eq!((p.min(), p.max()), (Some(10), Some(10)));

        let u = Pmf::uniform(2, 5).unwrap();
        assert_eq!(u.len(), 4);
        assert_approx_eq!(u.probability(3), 0.25);
        assert_approx_eq!(u.mean(), 3.5);
        assert!(u.is_normalized(1e-9));
        assert_eq!(Pmf::uniform(5, 2).unwrap_err().kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn uniform_support_is_bounded() {
        let err = Pmf::uniform(0, u64::MAX).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        let err = Pmf::uniform(7, 7 + MAX_UNIFORM_SUPPORT).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        let widest = Pmf::uniform(7, 6 + MAX_UNIFORM_SUPPORT).unwrap();
        assert_eq!(widest.len() as u64, MAX_UNIFORM_SUPPORT);

        let doc = Document::from_json_str(
            r#"{ "type": "uniform", "min": 0, "max": 18446744073709551615 }"#,
        )
        .unwrap();
        let err = registry().create_from(&doc.root()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let doc =
            Document::from_json_str(r#"{ "type": "uniform", "min": 0, "max": 1000000000000 }"#)
                .unwrap();
        let err = registry().create_from(&doc.root()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn masses_must_be_probabilities() {
        let mut p = Pmf::new();
        assert!(p.set(3, 1.5).is_err());
        assert!(p.set(3, -0.1).is_err());
        assert!(p.is_empty());
        let q = Pmf::from_pairs(vec![(1, 0.25), (2, 0.5), (1, 0.25)]).unwrap();
        assert_approx_eq!(q.probability(1), 0.5);
        assert_eq!(q.iter().collect::<Vec<_>>(), vec![(1, 0.5), (2, 0.5)]);
    }

    #[test]
    fn configured_distributions() {
        let doc = Document::from_json_str(
            r#"{ "type": "discrete", "values": [
                 { "value": 2, "probability": 0.2 },
                 { "value": 4, "probability": 0.8 } ] }"#,
        )
        .unwrap();
        let p = registry().create_from(&doc.root()).unwrap();
        assert_approx_eq!(p.mean(), 3.6);

        let doc = Document::from_json_str(r#"{ "type": "uniform", "min": 1, "max": 4 }"#).unwrap();
        assert_eq!(registry().create_from(&doc.root()).unwrap().len(), 4);
    }

    #[test]
    fn discrete_distribution_must_be_normalized() {
        let doc = Document::from_json_str(
            r#"{ "values": [ { "value": 2, "probability": 0.2 } ] }"#,
        )
        .unwrap();
        let err = registry().create("discrete", &doc.root()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}

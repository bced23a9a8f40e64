/*! Quality-of-service functions.

A [QoSFun] maps the probability of meeting a deadline to a scalar
utility, which an optimizer can aggregate to rank scheduling
configurations. This module provides the two standard shapes,
[LinearQoSFun] and [QuadraticQoSFun], together with builders that
configure them by name through [registry()].
*/

use std::fmt::Debug;
use std::sync::OnceLock;

use auto_impl::auto_impl;

use crate::error::{Error, Result};
use crate::registry::Registry;

/// A monotone mapping from a deadline-satisfaction probability to a utility.
///
/// Implementations must be pure: evaluating a QoS function never
/// changes it, so shared instances can be evaluated concurrently.
#[auto_impl(&, Box, Arc)]
pub trait QoSFun: Debug + Send + Sync {
    /// Map `probability` to a utility. Inputs outside `[0, 1]` fall
    /// onto the nearest flat branch; NaN falls onto the lower one.
    fn eval(&self, probability: f64) -> f64;
}

mod linear;
mod quadratic;

pub use linear::{LinearQoSFun, LinearQoSFunBuilder, LinearQoSFunParameters};
pub use quadratic::{QuadraticQoSFun, QuadraticQoSFunBuilder, QuadraticQoSFunParameters};

const FAMILY: &str = "qos function";

// Shared by both constructors: the shape must be well defined.
fn check_shape(context: &str, scale: f64, pmin: f64, pmax: f64) -> Result<()> {
    if !(pmax >= pmin) {
        return Err(Error::invalid_argument(
            context,
            format!("pmax ({}) smaller than pmin ({})", pmax, pmin),
        ));
    }
    if !(scale >= 0.0) {
        return Err(Error::invalid_argument(
            context,
            format!("negative scale ({})", scale),
        ));
    }
    Ok(())
}

// Shared by both builders: configured limits must be probabilities.
fn check_probability_limits(context: &str, scale: f64, pmin: f64, pmax: f64) -> Result<()> {
    for (label, p) in [("pmin", pmin), ("pmax", pmax)] {
        if !(0.0..=1.0).contains(&p) {
            return Err(Error::invalid_argument(
                context,
                format!("{} ({}) outside [0, 1]", label, p),
            ));
        }
    }
    check_shape(context, scale, pmin, pmax)
}

/// Register the standard QoS function types with `registry`.
pub fn register_standard_types(registry: &Registry<dyn QoSFun>) {
    registry.register_type("linear", LinearQoSFunBuilder);
    registry.register_type("quadratic", QuadraticQoSFunBuilder);
}

/// The process-wide QoS function registry, holding the standard types
/// from the first access on.
pub fn registry() -> &'static Registry<dyn QoSFun> {
    static REGISTRY: OnceLock<Registry<dyn QoSFun>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let registry = Registry::new(FAMILY);
        register_standard_types(&registry);
        registry
    })
}

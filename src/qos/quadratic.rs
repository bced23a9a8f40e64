use std::any::Any;

use super::{check_probability_limits, check_shape, QoSFun, FAMILY};
use crate::config::ConfigNode;
use crate::error::Result;
use crate::registry::{downcast_parameters, Builder, ParameterBundle};

/// Quadratic QoS: zero up to `pmin`, `scale * (p - pmin)^2` up to
/// `pmax`, and saturated at `scale * (pmax - pmin)^2` beyond.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadraticQoSFun {
    scale: f64,
    pmin: f64,
    pmax: f64,
}

impl QuadraticQoSFun {
    /// Construct a new quadratic QoS function, where `pmin <= pmax`
    /// and `scale >= 0`.
    pub fn new(scale: f64, pmin: f64, pmax: f64) -> Result<Self> {
        check_shape("quadratic qos function", scale, pmin, pmax)?;
        Ok(QuadraticQoSFun { scale, pmin, pmax })
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn pmin(&self) -> f64 {
        self.pmin
    }

    pub fn pmax(&self) -> f64 {
        self.pmax
    }
}

impl QoSFun for QuadraticQoSFun {
    fn eval(&self, probability: f64) -> f64 {
        let excess = if probability.is_nan() || probability <= self.pmin {
            0.0
        } else if probability > self.pmax {
            self.pmax - self.pmin
        } else {
            probability - self.pmin
        };
        self.scale * excess * excess
    }
}

/// Parameters of the `quadratic` QoS function type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadraticQoSFunParameters {
    pub scale: f64,
    pub pmin: f64,
    pub pmax: f64,
}

/// Builds the `quadratic` QoS function type: `{ scale, pmin, pmax }`.
#[derive(Debug, Default, Clone, Copy)]
pub struct QuadraticQoSFunBuilder;

impl Builder<dyn QoSFun> for QuadraticQoSFunBuilder {
    fn parse_parameters(&self, config: &ConfigNode<'_>) -> Result<ParameterBundle> {
        Ok(Box::new(QuadraticQoSFunParameters {
            scale: config.required_f64("scale")?,
            pmin: config.required_f64("pmin")?,
            pmax: config.required_f64("pmax")?,
        }))
    }

    fn create_instance(&self, parameters: &(dyn Any + Send + Sync)) -> Result<Box<dyn QoSFun>> {
        let p: &QuadraticQoSFunParameters = downcast_parameters(parameters, FAMILY, "quadratic")?;
        check_probability_limits("quadratic qos function", p.scale, p.pmin, p.pmax)?;
        Ok(Box::new(QuadraticQoSFun::new(p.scale, p.pmin, p.pmax)?))
    }
}

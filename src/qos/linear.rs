use std::any::Any;

use super::{check_probability_limits, check_shape, QoSFun, FAMILY};
use crate::config::ConfigNode;
use crate::error::Result;
use crate::registry::{downcast_parameters, Builder, ParameterBundle};

/// Piecewise-linear QoS: flat at `offset` up to `pmin`, rising with
/// slope `scale` up to `pmax`, and flat at
/// `offset + scale * (pmax - pmin)` beyond.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearQoSFun {
    scale: f64,
    pmin: f64,
    pmax: f64,
    offset: f64,
}

impl LinearQoSFun {
    /// Construct a new linear QoS function, where `pmin <= pmax`
    /// and `scale >= 0`.
    pub fn new(scale: f64, pmin: f64, pmax: f64, offset: f64) -> Result<Self> {
        check_shape("linear qos function", scale, pmin, pmax)?;
        Ok(LinearQoSFun {
            scale,
            pmin,
            pmax,
            offset,
        })
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

    pub fn offset(&self) -> f64 {
        self.offset
    }
}

impl QoSFun for LinearQoSFun {
    fn eval(&self, probability: f64) -> f64 {
        if probability.is_nan() || probability <= self.pmin {
            self.offset
        } else if probability > self.pmax {
            self.offset + self.scale * (self.pmax - self.pmin)
        } else {
            self.offset + self.scale * (probability - self.pmin)
        }
    }
}

/// Parameters of the `linear` QoS function type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearQoSFunParameters {
    pub scale: f64,
    pub pmin: f64,
    pub pmax: f64,
    pub offset: f64,
}

/// Builds the `linear` QoS function type:
/// `{ scale, pmin, pmax, offset? }`, with `offset` defaulting to zero.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinearQoSFunBuilder;

impl Builder<dyn QoSFun> for LinearQoSFunBuilder {
    fn parse_parameters(&self, config: &ConfigNode<'_>) -> Result<ParameterBundle> {
        Ok(Box::new(LinearQoSFunParameters {
            scale: config.required_f64("scale")?,
            pmin: config.required_f64("pmin")?,
            pmax: config.required_f64("pmax")?,
            offset: config.optional_f64("offset")?.unwrap_or(0.0),
        }))
    }

    fn create_instance(&self, parameters: &(dyn Any + Send + Sync)) -> Result<Box<dyn QoSFun>> {
        let p: &LinearQoSFunParameters = downcast_parameters(parameters, FAMILY, "linear")?;
        check_probability_limits("linear qos function", p.scale, p.pmin, p.pmax)?;
        Ok(Box::new(LinearQoSFun::new(p.scale, p.pmin, p.pmax, p.offset)?))
    }
}

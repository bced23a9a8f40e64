use std::any::Any;

use super::{FixedPriorityTaskDescriptor, ResourceReservationTaskDescriptor, TaskDescriptor};
use crate::config::ConfigNode;
use crate::error::Result;
use crate::pmf::{self, Pmf};
use crate::registry::{downcast_parameters, Builder, ParameterBundle};
use crate::time::{Deadline, Duration, Service};

const FAMILY: &str = "task";

/// How jobs of a configured task arrive.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrivalParameters {
    Periodic { period: Duration },
    Aperiodic { interarrival_time: Pmf },
}

/// The configuration shared by all task types:
///
/// ```text
/// name: <string>
/// computation_time: <distribution>
/// period: <integer>  |  interarrival_time: <distribution>
/// deadline_step: <integer>     (optional)
/// deadlines: [<integer>, ...]  (optional)
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CommonTaskParameters {
    pub name: String,
    pub computation_time: Pmf,
    pub arrival: ArrivalParameters,
    pub deadline_step: Option<Duration>,
    pub deadlines: Vec<Deadline>,
}

impl CommonTaskParameters {
    /// Parse the common fields. If no `deadline_step` is configured,
    /// `default_step` is used, and then the period of a periodic task.
    pub fn parse(config: &ConfigNode<'_>, default_step: Option<Duration>) -> Result<Self> {
        let name = config.required_str("name")?.to_string();
        let computation_time = *pmf::registry().create_from(&config.child("computation_time")?)?;
        let period = config.optional_u64("period")?;
        let arrival = match (period, config.optional_child("interarrival_time")) {
            (Some(period), None) => ArrivalParameters::Periodic { period },
            (None, Some(node)) => ArrivalParameters::Aperiodic {
                interarrival_time: *pmf::registry().create_from(&node)?,
            },
            (None, None) => return Err(config.missing("period")),
            (Some(_), Some(_)) => {
                return Err(config.invalid("period", "absent when interarrival_time is given"))
            }
        };
        let deadlines = config.optional_u64_list("deadlines")?;
        let deadline_step = config
            .optional_u64("deadline_step")?
            .or(default_step)
            .or(match arrival {
                ArrivalParameters::Periodic { period } => Some(period),
                ArrivalParameters::Aperiodic { .. } => None,
            });
        if deadline_step.is_none() && !deadlines.is_empty() {
            return Err(config.missing("deadline_step"));
        }
        Ok(CommonTaskParameters {
            name,
            computation_time,
            arrival,
            deadline_step,
            deadlines,
        })
    }

    /// Apply the configured deadline step and deadlines to `task`.
    fn configure<T>(&self, mut task: T) -> Result<Box<dyn TaskDescriptor>>
    where
        T: TaskDescriptor + 'static,
    {
        if let Some(step) = self.deadline_step {
            task.set_deadline_step(step)?;
        }
        for deadline in &self.deadlines {
            task.insert_deadline(*deadline)?;
        }
        Ok(Box::new(task))
    }
}

/// Parameters of the `fixed_priority` task type.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedPriorityTaskParameters {
    pub common: CommonTaskParameters,
    pub priority: u64,
}

/// Builds the `fixed_priority` task type: the common fields plus
/// `priority`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedPriorityTaskBuilder;

impl Builder<dyn TaskDescriptor> for FixedPriorityTaskBuilder {
    fn parse_parameters(&self, config: &ConfigNode<'_>) -> Result<ParameterBundle> {
        Ok(Box::new(FixedPriorityTaskParameters {
            common: CommonTaskParameters::parse(config, None)?,
            priority: config.required_u64("priority")?,
        }))
    }

    fn create_instance(
        &self,
        parameters: &(dyn Any + Send + Sync),
    ) -> Result<Box<dyn TaskDescriptor>> {
        let p: &FixedPriorityTaskParameters =
            downcast_parameters(parameters, FAMILY, "fixed_priority")?;
        let common = &p.common;
        // anything beyond u32 is out of range anyway
        let priority = u32::try_from(p.priority).unwrap_or(u32::MAX);
        let task = match &common.arrival {
            ArrivalParameters::Periodic { period } => FixedPriorityTaskDescriptor::periodic(
                common.name.clone(),
                common.computation_time.clone(),
                *period,
                priority,
            )?,
            ArrivalParameters::Aperiodic { interarrival_time } => {
                FixedPriorityTaskDescriptor::aperiodic(
                    common.name.clone(),
                    common.computation_time.clone(),
                    interarrival_time.clone(),
                    priority,
                )?
            }
        };
        common.configure(task)
    }
}

/// Parameters of the `resource_reservation` task type.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceReservationTaskParameters {
    pub common: CommonTaskParameters,
    pub budget: Service,
    pub server_period: Duration,
}

/// Builds the `resource_reservation` task type: the common fields plus
/// `budget` and `server_period`. The deadline step defaults to the
/// server period.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResourceReservationTaskBuilder;

impl Builder<dyn TaskDescriptor> for ResourceReservationTaskBuilder {
    fn parse_parameters(&self, config: &ConfigNode<'_>) -> Result<ParameterBundle> {
        let budget = config.required_u64("budget")?;
        let server_period = config.required_u64("server_period")?;
        Ok(Box::new(ResourceReservationTaskParameters {
            common: CommonTaskParameters::parse(config, Some(server_period))?,
            budget,
            server_period,
        }))
    }

    fn create_instance(
        &self,
        parameters: &(dyn Any + Send + Sync),
    ) -> Result<Box<dyn TaskDescriptor>> {
        let p: &ResourceReservationTaskParameters =
            downcast_parameters(parameters, FAMILY, "resource_reservation")?;
        let common = &p.common;
        let task = match &common.arrival {
            ArrivalParameters::Periodic { period } => ResourceReservationTaskDescriptor::periodic(
                common.name.clone(),
                common.computation_time.clone(),
                *period,
                p.budget,
                p.server_period,
            )?,
            ArrivalParameters::Aperiodic { interarrival_time } => {
                ResourceReservationTaskDescriptor::aperiodic(
                    common.name.clone(),
                    common.computation_time.clone(),
                    interarrival_time.clone(),
                    p.budget,
                    p.server_period,
                )?
            }
        };
        common.configure(task)
    }
}

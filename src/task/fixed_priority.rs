use super::{GenericTaskDescriptor, TaskDescriptor};
use crate::error::{Error, Result};
use crate::pmf::Pmf;
use crate::solver::SchedulingParameters;
use crate::time::Duration;

/// The largest admissible scheduling priority.
pub const MAX_PRIORITY: u32 = 99;

/// A task scheduled with a fixed priority in the range `0..=99`.
#[derive(Debug)]
pub struct FixedPriorityTaskDescriptor {
    task: GenericTaskDescriptor,
    priority: u32,
}

impl FixedPriorityTaskDescriptor {
    /// Describe an aperiodic fixed-priority task.
    pub fn aperiodic(
        name: impl Into<String>,
        computation_time: Pmf,
        interarrival_time: Pmf,
        priority: u32,
    ) -> Result<Self> {
        let task = GenericTaskDescriptor::aperiodic(name, computation_time, interarrival_time)?;
        Self::with_priority(task, priority)
    }

    /// Describe a periodic fixed-priority task.
    pub fn periodic(
        name: impl Into<String>,
        computation_time: Pmf,
        period: Duration,
        priority: u32,
    ) -> Result<Self> {
        let task = GenericTaskDescriptor::periodic(name, computation_time, period)?;
        Self::with_priority(task, priority)
    }

    fn with_priority(task: GenericTaskDescriptor, priority: u32) -> Result<Self> {
        check_priority(&task, priority)?;
        Ok(FixedPriorityTaskDescriptor { task, priority })
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    /// Change the priority, returning the previous one. Invalid
    /// priorities are rejected without changing the task.
    pub fn set_priority(&mut self, priority: u32) -> Result<u32> {
        check_priority(&self.task, priority)?;
        let old = std::mem::replace(&mut self.priority, priority);
        if old != priority {
            self.task.invalidate();
        }
        Ok(old)
    }
}

fn check_priority(task: &GenericTaskDescriptor, priority: u32) -> Result<()> {
    if priority > MAX_PRIORITY {
        Err(Error::invalid_argument(
            task.context(),
            format!("priority {} out of range [0, {}]", priority, MAX_PRIORITY),
        ))
    } else {
        Ok(())
    }
}

impl TaskDescriptor for FixedPriorityTaskDescriptor {
    fn generic(&self) -> &GenericTaskDescriptor {
        &self.task
    }

    fn generic_mut(&mut self) -> &mut GenericTaskDescriptor {
        &mut self.task
    }

    fn scheduling_parameters(&self) -> SchedulingParameters {
        SchedulingParameters::FixedPriority {
            priority: self.priority,
        }
    }
}

/*! Task descriptors.

A task descriptor couples the timing model of a task (computation and
inter-arrival time distributions) with a set of deadlines whose
probability of being met is computed lazily by an external
[ProbabilitySolver]. The common part lives in
[GenericTaskDescriptor]; each scheduling policy adds its own
parameters on top of it and exposes everything through the
[TaskDescriptor] trait:

- [FixedPriorityTaskDescriptor] for fixed-priority scheduling, and
- [ResourceReservationTaskDescriptor] for tasks served by a resource
  reservation.

New policies are added by implementing [TaskDescriptor] for a new
type that embeds a [GenericTaskDescriptor].

Probabilities are computed on the first read after the deadlines or
the solver changed, and cached until the next such change.
*/

use std::fmt::Debug;
use std::sync::{Arc, OnceLock};

use crate::error::Result;
use crate::pmf::Pmf;
use crate::qos::QoSFun;
use crate::registry::Registry;
use crate::solver::{ProbabilitySolver, SchedulingParameters};
use crate::time::{Deadline, Duration};

/// The interface shared by all task descriptors, whatever their
/// scheduling policy.
pub trait TaskDescriptor: Debug + Send + Sync {
    /// The policy-independent part of the descriptor.
    fn generic(&self) -> &GenericTaskDescriptor;

    /// Mutable access to the policy-independent part of the descriptor.
    fn generic_mut(&mut self) -> &mut GenericTaskDescriptor;

    /// The current scheduling parameters, as handed to the solver.
    fn scheduling_parameters(&self) -> SchedulingParameters;

    fn name(&self) -> &str {
        self.generic().name()
    }

    fn is_periodic(&self) -> bool {
        self.generic().is_periodic()
    }

    /// The period; fails for aperiodic tasks.
    fn get_period(&self) -> Result<Duration> {
        self.generic().get_period()
    }

    /// The inter-arrival-time distribution; fails for periodic tasks.
    fn get_interarrival_time(&self) -> Result<&Pmf> {
        self.generic().get_interarrival_time()
    }

    fn computation_time(&self) -> &Pmf {
        self.generic().computation_time()
    }

    fn deadline_step(&self) -> Option<Duration> {
        self.generic().deadline_step()
    }

    fn set_deadline_step(&mut self, step: Duration) -> Result<()> {
        self.generic_mut().set_deadline_step(step)
    }

    fn set_verbose(&mut self, verbose: bool) -> bool {
        self.generic_mut().set_verbose(verbose)
    }

    /// Register a deadline; it must be a multiple of the deadline step
    /// and not registered yet.
    fn insert_deadline(&mut self, deadline: Deadline) -> Result<()> {
        self.generic_mut().insert_deadline(deadline)
    }

    fn remove_deadline(&mut self, deadline: Deadline) -> Result<()> {
        self.generic_mut().remove_deadline(deadline)
    }

    fn deadlines(&self) -> Vec<Deadline> {
        self.generic().deadlines()
    }

    fn is_solved(&self) -> bool {
        self.generic().is_solved()
    }

    /// Force the next probability read to solve again.
    fn invalidate(&self) {
        self.generic().invalidate()
    }

    /// Attach a solver; this always invalidates cached probabilities.
    fn set_solver(&mut self, solver: Arc<dyn ProbabilitySolver>) {
        let scheduling = self.scheduling_parameters();
        self.generic_mut().set_solver(solver, scheduling)
    }

    fn clear_solver(&mut self) -> Option<Arc<dyn ProbabilitySolver>> {
        self.generic_mut().clear_solver()
    }

    fn set_qos_function(&mut self, qos: Arc<dyn QoSFun>) {
        self.generic_mut().set_qos_function(qos)
    }

    /// Solve for all registered deadlines unless already solved.
    fn compute_probability(&self) -> Result<()> {
        self.generic().compute_probability(self.scheduling_parameters())
    }

    /// The probability of meeting `deadline`, computed on first use.
    fn get_probability(&self, deadline: Deadline) -> Result<f64> {
        self.generic().get_probability(deadline, self.scheduling_parameters())
    }

    /// The utility of `deadline` under the task's QoS function.
    fn get_qos(&self, deadline: Deadline) -> Result<f64> {
        self.generic().get_qos(deadline, self.scheduling_parameters())
    }
}

mod builders;
mod fixed_priority;
mod generic;
mod reservation;

pub use builders::{
    ArrivalParameters, CommonTaskParameters, FixedPriorityTaskBuilder,
    FixedPriorityTaskParameters, ResourceReservationTaskBuilder,
    ResourceReservationTaskParameters,
};
pub use fixed_priority::{FixedPriorityTaskDescriptor, MAX_PRIORITY};
pub use generic::{CacheState, GenericTaskDescriptor};
pub use reservation::ResourceReservationTaskDescriptor;

/// Register the standard task types with `registry`.
pub fn register_standard_types(registry: &Registry<dyn TaskDescriptor>) {
    registry.register_type("fixed_priority", FixedPriorityTaskBuilder);
    registry.register_type("resource_reservation", ResourceReservationTaskBuilder);
}

/// The process-wide task type registry, holding the standard types
/// from the first access on.
pub fn registry() -> &'static Registry<dyn TaskDescriptor> {
    static REGISTRY: OnceLock<Registry<dyn TaskDescriptor>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let registry = Registry::new("task");
        register_standard_types(&registry);
        registry
    })
}

#[cfg(test)]
mod tests;

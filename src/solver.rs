/*! The contract between task descriptors and probability solvers.

The numerical analysis that computes the probability of meeting a
deadline is not part of this crate. A task descriptor reaches it only
through the [ProbabilitySolver] trait: when a solver is attached, the
task announces itself via [ProbabilitySolver::register_task]; when a
probability is first read after the task's deadlines (or its solver)
changed, the task hands its full set of unsolved deadlines to
[ProbabilitySolver::solve], which fills them in place.

Solvers never hold a pointer back into a task descriptor. Instead,
both calls receive a [TaskModel], a borrowed snapshot of everything
the analysis may need to know about the task.
*/

use auto_impl::auto_impl;
use derive_more::Display;
use thiserror::Error;

use crate::deadline::DeadlineProbabilityMap;
use crate::pmf::Pmf;
use crate::time::{Duration, Service};

/// Opaque failure reported by a probability solver.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{message}")]
pub struct SolverError {
    message: String,
}

impl SolverError {
    pub fn new(message: impl Into<String>) -> Self {
        SolverError {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// The scheduling-policy-specific parameters of a task.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum SchedulingParameters {
    /// Fixed-priority scheduling with the given priority.
    #[display(fmt = "fixed priority {}", priority)]
    FixedPriority { priority: u32 },
    /// A resource reservation granting `budget` every `server_period`.
    #[display(fmt = "reservation ({}, {})", budget, server_period)]
    ResourceReservation {
        budget: Service,
        server_period: Duration,
    },
}

/// A read-only view of a task's timing model, handed to solvers.
#[derive(Debug, Clone, Copy)]
pub struct TaskModel<'a> {
    /// The unique name of the task.
    pub name: &'a str,
    /// Distribution of the computation time of each job.
    pub computation_time: &'a Pmf,
    /// Distribution of the inter-arrival time. For periodic tasks this
    /// is degenerate on the period.
    pub interarrival_time: &'a Pmf,
    /// The period, if the task is periodic.
    pub period: Option<Duration>,
    /// The scheduling parameters of the task.
    pub scheduling: SchedulingParameters,
}

/// An external algorithm computing deadline probabilities.
///
/// Solvers are shared between tasks and possibly threads; a solver
/// with internal state must synchronize it itself.
#[auto_impl(&, Box, Arc)]
pub trait ProbabilitySolver: Send + Sync {
    /// Announce that the solver may later be asked to solve for
    /// `task`. Called every time the solver is attached to a task.
    fn register_task(&self, task: &TaskModel<'_>);

    /// Compute the probability of meeting every deadline in
    /// `deadlines`, all of which are multiples of `deadline_step`,
    /// and store the results in place.
    fn solve(
        &self,
        task: &TaskModel<'_>,
        deadlines: &mut DeadlineProbabilityMap,
        deadline_step: Duration,
    ) -> Result<(), SolverError>;
}

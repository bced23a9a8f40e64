use std::fmt;
use std::sync::Arc;

use itertools::Itertools;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::deadline::DeadlineProbabilityMap;
use crate::error::{Error, Result};
use crate::pmf::Pmf;
use crate::qos::QoSFun;
use crate::solver::{ProbabilitySolver, SchedulingParameters, SolverError, TaskModel};
use crate::time::{Deadline, Duration};

/// Whether the probabilities stored for a task reflect its current
/// deadlines and solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Unsolved,
    Solved,
}

#[derive(Debug)]
struct ProbabilityCache {
    deadlines: DeadlineProbabilityMap,
    state: CacheState,
}

impl ProbabilityCache {
    /// Drop all computed probabilities; returns whether any were valid.
    fn invalidate(&mut self) -> bool {
        let was_solved = self.state == CacheState::Solved;
        self.state = CacheState::Unsolved;
        self.deadlines.clear_probabilities();
        was_solved
    }
}

/// The timing model and deadline bookkeeping shared by all task
/// descriptors, independent of the scheduling policy.
///
/// The deadline map and the cache state live behind a single lock, so
/// that concurrent readers of a probability trigger at most one solve.
pub struct GenericTaskDescriptor {
    name: String,
    computation_time: Pmf,
    interarrival_time: Pmf,
    period: Option<Duration>,
    deadline_step: Option<Duration>,
    verbose: bool,
    solver: Option<Arc<dyn ProbabilitySolver>>,
    qos: Option<Arc<dyn QoSFun>>,
    cache: Mutex<ProbabilityCache>,
}

impl GenericTaskDescriptor {
    fn new(
        name: String,
        computation_time: Pmf,
        interarrival_time: Pmf,
        period: Option<Duration>,
    ) -> Result<Self> {
        if name.is_empty() {
            return Err(Error::invalid_argument("task", "empty task name"));
        }
        Ok(GenericTaskDescriptor {
            name,
            computation_time,
            interarrival_time,
            period,
            deadline_step: None,
            verbose: false,
            solver: None,
            qos: None,
            cache: Mutex::new(ProbabilityCache {
                deadlines: DeadlineProbabilityMap::new(),
                state: CacheState::Unsolved,
            }),
        })
    }

    /// Describe an aperiodic task with the given computation-time and
    /// inter-arrival-time distributions.
    pub fn aperiodic(
        name: impl Into<String>,
        computation_time: Pmf,
        interarrival_time: Pmf,
    ) -> Result<Self> {
        Self::new(name.into(), computation_time, interarrival_time, None)
    }

    /// Describe a periodic task. Its inter-arrival time is degenerate
    /// on `period`.
    pub fn periodic(
        name: impl Into<String>,
        computation_time: Pmf,
        period: Duration,
    ) -> Result<Self> {
        let name = name.into();
        if period == 0 {
            return Err(Error::invalid_argument(
                format!("task {}", name),
                "period must be positive",
            ));
        }
        Self::new(name, computation_time, Pmf::degenerate(period), Some(period))
    }

    /// The context string used in errors about this task.
    pub(crate) fn context(&self) -> String {
        format!("task {}", self.name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_periodic(&self) -> bool {
        self.period.is_some()
    }

    /// The period of a periodic task; fails for aperiodic tasks.
    pub fn get_period(&self) -> Result<Duration> {
        self.period.ok_or_else(|| {
            Error::precondition(self.context(), "period wrongly required for aperiodic task")
        })
    }

    /// The inter-arrival-time distribution of an aperiodic task; fails
    /// for periodic tasks.
    pub fn get_interarrival_time(&self) -> Result<&Pmf> {
        if self.is_periodic() {
            Err(Error::precondition(
                self.context(),
                "interarrival time wrongly required for periodic task",
            ))
        } else {
            Ok(&self.interarrival_time)
        }
    }

    pub fn computation_time(&self) -> &Pmf {
        &self.computation_time
    }

    /// Set the verbose flag, returning its previous value. Verbose
    /// tasks report each solve at info level.
    pub fn set_verbose(&mut self, verbose: bool) -> bool {
        std::mem::replace(&mut self.verbose, verbose)
    }

    pub fn deadline_step(&self) -> Option<Duration> {
        self.deadline_step
    }

    /// Set the granularity of registered deadlines. The step must be
    /// positive and divide every deadline registered so far.
    pub fn set_deadline_step(&mut self, step: Duration) -> Result<()> {
        if step == 0 {
            return Err(Error::invalid_argument(self.context(), "deadline step must be positive"));
        }
        let cache = self.cache.get_mut();
        if let Some(deadline) = cache.deadlines.deadlines().find(|d| d % step != 0) {
            return Err(Error::invalid_argument(
                format!("task {}", self.name),
                format!("deadline {} is not a multiple of step {}", deadline, step),
            ));
        }
        if self.deadline_step != Some(step) {
            self.deadline_step = Some(step);
            if cache.invalidate() {
                debug!(
                    task = %self.name,
                    step,
                    "deadline step changed, cached probabilities dropped"
                );
            }
        }
        Ok(())
    }

    /// Register a deadline whose probability is to be computed.
    pub fn insert_deadline(&mut self, deadline: Deadline) -> Result<()> {
        let step = self.deadline_step.ok_or_else(|| {
            Error::precondition(format!("task {}", self.name), "deadline step unset")
        })?;
        if deadline % step != 0 {
            return Err(Error::invalid_argument(
                self.context(),
                format!("deadline {} is not a multiple of step {}", deadline, step),
            ));
        }
        let cache = self.cache.get_mut();
        if !cache.deadlines.insert(deadline) {
            return Err(Error::DuplicateDeadline {
                task: self.name.clone(),
                deadline,
            });
        }
        cache.invalidate();
        debug!(task = %self.name, deadline, "deadline registered");
        Ok(())
    }

    /// Unregister a deadline.
    pub fn remove_deadline(&mut self, deadline: Deadline) -> Result<()> {
        let cache = self.cache.get_mut();
        if !cache.deadlines.remove(deadline) {
            return Err(Error::DeadlineNotFound {
                task: self.name.clone(),
                deadline,
            });
        }
        cache.invalidate();
        debug!(task = %self.name, deadline, "deadline removed");
        Ok(())
    }

    /// The registered deadlines in ascending order.
    pub fn deadlines(&self) -> Vec<Deadline> {
        self.cache.lock().deadlines.deadlines().collect()
    }

    pub fn cache_state(&self) -> CacheState {
        self.cache.lock().state
    }

    pub fn is_solved(&self) -> bool {
        self.cache_state() == CacheState::Solved
    }

    /// Drop all cached probabilities, so that the next read solves again.
    pub fn invalidate(&self) {
        if self.cache.lock().invalidate() {
            debug!(task = %self.name, "cached probabilities dropped");
        }
    }

    pub fn solver(&self) -> Option<&Arc<dyn ProbabilitySolver>> {
        self.solver.as_ref()
    }

    /// Attach `solver`, register the task with it and invalidate any
    /// cached probabilities.
    pub fn set_solver(
        &mut self,
        solver: Arc<dyn ProbabilitySolver>,
        scheduling: SchedulingParameters,
    ) {
        solver.register_task(&self.model(scheduling));
        self.solver = Some(solver);
        self.cache.get_mut().invalidate();
        debug!(task = %self.name, "probability solver attached");
    }

    /// Detach the current solver, if any.
    pub fn clear_solver(&mut self) -> Option<Arc<dyn ProbabilitySolver>> {
        self.cache.get_mut().invalidate();
        self.solver.take()
    }

    pub fn qos_function(&self) -> Option<&Arc<dyn QoSFun>> {
        self.qos.as_ref()
    }

    pub fn set_qos_function(&mut self, qos: Arc<dyn QoSFun>) {
        self.qos = Some(qos);
    }

    /// The view of this task handed to solvers.
    pub fn model(&self, scheduling: SchedulingParameters) -> TaskModel<'_> {
        TaskModel {
            name: &self.name,
            computation_time: &self.computation_time,
            interarrival_time: &self.interarrival_time,
            period: self.period,
            scheduling,
        }
    }

    /// Compute the probabilities of all registered deadlines, unless
    /// they are already known.
    pub fn compute_probability(&self, scheduling: SchedulingParameters) -> Result<()> {
        let mut cache = self.cache.lock();
        self.solve(&mut cache, scheduling)
    }

    /// The probability of meeting `deadline`, solving first if needed.
    pub fn get_probability(
        &self,
        deadline: Deadline,
        scheduling: SchedulingParameters,
    ) -> Result<f64> {
        let mut cache = self.cache.lock();
        self.solve(&mut cache, scheduling)?;
        match cache.deadlines.get(deadline) {
            Some(Some(probability)) => Ok(probability),
            Some(None) => Err(Error::precondition(
                self.context(),
                format!("probability of deadline {} unsolved", deadline),
            )),
            None => Err(Error::DeadlineNotFound {
                task: self.name.clone(),
                deadline,
            }),
        }
    }

    /// The utility of meeting `deadline` according to the task's QoS function.
    pub fn get_qos(&self, deadline: Deadline, scheduling: SchedulingParameters) -> Result<f64> {
        let qos = self
            .qos
            .as_ref()
            .ok_or_else(|| Error::precondition(self.context(), "qos function unset"))?;
        Ok(qos.eval(self.get_probability(deadline, scheduling)?))
    }

    fn solve(&self, cache: &mut ProbabilityCache, scheduling: SchedulingParameters) -> Result<()> {
        let solver = self
            .solver
            .as_ref()
            .ok_or_else(|| Error::precondition(self.context(), "probability solver unset"))?;
        if cache.deadlines.is_empty() {
            return Err(Error::precondition(self.context(), "no deadline specified"));
        }
        if cache.state == CacheState::Solved {
            return Ok(());
        }
        let step = self
            .deadline_step
            .ok_or_else(|| Error::precondition(self.context(), "deadline step unset"))?;

        let deadlines = cache.deadlines.deadlines().join(", ");
        if self.verbose {
            info!(task = %self.name, %scheduling, step, %deadlines, "solving probabilities");
        } else {
            debug!(task = %self.name, %scheduling, step, %deadlines, "solving probabilities");
        }

        // Solve into a scratch map so that a failed solve leaves the
        // registered deadlines untouched.
        let mut solution = cache.deadlines.clone();
        solution.clear_probabilities();
        solver
            .solve(&self.model(scheduling), &mut solution, step)
            .map_err(|source| self.solver_failure(source))?;
        if !solution.deadlines().eq(cache.deadlines.deadlines()) {
            return Err(self.solver_failure(SolverError::new(
                "solver changed the set of deadlines",
            )));
        }
        if let Some(deadline) = solution.first_unsolved() {
            return Err(self.solver_failure(SolverError::new(format!(
                "no probability computed for deadline {}",
                deadline
            ))));
        }
        if let Some((deadline, probability)) = solution
            .iter()
            .filter_map(|(d, p)| p.map(|p| (d, p)))
            .find(|(_, p)| !(0.0..=1.0).contains(p))
        {
            return Err(self.solver_failure(SolverError::new(format!(
                "probability {} computed for deadline {} is not in [0, 1]",
                probability, deadline
            ))));
        }

        cache.deadlines = solution;
        cache.state = CacheState::Solved;
        if self.verbose {
            info!(task = %self.name, probabilities = ?cache.deadlines, "probabilities solved");
        }
        Ok(())
    }

    fn solver_failure(&self, source: SolverError) -> Error {
        Error::Solver {
            task: self.name.clone(),
            source,
        }
    }
}

impl fmt::Debug for GenericTaskDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenericTaskDescriptor")
            .field("name", &self.name)
            .field("computation_time", &self.computation_time)
            .field("interarrival_time", &self.interarrival_time)
            .field("period", &self.period)
            .field("deadline_step", &self.deadline_step)
            .field("verbose", &self.verbose)
            .field("has_solver", &self.solver.is_some())
            .field("qos", &self.qos)
            .field("cache", &*self.cache.lock())
            .finish()
    }
}

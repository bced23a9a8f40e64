use super::{GenericTaskDescriptor, TaskDescriptor};
use crate::error::{Error, Result};
use crate::pmf::Pmf;
use crate::solver::SchedulingParameters;
use crate::time::{Duration, Service};

/// A task served by a resource reservation that grants `budget` time
/// units of execution every `server_period` time units.
///
/// The reservation can never exceed full utilization, i.e.,
/// `budget <= server_period` holds at all times.
#[derive(Debug)]
pub struct ResourceReservationTaskDescriptor {
    task: GenericTaskDescriptor,
    budget: Service,
    server_period: Duration,
}

impl ResourceReservationTaskDescriptor {
    /// Describe an aperiodic task served by a reservation.
    pub fn aperiodic(
        name: impl Into<String>,
        computation_time: Pmf,
        interarrival_time: Pmf,
        budget: Service,
        server_period: Duration,
    ) -> Result<Self> {
        let task = GenericTaskDescriptor::aperiodic(name, computation_time, interarrival_time)?;
        Self::with_reservation(task, budget, server_period)
    }

    /// Describe a periodic task served by a reservation.
    pub fn periodic(
        name: impl Into<String>,
        computation_time: Pmf,
        period: Duration,
        budget: Service,
        server_period: Duration,
    ) -> Result<Self> {
        let task = GenericTaskDescriptor::periodic(name, computation_time, period)?;
        Self::with_reservation(task, budget, server_period)
    }

    fn with_reservation(
        task: GenericTaskDescriptor,
        budget: Service,
        server_period: Duration,
    ) -> Result<Self> {
        check_reservation(&task, budget, server_period)?;
        Ok(ResourceReservationTaskDescriptor {
            task,
            budget,
            server_period,
        })
    }

    pub fn budget(&self) -> Service {
        self.budget
    }

    pub fn server_period(&self) -> Duration {
        self.server_period
    }

    /// The fraction of the processor granted by the reservation.
    pub fn bandwidth(&self) -> f64 {
        self.budget as f64 / self.server_period as f64
    }

    /// Change the budget, returning the previous one.
    pub fn set_budget(&mut self, budget: Service) -> Result<Service> {
        let old = self.budget;
        self.set_reservation(budget, self.server_period)?;
        Ok(old)
    }

    /// Change the server period, returning the previous one.
    pub fn set_server_period(&mut self, server_period: Duration) -> Result<Duration> {
        let old = self.server_period;
        self.set_reservation(self.budget, server_period)?;
        Ok(old)
    }

    /// Change budget and server period together, which allows moving
    /// between reservations that are not reachable by changing one
    /// parameter at a time. Nothing changes if the new pair is invalid.
    pub fn set_reservation(&mut self, budget: Service, server_period: Duration) -> Result<()> {
        check_reservation(&self.task, budget, server_period)?;
        if (budget, server_period) != (self.budget, self.server_period) {
            self.budget = budget;
            self.server_period = server_period;
            self.task.invalidate();
        }
        Ok(())
    }
}

fn check_reservation(
    task: &GenericTaskDescriptor,
    budget: Service,
    server_period: Duration,
) -> Result<()> {
    if server_period == 0 {
        return Err(Error::invalid_argument(task.context(), "server period must be positive"));
    }
    if budget == 0 {
        return Err(Error::invalid_argument(task.context(), "budget must be positive"));
    }
    if budget > server_period {
        return Err(Error::invalid_argument(
            task.context(),
            format!(
                "budget {} exceeds server period {} (utilization above 1)",
                budget, server_period
            ),
        ));
    }
    Ok(())
}

impl TaskDescriptor for ResourceReservationTaskDescriptor {
    fn generic(&self) -> &GenericTaskDescriptor {
        &self.task
    }

    fn generic_mut(&mut self) -> &mut GenericTaskDescriptor {
        &mut self.task
    }

    fn scheduling_parameters(&self) -> SchedulingParameters {
        SchedulingParameters::ResourceReservation {
            budget: self.budget,
            server_period: self.server_period,
        }
    }
}

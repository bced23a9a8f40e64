/*! Task models and quality-of-service functions for probabilistic
real-time scheduling analysis.

The crate models tasks whose computation and inter-arrival times are
given as probability distributions ([pmf::Pmf]), tracks the deadlines
for which the probability of timely completion is of interest, and
maps those probabilities to utilities via QoS functions. An optimizer
can use the resulting scores to choose scheduling parameters such as
priorities or reservation budgets.

The probabilities themselves are computed by an external
[solver::ProbabilitySolver], which a [task::TaskDescriptor] invokes
lazily on the first read after its deadlines or its solver changed.

QoS functions, task types and distributions can be built by name from
configuration documents through the registries in [qos], [task] and
[pmf], all of which are instances of [registry::Registry].
*/

pub mod config;
pub mod deadline;
pub mod error;
pub mod pmf;
pub mod qos;
pub mod registry;
pub mod solver;
pub mod task;
pub mod time;

pub use error::{Error, ErrorKind, Result};

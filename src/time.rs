/// This library uses a simple discrete time model.
pub type Time = u64;

/// Syntactic sugar to give a hint that a time value denotes an
/// interval length (e.g., a period or an inter-arrival time).
pub type Duration = Time;

/// Syntactic sugar to give a hint that a time value is a relative
/// deadline for which a probability of being met is tracked.
pub type Deadline = Time;

/// Syntactic sugar to give a hint that a time value represents some
/// amount of processor service (e.g., an execution time or a
/// reservation budget).
pub type Service = Time;

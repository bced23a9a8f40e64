use std::error::Error as _;
use std::sync::Arc;
use std::thread;

use assert_approx_eq::assert_approx_eq;

use crate::config::Document;
use crate::error::ErrorKind;
use crate::pmf::Pmf;
use crate::qos::LinearQoSFun;
use crate::solver::SchedulingParameters;
use crate::task::{
    self, FixedPriorityTaskDescriptor, ResourceReservationTaskDescriptor, TaskDescriptor,
};
use crate::tests::{ConstantSolver, CountingSolver, FailingSolver, SloppySolver};

fn fp_task(step: u64) -> FixedPriorityTaskDescriptor {
    let mut t = FixedPriorityTaskDescriptor::periodic("tau1", Pmf::uniform(1, 4).unwrap(), 40, 10)
        .unwrap();
    t.set_deadline_step(step).unwrap();
    t
}

fn rr_task() -> ResourceReservationTaskDescriptor {
    ResourceReservationTaskDescriptor::aperiodic(
        "tau2",
        Pmf::uniform(2, 6).unwrap(),
        Pmf::uniform(30, 50).unwrap(),
        5,
        10,
    )
    .unwrap()
}

#[test]
fn deadlines_must_be_multiples_of_step() {
    let mut t = fp_task(10);
    assert!(t.insert_deadline(10).is_ok());
    assert!(t.insert_deadline(0).is_ok());
    assert_eq!(t.insert_deadline(15).unwrap_err().kind(), ErrorKind::InvalidArgument);
    assert_eq!(t.insert_deadline(10).unwrap_err().kind(), ErrorKind::DuplicateEntry);
    assert_eq!(t.deadlines(), vec![0, 10]);
}

#[test]
fn deadlines_need_a_step() {
    let mut t = FixedPriorityTaskDescriptor::periodic("tau", Pmf::degenerate(2), 20, 1).unwrap();
    assert_eq!(t.deadline_step(), None);
    assert_eq!(t.insert_deadline(20).unwrap_err().kind(), ErrorKind::PreconditionViolation);
    assert!(t.deadlines().is_empty());
}

#[test]
fn deadline_step_must_divide_deadlines() {
    let mut t = fp_task(10);
    t.insert_deadline(20).unwrap();
    t.insert_deadline(40).unwrap();
    assert_eq!(t.set_deadline_step(0).unwrap_err().kind(), ErrorKind::InvalidArgument);
    assert_eq!(t.set_deadline_step(15).unwrap_err().kind(), ErrorKind::InvalidArgument);
    assert_eq!(t.deadline_step(), Some(10));
    assert!(t.set_deadline_step(20).is_ok());
    assert_eq!(t.deadline_step(), Some(20));
}

#[test]
fn probabilities_are_solved_once() {
    let solver = Arc::new(CountingSolver::new(100.0));
    let mut t = fp_task(10);
    t.insert_deadline(10).unwrap();
    t.insert_deadline(20).unwrap();
    t.set_solver(solver.clone());
    assert!(!t.is_solved());
    assert_eq!(solver.solves(), 0);

    assert_approx_eq!(t.get_probability(10).unwrap(), 0.1);
    assert_eq!(solver.solves(), 1);
    assert_approx_eq!(t.get_probability(20).unwrap(), 0.2);
    assert_eq!(solver.solves(), 1);
    assert!(t.is_solved());

    t.compute_probability().unwrap();
    assert_eq!(solver.solves(), 1);
}

#[test]
fn new_solver_forces_new_solve() {
    let solver = Arc::new(CountingSolver::new(100.0));
    let mut t = fp_task(10);
    t.insert_deadline(10).unwrap();
    t.set_solver(solver.clone());
    t.get_probability(10).unwrap();
    assert_eq!(solver.solves(), 1);

    t.set_solver(solver.clone());
    assert!(!t.is_solved());
    t.get_probability(10).unwrap();
    assert_eq!(solver.solves(), 2);
    assert_eq!(solver.registrations(), vec!["tau1".to_string(), "tau1".to_string()]);

    let other = Arc::new(CountingSolver::new(10.0));
    t.set_solver(other.clone());
    assert_approx_eq!(t.get_probability(10).unwrap(), 1.0);
    assert_eq!(other.solves(), 1);
    assert_eq!(solver.solves(), 2);
}

#[test]
fn deadline_changes_force_new_solve() {
    let solver = Arc::new(CountingSolver::new(100.0));
    let mut t = fp_task(10);
    t.insert_deadline(10).unwrap();
    t.set_solver(solver.clone());
    t.compute_probability().unwrap();

    t.insert_deadline(30).unwrap();
    assert!(!t.is_solved());
    assert_approx_eq!(t.get_probability(30).unwrap(), 0.3);
    assert_eq!(solver.solves(), 2);

    t.remove_deadline(10).unwrap();
    assert_eq!(t.remove_deadline(10).unwrap_err().kind(), ErrorKind::NotFound);
    assert_eq!(t.get_probability(10).unwrap_err().kind(), ErrorKind::NotFound);
    assert_eq!(solver.solves(), 3);
}

#[test]
fn solving_requires_solver_and_deadlines() {
    let mut t = fp_task(10);
    t.insert_deadline(10).unwrap();
    assert_eq!(t.compute_probability().unwrap_err().kind(), ErrorKind::PreconditionViolation);
    assert_eq!(t.get_probability(10).unwrap_err().kind(), ErrorKind::PreconditionViolation);

    let mut u = fp_task(10);
    u.set_solver(Arc::new(CountingSolver::new(100.0)));
    assert_eq!(u.compute_probability().unwrap_err().kind(), ErrorKind::PreconditionViolation);
}

#[test]
fn unknown_deadline() {
    let solver = Arc::new(CountingSolver::new(100.0));
    let mut t = fp_task(10);
    t.insert_deadline(10).unwrap();
    t.set_solver(solver.clone());
    assert_eq!(t.get_probability(50).unwrap_err().kind(), ErrorKind::NotFound);
    // the read still solved, so the next one is served from the cache
    assert_eq!(solver.solves(), 1);
    t.get_probability(10).unwrap();
    assert_eq!(solver.solves(), 1);
}

#[test]
fn solver_failures_propagate() {
    let mut t = fp_task(10);
    t.insert_deadline(10).unwrap();
    t.set_solver(Arc::new(FailingSolver));
    let err = t.get_probability(10).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SolverFailure);
    assert_eq!(err.source().unwrap().to_string(), "no convergence");
    assert!(!t.is_solved());
    assert_eq!(t.deadlines(), vec![10]);

    // retrying is possible once a working solver is attached
    t.set_solver(Arc::new(CountingSolver::new(100.0)));
    assert_approx_eq!(t.get_probability(10).unwrap(), 0.1);
}

#[test]
fn incomplete_solutions_are_rejected() {
    let mut t = fp_task(10);
    t.insert_deadline(10).unwrap();
    t.insert_deadline(20).unwrap();
    t.set_solver(Arc::new(SloppySolver));
    assert_eq!(t.get_probability(10).unwrap_err().kind(), ErrorKind::SolverFailure);
    assert!(!t.is_solved());
}

#[test]
fn out_of_range_solutions_are_rejected() {
    for value in [f64::NAN, f64::INFINITY, -0.1, 1.7] {
        let mut t = fp_task(10);
        t.insert_deadline(10).unwrap();
        t.insert_deadline(20).unwrap();
        t.set_solver(Arc::new(ConstantSolver(value)));
        let err = t.get_probability(10).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SolverFailure);
        assert!(!t.is_solved());
        assert_eq!(t.deadlines(), vec![10, 20]);
    }

    let mut t = fp_task(10);
    t.insert_deadline(10).unwrap();
    t.set_solver(Arc::new(ConstantSolver(1.0)));
    assert_approx_eq!(t.get_probability(10).unwrap(), 1.0);
    t.set_solver(Arc::new(ConstantSolver(0.0)));
    assert_approx_eq!(t.get_probability(10).unwrap(), 0.0);
}

#[test]
fn detaching_the_solver_drops_probabilities() {
    let solver = Arc::new(CountingSolver::new(100.0));
    let mut t = fp_task(10);
    t.insert_deadline(10).unwrap();
    t.set_solver(solver.clone());
    t.compute_probability().unwrap();
    assert!(t.is_solved());

    assert!(t.clear_solver().is_some());
    assert!(!t.is_solved());
    assert!(t.generic().solver().is_none());
    assert_eq!(t.get_probability(10).unwrap_err().kind(), ErrorKind::PreconditionViolation);
    assert_eq!(t.compute_probability().unwrap_err().kind(), ErrorKind::PreconditionViolation);
    assert!(t.clear_solver().is_none());
    assert_eq!(solver.solves(), 1);
}

#[test]
fn deadline_step_changes_invalidate() {
    let solver = Arc::new(CountingSolver::new(100.0));
    let mut t = fp_task(10);
    t.insert_deadline(20).unwrap();
    t.set_solver(solver.clone());
    t.compute_probability().unwrap();

    t.set_deadline_step(10).unwrap();
    assert!(t.is_solved());
    assert!(t.set_deadline_step(15).is_err());
    assert!(t.is_solved());
    t.set_deadline_step(20).unwrap();
    assert!(!t.is_solved());
    assert_approx_eq!(t.get_probability(20).unwrap(), 0.2);
    assert_eq!(solver.solves(), 2);
}

#[test]
fn periodic_and_aperiodic_accessors() {
    let p = fp_task(10);
    assert!(p.is_periodic());
    assert_eq!(p.get_period().unwrap(), 40);
    let err = p.get_interarrival_time().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PreconditionViolation);
    assert!(err.to_string().contains("tau1"));

    let a = rr_task();
    assert!(!a.is_periodic());
    assert_eq!(a.get_period().unwrap_err().kind(), ErrorKind::PreconditionViolation);
    assert_eq!(a.get_interarrival_time().unwrap().min(), Some(30));
}

#[test]
fn periodic_tasks_arrive_every_period() {
    let solver = Arc::new(CountingSolver::new(100.0));
    let mut p = fp_task(10);
    p.set_solver(solver);
    let model = p.generic().model(p.scheduling_parameters());
    assert_eq!(model.period, Some(40));
    assert_eq!(model.interarrival_time, &Pmf::degenerate(40));
    assert_eq!(model.scheduling, SchedulingParameters::FixedPriority { priority: 10 });
}

#[test]
fn priority_range() {
    let c = Pmf::degenerate(1);
    assert!(FixedPriorityTaskDescriptor::periodic("t", c.clone(), 10, 99).is_ok());
    let err = FixedPriorityTaskDescriptor::periodic("t", c.clone(), 10, 100).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    let z = Pmf::degenerate(5);
    assert!(FixedPriorityTaskDescriptor::aperiodic("t", c.clone(), z, 120).is_err());
    assert!(FixedPriorityTaskDescriptor::periodic("t", c, 0, 1).is_err());

    let mut t = fp_task(10);
    assert_eq!(t.set_priority(120).unwrap_err().kind(), ErrorKind::InvalidArgument);
    assert_eq!(t.priority(), 10);
    assert_eq!(t.set_priority(0).unwrap(), 10);
    assert_eq!(t.priority(), 0);
}

#[test]
fn scheduling_changes_invalidate() {
    let solver = Arc::new(CountingSolver::new(100.0));
    let mut t = fp_task(10);
    t.insert_deadline(10).unwrap();
    t.set_solver(solver.clone());
    t.compute_probability().unwrap();

    t.set_priority(10).unwrap();
    assert!(t.is_solved());
    t.set_priority(11).unwrap();
    assert!(!t.is_solved());
    t.compute_probability().unwrap();
    assert_eq!(solver.solves(), 2);

    let mut r = rr_task();
    r.set_deadline_step(10).unwrap();
    r.insert_deadline(20).unwrap();
    r.set_solver(solver.clone());
    r.compute_probability().unwrap();
    r.set_budget(5).unwrap();
    assert!(r.is_solved());
    r.set_budget(6).unwrap();
    assert!(!r.is_solved());

    r.compute_probability().unwrap();
    r.set_server_period(10).unwrap();
    assert!(r.is_solved());
    r.set_server_period(12).unwrap();
    assert!(!r.is_solved());

    r.compute_probability().unwrap();
    r.set_reservation(6, 12).unwrap();
    assert!(r.is_solved());
    assert!(r.set_reservation(13, 12).is_err());
    assert!(r.is_solved());
    r.set_reservation(4, 8).unwrap();
    assert!(!r.is_solved());
    r.compute_probability().unwrap();
    assert_eq!(solver.solves(), 6);
}

#[test]
fn reservation_cannot_exceed_full_utilization() {
    let c = Pmf::degenerate(2);
    let z = Pmf::degenerate(20);
    let aperiodic = |budget, period| {
        ResourceReservationTaskDescriptor::aperiodic("t", c.clone(), z.clone(), budget, period)
    };
    assert_eq!(aperiodic(11, 10).unwrap_err().kind(), ErrorKind::InvalidArgument);
    assert!(aperiodic(10, 10).is_ok());
    assert!(aperiodic(0, 10).is_err());
    assert!(ResourceReservationTaskDescriptor::periodic("t", c, 20, 1, 0).is_err());

    let mut r = rr_task();
    assert_approx_eq!(r.bandwidth(), 0.5);
    assert_eq!(r.set_budget(11).unwrap_err().kind(), ErrorKind::InvalidArgument);
    assert_eq!((r.budget(), r.server_period()), (5, 10));
    assert_eq!(r.set_server_period(4).unwrap_err().kind(), ErrorKind::InvalidArgument);
    assert_eq!((r.budget(), r.server_period()), (5, 10));

    assert_eq!(r.set_budget(10).unwrap(), 5);
    assert_eq!(r.set_server_period(20).unwrap(), 10);
    assert_eq!((r.budget(), r.server_period()), (10, 20));

    // (10, 20) -> (30, 40) needs both parameters to move together
    assert!(r.set_budget(30).is_err());
    r.set_reservation(30, 40).unwrap();
    assert_eq!(
        r.scheduling_parameters(),
        SchedulingParameters::ResourceReservation {
            budget: 30,
            server_period: 40
        }
    );
    assert!(r.set_reservation(50, 40).is_err());
    assert_eq!((r.budget(), r.server_period()), (30, 40));
}

#[test]
fn qos_of_a_deadline() {
    let mut t = fp_task(10);
    t.insert_deadline(70).unwrap();
    t.set_solver(Arc::new(CountingSolver::new(100.0)));
    assert_eq!(t.get_qos(70).unwrap_err().kind(), ErrorKind::PreconditionViolation);
    t.set_qos_function(Arc::new(LinearQoSFun::new(2.0, 0.5, 0.9, 1.0).unwrap()));
    assert_approx_eq!(t.get_qos(70).unwrap(), 1.4);
}

#[test]
fn verbose_flag() {
    let mut t = fp_task(10);
    assert!(!t.set_verbose(true));
    assert!(t.set_verbose(false));
}

#[test]
fn concurrent_readers_share_one_solve() {
    let solver = Arc::new(CountingSolver::slow(100.0, std::time::Duration::from_millis(20)));
    let mut t = fp_task(10);
    for d in [10, 20, 30] {
        t.insert_deadline(d).unwrap();
    }
    t.set_solver(solver.clone());
    let t = Arc::new(t);
    let readers: Vec<_> = (0..8)
        .map(|i| {
            let t = Arc::clone(&t);
            thread::spawn(move || t.get_probability(10 * (1 + i % 3)))
        })
        .collect();
    for r in readers {
        assert!(r.join().unwrap().is_ok());
    }
    assert_eq!(solver.solves(), 1);
}

#[test]
fn configured_fixed_priority_task() {
    let doc = Document::from_yaml_str(
        r#"
type: fixed_priority
name: video
priority: 3
period: 40
computation_time:
  type: discrete
  values:
    - { value: 5, probability: 0.5 }
    - { value: 15, probability: 0.5 }
deadlines: [40, 80]
"#,
    )
    .unwrap();
    let mut t = task::registry().create_from(&doc.root()).unwrap();
    assert_eq!(t.name(), "video");
    assert_eq!(t.get_period().unwrap(), 40);
    assert_eq!(t.deadline_step(), Some(40));
    assert_eq!(t.deadlines(), vec![40, 80]);
    assert_approx_eq!(t.computation_time().mean(), 10.0);
    assert_eq!(
        t.scheduling_parameters(),
        SchedulingParameters::FixedPriority { priority: 3 }
    );
    t.set_solver(Arc::new(CountingSolver::new(100.0)));
    assert_approx_eq!(t.get_probability(80).unwrap(), 0.8);
}

#[test]
fn configured_reservation_task() {
    let doc = Document::from_json_str(
        r#"{
            "name": "audio",
            "budget": 2,
            "server_period": 5,
            "computation_time": { "type": "uniform", "min": 1, "max": 3 },
            "interarrival_time": { "type": "degenerate", "value": 20 },
            "deadlines": [5, 10, 15]
        }"#,
    )
    .unwrap();
    let t = task::registry().create("resource_reservation", &doc.root()).unwrap();
    assert!(!t.is_periodic());
    assert_eq!(t.deadline_step(), Some(5));
    assert_eq!(t.get_interarrival_time().unwrap(), &Pmf::degenerate(20));
    assert_eq!(
        t.scheduling_parameters(),
        SchedulingParameters::ResourceReservation {
            budget: 2,
            server_period: 5
        }
    );
}

#[test]
fn configured_tasks_are_validated() {
    // over-utilized reservation
    let doc = Document::from_json_str(
        r#"{ "name": "t", "budget": 6, "server_period": 5, "period": 10,
             "computation_time": { "type": "degenerate", "value": 1 } }"#,
    )
    .unwrap();
    let err = task::registry().create("resource_reservation", &doc.root()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    // neither period nor inter-arrival time
    let doc = Document::from_json_str(
        r#"{ "name": "t", "priority": 1,
             "computation_time": { "type": "degenerate", "value": 1 } }"#,
    )
    .unwrap();
    let err = task::registry().create("fixed_priority", &doc.root()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingField);

    // aperiodic task with deadlines but no step
    let doc = Document::from_json_str(
        r#"{ "name": "t", "priority": 1, "deadlines": [10],
             "computation_time": { "type": "degenerate", "value": 1 },
             "interarrival_time": { "type": "degenerate", "value": 10 } }"#,
    )
    .unwrap();
    let err = task::registry().create("fixed_priority", &doc.root()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingField);

    // priority out of range
    let doc = Document::from_json_str(
        r#"{ "name": "t", "priority": 100, "period": 10,
             "computation_time": { "type": "degenerate", "value": 1 } }"#,
    )
    .unwrap();
    let err = task::registry().create("fixed_priority", &doc.root()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let err = task::registry().create("earliest_deadline_first", &doc.root()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn task_builders_reject_foreign_bundles() {
    let doc = Document::from_json_str(
        r#"{ "name": "t", "priority": 1, "period": 10,
             "computation_time": { "type": "degenerate", "value": 1 } }"#,
    )
    .unwrap();
    let fp = task::registry().builder("fixed_priority").unwrap();
    let rr = task::registry().builder("resource_reservation").unwrap();
    let bundle = fp.parse_parameters(&doc.root()).unwrap();
    assert!(fp.create_instance(&*bundle).is_ok());
    assert_eq!(rr.create_instance(&*bundle).unwrap_err().kind(), ErrorKind::TypeMismatch);
}

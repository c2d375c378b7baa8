use microtick_scheduler::{
    RunOutcome, RunState, Scheduler, SchedulerBuilder, SchedulerConfig, SchedulerError,
    TaskExecutionError, TaskKind,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

#[test]
fn test_cancel_before_due() {
    init_tracing();
    let scheduler = Scheduler::new();
    let fired = Rc::new(Cell::new(false));

    let f = fired.clone();
    let timer = scheduler.enqueue_macrotask(10, move || {
        f.set(true);
        Ok(())
    });
    let other = scheduler.enqueue_macrotask(20, || Ok(()));

    assert!(scheduler.cancel(timer));
    let report = scheduler.run().unwrap();

    assert!(!fired.get());
    assert_eq!(report.executed, vec![other]);
    assert_eq!(report.position(timer), None);
}

#[test]
fn test_cancel_after_execution_is_noop() {
    let scheduler = Scheduler::new();
    let timer = scheduler.enqueue_macrotask(0, || Ok(()));
    scheduler.run().unwrap();
    assert!(!scheduler.cancel(timer));
}

#[test]
fn test_cancel_from_earlier_timer() {
    let scheduler = Scheduler::new();
    let later_ran = Rc::new(Cell::new(false));

    let l = later_ran.clone();
    let later = scheduler.enqueue_macrotask(5, move || {
        l.set(true);
        Ok(())
    });
    let sch = scheduler.clone();
    let cancelled = Rc::new(Cell::new(false));
    let c = cancelled.clone();
    scheduler.enqueue_macrotask(1, move || {
        c.set(sch.cancel(later));
        Ok(())
    });

    let report = scheduler.run().unwrap();
    assert!(cancelled.get());
    assert!(!later_ran.get());
    assert_eq!(report.executed.len(), 1);
    assert_eq!(report.final_time, 1);
}

#[test]
fn test_running_task_cannot_cancel_itself() {
    let scheduler = Scheduler::new();
    let result = Rc::new(Cell::new(true));
    let slot = Rc::new(Cell::new(None));

    let sch = scheduler.clone();
    let r = result.clone();
    let s = slot.clone();
    let id = scheduler.enqueue_macrotask(0, move || {
        r.set(sch.cancel(s.get().unwrap()));
        Ok(())
    });
    slot.set(Some(id));

    scheduler.run().unwrap();
    assert!(!result.get());
}

#[test]
fn test_failing_task_does_not_stop_the_run() {
    init_tracing();
    let scheduler = Scheduler::new();
    let log = Rc::new(RefCell::new(Vec::new()));

    let bad = scheduler.enqueue_microtask(|| anyhow::bail!("rejected"));
    let l = log.clone();
    scheduler.enqueue_microtask(move || {
        l.borrow_mut().push("after-micro");
        Ok(())
    });
    let boom = scheduler.enqueue_macrotask(0, || panic!("timer exploded"));
    let l = log.clone();
    scheduler.enqueue_macrotask(0, move || {
        l.borrow_mut().push("after-macro");
        Ok(())
    });

    let report = scheduler.run().unwrap();

    assert_eq!(*log.borrow(), vec!["after-micro", "after-macro"]);
    assert_eq!(report.executed.len(), 4);
    assert_eq!(report.failures.len(), 2);
    assert_eq!(
        report.failure(bad),
        Some(&TaskExecutionError::Failed("rejected".into()))
    );
    assert_eq!(
        report.failure(boom),
        Some(&TaskExecutionError::Panicked("timer exploded".into()))
    );
    assert_eq!(report.failures[0].kind, TaskKind::Micro);
    assert_eq!(report.failures[1].kind, TaskKind::Macro);
    assert!(!report.is_clean());
}

#[test]
fn test_stop_halts_after_microtask_drain_and_resumes() {
    let scheduler = Scheduler::new();
    let log = Rc::new(RefCell::new(Vec::new()));

    {
        let log = log.clone();
        let sch = scheduler.clone();
        scheduler.enqueue_macrotask(1, move || {
            log.borrow_mut().push("M1");
            sch.stop();
            let l = log.clone();
            sch.enqueue_microtask(move || {
                l.borrow_mut().push("P-after-stop");
                Ok(())
            });
            Ok(())
        });
    }
    {
        let log = log.clone();
        scheduler.enqueue_macrotask(2, move || {
            log.borrow_mut().push("M2");
            Ok(())
        });
    }

    let first = scheduler.run().unwrap();
    assert_eq!(first.outcome, RunOutcome::Stopped);
    assert_eq!(scheduler.state(), RunState::Idle);
    assert_eq!(*log.borrow(), vec!["M1", "P-after-stop"]);
    assert_eq!(scheduler.snapshot().pending_microtasks, 0);
    assert_eq!(scheduler.now(), 1);

    let second = scheduler.run().unwrap();
    assert_eq!(second.outcome, RunOutcome::Drained);
    assert_eq!(*log.borrow(), vec!["M1", "P-after-stop", "M2"]);
    assert_eq!(second.executed.len(), 1);
}

#[test]
fn test_stop_while_idle_applies_to_next_run() {
    let scheduler = Scheduler::new();
    let log = Rc::new(RefCell::new(Vec::new()));

    let l = log.clone();
    scheduler.enqueue_macrotask(0, move || {
        l.borrow_mut().push("M1");
        Ok(())
    });
    let l = log.clone();
    scheduler.enqueue_microtask(move || {
        l.borrow_mut().push("P1");
        Ok(())
    });

    scheduler.stop();
    assert_eq!(scheduler.state(), RunState::Idle);

    // Microtasks still drain; the macrotask waits for the next run.
    let first = scheduler.run().unwrap();
    assert_eq!(first.outcome, RunOutcome::Stopped);
    assert_eq!(*log.borrow(), vec!["P1"]);
    assert_eq!(scheduler.snapshot().pending_macrotasks, 1);

    let second = scheduler.run().unwrap();
    assert_eq!(second.outcome, RunOutcome::Drained);
    assert_eq!(*log.borrow(), vec!["P1", "M1"]);
}

#[test]
fn test_reentrant_run_is_rejected() {
    let scheduler = Scheduler::new();
    let nested = Rc::new(RefCell::new(None));

    let sch = scheduler.clone();
    let n = nested.clone();
    scheduler.enqueue_microtask(move || {
        *n.borrow_mut() = Some(sch.run());
        Ok(())
    });

    let report = scheduler.run().unwrap();
    assert!(report.is_clean());
    assert_eq!(
        nested.borrow_mut().take().unwrap().unwrap_err(),
        SchedulerError::AlreadyRunning
    );
}

#[test]
fn test_turn_limit_guards_runaway_timer() {
    fn reschedule(scheduler: Scheduler, count: Rc<Cell<u32>>) {
        let sch = scheduler.clone();
        scheduler.enqueue_macrotask(1, move || {
            count.set(count.get() + 1);
            reschedule(sch, count);
            Ok(())
        });
    }

    let scheduler = Scheduler::with_config(SchedulerConfig {
        turn_limit: Some(3),
        ..SchedulerConfig::default()
    });
    let count = Rc::new(Cell::new(0));
    reschedule(scheduler.clone(), count.clone());

    let report = scheduler.run().unwrap();
    assert_eq!(report.outcome, RunOutcome::TurnLimitReached);
    assert_eq!(count.get(), 3);
    assert_eq!(report.final_time, 3);
    assert_eq!(scheduler.snapshot().pending_macrotasks, 1);

    // The limit applies per run.
    let again = scheduler.run().unwrap();
    assert_eq!(again.outcome, RunOutcome::TurnLimitReached);
    assert_eq!(count.get(), 6);
}

#[test]
fn test_loaded_config_feeds_builder() {
    let config: SchedulerConfig =
        serde_json::from_str(r#"{ "start_time": 50, "turn_limit": 1 }"#).unwrap();
    let scheduler = SchedulerBuilder::from(config).catch_panics(false).build();

    assert_eq!(
        *scheduler.config(),
        SchedulerConfig {
            start_time: 50,
            turn_limit: Some(1),
            catch_panics: false,
        }
    );
    assert_eq!(scheduler.now(), 50);

    scheduler.enqueue_macrotask(5, || Ok(()));
    scheduler.enqueue_macrotask(6, || Ok(()));
    let report = scheduler.run().unwrap();
    assert_eq!(report.outcome, RunOutcome::TurnLimitReached);
    assert_eq!(report.final_time, 55);
}

#[test]
fn test_panics_propagate_when_not_caught() {
    let scheduler = Scheduler::builder().catch_panics(false).build();
    scheduler.enqueue_macrotask(0, || panic!("debug me"));

    let sch = scheduler.clone();
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| sch.run()));
    assert!(outcome.is_err());
    // The guard resets the state so the scheduler stays usable.
    assert_eq!(scheduler.state(), RunState::Idle);
    assert!(scheduler.run().is_ok());
}

#[test]
fn test_report_serializes() {
    let scheduler = Scheduler::new();
    scheduler.enqueue_microtask(|| anyhow::bail!("nope"));
    scheduler.enqueue_macrotask(4, || Ok(()));

    let report = scheduler.run().unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "executed": [0, 1],
            "failures": [{
                "id": 0,
                "kind": "micro",
                "error": { "type": "failed", "message": "nope" }
            }],
            "outcome": "drained",
            "final_time": 4
        })
    );
}

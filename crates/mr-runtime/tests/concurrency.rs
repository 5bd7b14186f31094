use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use mr_core::{EngineLimits, HostValue};
use mr_runtime::{evaluate, EngineInstance, HostRuntime};

fn install_descend(from: &EngineInstance, target: &EngineInstance) {
    let target = target.clone();
    from.register_callback("descend", move |host, args| {
        let depth = args.first().and_then(HostValue::as_integer).unwrap_or(0);
        if depth <= 0 {
            return Ok(HostValue::Integer(0));
        }
        evaluate(
            host,
            &target,
            &format!("descend({}) + 1", depth - 1),
            Duration::ZERO,
        )
    })
    .expect("register descend");
}

#[test]
fn opposite_recursion_on_two_threads_completes() {
    let host = HostRuntime::new();
    let a = EngineInstance::create(&host, EngineLimits::default()).expect("a");
    let b = EngineInstance::create(&host, EngineLimits::default()).expect("b");
    install_descend(&a, &b);
    install_descend(&b, &a);

    let barrier = Arc::new(Barrier::new(2));
    let workers = [(a.clone(), 6i64), (b.clone(), 5i64)]
        .into_iter()
        .map(|(start, depth)| {
            let host = Arc::clone(&host);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let mut rounds = Vec::new();
                for _ in 0..10 {
                    let mut guard = host.enter();
                    rounds.push(evaluate(
                        &mut guard,
                        &start,
                        &format!("descend({})", depth),
                        Duration::from_secs(30),
                    ));
                }
                (depth, rounds)
            })
        })
        .collect::<Vec<_>>();

    for worker in workers {
        let (depth, rounds) = worker.join().expect("worker");
        for round in rounds {
            assert_eq!(round, Ok(HostValue::Integer(depth)));
        }
    }

    assert_eq!(a.dispose(), Ok(true));
    assert_eq!(b.dispose(), Ok(true));
}

#[test]
fn independent_instances_run_in_parallel() {
    let host = HostRuntime::new();
    let workers = (0..4i64)
        .map(|index| {
            let host = Arc::clone(&host);
            thread::spawn(move || {
                let instance =
                    EngineInstance::create(&host, EngineLimits::default()).expect("create");
                let mut guard = host.enter();
                evaluate(
                    &mut guard,
                    &instance,
                    &format!("let seed = {};", index),
                    Duration::ZERO,
                )
                .expect("seed");
                let value = evaluate(
                    &mut guard,
                    &instance,
                    "let s = seed; for i in 0..20000 { s += 1; } s",
                    Duration::ZERO,
                );
                (index, value)
            })
        })
        .collect::<Vec<_>>();

    for worker in workers {
        let (index, value) = worker.join().expect("worker");
        assert_eq!(value, Ok(HostValue::Integer(index + 20_000)));
    }
}

#[test]
fn a_terminated_instance_does_not_affect_its_neighbour() {
    let host = HostRuntime::new();
    let runaway = EngineInstance::create(&host, EngineLimits::default()).expect("runaway");
    let steady = EngineInstance::create(&host, EngineLimits::default()).expect("steady");

    let spinner = {
        let host = Arc::clone(&host);
        let runaway = runaway.clone();
        thread::spawn(move || {
            let mut guard = host.enter();
            evaluate(&mut guard, &runaway, "loop {}", Duration::from_millis(200))
        })
    };

    let mut guard = host.enter();
    for round in 0..20i64 {
        assert_eq!(
            evaluate(&mut guard, &steady, &format!("{} * 2", round), Duration::ZERO),
            Ok(HostValue::Integer(round * 2))
        );
    }
    drop(guard);

    let error = spinner.join().expect("spinner").expect_err("terminated");
    assert_eq!(error.code, "EVAL_TERMINATED");
}

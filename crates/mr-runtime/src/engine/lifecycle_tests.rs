use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mr_core::{EngineLimits, ErrorKind, HostValue, RacerError};

use super::*;

struct Counter {
    calls: AtomicUsize,
}

impl HostFunction for Counter {
    fn call(&self, _host: &mut HostGuard<'_>, _args: &[HostValue]) -> Result<HostValue, RacerError> {
        let calls = self.calls.fetch_add(1, Ordering::AcqRel) + 1;
        Ok(HostValue::Integer(calls as i64))
    }
}

#[test]
fn create_initializes_the_platform() {
    let host = HostRuntime::new();
    let instance = EngineInstance::create(&host, EngineLimits::default()).expect("create");
    assert!(platform::is_initialized());
    assert!(!instance.is_disposed());
    assert!(!instance.is_evaluating());
    assert!(Arc::ptr_eq(instance.host(), &host));
}

#[test]
fn create_rejects_an_empty_heap_budget() {
    let host = HostRuntime::new();
    let limits = EngineLimits {
        max_string_size: 0,
        ..EngineLimits::default()
    };
    let error = EngineInstance::create(&host, limits)
        .err()
        .expect("zero budget");
    assert_eq!(error.kind, ErrorKind::Resource);
    assert_eq!(error.code, "ENGINE_HEAP_INVALID");
    assert!(error.message.contains("max_string_size"));
}

#[test]
fn instances_have_distinct_ids_and_limits() {
    let host = HostRuntime::new();
    let limits = EngineLimits {
        max_call_levels: Some(16),
        ..EngineLimits::default()
    };
    let first = EngineInstance::create(&host, limits.clone()).expect("first");
    let second = EngineInstance::create(&host, EngineLimits::default()).expect("second");
    assert_ne!(first.id(), second.id());
    assert_eq!(first.limits().expect("limits"), limits);
    assert_eq!(second.limits().expect("limits"), EngineLimits::default());
}

#[test]
fn dispose_is_idempotent() {
    let host = HostRuntime::new();
    let instance = EngineInstance::create(&host, EngineLimits::default()).expect("create");
    assert_eq!(instance.dispose(), Ok(true));
    assert!(instance.is_disposed());
    assert_eq!(instance.dispose(), Ok(false));
}

#[test]
fn disposed_instances_refuse_work() {
    let host = HostRuntime::new();
    let instance = EngineInstance::create(&host, EngineLimits::default()).expect("create");
    instance.dispose().expect("dispose");

    let mut guard = host.enter();
    let error = evaluate(&mut guard, &instance, "1", Duration::ZERO).expect_err("disposed");
    assert_eq!(error.kind, ErrorKind::Disposed);
    assert_eq!(error.code, "ENGINE_DISPOSED");
    drop(guard);

    assert_eq!(
        instance.enter().err().map(|error| error.kind),
        Some(ErrorKind::Disposed)
    );
    assert_eq!(
        instance
            .register_callback("late", |_host, _args| Ok(HostValue::Null))
            .expect_err("disposed")
            .kind,
        ErrorKind::Disposed
    );
    assert_eq!(
        instance.unregister_callback("late").expect_err("disposed").kind,
        ErrorKind::Disposed
    );
    instance.terminate();
}

#[test]
fn dispose_during_an_evaluation_is_busy() {
    let host = HostRuntime::new();
    let instance = EngineInstance::create(&host, EngineLimits::default()).expect("create");
    {
        let same = instance.clone();
        instance
            .register_callback("dispose_me", move |_host, _args| match same.dispose() {
                Err(error) => Ok(HostValue::Text(error.code)),
                Ok(disposed) => Ok(HostValue::Text(disposed.to_string())),
            })
            .expect("register");
    }

    let mut guard = host.enter();
    let value = evaluate(&mut guard, &instance, "dispose_me()", Duration::ZERO).expect("eval");
    drop(guard);

    assert_eq!(value, HostValue::Text("ENGINE_BUSY".to_string()));
    assert!(!instance.is_disposed());
    assert_eq!(instance.dispose(), Ok(true));
}

#[test]
fn dropping_the_last_handle_releases_the_runtime() {
    let host = HostRuntime::new();
    let counter = Arc::new(Counter {
        calls: AtomicUsize::new(0),
    });
    let instance = EngineInstance::create(&host, EngineLimits::default()).expect("create");
    instance
        .register_function("tick", counter.clone())
        .expect("register");
    assert_eq!(Arc::strong_count(&counter), 2);

    drop(instance);
    assert_eq!(Arc::strong_count(&counter), 1);
}

#[test]
fn dispose_releases_callbacks() {
    let host = HostRuntime::new();
    let counter = Arc::new(Counter {
        calls: AtomicUsize::new(0),
    });
    let instance = EngineInstance::create(&host, EngineLimits::default()).expect("create");
    instance
        .register_function("tick", counter.clone())
        .expect("register");

    let mut guard = host.enter();
    assert_eq!(
        evaluate(&mut guard, &instance, "tick(); tick()", Duration::ZERO),
        Ok(HostValue::Integer(2))
    );
    drop(guard);

    instance.dispose().expect("dispose");
    assert_eq!(Arc::strong_count(&counter), 1);
}

#[test]
fn register_validates_names() {
    let host = HostRuntime::new();
    let instance = EngineInstance::create(&host, EngineLimits::default()).expect("create");

    let empty = instance
        .register_callback("", |_host, _args| Ok(HostValue::Null))
        .expect_err("empty");
    assert_eq!(empty.kind, ErrorKind::InvalidArgument);
    assert_eq!(empty.code, "CALLBACK_NAME_EMPTY");

    let invalid = instance
        .register_callback("not valid", |_host, _args| Ok(HostValue::Null))
        .expect_err("invalid");
    assert_eq!(invalid.code, "CALLBACK_NAME_INVALID");
    assert!(instance.callback_names().expect("names").is_empty());
}

#[test]
fn register_replaces_and_unregister_removes() {
    let host = HostRuntime::new();
    let instance = EngineInstance::create(&host, EngineLimits::default()).expect("create");
    instance
        .register_callback("answer", |_host, _args| Ok(HostValue::Integer(1)))
        .expect("register");
    instance
        .register_callback("answer", |_host, _args| Ok(HostValue::Integer(2)))
        .expect("replace");
    instance
        .register_callback("other", |_host, _args| Ok(HostValue::Null))
        .expect("register");
    assert_eq!(
        instance.callback_names().expect("names"),
        vec!["answer".to_string(), "other".to_string()]
    );

    let mut guard = host.enter();
    assert_eq!(
        evaluate(&mut guard, &instance, "answer()", Duration::ZERO),
        Ok(HostValue::Integer(2))
    );

    assert_eq!(instance.unregister_callback("answer"), Ok(true));
    assert_eq!(instance.unregister_callback("answer"), Ok(false));
    let error = evaluate(&mut guard, &instance, "answer()", Duration::ZERO).expect_err("gone");
    assert_eq!(error.code, "EVAL_EXECUTION_ERROR");
}

#[test]
fn registration_keeps_globals() {
    let host = HostRuntime::new();
    let instance = EngineInstance::create(&host, EngineLimits::default()).expect("create");
    let mut guard = host.enter();
    evaluate(&mut guard, &instance, "let kept = 5;", Duration::ZERO).expect("seed");

    instance
        .register_callback("plus_one", |_host, args| {
            let value = args.first().and_then(HostValue::as_integer).unwrap_or(0);
            Ok(HostValue::Integer(value + 1))
        })
        .expect("register");

    assert_eq!(
        evaluate(&mut guard, &instance, "plus_one(kept)", Duration::ZERO),
        Ok(HostValue::Integer(6))
    );
}

#[test]
fn call_depth_limit_is_an_execution_error() {
    let host = HostRuntime::new();
    let limits = EngineLimits {
        max_call_levels: Some(8),
        ..EngineLimits::default()
    };
    let instance = EngineInstance::create(&host, limits).expect("create");
    let mut guard = host.enter();
    let error = evaluate(
        &mut guard,
        &instance,
        "fn down(n) { if n == 0 { 0 } else { down(n - 1) } } down(100)",
        Duration::ZERO,
    )
    .expect_err("too deep");
    assert_eq!(error.kind, ErrorKind::Execution);
    assert_eq!(
        evaluate(&mut guard, &instance, "down(3)", Duration::ZERO).expect_err("not kept").kind,
        ErrorKind::Execution
    );
}

use std::time::Duration;

use rhai::{Dynamic, EvalAltResult, Position};

use mr_core::{Diagnostic, HostValue, RacerError, SourceLocation};

use super::host::HostGuard;
use super::instance::EngineInstance;
use super::scope::ValueHandle;
use super::watchdog::Watchdog;

#[derive(Debug, Clone, Copy)]
pub struct EvaluationRequest<'a> {
    pub source: &'a str,
    pub timeout: Duration,
}

impl<'a> EvaluationRequest<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            timeout: Duration::ZERO,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug)]
pub enum EvaluationOutcome {
    ParseFailed(Diagnostic),
    RuntimeFailed {
        diagnostic: Diagnostic,
        terminated: bool,
    },
    Completed(ValueHandle),
}

pub fn run(
    host: &mut HostGuard<'_>,
    instance: &EngineInstance,
    request: &EvaluationRequest<'_>,
) -> Result<EvaluationOutcome, RacerError> {
    if host.runtime().id() != instance.host().id() {
        return Err(RacerError::invalid_argument(
            "EVAL_HOST_MISMATCH",
            "Engine instance belongs to a different host runtime.",
        ));
    }
    host.without_lock(|| run_unlocked(instance, request))
}

fn run_unlocked(
    instance: &EngineInstance,
    request: &EvaluationRequest<'_>,
) -> Result<EvaluationOutcome, RacerError> {
    let scope = instance.enter()?;
    let mut checkout = scope.checkout()?;
    let instance_id = scope.instance_id();

    let ast = match checkout
        .engine
        .compile_with_scope(&checkout.globals, request.source)
    {
        Ok(ast) => ast,
        Err(error) => {
            let diagnostic = Diagnostic::new(error.0.to_string(), location_of(error.1));
            tracing::debug!(instance_id, %diagnostic, "script failed to parse");
            return Ok(EvaluationOutcome::ParseFailed(diagnostic));
        }
    };

    let watchdog = Watchdog::arm(instance_id, instance.terminate_handle(), request.timeout)?;
    let program = checkout.library.merge(&ast);
    let result = checkout
        .engine
        .eval_ast_with_scope::<Dynamic>(&mut checkout.globals, &program);
    let timed_out = watchdog.map(Watchdog::disarm).unwrap_or(false);

    match result {
        Ok(value) => {
            checkout.library.combine(ast.clone_functions_only());
            drop(checkout);
            Ok(EvaluationOutcome::Completed(scope.wrap(value).persist()))
        }
        Err(error) => {
            let terminated = is_termination(&error);
            let diagnostic = Diagnostic::new(error.to_string(), location_of(error.position()));
            tracing::debug!(
                instance_id,
                terminated,
                timed_out,
                %diagnostic,
                "script raised"
            );
            Ok(EvaluationOutcome::RuntimeFailed {
                diagnostic,
                terminated,
            })
        }
    }
}

pub fn evaluate(
    host: &mut HostGuard<'_>,
    instance: &EngineInstance,
    source: &str,
    timeout: Duration,
) -> Result<HostValue, RacerError> {
    let request = EvaluationRequest::new(source).with_timeout(timeout);
    let outcome = run(host, instance, &request)?;

    match outcome {
        EvaluationOutcome::ParseFailed(diagnostic) => {
            tracing::warn!(instance_id = instance.id(), %diagnostic, "parse error");
            Err(RacerError::parse())
        }
        EvaluationOutcome::RuntimeFailed {
            diagnostic,
            terminated,
        } => {
            if let Some(error) = instance.shared.take_host_error() {
                return Err(error);
            }
            tracing::warn!(instance_id = instance.id(), terminated, %diagnostic, "execution error");
            if terminated {
                Err(RacerError::terminated())
            } else {
                Err(RacerError::execution())
            }
        }
        EvaluationOutcome::Completed(handle) => host.without_lock(|| {
            let scope = instance.enter()?;
            let value = handle.open(&scope)?;
            Ok(value.to_host())
        }),
    }
}

fn is_termination(error: &EvalAltResult) -> bool {
    match error {
        EvalAltResult::ErrorTerminated(..) => true,
        EvalAltResult::ErrorInFunctionCall(_, _, inner, _)
        | EvalAltResult::ErrorInModule(_, inner, _) => is_termination(inner),
        _ => false,
    }
}

fn location_of(position: Position) -> Option<SourceLocation> {
    position.line().map(|line| SourceLocation {
        line,
        column: position.position().unwrap_or(0),
    })
}

mod engine;
mod helpers;

pub use engine::{
    evaluate, run, EngineInstance, EngineScope, EvaluationOutcome, EvaluationRequest, HostFunction,
    HostGuard, HostRuntime, ScopedValue, TerminateHandle, ValueHandle, MAX_CALLBACK_ARITY,
};
pub use engine::platform;
pub use helpers::rhai_bridge::{to_dynamic, to_host, UNSUPPORTED_CONVERSION};

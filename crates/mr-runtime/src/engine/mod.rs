mod callback;
mod eval;
mod exec_lock;
mod host;
mod instance;
pub mod platform;
mod scope;
mod watchdog;

pub use callback::{HostFunction, MAX_CALLBACK_ARITY};
pub use eval::{evaluate, run, EvaluationOutcome, EvaluationRequest};
pub use host::{HostGuard, HostRuntime};
pub use instance::{EngineInstance, TerminateHandle};
pub use scope::{EngineScope, ScopedValue, ValueHandle};

#[cfg(test)]
mod lifecycle_tests;

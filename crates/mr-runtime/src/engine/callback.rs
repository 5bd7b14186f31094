//! Host callables exposed to scripts as global functions.
//!
//! A script-side call never holds the instance's execution lock and the
//! host lock at the same time: arguments are converted under the execution
//! lock, the execution lock is handed back before the host lock is taken,
//! and the host lock is dropped before the execution lock is re-acquired to
//! convert the return value.

use std::sync::{Arc, Weak};

use rhai::{Dynamic, Engine, EvalAltResult, Position};

use mr_core::{HostValue, RacerError};

use super::host::{HostGuard, HostRuntime};
use super::instance::InstanceShared;
use crate::helpers::rhai_bridge;

pub const MAX_CALLBACK_ARITY: usize = 8;

const HOST_ERROR_TOKEN: &str = "host callback raised";

pub trait HostFunction: Send + Sync {
    fn call(&self, host: &mut HostGuard<'_>, args: &[HostValue]) -> Result<HostValue, RacerError>;
}

impl<F> HostFunction for F
where
    F: Fn(&mut HostGuard<'_>, &[HostValue]) -> Result<HostValue, RacerError> + Send + Sync,
{
    fn call(&self, host: &mut HostGuard<'_>, args: &[HostValue]) -> Result<HostValue, RacerError> {
        self(host, args)
    }
}

pub(crate) struct Trampoline {
    name: String,
    function: Arc<dyn HostFunction>,
    host: Arc<HostRuntime>,
    instance: Weak<InstanceShared>,
}

impl Trampoline {
    pub(crate) fn new(
        name: &str,
        function: Arc<dyn HostFunction>,
        host: Arc<HostRuntime>,
        instance: Weak<InstanceShared>,
    ) -> Self {
        Self {
            name: name.to_string(),
            function,
            host,
            instance,
        }
    }

    fn invoke(&self, args: Vec<Dynamic>) -> Result<Dynamic, Box<EvalAltResult>> {
        let Some(instance) = self.instance.upgrade() else {
            return Err(Box::new(EvalAltResult::ErrorRuntime(
                Dynamic::from(format!("engine instance for \"{}\" is gone", self.name)),
                Position::NONE,
            )));
        };

        debug_assert!(instance.lock.is_held_by_current_thread());
        let host_args = args.iter().map(rhai_bridge::to_host).collect::<Vec<_>>();
        let function = Arc::clone(&self.function);

        let result = instance.lock.unlocked(|| {
            let mut host = self.host.enter();
            function.call(&mut host, &host_args)
        });

        match result {
            Ok(value) => Ok(rhai_bridge::to_dynamic(&value)),
            Err(error) => {
                tracing::debug!(
                    instance_id = instance.id,
                    name = %self.name,
                    code = %error.code,
                    "host callback raised"
                );
                instance.stash_host_error(error);
                Err(Box::new(EvalAltResult::ErrorTerminated(
                    Dynamic::from(HOST_ERROR_TOKEN.to_string()),
                    Position::NONE,
                )))
            }
        }
    }
}

macro_rules! register_arities {
    ($engine:expr, $name:expr, $trampoline:expr; $(($($arg:ident),*)),* $(,)?) => {
        $({
            let trampoline = Arc::clone($trampoline);
            $engine.register_fn($name, move |$($arg: Dynamic),*| -> Result<Dynamic, Box<EvalAltResult>> {
                trampoline.invoke(vec![$($arg),*])
            });
        })*
    };
}

pub(crate) fn install(engine: &mut Engine, name: &str, trampoline: &Arc<Trampoline>) {
    register_arities!(engine, name, trampoline;
        (),
        (a1),
        (a1, a2),
        (a1, a2, a3),
        (a1, a2, a3, a4),
        (a1, a2, a3, a4, a5),
        (a1, a2, a3, a4, a5, a6),
        (a1, a2, a3, a4, a5, a6, a7),
        (a1, a2, a3, a4, a5, a6, a7, a8),
    );
}

pub(crate) fn validate_callback_name(name: &str) -> Result<(), RacerError> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(RacerError::invalid_argument(
            "CALLBACK_NAME_EMPTY",
            "Callback name must not be empty.",
        ));
    };

    let valid = (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
    if !valid {
        return Err(RacerError::invalid_argument(
            "CALLBACK_NAME_INVALID",
            format!("Callback name \"{}\" is not a valid identifier.", name),
        ));
    }
    Ok(())
}

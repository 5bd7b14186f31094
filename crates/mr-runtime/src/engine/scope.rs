use std::marker::PhantomData;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use rhai::{Dynamic, Engine, Scope, AST};

use mr_core::{HostValue, RacerError};

use super::exec_lock::ExecGuard;
use super::instance::{InstanceShared, Runtime};
use crate::helpers::rhai_bridge;

pub struct EngineScope<'a> {
    shared: &'a InstanceShared,
    _guard: ExecGuard<'a>,
}

impl<'a> EngineScope<'a> {
    pub(crate) fn enter(shared: &'a InstanceShared) -> Result<Self, RacerError> {
        let guard = shared.lock.acquire();
        if shared.state.lock().runtime.is_none() {
            drop(guard);
            return Err(RacerError::disposed());
        }
        Ok(Self {
            shared,
            _guard: guard,
        })
    }

    pub fn instance_id(&self) -> u64 {
        self.shared.id
    }

    pub fn global(&self, name: &str) -> Result<Option<ScopedValue<'_>>, RacerError> {
        self.with_runtime(|runtime| {
            runtime
                .globals
                .as_ref()
                .and_then(|globals| globals.get_value::<Dynamic>(name))
        })
        .map(|value| value.map(|value| self.wrap(value)))
    }

    pub(crate) fn wrap(&self, value: Dynamic) -> ScopedValue<'_> {
        ScopedValue {
            value,
            instance_id: self.shared.id,
            _scope: PhantomData,
        }
    }

    pub(crate) fn with_runtime<R>(
        &self,
        f: impl FnOnce(&mut Runtime) -> R,
    ) -> Result<R, RacerError> {
        let mut state = self.shared.state.lock();
        match state.runtime.as_mut() {
            Some(runtime) => Ok(f(runtime)),
            None => Err(RacerError::disposed()),
        }
    }

    /// Takes what a run needs out of the runtime. The first concurrent run
    /// owns the persistent global scope; any run that starts while it is
    /// checked out works on a scratch scope.
    pub(crate) fn checkout(&self) -> Result<Checkout<'_>, RacerError> {
        let (engine, globals, library) = self.with_runtime(|runtime| {
            (
                Arc::clone(&runtime.engine),
                runtime.globals.take(),
                runtime.library.clone(),
            )
        })?;

        if self.shared.active_runs.fetch_add(1, Ordering::AcqRel) == 0 {
            self.shared.interrupt.clear();
            self.shared.clear_host_errors();
        }

        let owns_globals = globals.is_some();
        Ok(Checkout {
            shared: self.shared,
            engine,
            globals: globals.unwrap_or_default(),
            library,
            owns_globals,
        })
    }
}

pub(crate) struct Checkout<'a> {
    shared: &'a InstanceShared,
    pub(crate) engine: Arc<Engine>,
    pub(crate) globals: Scope<'static>,
    pub(crate) library: AST,
    owns_globals: bool,
}

impl Drop for Checkout<'_> {
    fn drop(&mut self) {
        if self.owns_globals {
            let globals = std::mem::take(&mut self.globals);
            let library = std::mem::replace(&mut self.library, AST::empty());
            if let Some(runtime) = self.shared.state.lock().runtime.as_mut() {
                runtime.globals = Some(globals);
                runtime.library = library;
            }
        }

        if self.shared.active_runs.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.shared.interrupt.clear();
        }
    }
}

#[derive(Debug)]
pub struct ScopedValue<'s> {
    value: Dynamic,
    instance_id: u64,
    _scope: PhantomData<&'s ()>,
}

impl ScopedValue<'_> {
    pub fn dynamic(&self) -> &Dynamic {
        &self.value
    }

    pub fn to_host(&self) -> HostValue {
        rhai_bridge::to_host(&self.value)
    }

    pub fn persist(self) -> ValueHandle {
        ValueHandle {
            value: self.value,
            instance_id: self.instance_id,
        }
    }
}

#[must_use]
pub struct ValueHandle {
    value: Dynamic,
    instance_id: u64,
}

impl std::fmt::Debug for ValueHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueHandle")
            .field("instance_id", &self.instance_id)
            .field("type", &self.value.type_name())
            .finish()
    }
}

impl ValueHandle {
    pub fn instance_id(&self) -> u64 {
        self.instance_id
    }

    pub fn open<'s>(self, scope: &'s EngineScope<'_>) -> Result<ScopedValue<'s>, RacerError> {
        if scope.instance_id() != self.instance_id {
            return Err(RacerError::invalid_argument(
                "ENGINE_HANDLE_FOREIGN",
                format!(
                    "Value handle belongs to instance {}, not {}.",
                    self.instance_id,
                    scope.instance_id()
                ),
            ));
        }
        Ok(scope.wrap(self.value))
    }
}

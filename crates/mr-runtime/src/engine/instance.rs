use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;
use rhai::{Dynamic, Engine, Scope, AST};

use mr_core::{EngineLimits, HostValue, RacerError};

use super::callback::{self, HostFunction, Trampoline};
use super::exec_lock::ExecLock;
use super::host::{HostGuard, HostRuntime};
use super::platform::{self, Platform};
use super::scope::EngineScope;

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

const TERMINATION_TOKEN: &str = "terminated";

#[derive(Debug, Clone, Default)]
pub struct TerminateHandle {
    requested: Arc<AtomicBool>,
}

impl TerminateHandle {
    pub fn terminate(&self) {
        self.requested.store(true, Ordering::Release);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    pub(crate) fn clear(&self) {
        self.requested.store(false, Ordering::Release);
    }
}

pub(crate) struct Runtime {
    pub(crate) engine: Arc<Engine>,
    pub(crate) globals: Option<Scope<'static>>,
    pub(crate) library: AST,
    pub(crate) callbacks: BTreeMap<String, Arc<Trampoline>>,
    pub(crate) limits: EngineLimits,
}

impl Runtime {
    fn rebuild_engine(&mut self, interrupt: &TerminateHandle) {
        self.engine = Arc::new(build_engine(
            platform::initialize(),
            &self.limits,
            interrupt,
            &self.callbacks,
        ));
    }

    // Scope, then engine, then callback table, then budget.
    fn release(self, instance_id: u64) {
        let Runtime {
            engine,
            globals,
            library,
            callbacks,
            limits,
        } = self;

        if let Some(mut globals) = globals {
            globals.clear();
        }
        drop(library);
        tracing::debug!(instance_id, "cleared global scope");

        drop(engine);
        tracing::debug!(instance_id, "released engine runtime");

        let callback_count = callbacks.len();
        drop(callbacks);
        tracing::debug!(instance_id, callback_count, "released callbacks");

        tracing::debug!(instance_id, ?limits, "released heap budget");
    }
}

pub(crate) struct InstanceState {
    pub(crate) runtime: Option<Runtime>,
}

pub(crate) struct InstanceShared {
    pub(crate) id: u64,
    pub(crate) host: Arc<HostRuntime>,
    pub(crate) lock: ExecLock,
    pub(crate) state: Mutex<InstanceState>,
    pub(crate) interrupt: TerminateHandle,
    pub(crate) active_runs: AtomicUsize,
    // Keyed by the thread the failing run executes on.
    host_errors: Mutex<HashMap<ThreadId, RacerError>>,
}

impl InstanceShared {
    pub(crate) fn stash_host_error(&self, error: RacerError) {
        self.host_errors.lock().insert(thread::current().id(), error);
    }

    pub(crate) fn take_host_error(&self) -> Option<RacerError> {
        self.host_errors.lock().remove(&thread::current().id())
    }

    pub(crate) fn clear_host_errors(&self) {
        self.host_errors.lock().clear();
    }
}

impl Drop for InstanceShared {
    fn drop(&mut self) {
        if let Some(runtime) = self.state.get_mut().runtime.take() {
            tracing::debug!(instance_id = self.id, "disposing dropped engine instance");
            runtime.release(self.id);
        }
    }
}

#[derive(Clone)]
pub struct EngineInstance {
    pub(crate) shared: Arc<InstanceShared>,
}

impl EngineInstance {
    pub fn create(host: &Arc<HostRuntime>, limits: EngineLimits) -> Result<Self, RacerError> {
        let platform = platform::initialize();

        if let Some(budget) = limits.exhausted_budget() {
            return Err(RacerError::resource(
                "ENGINE_HEAP_INVALID",
                format!("Cannot install a heap budget with {} = 0.", budget),
            ));
        }

        let id = NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed);
        let interrupt = TerminateHandle::default();
        let callbacks = BTreeMap::new();
        let engine = build_engine(platform, &limits, &interrupt, &callbacks);

        tracing::debug!(instance_id = id, ?limits, "created engine instance");

        Ok(Self {
            shared: Arc::new(InstanceShared {
                id,
                host: Arc::clone(host),
                lock: ExecLock::default(),
                state: Mutex::new(InstanceState {
                    runtime: Some(Runtime {
                        engine: Arc::new(engine),
                        globals: Some(Scope::new()),
                        library: AST::empty(),
                        callbacks,
                        limits,
                    }),
                }),
                interrupt,
                active_runs: AtomicUsize::new(0),
                host_errors: Mutex::new(HashMap::new()),
            }),
        })
    }

    pub fn id(&self) -> u64 {
        self.shared.id
    }

    pub fn host(&self) -> &Arc<HostRuntime> {
        &self.shared.host
    }

    pub fn enter(&self) -> Result<EngineScope<'_>, RacerError> {
        EngineScope::enter(&self.shared)
    }

    pub fn terminate(&self) {
        tracing::debug!(instance_id = self.shared.id, "termination requested");
        self.shared.interrupt.terminate();
    }

    pub fn terminate_handle(&self) -> TerminateHandle {
        self.shared.interrupt.clone()
    }

    pub fn is_evaluating(&self) -> bool {
        self.shared.active_runs.load(Ordering::Acquire) > 0
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.state.lock().runtime.is_none()
    }

    pub fn limits(&self) -> Result<EngineLimits, RacerError> {
        let scope = self.enter()?;
        scope.with_runtime(|runtime| runtime.limits.clone())
    }

    pub fn dispose(&self) -> Result<bool, RacerError> {
        let _guard = self.shared.lock.acquire();
        if self.shared.active_runs.load(Ordering::Acquire) > 0 {
            return Err(RacerError::busy());
        }

        let runtime = self.shared.state.lock().runtime.take();
        match runtime {
            Some(runtime) => {
                tracing::debug!(instance_id = self.shared.id, "disposing engine instance");
                runtime.release(self.shared.id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn register_callback<F>(&self, name: &str, function: F) -> Result<(), RacerError>
    where
        F: Fn(&mut HostGuard<'_>, &[HostValue]) -> Result<HostValue, RacerError>
            + Send
            + Sync
            + 'static,
    {
        self.register_function(name, Arc::new(function))
    }

    pub fn register_function(
        &self,
        name: &str,
        function: Arc<dyn HostFunction>,
    ) -> Result<(), RacerError> {
        callback::validate_callback_name(name)?;

        let trampoline = Arc::new(Trampoline::new(
            name,
            function,
            Arc::clone(&self.shared.host),
            Arc::downgrade(&self.shared),
        ));

        let scope = self.enter()?;
        let replaced = scope.with_runtime(|runtime| {
            let replaced = runtime.callbacks.insert(name.to_string(), trampoline);
            runtime.rebuild_engine(&self.shared.interrupt);
            replaced
        })?;
        drop(scope);

        tracing::debug!(
            instance_id = self.shared.id,
            name,
            replaced = replaced.is_some(),
            "registered host callback"
        );
        Ok(())
    }

    pub fn unregister_callback(&self, name: &str) -> Result<bool, RacerError> {
        let scope = self.enter()?;
        let removed = scope.with_runtime(|runtime| {
            let removed = runtime.callbacks.remove(name);
            if removed.is_some() {
                runtime.rebuild_engine(&self.shared.interrupt);
            }
            removed
        })?;
        drop(scope);

        let existed = removed.is_some();
        drop(removed);
        if existed {
            tracing::debug!(instance_id = self.shared.id, name, "unregistered host callback");
        }
        Ok(existed)
    }

    pub fn callback_names(&self) -> Result<Vec<String>, RacerError> {
        let scope = self.enter()?;
        scope.with_runtime(|runtime| runtime.callbacks.keys().cloned().collect())
    }
}

fn build_engine(
    platform: &Platform,
    limits: &EngineLimits,
    interrupt: &TerminateHandle,
    callbacks: &BTreeMap<String, Arc<Trampoline>>,
) -> Engine {
    let mut engine = Engine::new_raw();
    engine.register_global_module(platform.packages());

    engine
        .set_max_string_size(limits.max_string_size)
        .set_max_array_size(limits.max_array_size)
        .set_max_map_size(limits.max_map_size);
    if let Some(levels) = limits.max_call_levels {
        engine.set_max_call_levels(levels);
    }

    let interrupt = interrupt.clone();
    engine.on_progress(move |_| {
        interrupt
            .is_requested()
            .then(|| Dynamic::from(TERMINATION_TOKEN.to_string()))
    });
    engine.on_print(|text| tracing::info!(target: "mr_runtime::script", "{}", text));
    engine.on_debug(|text, source, position| {
        tracing::debug!(
            target: "mr_runtime::script",
            source = source.unwrap_or(""),
            line = ?position.line(),
            "{}",
            text
        )
    });

    for (name, trampoline) in callbacks {
        callback::install(&mut engine, name, trampoline);
    }

    engine
}

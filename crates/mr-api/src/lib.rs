use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use mr_core::{EngineLimits, HostValue, RacerError};
use mr_runtime::{evaluate, EngineInstance, HostGuard, HostRuntime};

#[derive(Debug, Clone, Default)]
pub struct ContextOptions {
    pub timeout: Option<Duration>,
    pub limits: EngineLimits,
}

pub struct Context {
    instance: EngineInstance,
    timeout: Mutex<Duration>,
}

impl Context {
    pub fn new(host: &Arc<HostRuntime>, options: ContextOptions) -> Result<Self, RacerError> {
        let instance = EngineInstance::create(host, options.limits)?;
        let timeout = options.timeout.unwrap_or(Duration::ZERO);
        tracing::debug!(instance_id = instance.id(), ?timeout, "created context");
        Ok(Self {
            instance,
            timeout: Mutex::new(timeout),
        })
    }

    pub fn eval(&self, host: &mut HostGuard<'_>, source: &str) -> Result<HostValue, RacerError> {
        let timeout = *self.timeout.lock();
        evaluate(host, &self.instance, source, timeout)
    }

    pub fn stop(&self) {
        self.instance.terminate();
    }

    pub fn timeout(&self) -> Option<Duration> {
        let timeout = *self.timeout.lock();
        (!timeout.is_zero()).then_some(timeout)
    }

    pub fn set_timeout(&self, timeout: Option<Duration>) {
        *self.timeout.lock() = timeout.unwrap_or(Duration::ZERO);
    }

    pub fn attach<F>(&self, name: &str, function: F) -> Result<(), RacerError>
    where
        F: Fn(&mut HostGuard<'_>, &[HostValue]) -> Result<HostValue, RacerError>
            + Send
            + Sync
            + 'static,
    {
        self.instance.register_callback(name, function)
    }

    pub fn detach(&self, name: &str) -> Result<bool, RacerError> {
        self.instance.unregister_callback(name)
    }

    pub fn dispose(&self) -> Result<bool, RacerError> {
        self.instance.dispose()
    }

    pub fn is_disposed(&self) -> bool {
        self.instance.is_disposed()
    }

    pub fn instance(&self) -> &EngineInstance {
        &self.instance
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        if let Err(error) = self.instance.dispose() {
            tracing::warn!(instance_id = self.instance.id(), %error, "context dropped while busy");
        }
    }
}

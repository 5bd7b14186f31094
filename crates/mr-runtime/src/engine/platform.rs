use std::sync::{Arc, OnceLock};

use rhai::packages::{Package, StandardPackage};
use rhai::Module;

pub struct Platform {
    packages: Arc<Module>,
}

impl Platform {
    pub(crate) fn packages(&self) -> Arc<Module> {
        Arc::clone(&self.packages)
    }
}

static PLATFORM: OnceLock<Platform> = OnceLock::new();

pub fn initialize() -> &'static Platform {
    PLATFORM.get_or_init(|| {
        tracing::debug!("initializing engine platform");
        Platform {
            packages: StandardPackage::new().as_shared_module(),
        }
    })
}

pub fn is_initialized() -> bool {
    PLATFORM.get().is_some()
}

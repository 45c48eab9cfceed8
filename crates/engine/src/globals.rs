//! Global host service storage
//!
//! Host services are handed over once during plugin load and stored here.
//! Unlike a `OnceLock`, the slot can be cleared on unload so the plugin can
//! be loaded again into the same process.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::ThreadId;

use parking_lot::RwLock;

use crate::data::DataSource;
use crate::error::HostError;
use crate::image::CodeRegion;
use crate::ui::AddonHost;

/// Global host state containing every collaborator the core needs
pub struct HostGlobals {
    /// Executable code of the host's main module (scanned for signatures)
    pub code_region: CodeRegion,

    /// Localized data tables
    pub data_source: Arc<dyn DataSource>,

    /// UI refresh primitives
    pub addons: Arc<dyn AddonHost>,

    /// Directory the plugin was loaded from (configs live below it)
    plugin_dir: Option<PathBuf>,

    /// Host thread ID for thread safety checks
    pub main_thread_id: ThreadId,
}

/// Global host state storage
static HOST: RwLock<Option<Arc<HostGlobals>>> = RwLock::new(None);

impl HostGlobals {
    /// Create new HostGlobals bound to the calling thread
    ///
    /// # Arguments
    /// * `code_region` - Executable code to scan
    /// * `data_source` - Localized data lookups
    /// * `addons` - UI refresh primitives
    pub fn new(
        code_region: CodeRegion,
        data_source: Arc<dyn DataSource>,
        addons: Arc<dyn AddonHost>,
    ) -> Self {
        Self {
            code_region,
            data_source,
            addons,
            plugin_dir: None,
            main_thread_id: std::thread::current().id(),
        }
    }

    /// Set the plugin directory
    pub fn with_plugin_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.plugin_dir = Some(dir.into());
        self
    }

    /// Directory the plugin was loaded from, if the bridge supplied one
    pub fn plugin_dir(&self) -> Option<&Path> {
        self.plugin_dir.as_deref()
    }
}

/// Initialize host globals
///
/// Called once during plugin load. Returns error if already initialized.
pub fn init_host(globals: HostGlobals) -> Result<Arc<HostGlobals>, HostError> {
    let mut slot = HOST.write();
    if slot.is_some() {
        return Err(HostError::AlreadyInitialized);
    }
    let globals = Arc::new(globals);
    *slot = Some(Arc::clone(&globals));
    Ok(globals)
}

/// Drop the host globals
///
/// Called during plugin unload, after every hook is gone.
pub fn clear_host() {
    if HOST.write().take().is_some() {
        tracing::debug!("Host globals cleared");
    }
}

/// Get host globals
pub fn host() -> Result<Arc<HostGlobals>, HostError> {
    try_host().ok_or(HostError::NotInitialized)
}

/// Try to get host globals
pub fn try_host() -> Option<Arc<HostGlobals>> {
    HOST.read().clone()
}

/// Check if host is initialized
pub fn is_host_initialized() -> bool {
    HOST.read().is_some()
}

/// Check if current thread is the host thread
pub fn is_main_thread() -> bool {
    HOST.read()
        .as_ref()
        .map(|g| std::thread::current().id() == g.main_thread_id)
        .unwrap_or(false)
}

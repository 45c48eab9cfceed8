//! C-compatible exports called by the host-side bridge

use std::ffi::{c_char, CStr};
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::instrument;

use langswap_core::{queue_task, LangSwap, LangSwapConfig, Surface};
use langswap_engine::{clear_host, init_host, is_main_thread, CodeRegion, HostError, HostGlobals};

use super::bridge::{Bridge, LangSwapApi};
use crate::logging;

/// The running instance between load and unload
static RUNTIME: RwLock<Option<Arc<LangSwap>>> = RwLock::new(None);

/// Called once when the bridge loads the plugin
///
/// # Safety
/// - `api` must point to a callback table that stays valid until unload
/// - `plugin_dir` must be a valid null-terminated C string or null
#[no_mangle]
pub unsafe extern "C" fn langswap_load(api: *const LangSwapApi, plugin_dir: *const c_char) -> bool {
    match std::panic::catch_unwind(AssertUnwindSafe(|| load(api, plugin_dir))) {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            tracing::error!("LangSwap failed to load: {}", e);
            false
        }
        Err(_) => {
            tracing::error!("Panic during load");
            clear_host();
            false
        }
    }
}

#[instrument(skip_all)]
unsafe fn load(api: *const LangSwapApi, plugin_dir: *const c_char) -> Result<(), LoadError> {
    if api.is_null() {
        logging::init(false);
        return Err(LoadError::NullApi);
    }
    let bridge = Arc::new(Bridge::new(*api));

    let plugin_dir = (!plugin_dir.is_null())
        .then(|| PathBuf::from(CStr::from_ptr(plugin_dir).to_string_lossy().into_owned()));

    let config = match &plugin_dir {
        Some(dir) => LangSwap::load_config(dir),
        None => Ok(LangSwapConfig::default()),
    };
    let config = match config {
        Ok(config) => {
            logging::init(config.debug);
            config
        }
        Err(e) => {
            logging::init(false);
            tracing::warn!("Using default settings: {}", e);
            LangSwapConfig::default()
        }
    };

    tracing::info!("LangSwap {} loading...", env!("CARGO_PKG_VERSION"));

    let code_region = if bridge.api().code_base.is_null() {
        CodeRegion::main_module()?
    } else {
        CodeRegion::new(bridge.api().code_base, bridge.api().code_len)
    };

    let mut globals = HostGlobals::new(code_region, bridge.clone(), bridge);
    if let Some(dir) = plugin_dir {
        globals = globals.with_plugin_dir(dir);
    }
    let host = init_host(globals)?;

    let runtime = match LangSwap::start_in_host(config, &host) {
        Ok(runtime) => runtime,
        Err(e) => {
            clear_host();
            return Err(e.into());
        }
    };
    *RUNTIME.write() = Some(Arc::new(runtime));

    tracing::info!("LangSwap loaded");
    tracing::debug!("Host thread ID: {:?}", std::thread::current().id());
    Ok(())
}

#[derive(Debug, thiserror::Error)]
enum LoadError {
    #[error("Bridge API table is null")]
    NullApi,

    #[error(transparent)]
    Host(#[from] HostError),

    #[error(transparent)]
    Runtime(#[from] langswap_core::RuntimeError),
}

/// Called when the bridge unloads the plugin
///
/// Restores the client language and removes every hook before returning.
#[no_mangle]
#[instrument(skip_all)]
pub extern "C" fn langswap_unload() -> bool {
    tracing::info!("LangSwap unloading...");

    let runtime = RUNTIME.write().take();
    let result = std::panic::catch_unwind(AssertUnwindSafe(move || {
        if let Some(runtime) = runtime {
            runtime.shutdown();
        }
    }));
    clear_host();

    match result {
        Ok(()) => true,
        Err(_) => {
            tracing::error!("Panic during shutdown");
            false
        }
    }
}

/// Called by the bridge once per render tick, on the host thread
#[no_mangle]
pub extern "C" fn langswap_on_frame() {
    let Some(runtime) = RUNTIME.read().clone() else {
        return;
    };
    if std::panic::catch_unwind(AssertUnwindSafe(move || runtime.on_frame())).is_err() {
        tracing::error!("Panic during frame processing");
    }
}

/// Run `f` against the runtime on the host thread
///
/// Calls from other threads are queued to the next frame.
fn with_runtime<F>(name: &'static str, f: F) -> bool
where
    F: FnOnce(&LangSwap) + Send + 'static,
{
    let run = move || {
        let Some(runtime) = RUNTIME.read().clone() else {
            tracing::debug!("{} ignored, LangSwap is not loaded", name);
            return;
        };
        if std::panic::catch_unwind(AssertUnwindSafe(|| f(&runtime))).is_err() {
            tracing::error!("Panic during {}", name);
        }
    };

    if is_main_thread() {
        run();
        true
    } else {
        tracing::trace!("Queueing {} from off-thread caller", name);
        queue_task(run).is_ok()
    }
}

#[no_mangle]
pub extern "C" fn langswap_request_swap() -> bool {
    with_runtime("request_swap", |runtime| {
        runtime.request_swap();
    })
}

#[no_mangle]
pub extern "C" fn langswap_request_restore() -> bool {
    with_runtime("request_restore", |runtime| {
        runtime.request_restore();
    })
}

/// Swap when idle, restore when swapped (the keyboard shortcut)
#[no_mangle]
pub extern "C" fn langswap_request_toggle() -> bool {
    with_runtime("request_toggle", |runtime| {
        runtime.request_toggle();
    })
}

#[no_mangle]
pub extern "C" fn langswap_clear_cache() -> bool {
    with_runtime("clear_cache", LangSwap::clear_cache)
}

/// Enable or disable one surface (0 = cast bar, 1 = action detail, 2 = item detail)
#[no_mangle]
pub extern "C" fn langswap_set_surface(surface: u8, enabled: bool) -> bool {
    let Some(surface) = Surface::from_id(surface) else {
        tracing::warn!("Unknown surface id {}", surface);
        return false;
    };
    with_runtime("set_surface", move |runtime| {
        runtime.set_surface_enabled(surface, enabled);
    })
}

/// Whether the target language is currently shown
#[no_mangle]
pub extern "C" fn langswap_is_swapped() -> bool {
    RUNTIME
        .read()
        .as_ref()
        .is_some_and(|runtime| runtime.is_swapped())
}

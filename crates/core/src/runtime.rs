//! Runtime facade
//!
//! [`LangSwap`] wires the cache, the hook manager and the toggle together
//! and is what the plugin layer drives.

use std::path::Path;
use std::sync::Arc;

use langswap_engine::{AddonHost, DataSource, HostError, HostGlobals};

use crate::config::{self, ConfigError, LangSwapConfig};
use crate::frame::{self, FrameScheduler};
use crate::gamedata::{Gamedata, GamedataError};
use crate::hooks::{SignatureResolver, SymbolResolver};
use crate::scanner::Scanner;
use crate::surfaces::{HookManager, HostLayout, HookState, Surface, SurfaceContext};
use crate::toggle::{LanguageToggle, ToggleAction};
use crate::translation::TranslationCache;

/// Errors that prevent the runtime from starting
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Gamedata error: {0}")]
    Gamedata(#[from] GamedataError),

    #[error("Host error: {0}")]
    Host(#[from] HostError),
}

/// A running LangSwap instance
pub struct LangSwap {
    config: LangSwapConfig,
    cache: Arc<TranslationCache>,
    manager: Arc<HookManager>,
    toggle: LanguageToggle,
    scheduler: FrameScheduler,
}

impl LangSwap {
    /// Build every surface and enable the configured ones
    pub fn start(
        config: LangSwapConfig,
        gamedata: &Gamedata,
        source: Arc<dyn DataSource>,
        addons: Arc<dyn AddonHost>,
        resolver: Arc<dyn SymbolResolver>,
    ) -> Result<Self, RuntimeError> {
        let layout = HostLayout::from_gamedata(gamedata)?;
        let cache = Arc::new(TranslationCache::new(source, config.limits));

        let ctx = SurfaceContext {
            cache: cache.clone(),
            addons,
            resolver,
            layout,
            markers: config.markers,
            client_language: config.client_language,
            target_language: config.target_language,
        };
        let manager = Arc::new(HookManager::with_surfaces(ctx, config.surfaces.enabled()));
        manager.enable_all();

        tracing::info!(
            "LangSwap started ({} -> {}, {} surfaces)",
            config.client_language,
            config.target_language,
            manager.surfaces().len()
        );

        Ok(Self {
            toggle: LanguageToggle::new(config.toggle, manager.clone()),
            config,
            cache,
            manager,
            scheduler: FrameScheduler::new(),
        })
    }

    /// Start against the host's own process image
    ///
    /// Gamedata is read from next to the plugin when deployed there.
    pub fn start_in_host(config: LangSwapConfig, host: &HostGlobals) -> Result<Self, RuntimeError> {
        let gamedata = match host.plugin_dir() {
            Some(dir) => Gamedata::load_or_builtin(config::gamedata_path(dir))?,
            None => Gamedata::builtin()?,
        };
        if let Some(version) = gamedata.game_version() {
            tracing::info!("Gamedata for host build {}", version);
        }

        let gamedata = Arc::new(gamedata);
        let resolver = Arc::new(SignatureResolver::new(
            gamedata.clone(),
            Scanner::new(host.code_region),
        ));

        Self::start(
            config,
            &gamedata,
            host.data_source.clone(),
            host.addons.clone(),
            resolver,
        )
    }

    /// Load the user settings below `plugin_dir`
    pub fn load_config(plugin_dir: &Path) -> Result<LangSwapConfig, RuntimeError> {
        Ok(LangSwapConfig::load(&config::config_path(plugin_dir))?)
    }

    pub fn config(&self) -> &LangSwapConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<TranslationCache> {
        &self.cache
    }

    pub fn manager(&self) -> &Arc<HookManager> {
        &self.manager
    }

    pub fn is_swapped(&self) -> bool {
        self.manager.is_swapped()
    }

    pub fn surfaces(&self) -> Vec<(Surface, HookState)> {
        self.manager.surfaces()
    }

    pub fn request_swap(&self) -> bool {
        self.request(ToggleAction::Swap)
    }

    pub fn request_restore(&self) -> bool {
        self.request(ToggleAction::Restore)
    }

    pub fn request_toggle(&self) -> bool {
        self.request(ToggleAction::Toggle)
    }

    fn request(&self, action: ToggleAction) -> bool {
        if self.manager.is_disposed() {
            return false;
        }
        self.toggle.request(&self.scheduler, action)
    }

    /// Forget every cached translation
    pub fn clear_cache(&self) {
        let entries = self.cache.len();
        self.cache.clear();
        tracing::info!("Translation cache cleared ({} entries)", entries);
    }

    /// Turn one surface on or off while running
    ///
    /// Returns `false` if it already was in that state.
    pub fn set_surface_enabled(&self, surface: Surface, enabled: bool) -> bool {
        if enabled {
            self.manager.enable_surface(surface)
        } else {
            self.manager.disable_surface(surface)
        }
    }

    /// Drive queued tasks and deferred changes; called once per host frame
    pub fn on_frame(&self) {
        frame::on_frame(&self.scheduler);
    }

    /// Cancel pending changes, restore the client language and remove every
    /// hook. Later calls do nothing.
    pub fn shutdown(&self) {
        if self.manager.is_disposed() {
            return;
        }
        self.toggle.cancel(&self.scheduler);
        self.manager.restore_language();
        self.manager.dispose();
        tracing::info!("LangSwap shut down");
    }
}

impl Drop for LangSwap {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surfaces::testing::{serial, NoSymbols, RecordingUi};
    use crate::translation::testing::CountingSource;
    use langswap_sdk::{EntityKind, Language};

    fn runtime(config: LangSwapConfig) -> (LangSwap, Arc<CountingSource>) {
        let source = Arc::new(CountingSource::potions());
        let runtime = LangSwap::start(
            config,
            &Gamedata::builtin().unwrap(),
            source.clone(),
            Arc::new(RecordingUi::default()),
            Arc::new(NoSymbols),
        )
        .unwrap();
        (runtime, source)
    }

    fn quick() -> LangSwapConfig {
        let mut config = LangSwapConfig::default();
        config.toggle.delay_frames = 2;
        config.toggle.min_interval_ms = 0;
        config
    }

    #[test]
    fn test_start_enables_configured_surfaces() {
        let _serial = serial();
        let mut config = quick();
        config.surfaces.cast_bar = false;
        let (runtime, _) = runtime(config);

        let surfaces: Vec<Surface> = runtime.surfaces().into_iter().map(|(s, _)| s).collect();
        assert_eq!(surfaces, vec![Surface::ActionDetail, Surface::ItemDetail]);
    }

    #[test]
    fn test_requests_apply_after_delay() {
        let _serial = serial();
        let (runtime, _) = runtime(quick());

        assert!(runtime.request_toggle());
        runtime.on_frame();
        assert!(!runtime.is_swapped());
        runtime.on_frame();
        assert!(runtime.is_swapped());

        runtime.request_restore();
        runtime.on_frame();
        runtime.on_frame();
        assert!(!runtime.is_swapped());
    }

    #[test]
    fn test_clear_cache() {
        let _serial = serial();
        let (runtime, source) = runtime(quick());
        runtime.cache().get(EntityKind::Item, 1, Language::French);
        assert_eq!(runtime.cache().len(), 1);

        runtime.clear_cache();
        assert!(runtime.cache().is_empty());
        runtime.cache().get(EntityKind::Item, 1, Language::French);
        assert_eq!(source.calls(), 2);
    }

    #[test]
    fn test_surface_toggle_at_runtime() {
        let _serial = serial();
        let (runtime, _) = runtime(quick());

        assert!(runtime.set_surface_enabled(Surface::CastBar, false));
        assert!(!runtime.set_surface_enabled(Surface::CastBar, false));
        assert_eq!(runtime.surfaces().len(), 2);

        assert!(runtime.set_surface_enabled(Surface::CastBar, true));
        assert_eq!(runtime.surfaces().len(), 3);
    }

    #[test]
    fn test_shutdown_cancels_pending_change() {
        let _serial = serial();
        let (runtime, _) = runtime(quick());

        runtime.request_swap();
        runtime.shutdown();
        runtime.on_frame();
        runtime.on_frame();

        assert!(!runtime.is_swapped());
        assert!(runtime.manager().is_disposed());
        assert!(!runtime.request_toggle());
        runtime.shutdown();
    }

    #[test]
    fn test_shutdown_restores_before_dispose() {
        let _serial = serial();
        let (runtime, _) = runtime(quick());
        runtime.request_swap();
        runtime.on_frame();
        runtime.on_frame();
        assert!(runtime.is_swapped());

        runtime.shutdown();
        assert!(!runtime.is_swapped());
        for hook in Surface::ALL.map(|s| runtime.manager().hook(s).unwrap()) {
            assert_eq!(hook.state(), HookState::Disposed);
        }
    }
}

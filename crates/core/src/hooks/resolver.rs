//! Symbol resolution for hooks
//!
//! Hooks are named after their gamedata signature; a resolver turns that name
//! into an address in the running host.

use std::sync::Arc;

use crate::gamedata::{Gamedata, GamedataError};
use crate::scanner::Scanner;

use super::inline::{HookError, Interception};

/// Turns a signature name into a code address
pub trait SymbolResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Result<usize, GamedataError>;
}

/// Resolves names by scanning the host's code section for gamedata patterns
pub struct SignatureResolver {
    gamedata: Arc<Gamedata>,
    scanner: Scanner,
}

impl SignatureResolver {
    pub fn new(gamedata: Arc<Gamedata>, scanner: Scanner) -> Self {
        Self { gamedata, scanner }
    }

    pub fn gamedata(&self) -> &Gamedata {
        &self.gamedata
    }
}

impl SymbolResolver for SignatureResolver {
    fn resolve(&self, name: &str) -> Result<usize, GamedataError> {
        let pattern = self.gamedata.pattern(name)?;
        Ok(self.scanner.find(name, &pattern)?)
    }
}

/// Why a hook could not be placed
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    #[error("Resolution failed: {0}")]
    Resolve(#[from] GamedataError),

    #[error("Install failed: {0}")]
    Hook(#[from] HookError),
}

/// Install `interception` at the address its name resolves to, or re-enable
/// it if it was installed before.
///
/// # Safety
/// The resolved address must be a function whose signature is `F`.
pub unsafe fn hook_symbol<F: Copy>(
    interception: &Interception<F>,
    resolver: &dyn SymbolResolver,
    detour: F,
) -> Result<(), InstallError> {
    if interception.is_installed() {
        interception.enable()?;
        return Ok(());
    }

    let target = resolver.resolve(interception.name())?;
    interception.install(target, detour)?;
    Ok(())
}

//! The process-wide bootstrap tracing subscriber (§2A).
//!
//! `main` installs a plain, unfiltered-by-redaction subscriber before
//! `Engine::load` runs, so a Loader or Resolver failure has somewhere to go
//! even though the logger plugin — which builds the user's configured
//! format and redaction rules — hasn't been initialized yet. Once the
//! logger plugin's `init` hook runs, it replaces this bootstrap layer in
//! place via [`reconfigure`] rather than installing a second global
//! subscriber, which `tracing` does not allow.

use std::sync::OnceLock;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{reload, EnvFilter, Layer, Registry};

/// A type-erased layer, boxed so the bootstrap layer and the logger
/// plugin's eventual pretty/compact/json layer can share one `reload::Layer`
/// slot despite being different concrete types.
pub type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

static HANDLE: OnceLock<reload::Handle<BoxedLayer, Registry>> = OnceLock::new();

/// Installs an `info`-level (or `RUST_LOG`-controlled) plain-text subscriber
/// as the process's global default. Must be called exactly once, before any
/// plugin is loaded. Returns `Err` if a global subscriber was already
/// installed by someone else.
pub fn install_bootstrap() -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let boxed: BoxedLayer = Box::new(tracing_subscriber::fmt::layer().with_filter(env_filter));
    let (reloadable, handle) = reload::Layer::new(boxed);
    let _ = HANDLE.set(handle);
    Registry::default().with(reloadable).try_init()
}

/// Swaps the installed subscriber's layer for `layer`, in place. A no-op if
/// [`install_bootstrap`] was never called successfully (for example, in a
/// test harness that installs its own subscriber).
pub fn reconfigure(layer: BoxedLayer) {
    if let Some(handle) = HANDLE.get() {
        let _ = handle.reload(layer);
    }
}

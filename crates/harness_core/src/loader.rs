//! Plugin loading: dynamic shared objects via `libloading`, or statically
//! linked plugins registered in-process.
//!
//! Every plugin, however it was loaded, ends up as a [`LoadedPlugin`] that
//! owns whatever keeps its function pointers valid — either an
//! [`libloading::Library`] handle or nothing, for a plugin built into the
//! harness binary itself.

use std::collections::HashMap as StdHashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use libloading::Library;

use crate::error::LoadError;
use crate::manifest::{DeinitFn, InitFn, PluginDescriptor, PluginManifest, StartFn};

/// Name of the exported symbol a dynamic plugin library must provide:
/// `harness_plugin_<name>`, a `*const PluginDescriptor`.
fn descriptor_symbol_name(plugin_name: &str) -> Vec<u8> {
    let mut sym = format!("harness_plugin_{plugin_name}").into_bytes();
    sym.push(0);
    sym
}

/// A dynamically loaded plugin's backing library, kept alive for as long
/// as any of its function pointers might still be called.
///
/// Not `Clone`: ownership is unique, shared only via the `Arc` each
/// [`LoadedPlugin`] that came from the same library holds.
pub struct LoadedLibrary {
    #[allow(dead_code)]
    library: Library,
}

/// A plugin the harness knows about, whether it arrived by `dlopen` or by
/// static [`Loader::register`].
pub struct LoadedPlugin {
    /// The plugin's declarative manifest (name, version, requires, ...).
    pub manifest: PluginManifest,
    init: Option<InitFn>,
    deinit: Option<DeinitFn>,
    start: Option<StartFn>,
    /// Keeps the backing library mapped for as long as this plugin's
    /// function pointers might be invoked. `None` for statically linked
    /// plugins, which borrow no library at all.
    _library: Option<Arc<LoadedLibrary>>,
}

impl LoadedPlugin {
    /// The plugin's `init` hook, if it declared one.
    #[must_use]
    pub fn init(&self) -> Option<InitFn> {
        self.init
    }

    /// The plugin's `deinit` hook, if it declared one.
    #[must_use]
    pub fn deinit(&self) -> Option<DeinitFn> {
        self.deinit
    }

    /// The plugin's `start` (worker) hook, if it declared one.
    #[must_use]
    pub fn start(&self) -> Option<StartFn> {
        self.start
    }
}

/// Statically-linked plugin entry point: returns a `'static` reference to
/// a descriptor baked into the harness binary.
pub type StaticDescriptorFn = fn() -> &'static PluginDescriptor;

/// Loads plugins by name, either from shared objects under
/// [`crate::config::Config::extension_dir`] or from in-process
/// registrations.
#[derive(Default)]
pub struct Loader {
    extension_dir: PathBuf,
    static_registry: StdHashMap<String, StaticDescriptorFn>,
}

impl Loader {
    /// Builds a loader that looks for dynamic libraries under
    /// `extension_dir`.
    #[must_use]
    pub fn new(extension_dir: impl Into<PathBuf>) -> Self {
        Self {
            extension_dir: extension_dir.into(),
            static_registry: StdHashMap::new(),
        }
    }

    /// Registers a statically linked plugin under `name`, to be returned
    /// by [`Loader::load`] without touching the filesystem.
    ///
    /// This is how built-in plugins (routing, fabric cache, the logger)
    /// ship inside the harness binary while still going through the same
    /// descriptor contract as a `dlopen`'d plugin.
    pub fn register(&mut self, name: impl Into<String>, descriptor_fn: StaticDescriptorFn) {
        self.static_registry.insert(name.into(), descriptor_fn);
    }

    /// Loads `name`, preferring a static registration over the filesystem.
    pub fn load(&self, name: &str) -> Result<LoadedPlugin, LoadError> {
        if let Some(descriptor_fn) = self.static_registry.get(name) {
            let descriptor = descriptor_fn();
            // Safety: a statically linked descriptor is valid for the
            // program's entire lifetime.
            let manifest = unsafe { PluginManifest::from_descriptor(name, descriptor) }?;
            return Ok(LoadedPlugin {
                manifest,
                init: descriptor.init,
                deinit: descriptor.deinit,
                start: descriptor.start,
                _library: None,
            });
        }

        self.open(name)
    }

    /// Opens `name`'s shared object under the extension directory and
    /// reads its descriptor. Used directly by callers that want to bypass
    /// the static registry (mainly tests).
    pub fn open(&self, name: &str) -> Result<LoadedPlugin, LoadError> {
        let path = self.library_path(name);
        if !path.is_file() {
            return Err(LoadError::LibraryNotFound(path.display().to_string()));
        }

        // Safety: loading a plugin is inherently unsafe — we trust the
        // extension directory to contain well-formed harness plugins, the
        // same trust boundary the upstream loader draws around its own
        // plugin directory.
        let library = unsafe { Library::new(&path) }
            .map_err(|e| LoadError::SymbolNotFound {
                path: path.display().to_string(),
                symbol: e.to_string(),
            })?;

        let symbol_name = descriptor_symbol_name(name);
        // Safety: `symbol_name` is NUL-terminated; the symbol, if present,
        // is expected to be a `*const PluginDescriptor` per the harness
        // plugin ABI.
        let descriptor_ptr: *const PluginDescriptor = unsafe {
            *library
                .get::<*const PluginDescriptor>(&symbol_name)
                .map_err(|_| LoadError::SymbolNotFound {
                    path: path.display().to_string(),
                    symbol: String::from_utf8_lossy(&symbol_name).into_owned(),
                })?
        };

        if descriptor_ptr.is_null() {
            return Err(LoadError::BadDescriptor(
                name.to_owned(),
                "exported descriptor pointer is null".to_owned(),
            ));
        }

        // Safety: the descriptor pointer came from the library we just
        // opened and is kept mapped by `library`, which we move into the
        // returned `LoadedPlugin`.
        let manifest = unsafe { PluginManifest::from_descriptor(name, &*descriptor_ptr) }?;
        // Safety: same pointer, same validity argument as above.
        let (init, deinit, start) = unsafe {
            let d = &*descriptor_ptr;
            (d.init, d.deinit, d.start)
        };

        Ok(LoadedPlugin {
            manifest,
            init,
            deinit,
            start,
            _library: Some(Arc::new(LoadedLibrary { library })),
        })
    }

    fn library_path(&self, name: &str) -> PathBuf {
        let ext = std::env::consts::DLL_EXTENSION;
        self.extension_dir.join(format!("{name}.{ext}"))
    }
}

/// Convenience used by tests and by [`Loader::register`] callers that want
/// to point at a specific directory without building a full [`Loader`].
#[must_use]
pub fn extension_path(dir: &Path, name: &str) -> PathBuf {
    let ext = std::env::consts::DLL_EXTENSION;
    dir.join(format!("{name}.{ext}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_library_is_reported() {
        let loader = Loader::new("/nonexistent/extension/dir");
        let err = loader.open("routing").unwrap_err();
        assert!(matches!(err, LoadError::LibraryNotFound(_)));
    }

    #[test]
    fn static_registration_bypasses_filesystem() {
        static DESCRIPTOR: PluginDescriptor = PluginDescriptor {
            abi_version: crate::manifest::ABI_VERSION,
            brief: core::ptr::null(),
            plugin_version: 0,
            requires: core::ptr::null(),
            requires_len: 0,
            conflicts: core::ptr::null(),
            conflicts_len: 0,
            init: None,
            deinit: None,
            start: None,
        };
        fn get() -> &'static PluginDescriptor {
            &DESCRIPTOR
        }

        let mut loader = Loader::new("/nonexistent/extension/dir");
        loader.register("builtin", get);

        let loaded = loader.load("builtin").unwrap();
        assert_eq!(loaded.manifest.name, "builtin");
        assert!(loaded.init().is_none());
    }

    #[test]
    fn extension_path_uses_platform_suffix() {
        let path = extension_path(Path::new("/lib/harness"), "routing");
        assert_eq!(
            path,
            PathBuf::from(format!("/lib/harness/routing.{}", std::env::consts::DLL_EXTENSION))
        );
    }
}

//! The plugin descriptor: the stable C-ABI layout a shared object exports,
//! and the owned, safe [`PluginManifest`] the harness copies it into.
//!
//! The descriptor's pointer fields are only valid for as long as the
//! library that exported them stays mapped, so every field the harness
//! keeps around past the loading step is copied into owned `String`s
//! before the [`crate::loader::LoadedLibrary`] that produced it is allowed
//! to be dropped.

use core::ffi::{c_char, c_int, c_void};

use crate::error::LoadError;
use crate::version::Version;

/// The ABI major.minor the harness is compiled against (§6). Only the high
/// byte of a plugin's `abi_version` gates loading.
pub const ABI_VERSION: u32 = 0x0100;

/// Prototype for a plugin's optional `init` hook.
///
/// Receives an opaque pointer to the harness-owned [`HarnessInfo`] context
/// and returns `0` on success, any other value on failure.
pub type InitFn = unsafe extern "C" fn(info: *const c_void) -> c_int;

/// Prototype for a plugin's optional `deinit` hook. Same contract as
/// [`InitFn`].
pub type DeinitFn = unsafe extern "C" fn(info: *const c_void) -> c_int;

/// Prototype for a plugin's optional `start` (worker) hook. Runs on a
/// dedicated thread for the lifetime of the engine's Running state.
pub type StartFn = unsafe extern "C" fn(info: *const c_void) -> c_int;

/// The stable, `#[repr(C)]` layout a plugin exports as `harness_plugin_<N>`.
///
/// String fields are raw, NUL-terminated `*const c_char` to keep the layout
/// POD; `requires`/`conflicts` are C arrays of such pointers plus an
/// explicit count, mirroring the upstream `Plugin` struct's `const char*
/// requires[]` convention.
#[repr(C)]
pub struct PluginDescriptor {
    /// High byte major, low byte minor. Compared against [`ABI_VERSION`].
    pub abi_version: u32,
    /// Short, human-readable description.
    pub brief: *const c_char,
    /// Packed `(major, minor, patch)` — see [`Version::packed`].
    pub plugin_version: u32,
    /// `requires` entries, `"name"` or `"name (constraint)"`.
    pub requires: *const *const c_char,
    /// Number of entries in `requires`.
    pub requires_len: usize,
    /// `conflicts` entries, bare plugin names.
    pub conflicts: *const *const c_char,
    /// Number of entries in `conflicts`.
    pub conflicts_len: usize,
    /// Optional `init` hook; `None` when the plugin needs no initialization.
    pub init: Option<InitFn>,
    /// Optional `deinit` hook.
    pub deinit: Option<DeinitFn>,
    /// Optional `start` (worker) hook.
    pub start: Option<StartFn>,
}

/// Safety: `PluginDescriptor` is a plain-old-data struct of scalars,
/// function pointers and immutable string pointers; it carries no
/// interior mutability and its pointed-to data outlives the harness's use
/// of it for as long as the owning [`crate::loader::LoadedLibrary`] is kept
/// alive.
unsafe impl Send for PluginDescriptor {}
/// See the `Send` impl above; the descriptor is read-only after loading.
unsafe impl Sync for PluginDescriptor {}

/// Owned, safe copy of a [`PluginDescriptor`]'s declarative fields.
///
/// This is what the Dependency Resolver and Lifecycle Engine operate on;
/// they never dereference the raw descriptor pointer again after this is
/// built.
#[derive(Debug, Clone)]
pub struct PluginManifest {
    /// The plugin's name, as given in the configuration (not read from the
    /// descriptor itself — the descriptor has no self-referential name
    /// field, matching the upstream convention that the symbol name and
    /// configured plugin name are the same string).
    pub name: String,
    /// ABI version the plugin was built against.
    pub abi_version: u32,
    /// Short description, copied out of the descriptor.
    pub brief: String,
    /// The plugin's own version.
    pub version: Version,
    /// Parsed `requires` entries.
    pub requires: Vec<crate::version::Requirement>,
    /// `conflicts` entries (bare names).
    pub conflicts: Vec<String>,
    /// Whether this plugin declares an `init` hook.
    pub has_init: bool,
    /// Whether this plugin declares a `deinit` hook.
    pub has_deinit: bool,
    /// Whether this plugin declares a `start` (worker) hook.
    pub has_start: bool,
}

impl PluginManifest {
    /// `abi_version`'s high byte.
    #[must_use]
    pub fn abi_major(&self) -> u8 {
        (self.abi_version >> 8) as u8
    }

    /// `abi_version`'s low byte.
    #[must_use]
    pub fn abi_minor(&self) -> u8 {
        self.abi_version as u8
    }

    /// Copies a raw [`PluginDescriptor`] into an owned manifest, validating
    /// ABI compatibility and decoding every string field.
    ///
    /// # Safety
    ///
    /// `descriptor` must point to a valid, fully-initialized
    /// `PluginDescriptor` whose string pointers remain valid for the
    /// duration of this call (i.e. the owning library must still be
    /// mapped).
    pub unsafe fn from_descriptor(
        name: &str,
        descriptor: &PluginDescriptor,
    ) -> Result<Self, LoadError> {
        let supported_major = (ABI_VERSION >> 8) as u8;
        let required_major = (descriptor.abi_version >> 8) as u8;
        if required_major > supported_major {
            return Err(LoadError::IncompatibleAbi {
                plugin: name.to_owned(),
                required_major,
                supported_major,
            });
        }

        // Safety: caller guarantees the descriptor's pointers are valid for
        // the duration of this call.
        let brief = unsafe { c_str_to_string(descriptor.brief) }
            .map_err(|e| LoadError::BadDescriptor(name.to_owned(), e))?;

        // Safety: same guarantee extends to the requires/conflicts arrays.
        let requires_raw = unsafe {
            c_str_array_to_vec(descriptor.requires, descriptor.requires_len)
        }
        .map_err(|e| LoadError::BadDescriptor(name.to_owned(), e))?;
        let conflicts = unsafe {
            c_str_array_to_vec(descriptor.conflicts, descriptor.conflicts_len)
        }
        .map_err(|e| LoadError::BadDescriptor(name.to_owned(), e))?;

        let requires = requires_raw
            .iter()
            .map(|s| crate::version::Requirement::parse(s))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| LoadError::BadDescriptor(name.to_owned(), e.to_string()))?;

        Ok(PluginManifest {
            name: name.to_owned(),
            abi_version: descriptor.abi_version,
            brief,
            version: Version::from_packed(descriptor.plugin_version),
            requires,
            conflicts,
            has_init: descriptor.init.is_some(),
            has_deinit: descriptor.deinit.is_some(),
            has_start: descriptor.start.is_some(),
        })
    }
}

unsafe fn c_str_to_string(ptr: *const c_char) -> Result<String, String> {
    if ptr.is_null() {
        return Ok(String::new());
    }
    // Safety: caller guarantees `ptr` is a valid, NUL-terminated C string
    // for the duration of this call.
    unsafe {
        core::ffi::CStr::from_ptr(ptr)
            .to_str()
            .map(str::to_owned)
            .map_err(|_| "descriptor string is not valid UTF-8".to_owned())
    }
}

unsafe fn c_str_array_to_vec(
    ptr: *const *const c_char,
    len: usize,
) -> Result<Vec<String>, String> {
    if ptr.is_null() || len == 0 {
        return Ok(Vec::new());
    }
    let mut out = Vec::with_capacity(len);
    for i in 0..len {
        // Safety: caller guarantees `ptr` addresses `len` valid
        // `*const c_char` entries.
        let entry = unsafe { *ptr.add(i) };
        out.push(unsafe { c_str_to_string(entry) }?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leak_cstr(s: &str) -> *const c_char {
        let c = std::ffi::CString::new(s).unwrap();
        c.into_raw()
    }

    #[test]
    fn decodes_a_well_formed_descriptor() {
        let brief = leak_cstr("test plugin");
        let req = leak_cstr("fabric_cache (>>1.0.0)");
        let requires = [req];

        let descriptor = PluginDescriptor {
            abi_version: ABI_VERSION,
            brief,
            plugin_version: Version::new(1, 0, 0).packed(),
            requires: requires.as_ptr(),
            requires_len: requires.len(),
            conflicts: core::ptr::null(),
            conflicts_len: 0,
            init: None,
            deinit: None,
            start: None,
        };

        // Safety: all pointers above are valid C strings for this call.
        let manifest = unsafe { PluginManifest::from_descriptor("routing", &descriptor) }.unwrap();
        assert_eq!(manifest.name, "routing");
        assert_eq!(manifest.brief, "test plugin");
        assert_eq!(manifest.requires.len(), 1);
        assert_eq!(manifest.requires[0].name, "fabric_cache");

        unsafe {
            drop(std::ffi::CString::from_raw(brief as *mut c_char));
            drop(std::ffi::CString::from_raw(req as *mut c_char));
        }
    }

    #[test]
    fn rejects_incompatible_abi_major() {
        let descriptor = PluginDescriptor {
            abi_version: 0x0200,
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

        let err = unsafe { PluginManifest::from_descriptor("bad", &descriptor) }.unwrap_err();
        assert!(matches!(err, LoadError::IncompatibleAbi { .. }));
    }
}

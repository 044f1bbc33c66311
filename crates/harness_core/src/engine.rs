//! The Harness Lifecycle Engine.
//!
//! Drives every loaded plugin through Load → Resolve → Initialize → Start →
//! Wait → Stop → Deinit → Release, matching the upstream harness's plugin
//! lifecycle but replacing its panic-on-failure style with aggregated,
//! reportable [`HarnessError`]s (§2C).

use std::ffi::c_void;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::config::Config;
use crate::error::{HarnessError, LifecycleError};
use crate::loader::{LoadedPlugin, Loader};
use crate::resolver::{resolve, teardown_order};

/// The opaque context passed to every plugin hook. Plugins receive this as
/// `*const c_void` and must not assume any layout beyond what
/// [`HarnessInfo::stop_requested`] and [`HarnessInfo::config`] expose.
#[repr(C)]
pub struct HarnessInfo {
    stop_requested: *const AtomicBool,
    config: *const Config,
}

impl HarnessInfo {
    /// Whether the engine has asked running plugins to stop. A well-behaved
    /// `start` hook polls this in its work loop and returns once it is set.
    ///
    /// # Safety
    ///
    /// Only valid to call from within a hook the engine itself invoked;
    /// the pointer is only live for the duration of that call.
    #[must_use]
    pub unsafe fn stop_requested(&self) -> bool {
        // Safety: the engine keeps `stop_requested` alive for as long as
        // any hook holding a `HarnessInfo` might run.
        unsafe { (*self.stop_requested).load(Ordering::Acquire) }
    }

    /// The harness's fully loaded configuration, for a plugin's `init` to
    /// read its own section out of.
    ///
    /// # Safety
    ///
    /// Only valid to call from within a hook the engine itself invoked.
    #[must_use]
    pub unsafe fn config(&self) -> &Config {
        // Safety: the engine keeps the `Config` it was built with alive for
        // its own entire lifetime, which outlives every hook invocation.
        unsafe { &*self.config }
    }
}

/// The engine's current phase, reported to logging and exposed for tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Plugins loaded, not yet ordered.
    Loaded,
    /// Dependency order computed.
    Resolved,
    /// Running `init` hooks.
    Initializing,
    /// Running `start` hooks on worker threads.
    Starting,
    /// All workers running; blocked until asked to stop.
    Running,
    /// Stop requested; workers joining.
    Stopping,
    /// Running `deinit` hooks in reverse order.
    Deinitializing,
    /// Libraries released, engine done.
    Released,
}

/// How long `stop()` waits for a worker to exit before treating it as stuck
/// and proceeding to `deinit` without it.
const STOP_GRACE_PERIOD: Duration = Duration::from_secs(5);

struct Worker {
    plugin_name: String,
    handle: JoinHandle<i32>,
    /// Signaled by the worker closure right before it returns, so `stop()`
    /// can wait with a timeout — `JoinHandle::join` itself has none.
    done_rx: mpsc::Receiver<()>,
}

/// Owns the loaded plugins and drives them through their lifecycle.
pub struct Engine {
    plugins: Vec<LoadedPlugin>,
    order: Vec<String>,
    config: Config,
    stop_requested: Arc<AtomicBool>,
    workers: Vec<Worker>,
    phase: Phase,
}

impl Engine {
    /// Loads `names` via `loader`, in the order given, and computes their
    /// dependency order. Fails without starting anything if any plugin
    /// can't be loaded or the dependency graph is unsatisfiable.
    pub fn load(loader: &Loader, names: &[&str], config: Config) -> Result<Self, HarnessError> {
        let mut plugins = Vec::with_capacity(names.len());
        for name in names {
            plugins.push(loader.load(name)?);
        }

        let manifests: Vec<_> = plugins.iter().map(|p| p.manifest.clone()).collect();
        let order = resolve(&manifests)?;

        tracing::info!(target: "harness::engine", plugins = ?order, "resolved plugin load order");

        Ok(Self {
            plugins,
            order,
            config,
            stop_requested: Arc::new(AtomicBool::new(false)),
            workers: Vec::new(),
            phase: Phase::Resolved,
        })
    }

    /// The configuration the engine was loaded with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The resolved initialization order, dependencies first.
    #[must_use]
    pub fn order(&self) -> &[String] {
        &self.order
    }

    fn find(&self, name: &str) -> &LoadedPlugin {
        self.plugins
            .iter()
            .find(|p| p.manifest.name == name)
            .expect("resolver only returns names present in `plugins`")
    }

    /// Runs every plugin's `init` hook in dependency order. On the first
    /// failure, already-initialized plugins are torn down in reverse order
    /// before the error is returned, so a partially started harness never
    /// leaks plugin state.
    pub fn initialize(&mut self) -> Result<(), HarnessError> {
        self.phase = Phase::Initializing;
        let info = HarnessInfo {
            stop_requested: Arc::as_ptr(&self.stop_requested),
            config: &self.config,
        };
        let info_ptr: *const c_void = (&info as *const HarnessInfo).cast();

        let mut initialized = Vec::new();
        for name in self.order.clone() {
            let plugin = self.find(&name);
            if let Some(init) = plugin.init() {
                tracing::debug!(target: "harness::engine", plugin = %name, "initializing");
                // Safety: `info_ptr` addresses `info`, which outlives this
                // call; the plugin's `init` contract requires it read the
                // pointer only for the duration of the call.
                let code = unsafe { init(info_ptr) };
                if code != 0 {
                    self.deinit_in_order(initialized.iter().rev().cloned());
                    return Err(LifecycleError::InitFailed {
                        plugin: name,
                        code,
                    }
                    .into());
                }
            }
            initialized.push(name);
        }

        Ok(())
    }

    /// Spawns a worker thread for every plugin with a `start` hook.
    pub fn start(&mut self) -> Result<(), HarnessError> {
        self.phase = Phase::Starting;
        let stop_requested = Arc::clone(&self.stop_requested);
        let config_ptr: *const Config = &self.config;
        // Safety: workers are always joined by `stop()` before `self`
        // (and thus `self.config`) can be dropped, so the raw pointer
        // stays valid for every worker thread's whole lifetime.
        let config_addr = config_ptr as usize;

        for name in self.order.clone() {
            let plugin = self.find(&name);
            let Some(start) = plugin.start() else {
                continue;
            };
            let stop_ptr = Arc::as_ptr(&stop_requested);
            let plugin_name = name.clone();
            let (done_tx, done_rx) = mpsc::channel();

            tracing::info!(target: "harness::engine", plugin = %plugin_name, "starting worker");
            let handle = std::thread::Builder::new()
                .name(format!("harness-{plugin_name}"))
                .spawn(move || {
                    let info = HarnessInfo {
                        stop_requested: stop_ptr,
                        config: config_addr as *const Config,
                    };
                    let info_ptr: *const c_void = (&info as *const HarnessInfo).cast();
                    // Safety: `info` is stack-local to this closure and
                    // outlives the call; `stop_ptr` addresses the engine's
                    // `stop_requested`, kept alive by the `Arc` captured
                    // above for the thread's whole lifetime; `config_addr`
                    // addresses the engine's own `Config`, kept alive by
                    // the invariant documented above.
                    let code = unsafe { start(info_ptr) };
                    let _ = done_tx.send(());
                    code
                })
                .expect("failed to spawn plugin worker thread");

            self.workers.push(Worker {
                plugin_name,
                handle,
                done_rx,
            });
        }

        self.phase = Phase::Running;
        Ok(())
    }

    /// Installs `SIGINT`/`SIGTERM` handlers that set the stop flag, then
    /// blocks until either signal arrives.
    ///
    /// On non-Unix targets this degrades to the no-op it would be anyway:
    /// there is no signal to wait for, so it returns immediately.
    pub fn wait_for_shutdown_signal(&self) -> std::io::Result<()> {
        install_signal_handlers(&self.stop_requested)?;
        while !self.stop_requested.load(Ordering::Acquire) {
            std::thread::sleep(std::time::Duration::from_millis(100));
        }
        Ok(())
    }

    /// Requests every worker to stop and waits up to [`STOP_GRACE_PERIOD`]
    /// for each to exit. Workers that panicked are recorded as
    /// [`LifecycleError::WorkerPanicked`]; a worker that is still running
    /// after its grace period is recorded as [`LifecycleError::WorkerStuck`]
    /// and abandoned — its thread is left running, detached, and `stop()`
    /// still returns so the engine can proceed to `deinit` regardless.
    pub fn stop(&mut self) -> Result<(), HarnessError> {
        self.phase = Phase::Stopping;
        self.stop_requested.store(true, Ordering::Release);

        let mut first_error = None;
        for worker in self.workers.drain(..) {
            tracing::debug!(target: "harness::engine", plugin = %worker.plugin_name, "waiting for worker to stop");
            match worker.done_rx.recv_timeout(STOP_GRACE_PERIOD) {
                Ok(()) => {
                    if worker.handle.join().is_err() {
                        let err = LifecycleError::WorkerPanicked(worker.plugin_name);
                        tracing::error!(target: "harness::engine", "{err}");
                        first_error.get_or_insert(err);
                    }
                }
                Err(_timeout) => {
                    let err = LifecycleError::WorkerStuck(worker.plugin_name);
                    tracing::error!(target: "harness::engine", "{err}");
                    first_error.get_or_insert(err);
                    // Leave the thread running rather than block shutdown
                    // on it; `deinit` still runs for every other plugin.
                    drop(worker.handle);
                }
            }
        }

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// Runs every plugin's `deinit` hook in reverse initialization order.
    /// A plugin whose `deinit` fails is logged and skipped; the remaining
    /// plugins still get torn down, per §4.5.
    pub fn deinit(&mut self) -> Result<(), HarnessError> {
        self.phase = Phase::Deinitializing;
        let order = self.order.clone();
        self.deinit_in_order(teardown_order(&order).into_iter());
        self.phase = Phase::Released;
        Ok(())
    }

    fn deinit_in_order(&self, names: impl Iterator<Item = String>) {
        let info = HarnessInfo {
            stop_requested: Arc::as_ptr(&self.stop_requested),
            config: &self.config,
        };
        let info_ptr: *const c_void = (&info as *const HarnessInfo).cast();

        for name in names {
            let plugin = self.find(&name);
            if let Some(deinit) = plugin.deinit() {
                tracing::debug!(target: "harness::engine", plugin = %name, "deinitializing");
                // Safety: see `initialize`'s corresponding call.
                let code = unsafe { deinit(info_ptr) };
                if code != 0 {
                    let err = LifecycleError::DeinitFailed {
                        plugin: name,
                        code,
                    };
                    tracing::error!(target: "harness::engine", "{err}");
                }
            }
        }
    }
}

#[cfg(unix)]
fn install_signal_handlers(stop_requested: &Arc<AtomicBool>) -> std::io::Result<()> {
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(stop_requested))?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(stop_requested))?;
    Ok(())
}

#[cfg(not(unix))]
fn install_signal_handlers(_stop_requested: &Arc<AtomicBool>) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{PluginDescriptor, ABI_VERSION};

    static mut INIT_CALLS: i32 = 0;

    extern "C" fn counting_init(_info: *const c_void) -> i32 {
        // Safety: tests run single-threaded with respect to this counter.
        unsafe {
            INIT_CALLS += 1;
        }
        0
    }

    extern "C" fn failing_init(_info: *const c_void) -> i32 {
        1
    }

    #[test]
    fn initialize_runs_hooks_in_resolved_order() {
        static OK: PluginDescriptor = PluginDescriptor {
            abi_version: ABI_VERSION,
            brief: core::ptr::null(),
            plugin_version: 0,
            requires: core::ptr::null(),
            requires_len: 0,
            conflicts: core::ptr::null(),
            conflicts_len: 0,
            init: Some(counting_init),
            deinit: None,
            start: None,
        };
        fn get() -> &'static PluginDescriptor {
            &OK
        }

        let mut loader = Loader::new("/nonexistent");
        loader.register("alpha", get);
        loader.register("beta", get);

        let mut engine =
            Engine::load(&loader, &["alpha", "beta"], Config::new("harness_test")).unwrap();
        assert_eq!(engine.order().len(), 2);

        // Safety: single-threaded test.
        unsafe {
            INIT_CALLS = 0;
        }
        engine.initialize().unwrap();
        // Safety: single-threaded test.
        unsafe {
            assert_eq!(INIT_CALLS, 2);
        }
    }

    extern "C" fn polling_start(info: *const c_void) -> i32 {
        // Safety: the engine passes a valid `HarnessInfo` for the call's
        // duration.
        let info = unsafe { &*info.cast::<HarnessInfo>() };
        loop {
            // Safety: called only from within this hook, as required.
            if unsafe { info.stop_requested() } {
                return 0;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn a_well_behaved_worker_is_joined_well_within_its_grace_period() {
        static DESCRIPTOR: PluginDescriptor = PluginDescriptor {
            abi_version: ABI_VERSION,
            brief: core::ptr::null(),
            plugin_version: 0,
            requires: core::ptr::null(),
            requires_len: 0,
            conflicts: core::ptr::null(),
            conflicts_len: 0,
            init: None,
            deinit: None,
            start: Some(polling_start),
        };
        fn get() -> &'static PluginDescriptor {
            &DESCRIPTOR
        }

        let mut loader = Loader::new("/nonexistent");
        loader.register("worker", get);

        let mut engine = Engine::load(&loader, &["worker"], Config::new("harness_test")).unwrap();
        engine.start().unwrap();
        assert_eq!(engine.phase(), Phase::Running);

        let started = std::time::Instant::now();
        engine.stop().unwrap();
        assert!(started.elapsed() < STOP_GRACE_PERIOD);
        assert_eq!(engine.phase(), Phase::Stopping);
    }

    #[test]
    fn failing_init_is_reported_as_lifecycle_error() {
        static BAD: PluginDescriptor = PluginDescriptor {
            abi_version: ABI_VERSION,
            brief: core::ptr::null(),
            plugin_version: 0,
            requires: core::ptr::null(),
            requires_len: 0,
            conflicts: core::ptr::null(),
            conflicts_len: 0,
            init: Some(failing_init),
            deinit: None,
            start: None,
        };
        fn get() -> &'static PluginDescriptor {
            &BAD
        }

        let mut loader = Loader::new("/nonexistent");
        loader.register("broken", get);

        let mut engine = Engine::load(&loader, &["broken"], Config::new("harness_test")).unwrap();
        let err = engine.initialize().unwrap_err();
        assert!(matches!(err, HarnessError::Lifecycle(LifecycleError::InitFailed { .. })));
    }
}

//! The orchestration engine.
//!
//! [`Engine`] owns every registry, the event bus, the execution context and
//! the injected ports. It is built explicitly and passed by reference to
//! every hook and handler, so several engines can coexist (tests do this).
//!
//! Startup is split across modules, each adding an `impl Engine` block:
//! - `resolver`: [`Engine::register_features`]
//! - `lifecycle`: [`Engine::load_registered_features`]
//! - `runner`: [`Engine::register_actions_in_event_bus`]
//! - `pipeline`: [`Engine::execute_command`], [`Engine::run_phases`]

use std::{
    cell::{Ref, RefCell, RefMut},
    fmt,
    rc::Rc,
};

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::{
    application::{
        bus::EventBus,
        context::{ExecutionContext, RecordedFailure},
        plugin::{Action, Command, Feature},
        ports::{Cache, ConfigStore, Console, FeatureDiscovery},
    },
    domain::{Binary, CommandArgs, EventArgs, Phase, Registry, Service},
    error::RigupResult,
};

/// Configuration flag turning every action failure fatal.
pub const FAIL_FAST_KEY: &str = "core.fail_fast";

pub struct Engine {
    pub(crate) features: Registry<dyn Feature>,
    pub(crate) phases: Registry<Phase>,
    pub(crate) commands: Registry<dyn Command>,
    pub(crate) actions: Registry<dyn Action>,
    pub(crate) binaries: Registry<Binary>,
    pub(crate) services: Registry<Service>,
    pub(crate) caches: Registry<dyn Cache>,
    pub(crate) bus: EventBus,
    pub(crate) context: RefCell<ExecutionContext>,
    config: Box<dyn ConfigStore>,
    console: Box<dyn Console>,
}

impl Engine {
    /// Create an empty engine around the given ports.
    pub fn new(config: Box<dyn ConfigStore>, console: Box<dyn Console>) -> Self {
        Self {
            features: Registry::new("feature"),
            phases: Registry::new("phase"),
            commands: Registry::new("command"),
            actions: Registry::new("action"),
            binaries: Registry::new("binary"),
            services: Registry::new("service"),
            caches: Registry::new("cache"),
            bus: EventBus::new(),
            context: RefCell::new(ExecutionContext::default()),
            config,
            console,
        }
    }

    /// Full startup: reload configuration, then resolve, load and bind.
    ///
    /// Reloading makes startup repeatable after [`Engine::reset`]. Caches
    /// are not part of it; register them again before bootstrapping.
    /// `core.fail_fast = true` in configuration has the same effect as
    /// passing `fail_fast`.
    #[instrument(skip_all, fields(fail_fast = fail_fast))]
    pub fn bootstrap(
        &mut self,
        builtins: Vec<Rc<dyn Feature>>,
        discovery: &dyn FeatureDiscovery,
        fail_fast: bool,
    ) -> RigupResult<()> {
        self.config.reload()?;
        let fail_fast = fail_fast
            || self
                .config
                .get(FAIL_FAST_KEY)
                .and_then(|v| v.as_bool())
                .unwrap_or(false);

        self.register_features(builtins, discovery)?;
        let enabled = self.load_registered_features()?;
        self.register_actions_in_event_bus(fail_fast)?;

        info!(
            features = enabled.len(),
            actions = self.actions.len(),
            commands = self.commands.len(),
            "Engine ready"
        );
        Ok(())
    }

    pub fn register_cache(&mut self, namespace: &str, cache: Rc<dyn Cache>) -> RigupResult<()> {
        self.caches.register_as(namespace, cache)?;
        debug!(namespace, "Registered cache");
        Ok(())
    }

    pub fn cache(&self, namespace: &str) -> Option<Rc<dyn Cache>> {
        self.caches.get(namespace)
    }

    /// Fire `event` with the engine as handler context.
    pub fn emit(&self, event: &str, args: &EventArgs) -> RigupResult<Vec<Value>> {
        self.bus.emit(self, event, args)
    }

    /// Ask the running command to start over with `args` once the current
    /// phase completes.
    pub fn request_restart(&self, args: CommandArgs) {
        debug!(?args, "Restart requested");
        self.context.borrow_mut().request_restart(args);
    }

    /// Action failures recorded so far.
    pub fn failures(&self) -> Vec<RecordedFailure> {
        self.context.borrow().failures().to_vec()
    }

    /// Process exit status: `1` if any action failure was recorded.
    pub fn exit_code(&self) -> u8 {
        u8::from(!self.context.borrow().failures().is_empty())
    }

    /// Return the engine to its freshly constructed state.
    ///
    /// Caches are cleared and flushed before being dropped. Calling this
    /// twice is the same as calling it once.
    #[instrument(skip_all)]
    pub fn reset(&mut self) -> RigupResult<()> {
        let mut first_error = None;
        for cache in self.caches.all() {
            cache.clear();
            if let Err(e) = cache.flush() {
                warn!(error = %e, "Cache flush failed during reset");
                first_error.get_or_insert(e);
            }
        }

        self.caches.clear();
        self.bus.clear();
        self.features.clear();
        self.phases.clear();
        self.commands.clear();
        self.actions.clear();
        self.binaries.clear();
        self.services.clear();
        self.context.borrow_mut().reset();
        self.config.reset();

        debug!("Engine reset");
        first_error.map_or(Ok(()), Err)
    }

    /// Persist every cache.
    pub fn flush_caches(&self) -> RigupResult<()> {
        for cache in self.caches.all() {
            cache.flush()?;
        }
        Ok(())
    }

    pub fn config(&self) -> &dyn ConfigStore {
        self.config.as_ref()
    }

    pub fn console(&self) -> &dyn Console {
        self.console.as_ref()
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn features(&self) -> &Registry<dyn Feature> {
        &self.features
    }

    pub fn phases(&self) -> &Registry<Phase> {
        &self.phases
    }

    pub fn commands(&self) -> &Registry<dyn Command> {
        &self.commands
    }

    pub fn actions(&self) -> &Registry<dyn Action> {
        &self.actions
    }

    pub fn binaries(&self) -> &Registry<Binary> {
        &self.binaries
    }

    pub fn services(&self) -> &Registry<Service> {
        &self.services
    }

    /// Read access to the execution context.
    pub fn context(&self) -> Ref<'_, ExecutionContext> {
        self.context.borrow()
    }

    pub(crate) fn context_mut(&self) -> RefMut<'_, ExecutionContext> {
        self.context.borrow_mut()
    }

    /// True once every registry and the bus are empty.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
            && self.phases.is_empty()
            && self.commands.is_empty()
            && self.actions.is_empty()
            && self.binaries.is_empty()
            && self.services.is_empty()
            && self.caches.is_empty()
            && self.bus.is_empty()
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("features", &self.features)
            .field("phases", &self.phases)
            .field("commands", &self.commands)
            .field("actions", &self.actions)
            .field("binaries", &self.binaries)
            .field("services", &self.services)
            .field("caches", &self.caches)
            .field("bus", &self.bus)
            .finish_non_exhaustive()
    }
}

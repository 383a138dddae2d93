//! Feature lifecycle: load every registered feature breadth-first.

use std::rc::Rc;

use tracing::{debug, info, instrument};

use crate::{
    application::{
        Engine,
        plugin::{Action, Command, Feature},
    },
    domain::{Binary, Phase, Registry, Service},
    error::RigupResult,
};

/// Objects harvested from enabled features before they are installed.
struct Harvest {
    phases: Registry<Phase>,
    commands: Registry<dyn Command>,
    actions: Registry<dyn Action>,
    binaries: Registry<Binary>,
    services: Registry<Service>,
}

impl Harvest {
    fn collect(engine: &Engine, enabled: &[Rc<dyn Feature>]) -> RigupResult<Self> {
        let mut harvest = Self {
            phases: Registry::new("phase"),
            commands: Registry::new("command"),
            actions: Registry::new("action"),
            binaries: Registry::new("binary"),
            services: Registry::new("service"),
        };

        for feature in enabled {
            for phase in feature.phases() {
                harvest.phases.register(Rc::new(phase))?;
            }
        }
        for feature in enabled {
            for command in feature.commands() {
                harvest.commands.register(command)?;
            }
        }
        for feature in enabled {
            for action in feature.actions() {
                if action.disabled(engine) {
                    debug!(action = action.name(), "Skipping disabled action");
                    continue;
                }
                harvest.actions.register(action)?;
            }
        }
        for feature in enabled {
            for binary in feature.binaries(engine) {
                harvest.binaries.register(Rc::new(binary))?;
            }
        }
        for feature in enabled {
            for service in feature.services(engine) {
                harvest.services.register(Rc::new(service))?;
            }
        }

        Ok(harvest)
    }
}

impl Engine {
    /// Run the lifecycle hooks of every registered feature and install what
    /// the enabled ones contribute.
    ///
    /// Each step completes for all features, in registration order, before
    /// the next starts: `before_load`, `configure`, enablement, harvest,
    /// `after_load`. Contributions are installed before `after_load` so the
    /// hooks can see them. Any failure aborts the load and leaves the phase,
    /// command, action, binary and service registries empty.
    ///
    /// Returns the names of the enabled features.
    #[instrument(skip_all)]
    pub fn load_registered_features(&mut self) -> RigupResult<Vec<String>> {
        let features = self.features.all();

        for feature in &features {
            feature.before_load(self)?;
        }
        for feature in &features {
            feature.configure(self)?;
            debug!(feature = feature.name(), "Configured feature");
        }

        let (enabled, disabled): (Vec<_>, Vec<_>) =
            features.into_iter().partition(|f| !f.disabled(self));
        for feature in &disabled {
            info!(feature = feature.name(), "Feature disabled");
        }

        let harvest = Harvest::collect(self, &enabled)?;
        self.phases = harvest.phases;
        self.commands = harvest.commands;
        self.actions = harvest.actions;
        self.binaries = harvest.binaries;
        self.services = harvest.services;

        for feature in &enabled {
            if let Err(e) = feature.after_load(self) {
                debug!(feature = feature.name(), "after_load failed, discarding contributions");
                self.discard_contributions();
                return Err(e);
            }
        }

        Ok(enabled.iter().map(|f| f.name().to_owned()).collect())
    }

    fn discard_contributions(&mut self) {
        self.phases.clear();
        self.commands.clear();
        self.actions.clear();
        self.binaries.clear();
        self.services.clear();
    }
}

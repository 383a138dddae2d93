//! # Feature graph resolution.
//!
//! Turns the set of candidate features into a registration order:
//!
//! 1. Discovered features replace built-ins of the same name.
//! 2. Every *required* dependency must name a candidate feature.
//! 3. Extra edges from the `dependencies` configuration table are merged in.
//! 4. A level-by-level topological sort runs; names inside a level are
//!    sorted alphabetically so the result is deterministic.
//!
//! Names that only appear as edge targets (optional dependencies that were
//! never installed, or override keys without a feature) are graph nodes but
//! produce no registration.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    rc::Rc,
};

use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::{
    application::{Engine, plugin::Feature, ports::FeatureDiscovery},
    domain::{Dependency, DomainError},
    error::RigupResult,
};

/// Config key holding extra dependency edges (`feature -> [names]`).
pub const DEPENDENCIES_KEY: &str = "dependencies";

/// Dependency graph keyed by feature name.
#[derive(Debug, Default, Clone)]
pub struct FeatureGraph {
    edges: BTreeMap<String, BTreeSet<String>>,
}

impl FeatureGraph {
    /// Build the graph from declared dependencies, checking that required
    /// ones exist.
    pub fn from_declared(
        declared: &BTreeMap<String, Vec<Dependency>>,
    ) -> Result<Self, DomainError> {
        let mut graph = Self::default();

        for (name, dependencies) in declared {
            for dependency in dependencies {
                if dependency.is_required() && !declared.contains_key(&dependency.target) {
                    return Err(DomainError::MissingDependency {
                        feature: name.clone(),
                        dependency: dependency.target.clone(),
                    });
                }
            }

            graph.edges.insert(
                name.clone(),
                dependencies.iter().map(|d| d.target.clone()).collect(),
            );
        }

        Ok(graph)
    }

    /// Add `feature -> target` edges, creating the node when needed.
    pub fn add_edges(&mut self, feature: &str, targets: impl IntoIterator<Item = String>) {
        self.edges
            .entry(feature.to_owned())
            .or_default()
            .extend(targets);
    }

    /// Topologically sorted node names, dependencies first.
    pub fn sorted(&self) -> Result<Vec<String>, DomainError> {
        let mut pending: BTreeMap<String, BTreeSet<String>> = self.edges.clone();

        // Targets without their own entry are leaves.
        let leaves: Vec<String> = pending
            .values()
            .flatten()
            .filter(|target| !pending.contains_key(*target))
            .cloned()
            .collect();
        for leaf in leaves {
            pending.entry(leaf).or_default();
        }

        // Self edges never block.
        for (name, deps) in pending.iter_mut() {
            deps.remove(name);
        }

        let mut order = Vec::with_capacity(pending.len());
        loop {
            let level: Vec<String> = pending
                .iter()
                .filter(|(_, deps)| deps.is_empty())
                .map(|(name, _)| name.clone())
                .collect();

            if level.is_empty() {
                break;
            }

            for name in &level {
                pending.remove(name);
            }
            for deps in pending.values_mut() {
                for name in &level {
                    deps.remove(name);
                }
            }

            // BTreeMap iteration already yields the level alphabetically.
            order.extend(level);
        }

        if !pending.is_empty() {
            return Err(DomainError::DependencyCycle {
                features: pending.into_keys().collect(),
            });
        }

        Ok(order)
    }
}

/// Parse the `dependencies` override table.
fn dependency_overrides(raw: Option<Value>) -> Result<Vec<(String, Vec<String>)>, DomainError> {
    let Some(Value::Object(table)) = raw else {
        return Ok(Vec::new());
    };

    let mut overrides = Vec::with_capacity(table.len());
    for (feature, value) in table {
        let items = match value {
            Value::Array(items) => items,
            Value::String(single) => vec![Value::String(single)],
            other => return Err(DomainError::InvalidDependency(other.to_string())),
        };

        let mut targets = Vec::with_capacity(items.len());
        for item in items {
            let raw = item
                .as_str()
                .ok_or_else(|| DomainError::InvalidDependency(item.to_string()))?;
            targets.push(raw.parse::<Dependency>()?.target);
        }
        overrides.push((feature, targets));
    }

    Ok(overrides)
}

impl Engine {
    /// Merge, resolve and register every candidate feature.
    ///
    /// Returns the registered names in registration order. Nothing is
    /// registered when resolution fails.
    #[instrument(skip_all)]
    pub fn register_features(
        &mut self,
        builtins: Vec<Rc<dyn Feature>>,
        discovery: &dyn FeatureDiscovery,
    ) -> RigupResult<Vec<String>> {
        let mut candidates: HashMap<String, Rc<dyn Feature>> = HashMap::new();
        for feature in builtins {
            candidates.insert(feature.name().to_owned(), feature);
        }
        for feature in discovery.discover() {
            if candidates.contains_key(feature.name()) {
                debug!(feature = feature.name(), "Discovered feature overrides built-in");
            }
            candidates.insert(feature.name().to_owned(), feature);
        }

        let declared: BTreeMap<String, Vec<Dependency>> = candidates
            .iter()
            .map(|(name, feature)| (name.clone(), feature.dependencies()))
            .collect();

        let mut graph = FeatureGraph::from_declared(&declared)?;
        for (feature, targets) in dependency_overrides(self.config().get(DEPENDENCIES_KEY))? {
            if !candidates.contains_key(&feature) {
                warn!(feature = %feature, "Dependency override names an unknown feature");
            }
            graph.add_edges(&feature, targets);
        }

        let mut registered = Vec::with_capacity(candidates.len());
        for name in graph.sorted()? {
            if let Some(feature) = candidates.remove(&name) {
                self.features.register(feature)?;
                debug!(feature = %name, "Registered feature");
                registered.push(name);
            }
        }

        Ok(registered)
    }
}

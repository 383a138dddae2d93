//! One-call construction of a ready-to-run engine.

use std::{path::PathBuf, rc::Rc};

use rigup_core::{
    application::{
        Engine,
        ports::{Cache, Console, FeatureDiscovery},
    },
    error::RigupResult,
};
use tracing::{debug, instrument};

use crate::{
    cache::{
        GLOBAL_CACHE, JsonFileCache, MemoryCache, PROJECT_BINARY_CACHE, PROJECT_CACHE,
        REQUESTS_CACHE, project_scoped_name,
    },
    config::{ConfigOptions, LayeredConfig},
    features::builtin_features,
};

/// Inputs of [`build_engine`].
#[derive(Debug, Clone)]
pub struct BootstrapOptions {
    pub config: ConfigOptions,
    /// Abort on the first action failure instead of recording it.
    pub fail_fast: bool,
    /// Where persistent caches live; `None` keeps every cache in memory.
    pub cache_dir: Option<PathBuf>,
}

impl BootstrapOptions {
    pub fn new(config: ConfigOptions) -> Self {
        Self {
            config,
            fail_fast: false,
            cache_dir: JsonFileCache::default_dir(),
        }
    }

    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn cache_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.cache_dir = dir;
        self
    }
}

/// Load configuration, then [`start_engine`].
#[instrument(skip_all)]
pub fn build_engine(
    options: BootstrapOptions,
    console: Box<dyn Console>,
    discovery: &dyn FeatureDiscovery,
) -> RigupResult<Engine> {
    let config = LayeredConfig::load(options.config.clone())?;
    let mut engine = Engine::new(Box::new(config), console);
    start_engine(&mut engine, &options, discovery)?;
    Ok(engine)
}

/// Register the default caches and bootstrap every feature.
///
/// Repeatable: after [`Engine::reset`], calling this again gives an engine
/// that behaves like a freshly built one.
#[instrument(skip_all)]
pub fn start_engine(
    engine: &mut Engine,
    options: &BootstrapOptions,
    discovery: &dyn FeatureDiscovery,
) -> RigupResult<()> {
    let project_home = engine.config().paths().project_home;
    for namespace in [PROJECT_CACHE, GLOBAL_CACHE, REQUESTS_CACHE, PROJECT_BINARY_CACHE] {
        let name = match namespace {
            PROJECT_CACHE | PROJECT_BINARY_CACHE => project_scoped_name(namespace, &project_home),
            _ => namespace.to_owned(),
        };
        let cache: Rc<dyn Cache> = match (&options.cache_dir, namespace) {
            (Some(dir), ns) if ns != REQUESTS_CACHE => Rc::new(JsonFileCache::open(dir, &name)),
            _ => Rc::new(MemoryCache::new()),
        };
        engine.register_cache(namespace, cache)?;
    }

    debug!(fail_fast = options.fail_fast, "Bootstrapping engine");
    let builtins = builtin_features(&options.config.env);
    engine.bootstrap(builtins, discovery, options.fail_fast)
}

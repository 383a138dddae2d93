//! Built-in features.
//!
//! Each feature owns the configuration namespace named after it.

pub mod core;
pub mod docker;
pub mod file;
pub mod fixuid;
pub mod gitignore;
pub mod run;
pub mod shell;
mod support;
pub mod template;

use std::{collections::HashMap, rc::Rc};

use rigup_core::application::Feature;

pub use self::core::CoreFeature;
pub use docker::DockerFeature;
pub use file::FileFeature;
pub use fixuid::FixuidFeature;
pub use gitignore::GitignoreFeature;
pub use run::RunFeature;
pub use shell::ShellFeature;
pub use template::TemplateFeature;

/// Every built-in feature, reading environment-derived defaults from `env`.
pub fn builtin_features(env: &HashMap<String, String>) -> Vec<Rc<dyn Feature>> {
    vec![
        Rc::new(CoreFeature),
        Rc::new(FileFeature::default()),
        Rc::new(TemplateFeature::default()),
        Rc::new(GitignoreFeature::default()),
        Rc::new(DockerFeature::with_docker_host(env.get("DOCKER_HOST").cloned())),
        Rc::new(FixuidFeature::default()),
        Rc::new(ShellFeature::with_environ(
            env.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        )),
        Rc::new(RunFeature),
    ]
}

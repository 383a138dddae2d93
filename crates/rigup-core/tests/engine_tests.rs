//! End-to-end behaviour of the engine: resolution, lifecycle, binding and
//! command execution.

mod common;

use common::{Behaviour, FixedDiscovery, ScriptedAction, ScriptedFeature, engine, log};
use rigup_core::{
    application::ApplicationError,
    domain::{CommandArgs, DomainError, EventArgs},
    error::RigupError,
};
use serde_json::json;

#[test]
fn lower_order_runs_first_across_features() {
    let actions = log();
    let features = log();
    let a = ScriptedFeature::new("a", &features)
        .phase("x")
        .command("x", vec!["x"])
        .action(ScriptedAction::on("a:act", "phase:x", &actions).order(5).rc());
    let b = ScriptedFeature::new("b", &features)
        .depends_on("a")
        .action(ScriptedAction::on("b:act", "phase:x", &actions).order(10).rc());

    let mut engine = engine(json!({}));
    engine
        .bootstrap(vec![b.rc(), a.rc()], &FixedDiscovery::default(), false)
        .unwrap();
    engine.execute_command("x", CommandArgs::new()).unwrap();

    assert_eq!(*actions.borrow(), vec!["a:act", "b:act"]);
}

#[test]
fn order_wins_over_feature_position() {
    let actions = log();
    let features = log();
    let a = ScriptedFeature::new("a", &features)
        .phase("x")
        .command("x", vec!["x"])
        .action(ScriptedAction::on("a:act", "phase:x", &actions).order(10).rc());
    let b = ScriptedFeature::new("b", &features)
        .depends_on("a")
        .action(ScriptedAction::on("b:act", "phase:x", &actions).order(-1).rc())
        .action(ScriptedAction::on("b:tie", "phase:x", &actions).order(10).rc());

    let mut engine = engine(json!({}));
    engine
        .bootstrap(vec![a.rc(), b.rc()], &FixedDiscovery::default(), false)
        .unwrap();
    engine.execute_command("x", CommandArgs::new()).unwrap();

    assert_eq!(*actions.borrow(), vec!["b:act", "a:act", "b:tie"]);
}

#[test]
fn phase_without_handlers_completes_cleanly() {
    let features = log();
    let core = ScriptedFeature::new("core", &features)
        .phase("empty")
        .command("noop", vec!["empty"]);

    let mut engine = engine(json!({}));
    engine
        .bootstrap(vec![core.rc()], &FixedDiscovery::default(), false)
        .unwrap();

    assert!(engine.emit("phase:empty", &EventArgs::new()).unwrap().is_empty());
    engine.execute_command("noop", CommandArgs::new()).unwrap();
    assert_eq!(engine.exit_code(), 0);
}

#[test]
fn single_event_binding_equals_one_element_list() {
    let actions = log();
    let features = log();
    let core = ScriptedFeature::new("core", &features)
        .phase("info")
        .command("info", vec!["info"])
        .action(ScriptedAction::on("single", "phase:info", &actions).rc())
        .action(ScriptedAction::on("list", "phase:info", &actions).as_list().rc());

    let mut engine = engine(json!({}));
    engine
        .bootstrap(vec![core.rc()], &FixedDiscovery::default(), false)
        .unwrap();

    assert_eq!(engine.bus().handler_count("phase:info"), 2);
    assert_eq!(
        engine.bus().describe("phase:info"),
        vec!["single.execute", "list.execute"]
    );
    engine.execute_command("info", CommandArgs::new()).unwrap();
    assert_eq!(*actions.borrow(), vec!["single", "list"]);
}

#[test]
fn failing_handler_is_recorded_and_others_still_run() {
    let actions = log();
    let features = log();
    let core = ScriptedFeature::new("core", &features)
        .phase("configure")
        .command("configure", vec!["configure"])
        .action(
            ScriptedAction::on("broken", "phase:configure", &actions)
                .behaviour(Behaviour::Fail("boom"))
                .rc(),
        )
        .action(ScriptedAction::on("after", "phase:configure", &actions).rc());

    let mut engine = engine(json!({}));
    engine
        .bootstrap(vec![core.rc()], &FixedDiscovery::default(), false)
        .unwrap();
    engine.execute_command("configure", CommandArgs::new()).unwrap();

    let failures = engine.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].error.to_string(), "boom");
    assert_eq!(engine.exit_code(), 1);
    assert_eq!(*actions.borrow(), vec!["broken", "after"]);
}

#[test]
fn every_failure_is_recorded() {
    let actions = log();
    let features = log();
    let mut core = ScriptedFeature::new("core", &features)
        .phase("configure")
        .command("configure", vec!["configure"]);
    for name in ["f1", "f2", "f3"] {
        core = core.action(
            ScriptedAction::on(name, "phase:configure", &actions)
                .behaviour(Behaviour::Fail("boom"))
                .rc(),
        );
    }
    core = core.action(ScriptedAction::on("ok", "phase:configure", &actions).rc());

    let mut engine = engine(json!({}));
    engine
        .bootstrap(vec![core.rc()], &FixedDiscovery::default(), false)
        .unwrap();
    engine.execute_command("configure", CommandArgs::new()).unwrap();

    assert_eq!(engine.failures().len(), 3);
    assert_eq!(actions.borrow().last().map(String::as_str), Some("ok"));
}

#[test]
fn fail_fast_aborts_the_command() {
    let actions = log();
    let features = log();
    let core = ScriptedFeature::new("core", &features)
        .phase("configure")
        .phase("run")
        .command("configure", vec!["configure", "run"])
        .action(
            ScriptedAction::on("broken", "phase:configure", &actions)
                .behaviour(Behaviour::Fail("boom"))
                .rc(),
        )
        .action(ScriptedAction::on("after", "phase:configure", &actions).rc())
        .action(ScriptedAction::on("later", "phase:run", &actions).rc());

    let mut engine = engine(json!({}));
    engine
        .bootstrap(vec![core.rc()], &FixedDiscovery::default(), true)
        .unwrap();
    let err = engine
        .execute_command("configure", CommandArgs::new())
        .unwrap_err();

    assert_eq!(err.to_string(), "boom");
    assert_eq!(*actions.borrow(), vec!["broken"]);
    assert!(engine.failures().is_empty());
}

#[test]
fn nested_failure_keeps_both_frames() {
    let actions = log();
    let features = log();
    let core = ScriptedFeature::new("core", &features)
        .phase("configure")
        .command("configure", vec!["configure"])
        .action(
            ScriptedAction::on("file:walk", "phase:configure", &actions)
                .behaviour(Behaviour::Emit("file:found"))
                .rc(),
        )
        .action(
            ScriptedAction::on("template:render", "file:found", &actions)
                .behaviour(Behaviour::Fail("bad template"))
                .rc(),
        );

    let mut engine = engine(json!({}));
    engine
        .bootstrap(vec![core.rc()], &FixedDiscovery::default(), false)
        .unwrap();
    engine.execute_command("configure", CommandArgs::new()).unwrap();

    let failures = engine.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(
        failures[0].to_string(),
        "An unexpected error has occurred [phase:configure => file:walk.execute(), \
         file:found => template:render.execute(from=file:walk)]: bad template"
    );
}

#[test]
fn missing_required_dependency_aborts_before_any_hook() {
    let features = log();
    let template = ScriptedFeature::new("template", &features).depends_on("core");

    let mut engine = engine(json!({}));
    let err = engine
        .bootstrap(vec![template.rc()], &FixedDiscovery::default(), false)
        .unwrap_err();

    assert!(err.is_startup_error());
    assert_eq!(
        err.to_string(),
        "A required dependency is missing for template feature (core)"
    );
    assert!(features.borrow().is_empty());
    assert!(engine.features().is_empty());
}

#[test]
fn missing_optional_dependency_is_ignored() {
    let features = log();
    let template = ScriptedFeature::new("template", &features).depends_on("jinja[optional]");

    let mut engine = engine(json!({}));
    engine
        .bootstrap(vec![template.rc()], &FixedDiscovery::default(), false)
        .unwrap();

    assert_eq!(engine.features().names(), vec!["template"]);
}

#[test]
fn dependency_cycle_is_fatal() {
    let features = log();
    let a = ScriptedFeature::new("a", &features).depends_on("b");
    let b = ScriptedFeature::new("b", &features).depends_on("a");

    let mut engine = engine(json!({}));
    let err = engine
        .bootstrap(vec![a.rc(), b.rc()], &FixedDiscovery::default(), false)
        .unwrap_err();

    assert!(matches!(
        err,
        RigupError::Domain(DomainError::DependencyCycle { .. })
    ));
    assert!(features.borrow().is_empty());
}

#[test]
fn configured_dependencies_reorder_features() {
    let features = log();
    let a = ScriptedFeature::new("a", &features);
    let b = ScriptedFeature::new("b", &features);

    let mut engine = engine(json!({"dependencies": {"a": ["b"], "ghost": ["a"]}}));
    let order = engine
        .register_features(vec![a.rc(), b.rc()], &FixedDiscovery::default())
        .unwrap();

    assert_eq!(order, vec!["b", "a"]);
    assert!(!engine.features().has("ghost"));
}

#[test]
fn discovered_feature_replaces_builtin() {
    let builtin_log = log();
    let discovered_log = log();
    let builtin = ScriptedFeature::new("core", &builtin_log);
    let discovered = ScriptedFeature::new("core", &discovered_log);

    let mut engine = engine(json!({}));
    engine
        .bootstrap(
            vec![builtin.rc()],
            &FixedDiscovery(vec![discovered.rc()]),
            false,
        )
        .unwrap();

    assert!(builtin_log.borrow().is_empty());
    assert_eq!(
        *discovered_log.borrow(),
        vec!["core:before_load", "core:configure", "core:after_load"]
    );
}

#[test]
fn lifecycle_runs_breadth_first() {
    let features = log();
    let a = ScriptedFeature::new("a", &features);
    let b = ScriptedFeature::new("b", &features).depends_on("a");

    let mut engine = engine(json!({}));
    engine
        .bootstrap(vec![a.rc(), b.rc()], &FixedDiscovery::default(), false)
        .unwrap();

    assert_eq!(
        *features.borrow(),
        vec![
            "a:before_load",
            "b:before_load",
            "a:configure",
            "b:configure",
            "a:after_load",
            "b:after_load",
        ]
    );
}

#[test]
fn disabled_feature_contributes_nothing() {
    let actions = log();
    let features = log();
    let core = ScriptedFeature::new("core", &features)
        .phase("x")
        .command("x", vec!["x"]);
    let extra = ScriptedFeature::new("extra", &features)
        .phase("y")
        .action(ScriptedAction::on("extra:act", "phase:x", &actions).rc());

    let mut engine = engine(json!({"extra": {"disabled": true}}));
    engine
        .bootstrap(vec![core.rc(), extra.rc()], &FixedDiscovery::default(), false)
        .unwrap();

    assert!(engine.features().has("extra"));
    assert!(!engine.phases().has("y"));
    assert!(engine.actions().is_empty());
    assert!(!features.borrow().contains(&"extra:after_load".to_owned()));
}

#[test]
fn disabled_action_is_not_bound() {
    let actions = log();
    let features = log();
    let core = ScriptedFeature::new("core", &features)
        .phase("x")
        .action(ScriptedAction::on("off", "phase:x", &actions).disabled().rc())
        .action(ScriptedAction::on("on", "phase:x", &actions).rc());

    let mut engine = engine(json!({}));
    engine
        .bootstrap(vec![core.rc()], &FixedDiscovery::default(), false)
        .unwrap();

    assert_eq!(engine.actions().names(), vec!["on"]);
    assert_eq!(engine.bus().handler_count("phase:x"), 1);
}

#[test]
fn duplicate_action_names_fail_the_load() {
    let actions = log();
    let features = log();
    let a = ScriptedFeature::new("a", &features)
        .action(ScriptedAction::on("same", "phase:x", &actions).rc());
    let b = ScriptedFeature::new("b", &features)
        .action(ScriptedAction::on("same", "phase:x", &actions).rc());

    let mut engine = engine(json!({}));
    let err = engine
        .bootstrap(vec![a.rc(), b.rc()], &FixedDiscovery::default(), false)
        .unwrap_err();

    assert!(matches!(
        err,
        RigupError::Domain(DomainError::DuplicateName { kind: "action", .. })
    ));
    assert!(engine.actions().is_empty());
    assert!(engine.bus().is_empty());
}

#[test]
fn restart_reruns_the_command_once() {
    let actions = log();
    let features = log();
    let core = ScriptedFeature::new("core", &features)
        .phase("init")
        .phase("configure")
        .command("configure", vec!["init", "configure"])
        .action(
            ScriptedAction::on("restarter", "phase:init", &actions)
                .behaviour(Behaviour::RestartOnce)
                .rc(),
        )
        .action(ScriptedAction::on("work", "phase:configure", &actions).rc());

    let mut engine = engine(json!({}));
    engine
        .bootstrap(vec![core.rc()], &FixedDiscovery::default(), false)
        .unwrap();
    engine.execute_command("configure", CommandArgs::new()).unwrap();

    // first pass stops after `init`
    assert_eq!(*actions.borrow(), vec!["restarter", "restarter", "work"]);
}

#[test]
fn second_restart_is_an_error() {
    let actions = log();
    let features = log();
    let core = ScriptedFeature::new("core", &features)
        .phase("init")
        .command("configure", vec!["init"])
        .action(
            ScriptedAction::on("restarter", "phase:init", &actions)
                .behaviour(Behaviour::RestartAlways)
                .rc(),
        );

    let mut engine = engine(json!({}));
    engine
        .bootstrap(vec![core.rc()], &FixedDiscovery::default(), false)
        .unwrap();
    let err = engine
        .execute_command("configure", CommandArgs::new())
        .unwrap_err();

    assert!(matches!(
        err,
        RigupError::Application(ApplicationError::RestartLoop { .. })
    ));
}

#[test]
fn unknown_command_and_phase_are_errors() {
    let features = log();
    let core = ScriptedFeature::new("core", &features).command("broken", vec!["missing"]);

    let mut engine = engine(json!({}));
    engine
        .bootstrap(vec![core.rc()], &FixedDiscovery::default(), false)
        .unwrap();

    assert!(matches!(
        engine.execute_command("nope", CommandArgs::new()),
        Err(RigupError::Application(ApplicationError::UnknownCommand { .. }))
    ));
    assert!(matches!(
        engine.execute_command("broken", CommandArgs::new()),
        Err(RigupError::Application(ApplicationError::UnknownPhase { .. }))
    ));
}

#[test]
fn reset_is_total_and_startup_is_repeatable() {
    let actions = log();
    let features = log();
    let build = || {
        ScriptedFeature::new("core", &features)
            .phase("configure")
            .command("configure", vec!["configure"])
            .action(
                ScriptedAction::on("broken", "phase:configure", &actions)
                    .behaviour(Behaviour::Fail("boom"))
                    .rc(),
            )
            .rc()
    };

    let mut engine = engine(json!({}));
    engine
        .bootstrap(vec![build()], &FixedDiscovery::default(), false)
        .unwrap();
    engine.execute_command("configure", CommandArgs::new()).unwrap();
    assert_eq!(engine.failures().len(), 1);

    engine.reset().unwrap();
    assert!(engine.is_empty());
    assert!(engine.failures().is_empty());
    engine.reset().unwrap();
    assert!(engine.is_empty());

    engine
        .bootstrap(vec![build()], &FixedDiscovery::default(), false)
        .unwrap();
    engine.execute_command("configure", CommandArgs::new()).unwrap();
    assert_eq!(engine.failures().len(), 1);
    assert_eq!(engine.bus().handler_count("phase:configure"), 1);
}

#[test]
fn startup_after_reset_sees_the_same_configuration() {
    let features = log();
    let build = || {
        vec![
            ScriptedFeature::new("core", &features)
                .phase("configure")
                .command("configure", vec!["configure"])
                .rc(),
            ScriptedFeature::new("extra", &features).phase("extra").rc(),
        ]
    };

    let mut engine = engine(json!({
        "core": {"project": {"name": "demo"}},
        "extra": {"disabled": true},
    }));
    engine
        .bootstrap(build(), &FixedDiscovery::default(), false)
        .unwrap();
    engine.config().set("core.project.name", json!("changed"));

    engine.reset().unwrap();
    assert_eq!(engine.config().get("core.project.name"), None);

    engine
        .bootstrap(build(), &FixedDiscovery::default(), false)
        .unwrap();
    assert_eq!(
        engine.config().get("core.project.name"),
        Some(json!("demo"))
    );
    assert!(engine.phases().has("configure"));
    assert!(!engine.phases().has("extra"));
}

#[test]
fn failing_after_load_leaves_no_contributions() {
    let actions = log();
    let features = log();
    let core = ScriptedFeature::new("core", &features)
        .phase("x")
        .command("x", vec!["x"])
        .action(ScriptedAction::on("act", "phase:x", &actions).rc())
        .failing_after_load("after_load failed");

    let mut engine = engine(json!({}));
    let err = engine
        .bootstrap(vec![core.rc()], &FixedDiscovery::default(), false)
        .unwrap_err();

    assert_eq!(err.to_string(), "Configuration error: after_load failed");
    assert!(engine.phases().is_empty());
    assert!(engine.commands().is_empty());
    assert!(engine.actions().is_empty());
    assert!(engine.bus().is_empty());
}

#[test]
fn aborted_restart_request_does_not_leak_into_the_next_command() {
    let actions = log();
    let features = log();
    let core = ScriptedFeature::new("core", &features)
        .phase("init")
        .phase("build")
        .phase("check")
        .command("configure", vec!["init"])
        .command("test", vec!["build", "check"])
        .action(
            ScriptedAction::on("restarter", "phase:init", &actions)
                .behaviour(Behaviour::RestartThenFail("boom"))
                .rc(),
        )
        .action(ScriptedAction::on("build", "phase:build", &actions).rc())
        .action(ScriptedAction::on("check", "phase:check", &actions).rc());

    let mut engine = engine(json!({}));
    engine
        .bootstrap(vec![core.rc()], &FixedDiscovery::default(), true)
        .unwrap();

    assert!(engine
        .execute_command("configure", CommandArgs::new())
        .is_err());
    engine.execute_command("test", CommandArgs::new()).unwrap();

    assert_eq!(*actions.borrow(), vec!["restarter", "build", "check"]);
}

#[test]
fn fail_fast_can_come_from_configuration() {
    let actions = log();
    let features = log();
    let core = ScriptedFeature::new("core", &features)
        .phase("configure")
        .command("configure", vec!["configure"])
        .action(
            ScriptedAction::on("broken", "phase:configure", &actions)
                .behaviour(Behaviour::Fail("boom"))
                .rc(),
        );

    let mut engine = engine(json!({"core": {"fail_fast": true}}));
    engine
        .bootstrap(vec![core.rc()], &FixedDiscovery::default(), false)
        .unwrap();

    assert!(engine
        .execute_command("configure", CommandArgs::new())
        .is_err());
    assert!(engine.failures().is_empty());
}

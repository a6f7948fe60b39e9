//! Execution Manager Tests

use pretty_assertions::assert_eq;
use sweep_core::{ConstructError, ObjectRecipe, Value};
use sweep_runner::{demo_catalog, demo_tree, ExecutionManager, RunError, RunnerConfig};
use sweep_test_utils::{brittle_tree, foo_tree, gated_tree, Foo};
use sweep_tree::ConfigurationTree;

fn accept_all(_: &Value, _: Option<&ObjectRecipe>) -> Result<(), ConstructError> {
    Ok(())
}

#[test]
fn test_full_run_counts_everything() {
    let (tree, _) = foo_tree("1,2", "10,20,30");
    let manager = ExecutionManager::new(RunnerConfig::new());
    let mut seen = Vec::new();
    let summary = manager
        .run(&tree, &mut |value: &Value, recipe: Option<&ObjectRecipe>| -> Result<(), ConstructError> {
            let foo = value.downcast_ref::<Foo>().cloned();
            seen.push((foo, recipe.map(ToString::to_string)));
            Ok(())
        })
        .unwrap();

    assert_eq!(summary.produced, 6);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.total, 6);
    assert_eq!(summary.completed(), 6);
    assert!(!summary.stopped_early);
    assert_eq!(seen.len(), 6);
    assert_eq!(seen[0], (Some(Foo { a: 1, b: 10 }), Some("Foo(1, 10)".to_string())));
}

#[test]
fn test_enumerator_skips_counted() {
    let manager = ExecutionManager::default();
    let summary = manager.run(&gated_tree(), &mut accept_all).unwrap();
    assert_eq!(summary.produced, 6);
    assert_eq!(summary.skipped, 3);
    assert_eq!(summary.completed(), 3);
}

#[test]
fn test_experiment_skips_counted() {
    let (tree, _) = foo_tree("1:4", "1");
    let manager = ExecutionManager::default();
    let summary = manager
        .run(&tree, &mut |value: &Value, _: Option<&ObjectRecipe>| -> Result<(), ConstructError> {
            match value.downcast_ref::<Foo>() {
                Some(foo) if foo.a % 2 == 0 => Err(ConstructError::skip("even")),
                _ => Ok(()),
            }
        })
        .unwrap();
    assert_eq!(summary.produced, 4);
    assert_eq!(summary.skipped, 2);
}

#[test]
fn test_limit_stops_early() {
    let (tree, _) = foo_tree("1:10", "1:10");
    let manager = ExecutionManager::new(RunnerConfig::new().with_max_combinations(7));
    let summary = manager.run(&tree, &mut accept_all).unwrap();
    assert_eq!(summary.produced, 7);
    assert_eq!(summary.total, 100);
    assert!(summary.stopped_early);
}

#[test]
fn test_zero_limit_runs_nothing() {
    let (tree, _) = foo_tree("1,2", "1");
    let manager = ExecutionManager::new(RunnerConfig::new().with_max_combinations(0));
    let mut calls = 0;
    let summary = manager
        .run(&tree, &mut |_: &Value, _: Option<&ObjectRecipe>| -> Result<(), ConstructError> {
            calls += 1;
            Ok(())
        })
        .unwrap();
    assert_eq!(calls, 0);
    assert_eq!(summary.produced, 0);
    assert_eq!(summary.total, 2);
    assert!(summary.stopped_early);
}

#[test]
fn test_limit_equal_to_total_is_not_early() {
    let (tree, _) = foo_tree("1,2", "1");
    let manager = ExecutionManager::new(RunnerConfig::new().with_max_combinations(2));
    let summary = manager.run(&tree, &mut accept_all).unwrap();
    assert_eq!(summary.produced, 2);
    assert!(!summary.stopped_early);
}

#[test]
fn test_stop_on_skip() {
    let manager = ExecutionManager::new(RunnerConfig::new().with_stop_on_skip(true));
    let summary = manager.run(&gated_tree(), &mut accept_all).unwrap();
    // (1, 10) then the skipped (2, 10)
    assert_eq!(summary.produced, 2);
    assert_eq!(summary.skipped, 1);
    assert!(summary.stopped_early);
}

#[test]
fn test_construction_failure_aborts() {
    let manager = ExecutionManager::default();
    let err = manager.run(&brittle_tree("1,2,3"), &mut accept_all).unwrap_err();
    assert!(matches!(err, RunError::Enumeration(e) if e.is_construction_failure()));
}

#[test]
fn test_experiment_failure_aborts() {
    let (tree, _) = foo_tree("1,2", "5");
    let manager = ExecutionManager::default();
    let mut calls = 0;
    let err = manager
        .run(&tree, &mut |_: &Value, _: Option<&ObjectRecipe>| -> Result<(), ConstructError> {
            calls += 1;
            Err(ConstructError::failed("Foo", "diverged"))
        })
        .unwrap_err();
    assert_eq!(calls, 1);
    match err {
        RunError::Experiment { combination, source } => {
            assert_eq!(combination, "Foo(1, 5)");
            assert!(!source.is_skip());
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn test_unready_tree_rejected() {
    let tree = ConfigurationTree::new("Foo", sweep_test_utils::foo_catalog());
    let err = ExecutionManager::default().run(&tree, &mut accept_all).unwrap_err();
    assert!(matches!(err, RunError::Enumeration(_)));
}

#[test]
fn test_demo_survives_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("demo.json");
    let tree = demo_tree().unwrap();
    tree.save(&path).unwrap();

    let (loaded, report) = ConfigurationTree::load(&path, demo_catalog()).unwrap();
    assert!(report.is_clean());
    assert_eq!(loaded.total_combinations(), tree.total_combinations());

    let manager = ExecutionManager::default();
    let before = manager.run(&tree, &mut accept_all).unwrap();
    let after = manager.run(&loaded, &mut accept_all).unwrap();
    assert_eq!((before.produced, before.skipped), (after.produced, after.skipped));
}

#[test]
fn test_config_file_loads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("runner.toml");
    std::fs::write(&path, "max_combinations = 3\nstop_on_skip = true\n").unwrap();
    let config = RunnerConfig::load(&path).unwrap();
    assert_eq!(config.max_combinations, Some(3));
    assert!(config.stop_on_skip);
    assert_eq!(config.log_filter, "info");
    assert!(RunnerConfig::load(dir.path().join("missing.toml")).is_err());
}

//! `edgepush plan` output and guarantees.

mod common;

use common::*;

fn seeded_scenario() -> TestEnv {
    let env = TestEnv::new();
    env.write_source("a.txt", "H1");
    env.write_source("c.txt", "H3");
    let seeded = env.run(&["deploy"]);
    assert_eq!(seeded.exit_code, 0, "{}", seeded.combined_output());

    env.remove_source("c.txt");
    env.write_source("b.txt", "H2");
    env
}

#[test]
fn plan_output_snapshot() {
    let env = seeded_scenario();

    let result = env.run(&["plan", "--prune"]);

    assert_eq!(result.exit_code, 0, "{}", result.combined_output());
    insta::assert_snapshot!("plan_prune_scenario", env.redact(&result.stdout));
}

#[test]
fn plan_never_mutates_the_namespace() {
    let env = seeded_scenario();

    let result = env.run(&["plan", "--prune"]);

    assert_eq!(result.exit_code, 0);
    assert_eq!(env.remote_keys(), vec!["a.txt", "c.txt"]);
    assert_eq!(env.journal().batches.len(), 1);
}

#[test]
fn plan_json_lists_every_set() {
    let env = seeded_scenario();

    let result = env.run(&["plan", "--json"]);

    assert_eq!(result.exit_code, 0, "{}", result.combined_output());
    let events = result.events();
    assert_eq!(events.len(), 1);
    let plan = &events[0];
    assert_eq!(plan["event"], "plan");
    assert_eq!(plan["to_upload"], serde_json::json!(["b.txt"]));
    assert_eq!(plan["to_delete"], serde_json::json!([]));
    assert_eq!(plan["unchanged"], serde_json::json!(["a.txt"]));
    assert_eq!(plan["retained"], serde_json::json!(["c.txt"]));
}

#[test]
fn plan_flags_duplicate_content() {
    let env = TestEnv::new();
    env.write_source("index.html", "same");
    env.write_source("copy/index.html", "same");

    let result = env.run(&["plan", "-v"]);

    assert_eq!(result.exit_code, 0, "{}", result.combined_output());
    assert!(
        result.stdout.contains("1 group(s) of identical files"),
        "{}",
        result.stdout
    );
    assert!(result.stdout.contains("copy/index.html, index.html"));
}

#[test]
fn plan_of_missing_source_fails() {
    let env = TestEnv::new();

    let result = env.run(&["plan", "--source", "nope"]);

    assert_eq!(result.exit_code, 2);
    assert!(result.stderr.contains("source directory not found"), "{}", result.stderr);
}

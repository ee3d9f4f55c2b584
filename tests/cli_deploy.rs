//! `edgepush deploy` against the local store and journal CDN.

mod common;

use common::*;

#[test]
fn first_deploy_uploads_everything_and_invalidates() {
    let env = TestEnv::new();
    env.write_source("index.html", "<h1>home</h1>");
    env.write_source("css/site.css", "body {}");

    let result = env.run(&["deploy"]);

    assert_eq!(result.exit_code, 0, "{}", result.combined_output());
    assert!(result.stdout.contains("Deploy complete"), "{}", result.stdout);
    assert!(result.stdout.contains("2 uploaded, 0 deleted"), "{}", result.stdout);
    assert_eq!(env.remote_keys(), vec!["css/site.css", "index.html"]);
    assert_eq!(env.remote_file("css/site.css").as_deref(), Some("body {}"));

    let journal = env.journal();
    assert_eq!(journal.batches.len(), 1);
    assert_eq!(journal.batches[0].paths, vec!["/css/site.css", "/index.html"]);
    assert!(env.state_file().is_file());
}

#[test]
fn second_deploy_is_a_noop_without_cdn_request() {
    let env = TestEnv::new();
    env.write_source("index.html", "<h1>home</h1>");

    assert_eq!(env.run(&["deploy"]).exit_code, 0);
    let result = env.run(&["deploy"]);

    assert_eq!(result.exit_code, 0, "{}", result.combined_output());
    assert!(result.stdout.contains("Already up to date"), "{}", result.stdout);
    assert!(result.stdout.contains("0 uploaded, 0 deleted, 1 unchanged"));
    assert_eq!(env.journal().batches.len(), 1);
}

#[test]
fn dot_prefixed_assets_are_idempotent_and_prunable() {
    let env = TestEnv::new();
    env.write_source("index.html", "<h1>home</h1>");
    env.write_source(".tmp-build.json", "{}");
    env.write_source(".edgepush-meta/index.html.json", "{\"not\": \"a sidecar\"}");

    let first = env.run(&["deploy"]);
    assert_eq!(first.exit_code, 0, "{}", first.combined_output());
    assert!(first.stdout.contains("3 uploaded"), "{}", first.stdout);

    let second = env.run(&["deploy"]);
    assert_eq!(second.exit_code, 0, "{}", second.combined_output());
    assert!(second.stdout.contains("Already up to date"), "{}", second.stdout);
    assert!(second.stdout.contains("0 uploaded, 0 deleted, 3 unchanged"));

    env.remove_source(".tmp-build.json");
    let pruned = env.run(&["deploy", "--prune"]);
    assert_eq!(pruned.exit_code, 0, "{}", pruned.combined_output());
    assert_eq!(
        env.remote_keys(),
        vec![".edgepush-meta/index.html.json", "index.html"]
    );
}

#[test]
fn prune_deletes_remote_only_objects() {
    let env = TestEnv::new();
    env.write_source("a.txt", "H1");
    env.write_source("c.txt", "H3");
    assert_eq!(env.run(&["deploy"]).exit_code, 0);

    env.remove_source("c.txt");
    env.write_source("b.txt", "H2");
    let result = env.run(&["deploy", "--prune"]);

    assert_eq!(result.exit_code, 0, "{}", result.combined_output());
    assert_eq!(env.remote_keys(), vec!["a.txt", "b.txt"]);
    let journal = env.journal();
    assert_eq!(journal.batches.len(), 2);
    assert_eq!(journal.batches[1].paths, vec!["/b.txt", "/c.txt", "/index.html"]);
}

#[test]
fn without_prune_remote_only_objects_are_retained() {
    let env = TestEnv::new();
    env.write_source("a.txt", "H1");
    env.write_source("c.txt", "H3");
    assert_eq!(env.run(&["deploy"]).exit_code, 0);

    env.remove_source("c.txt");
    let result = env.run(&["deploy"]);

    assert_eq!(result.exit_code, 0, "{}", result.combined_output());
    assert!(result.stdout.contains("1 retained"), "{}", result.stdout);
    assert_eq!(env.remote_keys(), vec!["a.txt", "c.txt"]);
}

#[test]
fn changed_content_is_reuploaded() {
    let env = TestEnv::new();
    env.write_source("app.js", "v1");
    assert_eq!(env.run(&["deploy"]).exit_code, 0);

    env.write_source("app.js", "v2");
    let result = env.run(&["deploy"]);

    assert_eq!(result.exit_code, 0, "{}", result.combined_output());
    assert_eq!(env.remote_file("app.js").as_deref(), Some("v2"));
    assert_eq!(env.journal().batches[1].paths, vec!["/app.js", "/index.html"]);
}

#[test]
fn exclude_flag_keeps_files_local() {
    let env = TestEnv::new();
    env.write_source("index.html", "home");
    env.write_source("app.js.map", "{}");
    env.write_source("drafts/post.html", "wip");

    let result = env.run(&["deploy", "--exclude", "*.map", "--exclude", "drafts/"]);

    assert_eq!(result.exit_code, 0, "{}", result.combined_output());
    assert_eq!(env.remote_keys(), vec!["index.html"]);
}

#[test]
fn dry_run_prints_plan_and_mutates_nothing() {
    let env = TestEnv::new();
    env.write_source("index.html", "home");

    let result = env.run(&["deploy", "--dry-run"]);

    assert_eq!(result.exit_code, 0, "{}", result.combined_output());
    assert!(result.stdout.contains("Upload (1):"), "{}", result.stdout);
    assert!(env.remote_keys().is_empty());
    assert!(env.journal().batches.is_empty());
    assert!(!env.state_file().exists());
}

#[test]
fn json_mode_emits_ndjson_event_stream() {
    let env = TestEnv::new();
    env.write_source("index.html", "home");
    env.write_source("about.html", "about");

    let result = env.run(&["deploy", "--json"]);
    assert_eq!(result.exit_code, 0, "{}", result.combined_output());

    let events = result.events();
    let first = &events[0];
    assert_eq!(first["event"], "phase");
    assert_eq!(first["phase"], "scanning");

    let uploaded = events
        .iter()
        .filter(|e| e["event"] == "item_uploaded")
        .count();
    assert_eq!(uploaded, 2);
    assert!(events.iter().any(|e| e["event"] == "invalidation_submitted"));

    let last = events.last().unwrap();
    assert_eq!(last["event"], "complete");
    assert_eq!(last["status"], "succeeded");
    assert_eq!(last["uploaded"], 2);
}

#[test]
fn missing_source_directory_is_fatal() {
    let env = TestEnv::new();

    let result = env.run(&["deploy", "--source", "does-not-exist"]);

    assert_eq!(result.exit_code, 2, "{}", result.combined_output());
    assert!(result.stdout.contains("Deploy failed"), "{}", result.stdout);
    assert!(env.remote_keys().is_empty());
}

#[test]
fn missing_namespace_is_a_config_error() {
    let env = TestEnv::bare();
    env.write_source("index.html", "home");

    let result = env.run(&["deploy", "--source", "public"]);

    assert_eq!(result.exit_code, 2);
    assert!(
        result.stderr.contains("missing required setting"),
        "{}",
        result.stderr
    );
}

#[test]
fn flags_override_config_destination() {
    let env = TestEnv::new();
    env.write_source("index.html", "home");

    let result = env.run(&["deploy", "--namespace", "preview"]);

    assert_eq!(result.exit_code, 0, "{}", result.combined_output());
    assert!(env.root().join("remote/preview/index.html").is_file());
    assert!(env.remote_keys().is_empty());
}

#[test]
fn environment_overrides_config() {
    let env = TestEnv::new();
    env.write_source("index.html", "home");

    let result = env.run_with_env(&["deploy"], &[("EDGEPUSH_CDN_BACKEND", "none")]);

    assert_eq!(result.exit_code, 0, "{}", result.combined_output());
    assert_eq!(env.remote_keys(), vec!["index.html"]);
    assert!(env.journal().batches.is_empty());
}

#[test]
fn unknown_config_key_warns_with_suggestion() {
    let env = TestEnv::new();
    env.edit_config(|base| {
        base.replace("wildcard_threshold", "prnue = true\nwildcard_threshold")
    });
    env.write_source("index.html", "home");

    let result = env.run(&["deploy"]);

    assert_eq!(result.exit_code, 0, "{}", result.combined_output());
    assert!(result.stderr.contains("did you mean 'prune'"), "{}", result.stderr);
}

#[test]
fn wait_reports_completion() {
    let env = TestEnv::new();
    env.write_source("index.html", "home");

    let result = env.run(&["deploy", "--wait", "--wait-timeout", "5"]);

    assert_eq!(result.exit_code, 0, "{}", result.combined_output());
    assert!(result.stdout.contains("Invalidation completed"), "{}", result.stdout);
}

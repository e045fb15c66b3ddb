use std::fs;
use std::path::Path;

use chat_endpoint::fakes::{ScriptedChatClient, ScriptedReply};
use chat_endpoint::ChatOptions;
use repograde_core::report::{read_report, report_path};
use repograde_core::{evaluate_root, run_batch, Evaluator, GradeError, RepoTarget};

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn seed_repos(root: &Path) {
    write(root, "alice/calc/README.md", "# Calculator\n");
    write(root, "alice/calc/calc.py", "def add(a, b):\n    return a + b\n");
    write(root, "bob/site/index.html", "<h1>Hello</h1>\n");
    write(root, "carol/game/main.js", "let score = 0;\n");
}

const GOOD: &str = "```json\n{\"tech_stack\": \"Python\", \"functionality\": 6, \"code_quality\": 5, \"total_score\": 11, \"improvements\": \"add tests, add CLI,\",}\n```";

#[tokio::test]
async fn every_repository_gets_exactly_one_report() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    seed_repos(input.path());

    let client = ScriptedChatClient::new(vec![
        ScriptedReply::Text(GOOD.to_string()),
        ScriptedReply::Text("Sorry, I can't help with that.".to_string()),
        ScriptedReply::TransportFailure("connection refused".to_string()),
    ]);
    let evaluator = Evaluator::new(client, "deepseek-r1:8b");

    let summary = evaluate_root(&evaluator, input.path(), out.path()).await.unwrap();

    assert_eq!(summary.evaluated, 3);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.write_failures, 0);
    assert_eq!(summary.reports.len(), 3);

    let calc = read_report(&report_path(out.path(), "alice", "calc")).unwrap();
    assert!(calc.done);
    assert_eq!(calc.done_reason.as_deref(), Some("stop"));
    let score = calc.score().unwrap();
    assert_eq!(score.total_score, 11);
    assert_eq!(score.improvements, vec!["add tests", "add CLI"]);
    assert!(calc.corpus.has_readme);

    let site = read_report(&report_path(out.path(), "bob", "site")).unwrap();
    assert!(!site.done);
    assert_eq!(site.raw_output.as_deref(), Some("Sorry, I can't help with that."));

    let game = read_report(&report_path(out.path(), "carol", "game")).unwrap();
    assert!(!game.done);
    assert!(game.error.unwrap().contains("connection refused"));
}

#[tokio::test]
async fn repositories_are_evaluated_in_name_order_one_call_each() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    seed_repos(input.path());

    let client = ScriptedChatClient::with_texts(["{}", "{}", "{}"]);
    let evaluator = Evaluator::new(client, "m").with_options(ChatOptions {
        num_ctx: 4096,
        temperature: 0.0,
    });

    evaluate_root(&evaluator, input.path(), out.path()).await.unwrap();

    let requests = evaluator.client().requests();
    assert_eq!(requests.len(), 3);
    assert!(requests[0].messages[0].content.contains("calc.py"));
    assert!(requests[1].messages[0].content.contains("index.html"));
    assert!(requests[2].messages[0].content.contains("main.js"));
    assert!(requests.iter().all(|r| r.options.num_ctx == 4096));
}

#[tokio::test]
async fn report_write_failure_is_counted_not_fatal() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write(input.path(), "alice/calc/calc.py", "x = 1\n");
    // A plain file where the owner directory should go blocks the write.
    fs::write(out.path().join("alice"), "not a directory").unwrap();

    let targets = vec![RepoTarget::new(
        "alice",
        "calc",
        input.path().join("alice").join("calc"),
    )];
    let evaluator = Evaluator::new(ScriptedChatClient::with_texts(["{}"]), "m");

    let summary = run_batch(&evaluator, &targets, out.path()).await;

    assert_eq!(summary.evaluated, 1);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.write_failures, 1);
    assert!(summary.reports.is_empty());
}

#[tokio::test]
async fn missing_root_aborts_before_any_call() {
    let out = tempfile::tempdir().unwrap();
    let evaluator = Evaluator::new(ScriptedChatClient::default(), "m");

    let err = evaluate_root(&evaluator, &out.path().join("nope"), out.path())
        .await
        .unwrap_err();

    assert!(matches!(err, GradeError::RootNotFound(_)));
    assert_eq!(evaluator.client().call_count(), 0);
}

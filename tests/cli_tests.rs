#![cfg(feature = "cli")]

mod common;

use clap::Parser;
use common::{test_profile, test_registry, MockClient};
use pretty_assertions::assert_eq;

use vaiae::agent::QueryEvent;
use vaiae::cli::{dispatch, Cli};
use vaiae::engine::AgentEngineService;

const EXISTING: &str = "projects/p/locations/l/reasoningEngines/42";

async fn run(args: &[&str], client: &MockClient, profile: &str) -> vaiae::Result<String> {
    let cli = Cli::try_parse_from(args.iter().copied()).unwrap();
    let registry = test_registry();
    let service = AgentEngineService::new(test_profile(profile), client, &registry);
    let mut out = Vec::new();
    dispatch(&cli.command, &service, &mut out).await?;
    Ok(String::from_utf8(out).unwrap())
}

#[tokio::test]
async fn deploy_messages() {
    let client = MockClient::new();
    assert_eq!(
        run(&["vaiae", "deploy", "--dry-run"], &client, "default")
            .await
            .unwrap(),
        "Dry run completed for profile 'default'\n"
    );
    assert_eq!(
        run(&["vaiae", "deploy"], &client, "default").await.unwrap(),
        "Successfully deployed agent engine using profile 'default'\n"
    );
}

#[tokio::test]
async fn list_with_no_engines() {
    let client = MockClient::new();
    assert_eq!(
        run(&["vaiae", "list"], &client, "default").await.unwrap(),
        "No agent engines found.\n"
    );
}

#[tokio::test]
async fn list_prints_engine_blocks() {
    let client = MockClient::new().with_engine(EXISTING, "test-agent");
    let out = run(&["vaiae", "list"], &client, "default").await.unwrap();

    assert!(out.starts_with("Found 1 agent engine(s):\n\nDisplay Name: test-agent\n"));
    assert!(out.contains(&format!("Resource Name: {EXISTING}\n")));
    assert!(out.contains("Create Time: N/A\nUpdate Time: N/A\n"));
    assert!(out.ends_with(&format!("{}\n", "-".repeat(50))));
}

#[tokio::test]
async fn delete_by_name_messages() {
    let client = MockClient::new().with_engine(EXISTING, "test-agent");
    assert_eq!(
        run(&["vaiae", "delete", "-n", "test-agent", "--dry-run"], &client, "default")
            .await
            .unwrap(),
        "Dry run completed for 'test-agent' deletion\n"
    );
    assert_eq!(
        run(&["vaiae", "delete", "--name", "test-agent"], &client, "default")
            .await
            .unwrap(),
        "Successfully deleted agent engine 'test-agent'\n"
    );
}

#[tokio::test]
async fn delete_from_profile_messages() {
    let client = MockClient::new().with_engine(EXISTING, "test-agent");
    assert_eq!(
        run(&["vaiae", "delete", "--dry-run"], &client, "default")
            .await
            .unwrap(),
        "Dry run completed for profile 'default' deletion\n"
    );
    assert_eq!(
        run(&["vaiae", "delete", "--force"], &client, "default")
            .await
            .unwrap(),
        "Successfully deleted agent engine using profile 'default'\n"
    );
}

#[tokio::test]
async fn delete_missing_engine_reports_display_name() {
    let client = MockClient::new();
    let err = run(&["vaiae", "delete", "-n", "ghost"], &client, "default")
        .await
        .unwrap_err();
    assert_eq!(
        format!("Error: {err}"),
        "Error: Agent engine with display name 'ghost' not found"
    );
}

#[tokio::test]
async fn send_prints_agent_text() {
    let client = MockClient::new()
        .with_engine(EXISTING, "test-agent")
        .with_reply(vec![QueryEvent::text("agent", "Hi alice")]);
    assert_eq!(
        run(&["vaiae", "send", "-m", "hello", "-u", "alice"], &client, "default")
            .await
            .unwrap(),
        "Hi alice\n"
    );
}

#[tokio::test]
async fn send_requires_a_message() {
    let client = MockClient::new().with_engine(EXISTING, "test-agent");
    let err = run(&["vaiae", "send", "-u", "alice"], &client, "default")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("--message"));
}

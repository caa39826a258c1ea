use anyhow::Result;

use super::build;
use super::format_history;
use super::format_session;
use super::HistoryFormat;
use crate::domain::models::Agent;
use crate::domain::models::AgentKind;
use crate::domain::models::DisplayMessage;
use crate::domain::models::MediaItem;
use crate::domain::models::Role;

fn history() -> Vec<DisplayMessage> {
    return vec![
        DisplayMessage {
            role: Role::User,
            timestamp: None,
            text: "Plot it".to_string(),
            rendered_text: "<p>Plot it</p>\n".to_string(),
            media: vec![],
        },
        DisplayMessage {
            role: Role::Assistant,
            timestamp: None,
            text: "Done **now**".to_string(),
            rendered_text: "<p>Done <strong>now</strong></p>\n".to_string(),
            media: vec![MediaItem::image("/media/plot.png")],
        },
    ];
}

#[test]
fn it_builds_a_valid_command() {
    build().debug_assert();
}

#[test]
fn it_parses_sessions_subcommands() -> Result<()> {
    let matches = build().try_get_matches_from(vec![
        "agentdeck",
        "sessions",
        "spawn",
        "--task",
        "Summarize",
        "--cleanup",
        "delete",
        "--run-timeout",
        "120",
    ])?;

    let (_, sessions_matches) = matches.subcommand().unwrap();
    let (name, spawn_matches) = sessions_matches.subcommand().unwrap();
    assert_eq!(name, "spawn");
    assert_eq!(
        spawn_matches.get_one::<String>("cleanup"),
        Some(&"delete".to_string())
    );
    assert_eq!(spawn_matches.get_one::<u64>("run-timeout"), Some(&120));

    let res = build().try_get_matches_from(vec![
        "agentdeck",
        "sessions",
        "spawn",
        "--task",
        "Summarize",
        "--cleanup",
        "archive",
    ]);
    assert!(res.is_err());

    return Ok(());
}

#[test]
fn it_formats_sessions() {
    let mut agent = Agent::new("agent:researcher:task-7", AgentKind::Isolated);
    assert_eq!(
        format_session(&agent),
        "🤖 Researcher (isolated) agent:researcher:task-7"
    );

    agent.label = Some("paper digest".to_string());
    assert_eq!(
        format_session(&agent),
        "🤖 paper digest (isolated) agent:researcher:task-7"
    );
}

#[test]
fn it_formats_text_history() -> Result<()> {
    let res = format_history(&history(), HistoryFormat::Text)?;

    insta::assert_snapshot!(res, @r###"
    user:
    Plot it

    assistant:
    Done **now**
    [image] /media/plot.png
    "###);

    return Ok(());
}

#[test]
fn it_formats_html_history() -> Result<()> {
    let res = format_history(&history(), HistoryFormat::Html)?;

    insta::assert_snapshot!(res, @r###"
    user:
    <p>Plot it</p>

    assistant:
    <p>Done <strong>now</strong></p>
    [image] /media/plot.png
    "###);

    return Ok(());
}

#[test]
fn it_formats_json_history() -> Result<()> {
    let res = format_history(&history(), HistoryFormat::Json)?;
    let parsed = serde_json::from_str::<serde_json::Value>(&res)?;

    assert_eq!(parsed[1]["role"], "assistant");
    assert_eq!(parsed[1]["media"][0]["kind"], "image");
    assert_eq!(parsed[1]["media"][0]["url"], "/media/plot.png");

    return Ok(());
}

use super::parse;
use crate::cli::{Cli, CliCommand, RequesterArgs};
use clap::Parser;
use uuid::Uuid;
use vdq_core::policy::{Requester, Tier};

const SOURCE: &str = "67e55044-10b1-426f-9247-bb680e5fe0c8";

#[test]
fn fetch_defaults_to_local_guest() {
    match parse(&["vdq", "fetch", "https://www.youtube.com/watch?v=abc"]) {
        CliCommand::Fetch { url, who } => {
            assert_eq!(url, "https://www.youtube.com/watch?v=abc");
            assert_eq!(who.requester(), Requester::guest("local"));
        }
        other => panic!("expected Fetch, got {other:?}"),
    }
}

#[test]
fn add_with_account_and_tier() {
    match parse(&["vdq", "add", SOURCE, "22", "--user", "42", "--tier", "Pro"]) {
        CliCommand::Add {
            source_id,
            format_id,
            who,
        } => {
            assert_eq!(source_id, Uuid::parse_str(SOURCE).unwrap());
            assert_eq!(format_id.as_deref(), Some("22"));
            assert_eq!(who.requester(), Requester::account("42", Tier::Pro));
        }
        other => panic!("expected Add, got {other:?}"),
    }
}

#[test]
fn add_without_format_uses_default() {
    match parse(&["vdq", "add", SOURCE, "--guest", "s1"]) {
        CliCommand::Add { format_id, who, .. } => {
            assert!(format_id.is_none());
            assert_eq!(who.requester(), Requester::guest("s1"));
        }
        other => panic!("expected Add, got {other:?}"),
    }
}

#[test]
fn user_and_guest_conflict() {
    assert!(Cli::try_parse_from(["vdq", "usage", "--user", "1", "--guest", "s"]).is_err());
}

#[test]
fn tier_requires_user_and_known_value() {
    assert!(Cli::try_parse_from(["vdq", "usage", "--tier", "pro"]).is_err());
    assert!(Cli::try_parse_from(["vdq", "usage", "--user", "1", "--tier", "gold"]).is_err());
}

#[test]
fn playlist_with_format() {
    match parse(&["vdq", "playlist", "https://www.youtube.com/playlist?list=PL", "--format", "18"]) {
        CliCommand::Playlist { url, format, who } => {
            assert!(url.ends_with("list=PL"));
            assert_eq!(format.as_deref(), Some("18"));
            assert_eq!(
                who,
                RequesterArgs {
                    user: None,
                    tier: Tier::Free,
                    guest: None
                }
            );
        }
        other => panic!("expected Playlist, got {other:?}"),
    }
}

#[test]
fn run_jobs_optional() {
    match parse(&["vdq", "run"]) {
        CliCommand::Run { jobs } => assert!(jobs.is_none()),
        other => panic!("expected Run, got {other:?}"),
    }
    match parse(&["vdq", "run", "--jobs", "4"]) {
        CliCommand::Run { jobs } => assert_eq!(jobs, Some(4)),
        other => panic!("expected Run, got {other:?}"),
    }
}

#[test]
fn job_commands_take_uuid() {
    assert!(matches!(parse(&["vdq", "show", SOURCE]), CliCommand::Show { .. }));
    assert!(matches!(parse(&["vdq", "cancel", SOURCE]), CliCommand::Cancel { .. }));
    match parse(&["vdq", "remove", SOURCE, "--delete-file"]) {
        CliCommand::Remove { delete_file, .. } => assert!(delete_file),
        other => panic!("expected Remove, got {other:?}"),
    }
    assert!(Cli::try_parse_from(["vdq", "show", "12"]).is_err());
}

#[test]
fn history_id_optional() {
    match parse(&["vdq", "history"]) {
        CliCommand::History { id } => assert!(id.is_none()),
        other => panic!("expected History, got {other:?}"),
    }
    assert!(matches!(parse(&["vdq", "status"]), CliCommand::Status));
}

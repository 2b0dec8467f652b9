use super::*;
use fixtures::job;

#[test]
fn parses_run_command_with_defaults() {
    let cli = Cli::try_parse_from(["styleprof-cli", "run", "--transcript", "interviews/ada.md"])
        .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Commands::Run {
            ref transcript,
            project_id: None,
            client_id: None,
            display_name: None,
            output: None,
        } if transcript == Path::new("interviews/ada.md")
    ));
}

#[test]
fn parses_run_command_with_overrides() {
    let cli = Cli::try_parse_from([
        "styleprof-cli",
        "run",
        "--transcript",
        "t.md",
        "--project-id",
        "proj-7",
        "--client-id",
        "client-7",
        "--output",
        "/tmp/out",
    ])
    .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Commands::Run {
            project_id: Some(ref p),
            client_id: Some(ref c),
            output: Some(ref o),
            ..
        } if p == "proj-7" && c == "client-7" && o == Path::new("/tmp/out")
    ));
}

#[test]
fn run_requires_transcript() {
    assert!(Cli::try_parse_from(["styleprof-cli", "run"]).is_err());
}

#[test]
fn parses_status_and_db_commands() {
    let id = Uuid::new_v4().to_string();
    let cli = Cli::try_parse_from(["styleprof-cli", "status", &id, "--json"])
        .expect("expected valid cli args");
    assert!(matches!(cli.command, Commands::Status { json: true, .. }));

    assert!(Cli::try_parse_from(["styleprof-cli", "status", "not-a-uuid"]).is_err());

    let cli = Cli::try_parse_from(["styleprof-cli", "db", "migrate"]).expect("valid");
    assert!(matches!(
        cli.command,
        Commands::Db {
            command: DbCommands::Migrate
        }
    ));
}

#[test]
fn parses_jobs_limit_default() {
    let cli = Cli::try_parse_from(["styleprof-cli", "jobs"]).expect("valid");
    assert!(matches!(cli.command, Commands::Jobs { limit: 20 }));
}

#[test]
fn trigger_defaults_project_to_file_stem() {
    let trigger = build_trigger(Path::new("interviews/ada-lovelace.md"), None, None, None)
        .expect("trigger");
    assert_eq!(trigger.project_id, "ada-lovelace");
    assert!(trigger.client_id.is_empty());
    assert!(Path::new(&trigger.transcript_ref).is_absolute());
    assert!(trigger.transcript_ref.ends_with("ada-lovelace.md"));
}

#[test]
fn exit_codes_follow_error_kind() {
    let input = anyhow::Error::from(JobError::from(
        styleprof_core::TriggerError::MissingField("projectId"),
    ));
    assert_eq!(exit_code_for(&input), EXIT_INPUT);

    let conflict = anyhow::Error::from(JobError::Conflict {
        project_id: "p".to_string(),
    });
    assert_eq!(exit_code_for(&conflict), EXIT_CONFLICT);

    let other = anyhow::anyhow!("database unreachable");
    assert_eq!(exit_code_for(&other), EXIT_FAILED);
}

#[test]
fn summary_lists_artifacts_and_missing_sections() {
    let mut completed = job(JobState::Completed);
    completed.profile = Some(styleprof_core::StyleProfile::assemble(vec![], vec![]));

    let summary = summarize(&completed, Path::new("/out"));
    assert!(summary.contains(&format!("/out/{}/style-profile.md", completed.id)));
    assert!(summary.contains("missing:  voice (not produced)"));
}

#[test]
fn summary_shows_failure() {
    let mut failed = job(JobState::Failed);
    failed.error = Some(styleprof_core::JobFailure::new(
        styleprof_core::FailureKind::PipelineExhausted,
        "every capability failed",
    ));

    let summary = summarize(&failed, Path::new("/out"));
    assert!(summary.contains("error:    pipeline_exhausted: every capability failed"));
    assert!(!summary.contains("profile:"));
}

#[tokio::test]
async fn run_job_completes_with_memory_store() {
    let dir = tempfile::tempdir().expect("tempdir");
    let transcript = dir.path().join("interview.md");
    std::fs::write(
        &transcript,
        "## [Chunk 1]\n**Timestamp**: 00:00 - 00:30\n> Speaker 2: I learned to trust the process.\n",
    )
    .expect("write transcript");

    let config = AppConfig {
        output_dir: dir.path().join("out"),
        ..AppConfig::default()
    };
    let trigger = build_trigger(&transcript, None, None, None).expect("trigger");

    let code = run_job(&config, trigger).await.expect("run");
    assert_eq!(format!("{code:?}"), format!("{:?}", ExitCode::SUCCESS));

    let job_dirs: Vec<_> = std::fs::read_dir(dir.path().join("out"))
        .expect("output dir")
        .collect();
    assert_eq!(job_dirs.len(), 1);
}

#[tokio::test]
async fn run_job_rejects_unchunked_transcript_as_input() {
    let dir = tempfile::tempdir().expect("tempdir");
    let transcript = dir.path().join("notes.md");
    std::fs::write(&transcript, "plain notes\n").expect("write transcript");

    let config = AppConfig {
        output_dir: dir.path().join("out"),
        ..AppConfig::default()
    };
    let trigger = build_trigger(&transcript, None, None, None).expect("trigger");

    let err = run_job(&config, trigger).await.expect_err("input error");
    assert_eq!(exit_code_for(&err), EXIT_INPUT);
}

mod fixtures {
    use styleprof_core::{Job, JobState, NotificationState};
    use uuid::Uuid;

    pub(super) fn job(state: JobState) -> Job {
        let now = "2026-01-01T00:00:00Z".parse().expect("timestamp");
        Job {
            id: Uuid::new_v4(),
            project_id: "proj".to_string(),
            client_id: "proj".to_string(),
            display_name: None,
            transcript_ref: "t.md".to_string(),
            state,
            notification_state: NotificationState::NotSent,
            attempt: 1,
            retry_of: None,
            error: None,
            profile: None,
            scores: None,
            created_at: now,
            updated_at: now,
        }
    }
}

use super::*;
use clap::CommandFactory;

fn settings_for(mode: ExecutionMode) -> Settings {
    Settings {
        mode,
        placeholder: '?',
        ..Settings::default()
    }
}

fn rendered(outcome: &RunOutcome) -> String {
    outcome.glyphs.iter().map(|glyph| glyph.rendered).collect()
}

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[tokio::test]
async fn every_mode_renders_the_demo_script_identically() {
    for mode in [ExecutionMode::Sync, ExecutionMode::Actor, ExecutionMode::Worker] {
        let outcome = run_script(&settings_for(mode), demo_script())
            .await
            .expect("run");
        assert_eq!(outcome.mode, mode);
        assert_eq!(outcome.messages, 10);
        assert_eq!(
            rendered(&outcome),
            "\u{1F600}\u{1F937}?\u{1F60F}\u{1F61D}",
            "mode {mode}"
        );
    }
}

#[tokio::test]
async fn actor_mode_keeps_every_output_with_a_small_queue() {
    let settings = Settings {
        queue_capacity: 2,
        ..settings_for(ExecutionMode::Actor)
    };
    let mut script = vec![Message::Set(0x40)];
    for _ in 0..26 {
        script.push(Message::Increment(1));
        script.push(Message::Print);
    }

    let outcome = run_script(&settings, script).await.expect("run");
    assert_eq!(rendered(&outcome), "ABCDEFGHIJKLMNOPQRSTUVWXYZ");
}

#[tokio::test]
async fn initial_state_seeds_the_counter() {
    let settings = Settings {
        initial_state: 0x61,
        ..settings_for(ExecutionMode::Worker)
    };
    let outcome = run_script(&settings, vec![Message::Print, Message::Increment(1), Message::Print])
        .await
        .expect("run");
    assert_eq!(rendered(&outcome), "ab");
}

#[test]
fn json_report_counts_substitutions() {
    let outcome = RunOutcome {
        mode: ExecutionMode::Sync,
        messages: 10,
        glyphs: run_sync(&settings_for(ExecutionMode::Sync), demo_script()),
    };
    let report = serde_json::to_value(RunReport::from(&outcome)).expect("encode");

    assert_eq!(report["mode"], "sync");
    assert_eq!(report["emitted"], 5);
    assert_eq!(report["substituted"], 1);
    assert_eq!(report["outputs"][2]["code"], 10066329);
    assert_eq!(report["outputs"][2]["rendered"], "?");
    assert_eq!(report["outputs"][0]["rendered"], "\u{1F600}");
}

#[test]
fn cli_flags_override_settings_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config_path = dir.path().join("reducer.toml");
    std::fs::write(&config_path, "mode = \"worker\"\nplaceholder = \"#\"\n").expect("write");

    let cli = Cli::try_parse_from([
        "reducer-pipeline",
        "--config",
        config_path.to_str().expect("utf8 path"),
        "--mode",
        "actor",
        "--initial-state",
        "-7",
    ])
    .expect("parse args");
    let settings = resolve_settings(&cli).expect("settings");

    assert_eq!(settings.mode, ExecutionMode::Actor);
    assert_eq!(settings.placeholder, '#');
    assert_eq!(settings.initial_state, -7);
}

#[test]
fn invalid_placeholder_flag_is_rejected() {
    let cli = Cli::try_parse_from(["reducer-pipeline", "--placeholder", "xy"]).expect("parse args");
    let err = resolve_settings(&cli).expect_err("must fail");
    assert!(err.to_string().contains("invalid placeholder"));
}

fn set_then_prints(count: usize) -> Vec<Message> {
    std::iter::once(Message::Set(0x41))
        .chain(std::iter::repeat(Message::Print).take(count))
        .collect()
}

#[tokio::test]
async fn one_slot_queues_lose_nothing_in_any_mode() {
    for mode in [ExecutionMode::Sync, ExecutionMode::Actor, ExecutionMode::Worker] {
        let settings = Settings {
            queue_capacity: 1,
            output_capacity: 1,
            ..settings_for(mode)
        };
        let outcome = run_script(&settings, set_then_prints(2000))
            .await
            .expect("run");
        assert_eq!(outcome.glyphs.len(), 2000, "mode {mode}");
        assert!(outcome.glyphs.iter().all(|glyph| glyph.rendered == 'A'));
    }
}

#[test]
fn missing_script_error_names_the_file_once() {
    let dir = tempfile::tempdir().expect("tempdir");
    let script = dir.path().join("absent.script");
    let cli = Cli::try_parse_from([
        "reducer-pipeline",
        "--script",
        script.to_str().expect("utf8 path"),
    ])
    .expect("parse args");

    let err = load_messages(&cli).expect_err("must fail");
    let chain = format!("{err:#}");
    assert!(chain.starts_with("failed to load script"));
    assert_eq!(chain.matches("absent.script").count(), 1, "{chain}");
}

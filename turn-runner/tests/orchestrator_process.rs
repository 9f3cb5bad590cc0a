//! End-to-end runs against real `sh` scripts standing in for the simulation.
//!
//! Each test writes scripts into a temp directory, points the orchestrator at
//! them and checks the parsed result, the error taxonomy and the run gate.

use std::path::Path;

use turn_runner::error::TurnError;
use turn_runner::io::run_state::RunState;
use turn_runner::io::simulation::{ScriptRunner, SimulationRunner};
use turn_runner::io::store::{FileStore, WorldStore};
use turn_runner::test_support::{agent, fixed_clock, sh_config, sh_runner, world, write_script};
use turn_runner::turn::{Orchestrator, RunEvent, TurnRequest};

const PRODUCER: &str = r#"
echo "TURN 1 - 08:00"
echo "🎭 Alice"
echo "📍 Location: public_library"
echo "🤔 Decision: reads quietly"
echo "✅ Result: calmer"
echo "🤝 Alice meets Bob at library"
echo "Interaction type: friendly"
echo "💰 Alice shares \$5 with Bob"
echo "💬 Alice and Bob swap stories"
echo "debug: args=$*"
"#;

fn orchestrator(dir: &Path, timeout_secs: u64) -> Orchestrator<ScriptRunner, FileStore> {
    let cfg = sh_config(dir, timeout_secs);
    Orchestrator::new(
        ScriptRunner::from_config(&cfg),
        FileStore::new(&cfg.store_dir),
        "main",
        cfg.output_limit_bytes,
    )
    .with_clock(fixed_clock)
}

#[test]
fn successful_run_parses_output_and_reconciles() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_script(temp.path(), "baseline.sh", PRODUCER);
    let orch = orchestrator(temp.path(), 30);
    orch.store().put_agent(&agent("alice", "28yo writer, couchsurfing")).expect("put");
    orch.store().put_world(&world("main", 1)).expect("put");

    let mut updates = 0;
    let result = orch
        .run_turns(&TurnRequest { turns: 2, use_bedrock: true }, &mut |event| {
            if matches!(event, RunEvent::Update(_)) {
                updates += 1;
            }
        })
        .expect("run");

    assert!(result.success);
    assert_eq!(updates, 8);
    assert_eq!(result.log.len(), 1);
    let entry = &result.log[0];
    assert_eq!(entry.actor, "Alice");
    assert_eq!(entry.turn_number, Some(1));
    assert_eq!(entry.action.as_deref(), Some("reads quietly"));
    assert_eq!(entry.result.as_deref(), Some("calmer"));

    let interaction = &result.interactions[0];
    assert_eq!(interaction.participants, ["Alice".to_string(), "Bob".to_string()]);
    assert_eq!(interaction.kind, "friendly");
    assert_eq!(interaction.resource_exchange.as_deref(), Some("Alice shared $5 with Bob"));
    assert_eq!(
        interaction.outcome.as_deref(),
        Some("Shared survival tips and emotional support")
    );

    assert!(result.raw_output.contains("debug: args=--turns 2 --use-bedrock"));
    assert_eq!(result.world_snapshot.characters["alice"].money, 53.09);
    assert_eq!(result.world_snapshot.world.as_ref().map(|w| w.turn_number), Some(1));
    assert_eq!(orch.run_state(), RunState::Idle);
}

#[test]
fn failing_process_reports_stderr_and_releases_gate() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_script(temp.path(), "baseline.sh", "echo boom >&2\nexit 1\n");
    let orch = orchestrator(temp.path(), 30);

    let err = orch
        .run_turns(&TurnRequest::default(), &mut |_| {})
        .unwrap_err();

    match &err {
        TurnError::Execution { exit_code, stderr } => {
            assert_eq!(*exit_code, Some(1));
            assert!(stderr.contains("boom"));
        }
        other => panic!("expected execution error, got {other:?}"),
    }
    assert_eq!(orch.run_state(), RunState::Idle);
}

#[test]
fn slow_process_times_out() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_script(
        temp.path(),
        "baseline.sh",
        "echo '🎭 Alice'\necho 'waiting on bedrock' >&2\nexec sleep 30\n",
    );
    let orch = orchestrator(temp.path(), 1);

    let err = orch
        .run_turns(&TurnRequest::default(), &mut |_| {})
        .unwrap_err();

    match &err {
        TurnError::TimedOut {
            timeout_secs,
            stderr,
        } => {
            assert_eq!(*timeout_secs, 1);
            assert!(stderr.contains("waiting on bedrock"), "stderr: {stderr}");
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert_eq!(orch.run_state(), RunState::Idle);
}

#[test]
fn missing_scripts_fail_to_launch() {
    let temp = tempfile::tempdir().expect("tempdir");
    let orch = orchestrator(temp.path(), 30);

    let err = orch
        .run_turns(&TurnRequest::default(), &mut |_| {})
        .unwrap_err();

    assert_eq!(err.code(), "launch_failed");
    assert!(err.to_string().contains("no simulation script found"));
    assert_eq!(orch.run_state(), RunState::Idle);
}

#[test]
fn enhanced_script_is_preferred_when_present() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_script(temp.path(), "baseline.sh", "echo baseline\n");
    let runner = sh_runner(temp.path(), 30);

    let mut out = Vec::new();
    runner
        .run(&TurnRequest::default().invocation(), &mut |chunk| out.extend_from_slice(chunk))
        .expect("run baseline");
    assert_eq!(out, b"baseline\n");

    write_script(temp.path(), "enhanced.sh", "echo enhanced\n");
    out.clear();
    runner
        .run(&TurnRequest::default().invocation(), &mut |chunk| out.extend_from_slice(chunk))
        .expect("run enhanced");
    assert_eq!(out, b"enhanced\n");
}

#[test]
fn reset_passes_reset_arguments() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_script(temp.path(), "baseline.sh", "echo \"$*\"\n");
    let orch = orchestrator(temp.path(), 30);

    let result = orch.reset(&mut |_| {}).expect("reset");
    assert_eq!(result.raw_output, "--reset --turns 0\n");
    assert!(result.log.is_empty());
}

#[test]
fn corrupt_store_is_reconciliation_error_after_successful_run() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_script(temp.path(), "baseline.sh", "echo '🎭 Alice'\n");
    let agents = temp.path().join("store").join("agents");
    std::fs::create_dir_all(&agents).expect("mkdir");
    std::fs::write(agents.join("broken.json"), "{").expect("write");
    let orch = orchestrator(temp.path(), 30);

    let err = orch
        .run_turns(&TurnRequest::default(), &mut |_| {})
        .unwrap_err();

    assert!(matches!(err, TurnError::Reconciliation(_)));
    assert_eq!(orch.run_state(), RunState::Idle);
}

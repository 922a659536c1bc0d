use std::process::Command;

fn skull_event(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_skull-event"))
        .current_dir(concat!(env!("CARGO_MANIFEST_DIR"), "/../.."))
        .env("RUST_LOG", "warn")
        .args(args)
        .output()
        .expect("failed to launch skull-event")
}

#[test]
fn shipped_scenario_runs_to_summary() {
    let output = skull_event(&[
        "--config",
        "assets/skull_event.toml",
        "--duration",
        "90",
        "--stages",
        "0:1",
        "--collect-after",
        "2",
    ]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("stage 1 activated"), "{stdout}");
    assert!(stdout.contains("skull #1 spawned"), "{stdout}");
    assert!(stdout.contains("skull #1 collected"), "{stdout}");
    assert!(stdout.lines().last().is_some_and(|line| line.starts_with("spawned ")));
}

#[test]
fn same_seed_prints_same_timeline() {
    let args = ["--duration", "60", "--stages", "0:2,30:3", "--seed", "42"];

    let first = skull_event(&args);
    let second = skull_event(&args);

    assert!(first.status.success());
    assert_eq!(first.stdout, second.stdout);
}

#[test]
fn malformed_schedule_fails() {
    let output = skull_event(&["--stages", "soon:1"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--stages"), "{stderr}");
}

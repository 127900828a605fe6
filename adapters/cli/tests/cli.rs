use std::process::Command;

fn dash_runner(args: &[&str]) -> String {
    let output = Command::new(env!("CARGO_BIN_EXE_dash-runner"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to launch dash-runner");
    assert!(
        output.status.success(),
        "dash-runner {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("utf-8 output")
}

#[test]
fn zones_prints_the_locked_sequence() {
    let stdout = dash_runner(&["zones", "--seed", "race1", "--blocks", "4"]);
    let zones: Vec<&str> = stdout
        .lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().last())
        .collect();
    assert_eq!(zones, vec!["nature", "nature", "bridge", "suburbs"]);
}

#[test]
fn spawns_are_identical_across_invocations() {
    let args = ["spawns", "--seed", "cli", "--from", "100", "--count", "60"];
    assert_eq!(dash_runner(&args), dash_runner(&args));
}

#[test]
fn overrides_are_validated() {
    let status = Command::new(env!("CARGO_BIN_EXE_dash-runner"))
        .args(["--overrides", r#"{"lanes":{"maxLanes":0}}"#, "zones"])
        .env("RUST_LOG", "off")
        .status()
        .expect("failed to launch dash-runner");
    assert!(!status.success());
}

#[test]
fn simulate_reports_every_peer() {
    let stdout = dash_runner(&["simulate", "--seed", "cli", "--peers", "3", "--frames", "200"]);
    assert_eq!(stdout.lines().count(), 4);
}

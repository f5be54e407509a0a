mod setup;

use predicates::boolean::PredicateBooleanExt;
use predicates::str::contains;

use crate::setup::{DEFAULT_TIMEOUT, fixtures_dir, make_cli};

#[test]
fn test_repl_session() {
    let logs = tempfile::tempdir().expect("Failed to create temp dir");
    let history = logs.path().join("history.log");

    let mut cmd = make_cli();
    cmd.timeout(DEFAULT_TIMEOUT)
        .arg("-d")
        .arg(fixtures_dir())
        .arg("-l")
        .arg(&history)
        .write_stdin("read('census.csv')\nkeep(County,\n  Total)\nquit()\n")
        .assert()
        .success()
        .stdout(
            contains("Welcome to T:")
                .and(contains("Baldwin"))
                .and(contains("Bye!")),
        );

    let logged = std::fs::read_to_string(&history).expect("Failed to read history");
    let lines: Vec<&str> = logged.lines().collect();
    assert_eq!("000", lines[0]);
    assert_eq!("001 read('census.csv')", lines[1]);
    assert!(lines[2].starts_with("002 keep(County,"));
}

#[test]
fn test_repl_silent_and_errors() {
    let logs = tempfile::tempdir().expect("Failed to create temp dir");

    let mut cmd = make_cli();
    cmd.timeout(DEFAULT_TIMEOUT)
        .arg("--silent")
        .arg("-d")
        .arg(fixtures_dir())
        .arg("-l")
        .arg(logs.path().join("history.log"))
        .write_stdin("read('census.csv')\nkeep(Nope)\npop()\n")
        .assert()
        .success()
        // No preview, errors are reported and the session ends at EOF.
        .stdout(
            contains("Autauga")
                .not()
                .and(contains("Error in 'keep' command"))
                .and(contains("Bye!")),
        );
}

//! Recovery runs against a scripted robot, as at startup after a crash.

mod common;

use chessbot_api::{recover, ActuatorError, MemoryStore, MoveLogStore, RecoveryFailure};
use chessbot_core::{Color, Spot, Transfer};

use common::{sq, ScriptedRobot};

/// Log of 1.e4 d5 2.exd5 Qxd5 as the coordinator writes it.
fn crashed_log() -> MemoryStore {
    let log = MemoryStore::new();
    for entry in ["e2-e4-WHITE-P-0", "e4-d5-WHITE-P-0", "d5-2-WHITE-P-1"] {
        log.push_raw(Color::White, entry);
    }
    for entry in ["d7-d5-BLACK-p-0", "d5-1-BLACK-p-1", "d8-d5-BLACK-q-0"] {
        log.push_raw(Color::Black, entry);
    }
    log
}

#[test]
fn test_recover_after_crash() {
    let mut robot = ScriptedRobot::new();
    let mut log = crashed_log();

    let report = recover(&mut robot, &mut log).unwrap();

    assert_eq!(
        robot.done(),
        vec![
            Transfer::on_board(sq("d5"), sq("d8")),
            Transfer {
                from: Spot::holding(2),
                to: Spot::active(sq("e2")),
            },
            Transfer {
                from: Spot::holding(1),
                to: Spot::active(sq("d7")),
            },
        ]
    );
    assert_eq!(report.transfers, 3);
    assert!(report.stranded.is_empty());
    assert!(log.is_empty().unwrap());
}

#[test]
fn test_recover_empty_log_does_nothing() {
    let mut robot = ScriptedRobot::new();
    let mut log = MemoryStore::new();

    let report = recover(&mut robot, &mut log).unwrap();
    assert_eq!(report.transfers, 0);
    assert!(robot.done().is_empty());
}

#[test]
fn test_robot_failure_keeps_log_for_retry() {
    let mut robot = ScriptedRobot::new();
    let mut log = crashed_log();
    robot.script(&[true, false]);

    let err = recover(&mut robot, &mut log).unwrap_err();
    match err {
        RecoveryFailure::Actuator {
            completed,
            source: ActuatorError::Rejected(_),
            ..
        } => assert_eq!(completed, 1),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(log.raw(Color::White).len(), 3);
    assert_eq!(log.raw(Color::Black).len(), 3);
}

#[test]
fn test_corrupt_log_is_reported() {
    let mut robot = ScriptedRobot::new();
    let mut log = MemoryStore::new();
    log.push_raw(Color::White, "e2-e4-WHITE");

    assert!(matches!(
        recover(&mut robot, &mut log),
        Err(RecoveryFailure::Log(_))
    ));
    assert!(robot.done().is_empty());
}

#[test]
fn test_unreplayable_log_is_reported() {
    let mut robot = ScriptedRobot::new();
    let mut log = MemoryStore::new();
    log.push_raw(Color::White, "e2-e5-WHITE-P-0");

    assert!(matches!(
        recover(&mut robot, &mut log),
        Err(RecoveryFailure::Plan(_))
    ));
    assert_eq!(log.raw(Color::White).len(), 1);
}

//! AML mutexes and events driven through control methods, across threads.

mod common;

use std::time::Duration;

use common::*;
use hadron_aml::{AmlError, Interpreter, Object};

const TIMED_OUT: u64 = u64::MAX;

fn status(interp: &Interpreter<FakeHandler>, method: &str) -> u64 {
    match interp.evaluate(&path(method), Vec::new()).unwrap() {
        Object::Integer(v) => v,
        other => panic!("expected an integer, got {other:?}"),
    }
}

/// `Acquire(MTX0, timeout)` returned from a method.
fn acquire_method(seg: &[u8], timeout: u16) -> Vec<u8> {
    method(seg, 0, &ret(&cat(&[&[0x5B, 0x23], b"MTX0", &timeout.to_le_bytes()])))
}

/// `Wait(EVT0, timeout)` returned from a method.
fn wait_method(seg: &[u8], timeout: u16) -> Vec<u8> {
    method(seg, 0, &ret(&cat(&[&[0x5B, 0x25], b"EVT0", &word(timeout)])))
}

fn mutex_table() -> Vec<u8> {
    // Mutex(MTX0, 0)
    cat(&[
        &[0x5B, 0x01],
        b"MTX0",
        &[0x00],
        &acquire_method(b"LCKW", 0xFFFF),
        &acquire_method(b"LCKT", 20),
        &method(b"UNL0", 0, &cat(&[&[0x5B, 0x27], b"MTX0"])),
    ])
}

fn event_table() -> Vec<u8> {
    // Event(EVT0)
    cat(&[
        &[0x5B, 0x02],
        b"EVT0",
        &wait_method(b"WAIT", 0xFFFF),
        &wait_method(b"POLL", 0),
        &wait_method(b"WTMO", 20),
        &method(b"SIG0", 0, &cat(&[&[0x5B, 0x24], b"EVT0"])),
        &method(b"RST0", 0, &cat(&[&[0x5B, 0x26], b"EVT0"])),
    ])
}

#[test]
fn mutex_is_recursive_for_its_owner() {
    let interp = load(&mutex_table());
    assert_eq!(status(&interp, "\\LCKW"), 0);
    assert_eq!(status(&interp, "\\LCKT"), 0);
    interp.evaluate(&path("\\UNL0"), Vec::new()).unwrap();
    interp.evaluate(&path("\\UNL0"), Vec::new()).unwrap();
    assert_eq!(
        interp.evaluate(&path("\\UNL0"), Vec::new()).unwrap_err(),
        AmlError::NotMutexOwner
    );
}

#[test]
fn contended_acquire_times_out() {
    let interp = load(&mutex_table());
    assert_eq!(status(&interp, "\\LCKW"), 0);

    std::thread::scope(|s| {
        let other = s.spawn(|| status(&interp, "\\LCKT"));
        assert_eq!(other.join().unwrap(), TIMED_OUT);
    });
}

#[test]
fn release_hands_mutex_to_waiter() {
    let interp = load(&mutex_table());
    assert_eq!(status(&interp, "\\LCKW"), 0);

    std::thread::scope(|s| {
        let waiter = s.spawn(|| {
            let acquired = status(&interp, "\\LCKW");
            interp.evaluate(&path("\\UNL0"), Vec::new()).unwrap();
            acquired
        });
        std::thread::sleep(Duration::from_millis(20));
        interp.evaluate(&path("\\UNL0"), Vec::new()).unwrap();
        assert_eq!(waiter.join().unwrap(), 0);
    });
}

#[test]
fn release_from_other_thread_fails() {
    let interp = load(&mutex_table());
    assert_eq!(status(&interp, "\\LCKW"), 0);

    std::thread::scope(|s| {
        let err = s
            .spawn(|| interp.evaluate(&path("\\UNL0"), Vec::new()).unwrap_err())
            .join()
            .unwrap();
        assert_eq!(err, AmlError::NotMutexOwner);
    });
}

#[test]
fn event_counts_signals() {
    let interp = load(&event_table());
    assert_eq!(status(&interp, "\\POLL"), TIMED_OUT);

    interp.evaluate(&path("\\SIG0"), Vec::new()).unwrap();
    interp.evaluate(&path("\\SIG0"), Vec::new()).unwrap();
    assert_eq!(status(&interp, "\\POLL"), 0);
    assert_eq!(status(&interp, "\\POLL"), 0);
    assert_eq!(status(&interp, "\\WTMO"), TIMED_OUT);
}

#[test]
fn reset_discards_pending_signals() {
    let interp = load(&event_table());
    interp.evaluate(&path("\\SIG0"), Vec::new()).unwrap();
    interp.evaluate(&path("\\RST0"), Vec::new()).unwrap();
    assert_eq!(status(&interp, "\\POLL"), TIMED_OUT);
}

#[test]
fn signal_wakes_waiting_thread() {
    let interp = load(&event_table());

    std::thread::scope(|s| {
        let waiter = s.spawn(|| status(&interp, "\\WAIT"));
        std::thread::sleep(Duration::from_millis(20));
        interp.evaluate(&path("\\SIG0"), Vec::new()).unwrap();
        assert_eq!(waiter.join().unwrap(), 0);
    });
}

#[test]
fn fatal_aborts_evaluation() {
    // Method(DIE0) { Fatal(0x01, 0x0000BEEF, 7) }
    let body = cat(&[&[0x5B, 0x32, 0x01], &0xBEEF_u32.to_le_bytes(), &byte(7)]);
    let interp = load(&method(b"DIE0", 0, &body));
    assert_eq!(
        interp.evaluate(&path("\\DIE0"), Vec::new()).unwrap_err(),
        AmlError::Fatal {
            kind: 1,
            code: 0xBEEF,
            arg: 7
        }
    );
}

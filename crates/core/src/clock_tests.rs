// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn system_clock_tracks_real_time() {
    let clock = SystemClock;
    let t1 = clock.now();
    std::thread::sleep(Duration::from_millis(1));
    assert!(clock.now() > t1);
}

#[test]
fn fake_clock_only_moves_when_advanced() {
    let clock = FakeClock::new();
    let t1 = clock.now();
    assert_eq!(clock.now(), t1);

    clock.advance(Duration::from_secs(5));
    assert_eq!(clock.now().duration_since(t1), Duration::from_secs(5));
}

#[test]
fn fake_clock_clones_share_the_timeline() {
    let clock = FakeClock::new();
    let handle = clock.clone();
    let t1 = clock.now();

    handle.advance(Duration::from_secs(30));
    assert_eq!(clock.now().duration_since(t1), Duration::from_secs(30));
}

#[test]
fn advances_accumulate() {
    let clock = FakeClock::new();
    let t1 = clock.now();
    clock.advance(Duration::from_secs(1));
    clock.advance(Duration::from_secs(2));
    assert_eq!(clock.now().duration_since(t1), Duration::from_secs(3));
}

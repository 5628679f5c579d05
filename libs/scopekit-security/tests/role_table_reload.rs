#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::atomic::{AtomicBool, Ordering};

use scopekit_security::capabilities::names;
use scopekit_security::{Role, RoleHierarchy, RoleTable, ScopeClass};

/// Builtin table with `leader` demoted to individual scope and stripped of
/// benchmark read.
fn demoted_leader() -> RoleHierarchy {
    let mut cfg = RoleHierarchy::builtin().to_config();
    let leader = cfg.roles.get_mut("leader").unwrap();
    leader.scope = ScopeClass::Individual;
    leader.capabilities.retain(|c| c != names::BENCHMARK_READ);
    RoleHierarchy::from_config(&cfg).unwrap()
}

#[test]
fn readers_never_observe_a_mixed_table() {
    let table = RoleTable::builtin();
    let done = AtomicBool::new(false);

    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                while !done.load(Ordering::Acquire) {
                    let snap = table.snapshot();
                    let class = snap.scope_class_of(&Role::Leader);
                    let reads = snap.role_grants(&Role::Leader, names::BENCHMARK_READ);
                    assert!(
                        (class == ScopeClass::Department && reads)
                            || (class == ScopeClass::Individual && !reads),
                        "torn snapshot: {class} / benchmark read = {reads}"
                    );
                }
            });
        }

        for i in 0..200 {
            if i % 2 == 0 {
                table.replace(demoted_leader());
            } else {
                table.replace(RoleHierarchy::builtin());
            }
        }
        done.store(true, Ordering::Release);
    });
}

#[test]
fn reload_applies_to_later_snapshots_only() {
    let table = RoleTable::builtin();
    let in_flight = table.snapshot();

    table.replace(demoted_leader());

    assert_eq!(in_flight.scope_class_of(&Role::Leader), ScopeClass::Department);
    assert_eq!(
        table.snapshot().scope_class_of(&Role::Leader),
        ScopeClass::Individual
    );
    assert_eq!(
        table.snapshot().scope_class_of(&Role::parse("auditor")),
        ScopeClass::MOST_RESTRICTIVE
    );
}

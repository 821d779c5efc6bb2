// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
mod common;

use common::{cache, codon, parent, pinned_runner, sig};
use egp_core::{DependencyField, GcHandle, GcRef};
use proptest::prelude::*;

const SEED_TAG: &[u8] = b"GCC";

#[test]
fn seventeenth_insert_frees_the_four_oldest_slots() {
    let mut gcc = cache(16);
    let handles: Vec<GcHandle> = (1..=16)
        .map(|n| gcc.insert(codon(n)).expect("insert"))
        .collect();
    assert_eq!(handles, (0..16).map(GcHandle).collect::<Vec<_>>());
    assert_eq!(gcc.purge_count(), 0);

    let h17 = gcc.insert(codon(17)).expect("insert 17");
    assert_eq!(gcc.purge_count(), 1);
    assert_eq!(h17, GcHandle(0), "oldest freed slot is reused first");
    for slot in 1..4 {
        assert!(!gcc.contains(GcHandle(slot)));
        assert_eq!(gcc.access_sequence(GcHandle(slot)), Some(u64::MAX));
    }
    for n in 1..=4 {
        assert_eq!(gcc.find(&sig(n)), None);
    }
    for n in 5..=17 {
        assert!(gcc.find(&sig(n)).is_some(), "codon {n} should survive");
    }

    for n in 18..=32 {
        gcc.insert(codon(n)).expect("insert");
    }
    assert_eq!(gcc.purge_count(), 4);
    assert_eq!(gcc.len(), 16);
    assert!(gcc.check_consistency().is_empty());
}

#[test]
fn reading_through_a_view_spares_the_entry() {
    let mut gcc = cache(16);
    for n in 1..=16 {
        gcc.insert(codon(n)).expect("insert");
    }
    let (first, second) = (GcHandle(0), GcHandle(1));
    assert_eq!(gcc.get(first).expect("first").signature(), sig(1));
    assert_eq!(gcc.get(second).expect("second").generation(), 0);
    assert!(gcc.access_sequence(first) > gcc.access_sequence(GcHandle(15)));

    let report = gcc.purge(0.25);
    let expected: Vec<GcHandle> = (2..6).map(GcHandle).collect();
    assert_eq!(report.freed, expected);
    assert!(gcc.contains(first));
    assert!(gcc.contains(second));
    assert_eq!(gcc.find(&sig(1)), Some(first));
    assert_eq!(gcc.find(&sig(3)), None);
}

#[test]
fn purge_selects_the_globally_oldest_slots() {
    let order = Just((0_u32..16).collect::<Vec<_>>()).prop_shuffle();
    pinned_runner(SEED_TAG)
        .run(&order, |order| {
            let mut gcc = cache(16);
            for n in 1..=16 {
                gcc.insert(codon(n)).expect("insert");
            }
            for &slot in &order {
                gcc.touch(GcHandle(slot));
            }
            let report = gcc.purge(0.25);
            let expected: Vec<GcHandle> = order[..4]
                .iter()
                .copied()
                .map(GcHandle)
                .collect();
            prop_assert_eq!(report.freed, expected);
            prop_assert_eq!(gcc.len(), 12);
            Ok(())
        })
        .expect("pinned LRU property");
}

#[derive(Clone, Debug)]
enum Op {
    Codon(u32),
    Parent(u32, u32),
    Touch(u32),
    Purge,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1_u32..40).prop_map(Op::Codon),
        (1_u32..40, 1_u32..40).prop_map(|(a, b)| Op::Parent(a, b)),
        (0_u32..8).prop_map(Op::Touch),
        Just(Op::Purge),
    ]
}

#[test]
fn no_surviving_entry_references_a_free_slot() {
    let ops = prop::collection::vec(op(), 1..120);
    pinned_runner(SEED_TAG)
        .run(&ops, |ops| {
            let mut gcc = cache(8);
            for op in ops {
                match op {
                    Op::Codon(n) => {
                        gcc.insert(codon(n)).expect("insert codon");
                    }
                    Op::Parent(a, b) => {
                        gcc.insert(parent(sig(a), sig(b))).expect("insert parent");
                    }
                    Op::Touch(slot) => gcc.touch(GcHandle(slot)),
                    Op::Purge => {
                        gcc.purge(0.25);
                    }
                }
                prop_assert!(gcc.len() <= gcc.capacity());
                let problems = gcc.check_consistency();
                prop_assert!(problems.is_empty(), "{:?}", problems);
                for h in gcc.handles() {
                    for field in DependencyField::ALL {
                        let view = gcc.get(h).expect("resident");
                        if let GcRef::Resident(dep) = view.dependency(field) {
                            prop_assert!(gcc.contains(dep));
                        }
                    }
                }
            }
            Ok(())
        })
        .expect("pinned dangling-reference property");
}

#[test]
fn refreezing_a_leaf_keeps_its_frozen_fields() {
    let mut gcc = cache(8);
    let a = gcc.insert(codon(1)).expect("a");
    let b = gcc.insert(codon(2)).expect("b");
    let p = gcc.insert(parent(sig(1), sig(2))).expect("p");
    gcc.touch(b);
    gcc.touch(p);

    // k = 1: a is the oldest.
    assert_eq!(gcc.purge(0.125).freed, vec![a]);
    let first = gcc.get(p).expect("p").to_record();
    assert!(gcc.is_leaf(p));

    gcc.touch(p);
    assert_eq!(gcc.purge(0.125).freed, vec![b]);
    let view = gcc.get(p).expect("p");
    assert_eq!(view.gcb(), GcRef::Purged);
    assert_eq!(view.to_record(), first);
    assert_eq!(view.generation(), 1);
}

#[test]
fn optimize_relinks_reinserted_dependencies() {
    let mut gcc = cache(8);
    let a = gcc.insert(codon(1)).expect("a");
    let b = gcc.insert(codon(2)).expect("b");
    let p = gcc.insert(parent(sig(1), sig(2))).expect("p");
    let signature = gcc.get(p).expect("p").signature();
    gcc.touch(b);
    gcc.touch(p);
    assert_eq!(gcc.purge(0.125).freed, vec![a]);
    assert!(gcc.is_leaf(p));

    let again = gcc.insert(codon(1)).expect("reinsert");
    let report = gcc.optimize();
    assert_eq!(report.relinked, 1);
    assert_eq!(report.unleafed, 1);
    let view = gcc.get(p).expect("p");
    assert_eq!(view.gca(), GcRef::Resident(again));
    assert!(!view.is_leaf());
    assert_eq!(view.signature(), signature);
    assert!(gcc.check_consistency().is_empty());
}

#[test]
fn rehydrate_pulls_flushed_dependencies_back() {
    let mut gcc = cache(8);
    let a = gcc.insert(codon(1)).expect("a");
    let b = gcc.insert(codon(2)).expect("b");
    let p = gcc.insert(parent(sig(1), sig(2))).expect("p");
    gcc.mark_dirty(a).expect("dirty");
    gcc.touch(b);
    gcc.touch(p);
    let report = gcc.purge(0.125);
    assert_eq!(report.flushed, 1);
    assert!(gcc.pool().contains(&sig(1)));

    let back = gcc
        .rehydrate(p, DependencyField::Gca)
        .expect("rehydrate")
        .expect("in pool");
    assert_eq!(gcc.find(&sig(1)), Some(back));
    assert_eq!(gcc.get(p).expect("p").gca(), GcRef::Resident(back));
    assert_eq!(gcc.rehydrate(p, DependencyField::AncestorA), Ok(None));
}

#[test]
fn clean_entries_are_not_flushed() {
    let mut gcc = cache(4);
    gcc.insert(codon(1)).expect("a");
    let report = gcc.purge(0.25);
    assert_eq!(report.freed.len(), 1);
    assert_eq!(report.flushed, 0);
    assert!(!gcc.pool().contains(&sig(1)));
}

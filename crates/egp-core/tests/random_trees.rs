// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
mod common;

use common::{cache, rng};
use egp_core::{DependencyField, GcHandle, GcRef};

#[test]
fn depth_five_tree_fills_sixty_three_slots() {
    let mut gcc = cache(64);
    let root = gcc.random(5, &mut rng(0x5eed)).expect("random tree");
    assert_eq!(root, GcHandle(0));
    assert_eq!(gcc.len(), 63);
    assert_eq!(gcc.purge_count(), 0);

    let view = gcc.get(root).expect("root");
    assert_eq!(view.generation(), 5);
    assert!(gcc.handles().all(|h| gcc.is_dirty(h)));
    assert_eq!(gcc.leaves().count(), 32, "every codon is a leaf");
    assert!(gcc.check_consistency().is_empty());
}

#[test]
fn generations_count_up_from_the_codons() {
    let mut gcc = cache(16);
    let root = gcc.random(2, &mut rng(11)).expect("random tree");
    let view = gcc.get(root).expect("root");
    let child = view.child(DependencyField::Gca).expect("gca");
    let grandchild = child.child(DependencyField::Gcb).expect("gcb");
    let generations = (
        view.generation(),
        child.generation(),
        grandchild.generation(),
    );
    assert_eq!(generations, (2, 1, 0));
    assert!(grandchild.is_codon());
    assert_eq!(view.ancestor_a(), GcRef::Empty);
}

#[test]
fn trees_survive_repeated_purges() {
    let mut gcc = cache(16);
    let mut r = rng(0xc0de);
    for _ in 0..20 {
        let root = gcc.random(2, &mut r).expect("random tree under pressure");
        assert!(gcc.contains(root));
        assert_eq!(gcc.get(root).expect("root").generation(), 2);
    }
    assert!(gcc.purge_count() > 0);
    assert!(gcc.len() <= 16);
    assert!(gcc.check_consistency().is_empty());
}

#[test]
fn random_signatures_differ() {
    let mut gcc = cache(4);
    let mut r = rng(5);
    let a = gcc.random(0, &mut r).expect("a");
    let b = gcc.random(0, &mut r).expect("b");
    let sig_a = gcc.get(a).expect("a").signature();
    assert_ne!(sig_a, gcc.get(b).expect("b").signature());
}

//! End-to-end engine scenarios: command scripts run against a real backing
//! file, including persistence across close/reopen.

use std::io::Read;

use dnadb::config::StoreConfig;
use dnadb::controller::Controller;
use dnadb::sequence::DnaSequence;
use dnadb::storage::MemManager;
use dnadb::trie::{DnaTrie, InsertOutcome, PrintMode};

fn scenario_config() -> StoreConfig {
    // Block size 64, 4 buffers, initial pool 256.
    StoreConfig {
        pool_size: 256,
        block_size: 64,
        buffers: 4,
        ..StoreConfig::default()
    }
}

fn open_controller(path: &std::path::Path, config: &StoreConfig) -> Controller {
    let (manager, resume) = MemManager::open(path, config).unwrap();
    Controller::new(DnaTrie::open(manager, resume).unwrap())
}

fn run_script(controller: &mut Controller, script: &str) -> String {
    let mut out = Vec::new();
    controller.run(script.as_bytes(), &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn insert_then_print_shows_single_leaf_at_root() {
    let dir = tempfile::tempdir().unwrap();
    let mut controller = open_controller(&dir.path().join("s1.pool"), &scenario_config());

    let out = run_script(&mut controller, "insert AAAA\nprint\n");

    assert!(
        out.contains("Successfully inserted new record \"AAAA\" of 3 bytes (4 characters)"),
        "{out}"
    );
    // A single stored sequence renders as a bare leaf, no branches.
    assert!(out.contains("\nAAAA\n"), "{out}");
    assert!(!out.contains("\nI\n"), "{out}");
}

#[test]
fn duplicate_insert_leaves_engine_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let mut controller = open_controller(&dir.path().join("s2.pool"), &scenario_config());

    let first = run_script(&mut controller, "insert AAAA\nprint\n");
    let second = run_script(&mut controller, "insert AAAA\nprint\n");

    assert!(
        second.contains("INSERT: Cannot insert duplicate record \"AAAA\"."),
        "{second}"
    );
    // The print section (tree + free blocks) is byte-identical.
    let tail = |s: &str| s.split_once('\n').map(|(_, rest)| rest.to_owned()).unwrap();
    assert_eq!(tail(&first), tail(&second));
}

#[test]
fn shared_prefix_split_produces_internal_at_shared_depth() {
    let dir = tempfile::tempdir().unwrap();
    let mut controller = open_controller(&dir.path().join("s3.pool"), &scenario_config());

    run_script(&mut controller, "insert AAAA\ninsert AACG\n");
    let out = run_script(&mut controller, "print\n");

    // Internals at depths 0-2, both leaves under the shared AA path.
    assert!(out.starts_with("I\n  I\n    I\n      AAAA\n      AACG\n"), "{out}");
}

#[test]
fn remove_collapses_and_reclaims_space() {
    let dir = tempfile::tempdir().unwrap();
    let mut controller = open_controller(&dir.path().join("s4.pool"), &scenario_config());

    run_script(&mut controller, "insert AAAA\ninsert AACG\n");
    let out = run_script(&mut controller, "remove AAAA\nprint\n");

    assert!(out.contains("Deleted old record \"AAAA\""), "{out}");
    // The tree collapsed to the surviving leaf at the root.
    assert!(out.contains("AACG\nFree Blocks:"), "{out}");
    assert!(!out.contains("\nI\n"), "{out}");

    // Everything the engine still holds is reachable: boot record (28),
    // flyweight (3), the surviving leaf (9) and its one-byte payload (3);
    // every other byte of the pool is free again.
    let trie = controller.trie();
    assert_eq!(trie.len(), 1);
    let live_bytes = 28 + 3 + 9 + 3;
    assert_eq!(
        trie.manager().free_total() + live_bytes,
        trie.manager().pool_size() as u64
    );
}

#[test]
fn prefix_search_finds_survivors() {
    let dir = tempfile::tempdir().unwrap();
    let mut controller = open_controller(&dir.path().join("s5.pool"), &scenario_config());

    run_script(&mut controller, "insert AAAA\ninsert AACG\n");
    let both = run_script(&mut controller, "search AA\n");
    assert!(both.contains("sequence: AAAA"), "{both}");
    assert!(both.contains("sequence: AACG"), "{both}");

    let after = run_script(&mut controller, "remove AAAA\nsearch AA\n");
    assert!(after.contains("sequence: AACG"), "{after}");
    assert!(!after.contains("sequence: AAAA"), "{after}");
}

#[test]
fn sequences_persist_across_close_and_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("s6.pool");
    let config = scenario_config();

    let mut controller = open_controller(&path, &config);
    let out = run_script(&mut controller, "insert CGCG\ninsert AAAA\n");
    assert!(out.contains("Successfully inserted new record \"CGCG\""), "{out}");
    controller.close().unwrap();

    let mut controller = open_controller(&path, &config);
    let out = run_script(&mut controller, "search CGCG$\nsearch AA\n");
    assert!(out.contains("sequence: CGCG"), "{out}");
    assert!(out.contains("sequence: AAAA"), "{out}");
    controller.close().unwrap();
}

#[test]
fn print_is_idempotent_in_every_mode() {
    let dir = tempfile::tempdir().unwrap();
    let mut controller = open_controller(&dir.path().join("p7.pool"), &scenario_config());

    run_script(
        &mut controller,
        "insert ACGT\ninsert ACCA\ninsert TGCA\nsearch AC\n",
    );
    for mode in ["print", "print lengths", "print stats"] {
        let first = run_script(&mut controller, &format!("{mode}\n"));
        let second = run_script(&mut controller, &format!("{mode}\n"));
        assert_eq!(first, second, "{mode}");
    }
}

#[test]
fn flushed_pool_bytes_match_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("p8.pool");
    let config = scenario_config();

    let (mut manager, _) = MemManager::open(&path, &config).unwrap();
    let handle = manager.insert(b"raw payload bytes").unwrap().unwrap();
    manager.flush().unwrap();

    let mut contents = Vec::new();
    std::fs::File::open(&path)
        .unwrap()
        .read_to_end(&mut contents)
        .unwrap();
    let addr = handle.addr() as usize;
    assert_eq!(&contents[addr..addr + 2], &17u16.to_be_bytes());
    assert_eq!(&contents[addr + 2..addr + 19], b"raw payload bytes");
}

#[test]
fn growth_covers_inserts_larger_than_the_initial_pool() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig {
        pool_size: 64,
        block_size: 16,
        buffers: 4,
        ..StoreConfig::default()
    };
    let (manager, resume) = MemManager::open(&dir.path().join("grow.pool"), &config).unwrap();
    let mut trie = DnaTrie::open(manager, resume).unwrap();

    // 400 bases pack to 100 payload bytes: larger than the whole initial
    // pool, so several growth steps are required.
    let long_seq = DnaSequence::new(&"ACGT".repeat(100)).unwrap();
    assert!(matches!(
        trie.insert(&long_seq).unwrap(),
        InsertOutcome::Inserted { .. }
    ));

    assert!(trie.fetch(&long_seq).unwrap());
    assert!(trie.manager().pool_size() > 64);
}

#[test]
fn block_size_one_is_pathological_but_correct() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig {
        pool_size: 256,
        block_size: 1,
        buffers: 4,
        ..StoreConfig::default()
    };
    let path = dir.path().join("tiny.pool");
    let mut controller = open_controller(&path, &config);

    let out = run_script(
        &mut controller,
        "insert ACGT\ninsert AAAA\nsearch ACGT$\nremove AAAA\n",
    );
    assert!(out.contains("sequence: ACGT"), "{out}");
    assert!(out.contains("Deleted old record \"AAAA\""), "{out}");
    controller.close().unwrap();

    let mut controller = open_controller(&path, &config);
    let out = run_script(&mut controller, "search ACGT$\n");
    assert!(out.contains("sequence: ACGT"), "{out}");
}

#[test]
fn sequence_length_boundaries() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig {
        pool_size: 256,
        block_size: 4096,
        buffers: 8,
        ..StoreConfig::default()
    };
    let (manager, resume) = MemManager::open(&dir.path().join("b.pool"), &config).unwrap();
    let mut trie = DnaTrie::open(manager, resume).unwrap();

    // Exactly 65535 bases is accepted.
    let max_seq = DnaSequence::new(&"G".repeat(65535)).unwrap();
    assert!(matches!(
        trie.insert(&max_seq).unwrap(),
        InsertOutcome::Inserted { .. }
    ));
    assert!(trie.fetch(&max_seq).unwrap());

    // One more base is rejected.
    let over = DnaSequence::new(&"G".repeat(65536)).unwrap();
    assert_eq!(trie.insert(&over).unwrap(), InsertOutcome::InvalidSequence);

    // The empty sequence is rejected.
    let empty = DnaSequence::new("").unwrap();
    assert_eq!(trie.insert(&empty).unwrap(), InsertOutcome::InvalidSequence);
}

#[test]
fn conservation_holds_across_mixed_workload() {
    let dir = tempfile::tempdir().unwrap();
    let (manager, resume) =
        MemManager::open(&dir.path().join("mix.pool"), &scenario_config()).unwrap();
    let mut trie = DnaTrie::open(manager, resume).unwrap();

    let sequences = [
        "A", "ACGT", "ACGG", "TTTTTTTT", "GATTACA", "CCCC", "CGCG", "AACGT",
    ];
    for s in sequences {
        trie.insert(&DnaSequence::new(s).unwrap()).unwrap();
    }
    for s in ["ACGT", "CCCC", "A"] {
        trie.remove(&DnaSequence::new(s).unwrap()).unwrap();
    }

    // Free extents stay disjoint, ordered, and non-touching.
    let extents = trie.manager().free_extents();
    for pair in extents.windows(2) {
        assert!(pair[0].addr + pair[0].size < pair[1].addr, "{pair:?}");
    }

    // Every survivor is still retrievable, byte-exact.
    for s in ["ACGG", "TTTTTTTT", "GATTACA", "CGCG", "AACGT"] {
        let seq = DnaSequence::new(s).unwrap();
        assert!(trie.fetch(&seq).unwrap(), "{s}");
        let found = trie.search(&seq, true).unwrap();
        assert_eq!(found.matches, vec![s.to_owned()]);
    }

    // Renders agree before and after a flush.
    let before = trie.render(PrintMode::Lengths).unwrap();
    trie.manager_mut().flush().unwrap();
    let after = trie.render(PrintMode::Lengths).unwrap();
    assert_eq!(before, after);
}

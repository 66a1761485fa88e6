use patricia_rib_trie::{Family, Prefix, Tree};

mod common {
    use std::io::Write;

    pub fn init() {
        let _ = env_logger::builder()
            .format(|buf, record| writeln!(buf, "{}", record.args()))
            .is_test(true)
            .try_init();
    }
}

fn v4(bytes: [u8; 4], bitlen: u8) -> Prefix {
    Prefix::from_bytes(Family::V4, &bytes, bitlen).unwrap()
}

fn v6(bytes: [u8; 16], bitlen: u8) -> Prefix {
    Prefix::from_bytes(Family::V6, &bytes, bitlen).unwrap()
}

#[test]
fn best_and_worst_match_bracket_a_chain_of_supernets() {
    common::init();

    let mut tree: Tree<&'static str> = Tree::new();
    for (bytes, bitlen, label) in [
        ([10, 0, 0, 0], 8u8, "8"),
        ([10, 0, 0, 0], 16u8, "16a"),
        ([10, 1, 0, 0], 16u8, "16b"),
    ] {
        let h = tree.lookup(v4(bytes, bitlen)).unwrap();
        tree.set_data(h, label).unwrap();
    }

    let query = v4([10, 1, 2, 3], 32);
    let best = tree.search_best(query, true).unwrap();
    assert_eq!(*tree.data(best).unwrap(), "16b");

    let worst = tree.search_worst(query, true).unwrap();
    assert_eq!(*tree.data(worst).unwrap(), "8");

    assert!(tree.search_exact(v4([10, 0, 0, 0], 24)).is_none());
}

#[test]
fn default_routes_answer_every_query_in_their_family() {
    common::init();

    let mut tree: Tree<&'static str> = Tree::new();
    let v4_default = tree.lookup(v4([0, 0, 0, 0], 0)).unwrap();
    tree.set_data(v4_default, "v4-default").unwrap();
    let v6_default = tree.lookup(v6([0; 16], 0)).unwrap();
    tree.set_data(v6_default, "v6-default").unwrap();

    let mut seen = Vec::new();
    let mut iter = tree.iter();
    while let Some(h) = iter.next(&tree).unwrap() {
        seen.push(*tree.data(h).unwrap());
    }
    seen.sort_unstable();
    assert_eq!(seen, vec!["v4-default", "v6-default"]);

    let best_v4 = tree.search_best(v4([8, 8, 8, 8], 32), true).unwrap();
    assert_eq!(*tree.data(best_v4).unwrap(), "v4-default");

    let mut db8 = [0u8; 16];
    db8[0] = 0x20;
    db8[1] = 0x01;
    db8[2] = 0x0d;
    db8[3] = 0xb8;
    let best_v6 = tree.search_best(v6(db8, 32), true).unwrap();
    assert_eq!(*tree.data(best_v6).unwrap(), "v6-default");
}

#[test]
fn non_inclusive_best_match_skips_the_query_itself() {
    common::init();

    let mut tree: Tree<&'static str> = Tree::new();
    let parent = tree.lookup(v4([10, 0, 0, 0], 8)).unwrap();
    tree.set_data(parent, "parent").unwrap();
    let exact = tree.lookup(v4([10, 0, 0, 0], 16)).unwrap();
    tree.set_data(exact, "exact").unwrap();

    let query = v4([10, 0, 0, 0], 16);
    assert_eq!(tree.search_best(query, true), Some(exact));

    let best_non_inclusive = tree.search_best(query, false).unwrap();
    assert_eq!(*tree.data(best_non_inclusive).unwrap(), "parent");
}

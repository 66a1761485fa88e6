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

fn v6(bytes: [u8; 16], bitlen: u8) -> Prefix {
    Prefix::from_bytes(Family::V6, &bytes, bitlen).unwrap()
}

fn db8_with(third: u8, fourth: u8) -> [u8; 16] {
    let mut b = [0u8; 16];
    b[0] = 0x20;
    b[1] = 0x01;
    b[2] = 0x0d;
    b[3] = 0xb8;
    b[4] = third;
    b[5] = fourth;
    b
}

#[test]
fn covered_enumeration_respects_inclusive_flag() {
    common::init();

    let mut tree: Tree<&'static str> = Tree::new();
    let top = tree.lookup(v6(db8_with(0, 0), 32)).unwrap();
    tree.set_data(top, "top").unwrap();
    let first = tree.lookup(v6(db8_with(1, 0), 48)).unwrap();
    tree.set_data(first, "first").unwrap();
    let second = tree.lookup(v6(db8_with(2, 0), 48)).unwrap();
    tree.set_data(second, "second").unwrap();

    let query = v6(db8_with(0, 0), 32);

    let mut non_inclusive = Vec::new();
    tree.search_covered(query, false, |h| {
        non_inclusive.push(*tree.data(h).unwrap());
        0
    });
    non_inclusive.sort_unstable();
    assert_eq!(non_inclusive, vec!["first", "second"]);

    let mut inclusive = Vec::new();
    tree.search_covered(query, true, |h| {
        inclusive.push(*tree.data(h).unwrap());
        0
    });
    inclusive.sort_unstable();
    assert_eq!(inclusive, vec!["first", "second", "top"]);
}

#[test]
fn covering_enumeration_walks_ancestors_to_the_root() {
    common::init();

    let mut tree: Tree<&'static str> = Tree::new();
    let top = tree.lookup(v6(db8_with(0, 0), 32)).unwrap();
    tree.set_data(top, "top").unwrap();
    let mid = tree.lookup(v6(db8_with(1, 0), 48)).unwrap();
    tree.set_data(mid, "mid").unwrap();

    let query = v6(db8_with(1, 0), 64);
    let mut hits = Vec::new();
    tree.search_covering(query, |h| {
        hits.push(*tree.data(h).unwrap());
        0
    });
    assert_eq!(hits, vec!["mid", "top"]);
}

#[test]
fn covering_callback_abort_stops_the_walk() {
    common::init();

    let mut tree: Tree<&'static str> = Tree::new();
    let top = tree.lookup(v6(db8_with(0, 0), 32)).unwrap();
    tree.set_data(top, "top").unwrap();
    let mid = tree.lookup(v6(db8_with(1, 0), 48)).unwrap();
    tree.set_data(mid, "mid").unwrap();

    let query = v6(db8_with(1, 0), 64);
    let mut hits = Vec::new();
    let rc = tree.search_covering(query, |h| {
        hits.push(*tree.data(h).unwrap());
        1
    });
    assert_eq!(rc, 1);
    assert_eq!(hits, vec!["mid"]);
}

#[test]
fn intersect_combines_covering_and_covered() {
    common::init();

    let mut tree: Tree<&'static str> = Tree::new();
    let top = tree.lookup(v6(db8_with(0, 0), 32)).unwrap();
    tree.set_data(top, "top").unwrap();
    let first = tree.lookup(v6(db8_with(1, 0), 48)).unwrap();
    tree.set_data(first, "first").unwrap();

    let mut hits = Vec::new();
    tree.search_intersect(v6(db8_with(0, 0), 32), |h| {
        hits.push(*tree.data(h).unwrap());
        0
    });
    hits.sort_unstable();
    assert_eq!(hits, vec!["first", "top"]);
}

// Tests for referrer trie aggregation and navigation

use trackingcode_analytics::trie::{DEFAULT_LIMIT, NodeId, ReferrerExplorer, ReferrerTrie};
use trackingcode_analytics::{DIRECT, ReferrerRecord};

fn records(pairs: &[(&str, u64)]) -> Vec<ReferrerRecord> {
    pairs.iter().map(|&(a, c)| ReferrerRecord::new(a, c)).collect()
}

fn sample() -> Vec<ReferrerRecord> {
    records(&[
        ("https://a.com/x", 5),
        ("https://a.com/y", 3),
        (DIRECT, 2),
    ])
}

fn keys(explorer: &ReferrerExplorer) -> Vec<String> {
    explorer.current_rows().iter().map(|r| r.key.clone()).collect()
}

fn check_invariant(trie: &mut ReferrerTrie, id: NodeId) {
    let total = trie.node(id).total();
    let own = trie.own_count(id);
    let children = trie.children(id);
    let children_total: u64 = children.iter().map(|c| trie.node(*c).total()).sum();
    assert_eq!(total, own + children_total, "node {}", trie.node(id).key());
    for child in children {
        check_invariant(trie, child);
    }
}

// ============================================================================
// Build Tests
// ============================================================================

#[test]
fn test_top_level_groups_by_host() {
    let explorer = ReferrerExplorer::new(sample());
    let rows = explorer.current_rows();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].key, "a.com");
    assert_eq!(rows[0].total(), 8);
    assert_eq!(rows[1].key, DIRECT);
    assert_eq!(rows[1].total(), 2);
}

#[test]
fn test_own_and_deep_counts() {
    let explorer = ReferrerExplorer::new(records(&[
        ("https://a.com/", 4),
        ("https://a.com/blog/one", 6),
        ("https://a.com/blog/two", 1),
        ("https://b.org", 3),
    ]));
    let rows = explorer.current_rows();

    assert_eq!(rows[0].key, "a.com");
    assert_eq!(rows[0].own_count, 4);
    assert_eq!(rows[0].deep_count, 7);
    assert!(rows[0].drillable);

    assert_eq!(rows[1].key, "b.org");
    assert_eq!(rows[1].own_count, 3);
    assert_eq!(rows[1].deep_count, 0);
    assert!(!rows[1].drillable);
}

#[test]
fn test_count_invariant_holds_everywhere() {
    let mut trie = ReferrerTrie::build(records(&[
        ("https://a.com/", 1),
        ("https://a.com/a/b/c", 2),
        ("https://a.com/a/b", 3),
        ("https://a.com/a/d?x=1", 4),
        ("https://b.com/q", 5),
        (DIRECT, 6),
        ("garbage referrer", 7),
    ]));
    let roots = trie.roots().to_vec();
    for root in roots {
        check_invariant(&mut trie, root);
    }
}

#[test]
fn test_children_are_lazy() {
    let mut trie = ReferrerTrie::build(sample());
    let roots = trie.roots().to_vec();
    assert_eq!(trie.len(), 2);
    assert!(!trie.node(roots[0]).is_materialised());

    let children = trie.children(roots[0]);
    assert_eq!(children.len(), 2);
    assert!(trie.node(roots[0]).is_materialised());
    assert_eq!(trie.len(), 4);

    // second call reuses the cached partition
    assert_eq!(trie.children(roots[0]), children);
    assert_eq!(trie.len(), 4);
}

#[test]
fn test_representative_url_is_first_record() {
    let trie = ReferrerTrie::build(records(&[
        ("https://a.com/first", 1),
        ("https://a.com/second", 10),
    ]));
    let root = trie.roots()[0];
    assert_eq!(
        trie.node(root).representative_url(),
        Some("https://a.com/first")
    );
}

#[test]
fn test_direct_and_malformed_have_no_link() {
    let explorer = ReferrerExplorer::new(records(&[
        (DIRECT, 3),
        ("android-app://com.example", 0),
        ("::not a url::", 2),
        ("::not a url::", 1),
    ]));
    let rows = explorer.current_rows();

    let direct = rows.iter().find(|r| r.key == DIRECT).unwrap();
    assert_eq!(direct.representative_url, None);
    assert!(!direct.drillable);

    let malformed = rows.iter().find(|r| r.key == "::not a url::").unwrap();
    assert_eq!(malformed.total(), 3);
    assert_eq!(malformed.representative_url, None);
}

#[test]
fn test_link_strips_query() {
    let explorer = ReferrerExplorer::new(records(&[("https://t.co/abc?utm=1", 1)]));
    assert_eq!(explorer.current_rows()[0].link(), Some("https://t.co/abc"));
}

#[test]
fn test_empty_input() {
    let explorer = ReferrerExplorer::new(Vec::new());
    let view = explorer.view(DEFAULT_LIMIT, false);
    assert!(view.rows.is_empty());
    assert!(!view.has_more);
    assert!(!view.can_drill_up);
}

// ============================================================================
// Ordering and Truncation Tests
// ============================================================================

#[test]
fn test_ties_keep_insertion_order() {
    let explorer = ReferrerExplorer::new(records(&[
        ("https://c.com", 1),
        ("https://a.com", 5),
        ("https://b.com", 1),
        ("https://d.com", 1),
    ]));
    assert_eq!(keys(&explorer), vec!["a.com", "c.com", "b.com", "d.com"]);
}

#[test]
fn test_truncation_and_has_more() {
    let many: Vec<ReferrerRecord> = (0..20)
        .map(|i| ReferrerRecord::new(format!("https://site{}.com/", i), 100 - i))
        .collect();
    let explorer = ReferrerExplorer::new(many);

    let view = explorer.view(DEFAULT_LIMIT, false);
    assert_eq!(view.rows.len(), 12);
    assert!(view.has_more);
    assert_eq!(view.rows[0].key, "site0.com");
    assert_eq!(view.rows[11].key, "site11.com");

    let expanded = explorer.view(DEFAULT_LIMIT, true);
    assert_eq!(expanded.rows.len(), 20);
    assert!(expanded.has_more);
    assert_eq!(&expanded.rows[..12], &view.rows[..]);
}

#[test]
fn test_truncation_is_idempotent() {
    let many: Vec<ReferrerRecord> = (0..30)
        .map(|i| ReferrerRecord::new(format!("https://h{}.net/p", i), (i % 4) as u64))
        .collect();
    let explorer = ReferrerExplorer::new(many);

    let first = explorer.view(DEFAULT_LIMIT, false);
    let second = explorer.view(DEFAULT_LIMIT, false);
    assert_eq!(first, second);
}

#[test]
fn test_exactly_limit_rows_has_no_more() {
    let exact: Vec<ReferrerRecord> = (0..12)
        .map(|i| ReferrerRecord::new(format!("https://x{}.io", i), 1))
        .collect();
    let view = ReferrerExplorer::new(exact).view(DEFAULT_LIMIT, false);
    assert_eq!(view.rows.len(), 12);
    assert!(!view.has_more);
}

// ============================================================================
// Navigation Tests
// ============================================================================

#[test]
fn test_drill_down_shows_path_segments() {
    let mut explorer = ReferrerExplorer::new(sample());
    assert!(explorer.drill_down("a.com"));

    let view = explorer.view(DEFAULT_LIMIT, false);
    assert!(view.can_drill_up);
    assert_eq!(view.path, vec!["a.com"]);
    assert_eq!(keys(&explorer), vec!["x", "y"]);
    assert_eq!(view.rows[0].total(), 5);
    assert_eq!(
        view.rows[0].representative_url.as_deref(),
        Some("https://a.com/x")
    );
}

#[test]
fn test_drill_up_inverts_drill_down() {
    let mut explorer = ReferrerExplorer::new(records(&[
        ("https://a.com/one/two", 3),
        ("https://a.com/one", 2),
        ("https://b.com/", 4),
        (DIRECT, 9),
    ]));
    let before = explorer.view(DEFAULT_LIMIT, false);

    assert!(explorer.drill_down("a.com"));
    assert!(explorer.drill_down("one"));
    assert_eq!(explorer.depth(), 2);
    assert_eq!(keys(&explorer), vec!["two"]);

    assert!(explorer.drill_up());
    assert!(explorer.drill_up());
    assert_eq!(explorer.view(DEFAULT_LIMIT, false), before);
}

#[test]
fn test_leaf_and_unknown_are_not_drillable() {
    let mut explorer = ReferrerExplorer::new(sample());
    let before = keys(&explorer);

    assert!(!explorer.drill_down(DIRECT));
    assert!(!explorer.drill_down("nope.com"));
    assert_eq!(keys(&explorer), before);
    assert_eq!(explorer.depth(), 0);
}

#[test]
fn test_drill_up_at_root_is_noop() {
    let mut explorer = ReferrerExplorer::new(sample());
    assert!(!explorer.drill_up());
    assert_eq!(keys(&explorer), vec!["a.com", DIRECT]);
}

#[test]
fn test_deeper_levels_keep_invariant_in_rows() {
    let mut explorer = ReferrerExplorer::new(records(&[
        ("https://a.com/docs", 2),
        ("https://a.com/docs/intro", 3),
        ("https://a.com/docs/api/v1", 4),
    ]));
    assert!(explorer.drill_down("a.com"));
    let docs = explorer.current_rows()[0].clone();
    assert_eq!(docs.key, "docs");
    assert_eq!(docs.own_count, 2);
    assert_eq!(docs.deep_count, 7);

    assert!(explorer.drill_down("docs"));
    let rows = explorer.current_rows();
    assert_eq!(rows[0].key, "api");
    assert!(rows[0].drillable);
    assert_eq!(rows[1].key, "intro");
    assert!(!rows[1].drillable);
}

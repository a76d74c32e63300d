// Tests for referrer colour assignment

use rand::rngs::mock::StepRng;
use trackingcode_analytics::DIRECT;
use trackingcode_analytics::colour::{
    ColourAssignor, ColourThresholds, Rgb, SharedColourAssignor, identity_of, levenshtein, mirror,
};

// ============================================================================
// Identity Tests
// ============================================================================

#[test]
fn test_identity_uses_host() {
    assert_eq!(identity_of("https://a.com/x"), "a.com");
    assert_eq!(identity_of("https://a.com/y?z=1"), "a.com");
    assert_eq!(identity_of(DIRECT), DIRECT);
    assert_eq!(identity_of("just words"), "just words");
}

#[test]
fn test_same_host_shares_colour() {
    let mut assignor = ColourAssignor::with_seed(7);
    let x = assignor.colour_for("https://a.com/x");
    let y = assignor.colour_for("https://a.com/y");
    assert_eq!(x, y);
    assert_eq!(assignor.len(), 1);
}

// ============================================================================
// Determinism Tests
// ============================================================================

#[test]
fn test_colour_is_stable_within_session() {
    let mut assignor = ColourAssignor::new();
    let first = assignor.colour_for("a.com");
    let second = assignor.colour_for("a.com");
    assert_eq!(first, second);
    assert_eq!(assignor.cached("a.com"), Some(first));
}

#[test]
fn test_seeded_assignors_agree() {
    let referrers = ["https://google.com", "https://google.de", DIRECT, "https://news.ycombinator.com"];
    let mut a = ColourAssignor::with_seed(42);
    let mut b = ColourAssignor::with_seed(42);
    for referrer in referrers {
        assert_eq!(a.colour_for(referrer), b.colour_for(referrer));
    }
}

#[test]
fn test_far_identities_get_fresh_colours() {
    let mut assignor = ColourAssignor::with_seed(3);
    let first = assignor.colour_for("duckduckgo.com");
    let second = assignor.colour_for("x.io");
    assert!(levenshtein("duckduckgo.com", "x.io") > 7);
    assert_eq!(assignor.len(), 2);
    // both are valid colours that round-trip through hex
    assert_eq!(first.to_hex().parse::<Rgb>().unwrap(), first);
    assert_eq!(second.to_hex().parse::<Rgb>().unwrap(), second);
}

#[test]
fn test_reset_empties_cache() {
    let mut assignor = ColourAssignor::with_seed(1);
    assignor.colour_for("a.com");
    assignor.colour_for("b.com");
    assert_eq!(assignor.len(), 2);

    assignor.reset();
    assert!(assignor.is_empty());
    assert_eq!(assignor.cached("a.com"), None);
}

// ============================================================================
// Similarity Tests
// ============================================================================

fn assert_close(actual: f64, expected: f64, what: &str) {
    assert!(
        (actual - expected).abs() < 0.02,
        "{}: expected {} got {}",
        what,
        expected,
        actual
    );
}

#[test]
fn test_close_identity_is_nudged_from_its_neighbour() {
    // all-zero randomness leaves only the distance-scaled part of the nudge
    let mut assignor = ColourAssignor::with_rng(StepRng::new(0, 0));
    let base = assignor.colour_for("a.com");
    let near = assignor.colour_for("b.com");
    assert_eq!(levenshtein("a.com", "b.com"), 1);

    let (bh, bs, bv) = base.to_hsv();
    let step = |c: f64| if c > 0.5 { c - 0.1 } else { c + 0.1 };
    let (nh, ns, nv) = near.to_hsv();
    assert_close(nh, mirror(bh + 0.1), "hue");
    assert_close(ns, mirror(step(bs)), "saturation");
    assert_close(nv, mirror(step(bv)), "value");
}

#[test]
fn test_nudge_grows_with_distance() {
    let mut assignor = ColourAssignor::with_rng(StepRng::new(0, 0));
    let base = assignor.colour_for("abcdef.com");
    let far = assignor.colour_for("abcxyz.com");
    assert_eq!(levenshtein("abcdef.com", "abcxyz.com"), 3);

    let (bh, _, _) = base.to_hsv();
    let (fh, _, _) = far.to_hsv();
    assert_close(fh, mirror(bh + 0.3), "hue");
}

#[test]
fn test_custom_thresholds_force_fresh_colours() {
    let thresholds = ColourThresholds { near: 0, far: 0 };
    let mut assignor = ColourAssignor::with_seed(5).with_thresholds(thresholds);
    assignor.colour_for("a.com");
    assignor.colour_for("b.com");
    assert_eq!(assignor.thresholds(), thresholds);
    assert_eq!(assignor.len(), 2);
}

#[test]
fn test_shared_assignor_across_threads() {
    let shared = SharedColourAssignor::new(ColourAssignor::with_seed(9));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let shared = shared.clone();
            std::thread::spawn(move || shared.colour_for("https://a.com/x"))
        })
        .collect();
    let colours: Vec<Rgb> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert!(colours.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(shared.len(), 1);
    shared.reset();
    assert!(shared.is_empty());
}

// ============================================================================
// Mirroring Tests
// ============================================================================

#[test]
fn test_mirror_in_range_is_identity() {
    for value in [0.0, 0.25, 0.5, 1.0] {
        assert_eq!(mirror(value), value);
    }
}

#[test]
fn test_mirror_reflects_overflow() {
    assert!((mirror(1.25) - 0.75).abs() < 1e-12);
    assert!((mirror(-0.25) - 0.75).abs() < 1e-9);
}

#[test]
fn test_mirror_bounds_for_pathological_values() {
    let values = [
        1.0000001,
        -0.0000001,
        7.3,
        -7.3,
        -999.5,
        -1000.0,
        -123456.789,
        1e12,
        -1e12,
        f64::MAX,
        f64::MIN,
        f64::INFINITY,
        f64::NEG_INFINITY,
        f64::NAN,
    ];
    for value in values {
        let m = mirror(value);
        assert!((0.0..=1.0).contains(&m), "mirror({}) = {}", value, m);
    }
}

// ============================================================================
// Hex Tests
// ============================================================================

#[test]
fn test_hex_parsing() {
    assert_eq!("#4791AE".parse::<Rgb>().unwrap(), Rgb::new(0x47, 0x91, 0xae));
    assert_eq!("fff".parse::<Rgb>().unwrap(), Rgb::new(255, 255, 255));
    assert_eq!(Rgb::new(1, 2, 3).to_string(), "#010203");
    assert!("#12345".parse::<Rgb>().is_err());
    assert!("#gggggg".parse::<Rgb>().is_err());
}

#[test]
fn test_rgb_serializes_as_hex() {
    let json = serde_json::to_string(&Rgb::new(0xea, 0x86, 0x76)).unwrap();
    assert_eq!(json, "\"#ea8676\"");
    let back: Rgb = serde_json::from_str(&json).unwrap();
    assert_eq!(back, Rgb::new(0xea, 0x86, 0x76));
}

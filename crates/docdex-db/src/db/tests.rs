use super::queries::{ancestor_roots, packages_from_triples};
use super::popularity::scaled_time;
use super::{Kind, Package};
use chrono::{Duration, Utc};

fn triples(rows: &[(&str, &str, &str)]) -> Vec<Option<String>> {
    rows.iter()
        .flat_map(|(p, s, k)| {
            [
                Some(p.to_string()),
                Some(s.to_string()),
                Some(k.to_string()),
            ]
        })
        .collect()
}

#[test]
fn triples_parse_and_filter_directories() {
    let values = triples(&[
        ("example.com/a", "Package a.", "p"),
        ("example.com/a/internal", "", "d"),
        ("example.com/a/cmd", "A tool.", "c"),
    ]);

    let pkgs = packages_from_triples(values.clone(), false);
    assert_eq!(pkgs.len(), 2);
    assert_eq!(pkgs[0].path, "example.com/a");
    assert_eq!(pkgs[0].kind, Kind::Package);
    assert_eq!(pkgs[1].kind, Kind::Command);

    let all = packages_from_triples(values, true);
    assert_eq!(all.len(), 3);
    assert_eq!(all[1].kind, Kind::Directory);
}

#[test]
fn triples_skip_dangling_entries() {
    // A record deleted between the set read and the hash fetch comes back
    // as a nil path.
    let mut values = triples(&[("example.com/a", "", "p")]);
    values.extend([None, None, None]);
    let pkgs = packages_from_triples(values, false);
    assert_eq!(pkgs.len(), 1);
}

#[test]
fn c_pseudo_package_gets_a_synopsis() {
    let pkgs = packages_from_triples(triples(&[("C", "", "p")]), false);
    assert!(pkgs[0].synopsis.contains("pseudo-package"));
}

#[test]
fn unknown_kind_survives_filtering() {
    let pkgs = packages_from_triples(triples(&[("example.com/x", "", "u")]), false);
    assert_eq!(pkgs.len(), 1);
    assert_eq!(pkgs[0].kind, Kind::Unknown);
}

#[test]
fn kind_round_trips() {
    for kind in [Kind::Package, Kind::Command, Kind::Directory, Kind::Unknown] {
        assert_eq!(Kind::parse(kind.as_str()), kind);
    }
    assert_eq!(Kind::parse("weird"), Kind::Unknown);
}

#[test]
fn package_serializes_compactly() {
    let pkg = Package::new("example.com/a");
    assert_eq!(
        serde_json::to_string(&pkg).unwrap(),
        r#"{"path":"example.com/a"}"#
    );

    let pkg = Package {
        path: "example.com/a".into(),
        synopsis: "Package a.".into(),
        kind: Kind::Package,
    };
    assert_eq!(
        serde_json::to_string(&pkg).unwrap(),
        r#"{"path":"example.com/a","synopsis":"Package a.","kind":"p"}"#
    );
}

#[test]
fn ancestor_roots_chop_at_most_four_times() {
    assert_eq!(
        ancestor_roots("a.com/b/c/d/e/f"),
        vec!["a.com/b/c/d/e/f", "a.com/b/c/d/e", "a.com/b/c/d", "a.com/b/c", "a.com/b"]
    );
    assert_eq!(ancestor_roots("a.com/b"), vec!["a.com/b", "a.com"]);
    assert_eq!(ancestor_roots("a.com"), vec!["a.com"]);
}

#[test]
fn scaled_time_advances_one_ln2_per_half_life() {
    let t0 = Utc::now();
    let week = 7 * 24 * 3600;
    let tau0 = scaled_time(t0, week);
    let tau1 = scaled_time(t0 + Duration::days(7), week);
    assert!((tau1 - tau0 - std::f64::consts::LN_2).abs() < 1e-9);
    // an event one half-life later carries twice the weight
    assert!(((tau1 - tau0).exp() - 2.0).abs() < 1e-9);
}

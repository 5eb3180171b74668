// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn from_entry_parses_key_value() {
    let var = Variable::from_entry("FOO=bar").unwrap();
    assert_eq!(var.key, "FOO");
    assert_eq!(var.value, "bar");
    assert!(var.public);
    assert!(var.internal);
}

#[test]
fn from_entry_keeps_equals_in_value() {
    let var = Variable::from_entry("FOO=a=b").unwrap();
    assert_eq!(var.value, "a=b");
}

#[test]
fn from_entry_rejects_malformed_entries() {
    assert!(Variable::from_entry("NOVALUE").is_none());
    assert!(Variable::from_entry("=bar").is_none());
}

#[test]
fn get_returns_last_match() {
    let vars: Variables =
        vec![Variable::new("KEY", "first"), Variable::new("KEY", "second")].into();
    assert_eq!(vars.get("KEY"), Some("second"));
    assert_eq!(vars.get("MISSING"), None);
}

#[test]
fn expand_substitutes_plain_and_braced_references() {
    let vars: Variables = vec![
        Variable::new("HOST", "example.com"),
        Variable::new("URL", "https://$HOST/path"),
        Variable::new("NAME", "pre-${HOST}-post"),
    ]
    .into();
    let expanded = vars.expand();
    assert_eq!(expanded.get("URL"), Some("https://example.com/path"));
    assert_eq!(expanded.get("NAME"), Some("pre-example.com-post"));
}

#[test]
fn expand_unknown_key_is_empty() {
    let vars: Variables = vec![Variable::new("A", "x$MISSINGy")].into();
    // $MISSINGy is one key (MISSINGy); whole reference vanishes
    assert_eq!(vars.expand().get("A"), Some("x"));
}

#[test]
fn expand_dollar_escapes() {
    let vars: Variables = vec![Variable::new("A", "cost: $$5 and a lone $")].into();
    assert_eq!(vars.expand().get("A"), Some("cost: $5 and a lone $"));
}

#[test]
fn expand_is_single_pass() {
    // B references A whose raw value itself contains a reference; expansion
    // resolves against raw values, not already-expanded ones.
    let vars: Variables =
        vec![Variable::new("A", "$C"), Variable::new("B", "$A"), Variable::new("C", "deep")].into();
    assert_eq!(vars.expand().get("B"), Some("$C"));
}

#[test]
fn later_entries_shadow_in_expansion() {
    let vars: Variables = vec![
        Variable::new("DIR", "/runner"),
        Variable::new("DIR", "/job"),
        Variable::new("OUT", "$DIR/out"),
    ]
    .into();
    assert_eq!(vars.expand().get("OUT"), Some("/job/out"));
}

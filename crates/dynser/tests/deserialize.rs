//! Integration tests for string to properties conversion.

use dynser::{Converter, DeserializeErrorKind, props};

fn converter(schema: &str) -> Converter {
    let mut converter = Converter::new();
    converter.load_config_str(schema).unwrap();
    converter
}

const SCHEMA: &str = r#"
tags:
  point:
    continual:
      - linear: { pattern: "{x}", fields: { 1: x } }
      - linear: { pattern: ",{y}", fields: { 1: y } }
  segment:
    continual:
      - existing: { tag: point, prefix: from }
      - linear: { pattern: "-" }
      - existing: { tag: point, prefix: to }
  range:
    continual:
      - linear: { pattern: "(\\d+)-(\\d+)", fields: { 1: lo, 2: hi } }
  name:
    continual:
      - linear: { pattern: " {n}", fields: { 1: n } }
  greeting:
    continual:
      - linear: { pattern: "hello" }
      - existing: { tag: name, required: false }
  sign:
    branched:
      script: "BRANCH = parse_int(INPUT_TABLE.n);"
      rules:
        - linear: { pattern: "zero" }
        - linear: { pattern: "one:{v}", fields: { 1: v } }
  list:
    recurrent:
      - linear: { pattern: "{v}", fields: { 1: v } }
      - infix: { pattern: "," }
  entries:
    recurrent_dict: { key: items, tag: point }
  wrapped_list:
    continual:
      - linear: { pattern: "[" }
      - existing: { tag: list }
      - linear: { pattern: "]" }
"#;

// =============================================================================
// Continual
// =============================================================================

#[test]
fn point_round_trips() {
    let mut converter = converter(SCHEMA);
    let props = props! { "x" => "3", "y" => "4" };
    let text = converter.convert("point", &props).unwrap();
    assert_eq!(converter.convert_back("point", &text).unwrap(), props);
}

#[test]
fn character_classes_constrain_captures() {
    let mut converter = converter(SCHEMA);
    assert_eq!(
        converter.convert_back("range", "10-20").unwrap(),
        props! { "lo" => "10", "hi" => "20" }
    );

    let err = converter.convert_back("range", "10-x").unwrap_err();
    assert_eq!(
        err.kind,
        DeserializeErrorKind::NoMatch {
            tag: "range".to_string()
        }
    );
    assert_eq!(err.scope, "10-x");
}

#[test]
fn existing_rule_prefixes_are_restored() {
    let mut converter = converter(SCHEMA);
    assert_eq!(
        converter.convert_back("segment", "1,2-3,4").unwrap(),
        props! {
            "from.x" => "1",
            "from.y" => "2",
            "to.x" => "3",
            "to.y" => "4",
        }
    );
}

#[test]
fn optional_existing_rule_may_be_absent() {
    let mut converter = converter(SCHEMA);
    assert_eq!(converter.convert_back("greeting", "hello").unwrap(), props! {});
    assert_eq!(
        converter.convert_back("greeting", "hello bob").unwrap(),
        props! { "n" => "bob" }
    );
}

// =============================================================================
// Branched and recurrent
// =============================================================================

#[test]
fn first_matching_branch_wins() {
    let mut converter = converter(SCHEMA);
    assert_eq!(converter.convert_back("sign", "zero").unwrap(), props! {});
    assert_eq!(
        converter.convert_back("sign", "one:x").unwrap(),
        props! { "v" => "x" }
    );
    assert!(matches!(
        converter.convert_back("sign", "two").unwrap_err().kind,
        DeserializeErrorKind::NoMatch { .. }
    ));
}

#[test]
fn recurrent_text_becomes_lists() {
    let mut converter = converter(SCHEMA);
    assert_eq!(
        converter.convert_back("list", "1,2,3").unwrap(),
        props! { "v" => vec!["1", "2", "3"] }
    );
    assert_eq!(
        converter.convert_back("list", "7").unwrap(),
        props! { "v" => vec!["7"] }
    );
}

#[test]
fn list_round_trips() {
    let mut converter = converter(SCHEMA);
    let props = props! { "v" => vec!["a", "bb", "c"] };
    let text = converter.convert("list", &props).unwrap();
    assert_eq!(converter.convert_back("list", &text).unwrap(), props);
}

// =============================================================================
// Scripts
// =============================================================================

#[test]
fn deserialization_script_rebuilds_properties() {
    let mut converter = converter(
        r#"
tags:
  celsius:
    serialization_script: 'OUTPUT_TABLE.v = INPUT_TABLE.value;'
    deserialization_script: 'OUTPUT_TABLE.value = INPUT_TABLE.v; CONTEXT.seen = "yes";'
    continual:
      - linear: { pattern: "{v}C", fields: { 1: v } }
"#,
    );
    let text = converter
        .convert("celsius", &props! { "value" => "21" })
        .unwrap();
    assert_eq!(text, "21C");
    assert_eq!(
        converter.convert_back("celsius", &text).unwrap(),
        props! { "value" => "21" }
    );
    assert_eq!(converter.context().get("seen"), Some(&"yes".into()));
}

#[test]
fn dynamic_group_matches_context_pattern() {
    let mut converter = converter(
        r#"
tags:
  length:
    continual:
      - linear: { pattern: "{n}{unit}", fields: { 1: n }, dyn_groups: { 2: unit_pattern } }
"#,
    );
    converter.context_mut().insert("unit_pattern", "px");
    assert_eq!(
        converter.convert_back("length", "12px").unwrap(),
        props! { "n" => "12" }
    );
}

// =============================================================================
// Unsupported constructs and lookup
// =============================================================================

#[test]
fn recurrent_dict_cannot_be_matched() {
    let mut converter = converter(SCHEMA);
    let err = converter.convert_back("entries", "1,2").unwrap_err();
    insta::assert_snapshot!(
        err.to_string(),
        @"cannot match recurrent_dict tag 'entries' back to properties"
    );
}

#[test]
fn nested_recurrent_tag_cannot_be_matched() {
    let mut converter = converter(SCHEMA);
    let err = converter.convert_back("wrapped_list", "[1,2]").unwrap_err();
    assert!(matches!(err.kind, DeserializeErrorKind::Unsupported { .. }));
    assert_eq!(err.trace.len(), 1);
    assert_eq!(err.trace[0].tag, "wrapped_list");
    assert_eq!(err.trace[0].rule_index, 1);
}

#[test]
fn unknown_tag_suggests_close_names() {
    let mut converter = converter(SCHEMA);
    let err = converter.convert_back("lits", "1").unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"tag not found: 'lits', did you mean: list?");
}

#[test]
fn convert_back_without_schema_fails() {
    let mut converter = Converter::new();
    let err = converter.convert_back("point", "3,4").unwrap_err();
    assert_eq!(err.kind, DeserializeErrorKind::ConfigNotLoaded);
}

#[test]
fn invalid_pattern_is_reported() {
    let mut converter = converter(
        r#"
tags:
  broken:
    continual:
      - linear: { pattern: "(abc" }
"#,
    );
    let err = converter.convert_back("broken", "abc").unwrap_err();
    assert!(matches!(err.kind, DeserializeErrorKind::Pattern { .. }));
}

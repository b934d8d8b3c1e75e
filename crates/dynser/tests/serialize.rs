//! Integration tests for properties to string conversion.

use dynser::{Converter, SerializeErrorKind, props};

fn converter(schema: &str) -> Converter {
    let mut converter = Converter::new();
    converter.load_config_str(schema).unwrap();
    converter
}

const POINT: &str = r#"
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
"#;

// =============================================================================
// Continual
// =============================================================================

#[test]
fn point_concatenates_leaf_outputs() {
    let mut converter = converter(POINT);
    let text = converter
        .convert("point", &props! { "x" => "3", "y" => "4" })
        .unwrap();
    assert_eq!(text, "3,4");
}

#[test]
fn unused_properties_are_ignored() {
    let mut converter = converter(POINT);
    let text = converter
        .convert("point", &props! { "x" => "3", "y" => "4", "z" => "5" })
        .unwrap();
    assert_eq!(text, "3,4");
}

#[test]
fn missing_field_fails_with_one_breadcrumb() {
    let mut converter = converter(POINT);
    let err = converter
        .convert("point", &props! { "x" => "3" })
        .unwrap_err();
    assert_eq!(
        err.kind,
        SerializeErrorKind::ScriptVariableNotFound {
            name: "y".to_string()
        }
    );
    assert_eq!(err.trace.len(), 1);
    assert_eq!(err.trace[0].tag, "point");
    assert_eq!(err.trace[0].rule_index, 1);
    assert_eq!(err.scope, props! { "x" => "3" });
    insta::assert_snapshot!(err.to_string(), @"in tag 'point', rule 1: script variable not found: 'y'");
}

#[test]
fn existing_rules_strip_their_prefix() {
    let mut converter = converter(POINT);
    let text = converter
        .convert(
            "segment",
            &props! {
                "from.x" => "1",
                "from.y" => "2",
                "to.x" => "3",
                "to.y" => "4",
            },
        )
        .unwrap();
    assert_eq!(text, "1,2-3,4");
}

#[test]
fn keys_under_the_referenced_tag_name_take_precedence() {
    let mut converter = converter(
        r#"
tags:
  point:
    continual:
      - linear: { pattern: "{x}", fields: { 1: x } }
  wrapper:
    continual:
      - linear: { pattern: "<" }
      - existing: { tag: point }
      - linear: { pattern: ">" }
"#,
    );
    let text = converter
        .convert("wrapper", &props! { "x" => "1", "point.x" => "9" })
        .unwrap();
    assert_eq!(text, "<9>");
}

#[test]
fn static_pattern_needs_no_properties() {
    let mut converter = converter(
        r#"
tags:
  hello:
    continual:
      - linear: { pattern: "hello\\, world" }
"#,
    );
    assert_eq!(converter.convert("hello", &props! {}).unwrap(), "hello, world");
}

// =============================================================================
// Existing rules: required and optional
// =============================================================================

const GREETING: &str = r#"
tags:
  name:
    continual:
      - linear: { pattern: " {n}", fields: { 1: n } }
  greeting:
    continual:
      - linear: { pattern: "hello" }
      - existing: { tag: name, required: false }
  strict:
    continual:
      - linear: { pattern: "hello" }
      - existing: { tag: name }
"#;

#[test]
fn optional_existing_rule_yields_empty_string() {
    let mut converter = converter(GREETING);
    assert_eq!(converter.convert("greeting", &props! {}).unwrap(), "hello");
}

#[test]
fn optional_existing_rule_renders_when_fields_exist() {
    let mut converter = converter(GREETING);
    let text = converter
        .convert("greeting", &props! { "n" => "bob" })
        .unwrap();
    assert_eq!(text, "hello bob");
}

#[test]
fn required_existing_rule_propagates_with_breadcrumbs() {
    let mut converter = converter(GREETING);
    let err = converter.convert("strict", &props! {}).unwrap_err();
    assert_eq!(err.trace.len(), 2);
    insta::assert_snapshot!(
        err.to_string(),
        @"in tag 'strict', rule 1 -> in tag 'name', rule 0: script variable not found: 'n'"
    );
}

#[test]
fn optional_existing_rule_does_not_hide_other_failures() {
    let mut converter = converter(
        r#"
tags:
  broken:
    serialization_script: "throw \"bad input\";"
    continual:
      - linear: { pattern: "{n}", fields: { 1: n } }
  outer:
    continual:
      - existing: { tag: broken, required: false }
"#,
    );
    let err = converter
        .convert("outer", &props! { "n" => "1" })
        .unwrap_err();
    assert!(matches!(err.kind, SerializeErrorKind::ScriptError { .. }));
    assert_eq!(err.trace.len(), 1);
}

const CHAIN: &str = r#"
tags:
  node:
    continual:
      - linear: { pattern: "{v}", fields: { 1: v } }
      - existing: { tag: node, prefix: next, required: false }
"#;

#[test]
fn optional_self_reference_ends_at_first_missing_level() {
    let mut converter = converter(CHAIN);
    let text = converter
        .convert("node", &props! { "v" => "1", "next.v" => "2" })
        .unwrap();
    assert_eq!(text, "12");
}

#[test]
fn optional_self_reference_follows_every_prefixed_level() {
    let mut converter = converter(CHAIN);
    let text = converter
        .convert(
            "node",
            &props! { "v" => "a", "next.v" => "b", "next.next.v" => "c" },
        )
        .unwrap();
    assert_eq!(text, "abc");
}

#[test]
fn prefixed_existing_rule_does_not_see_parent_keys() {
    let mut converter = converter(
        r#"
tags:
  name:
    continual:
      - linear: { pattern: " {n}", fields: { 1: n } }
  greeting:
    continual:
      - linear: { pattern: "hello" }
      - existing: { tag: name, prefix: who, required: false }
"#,
    );
    assert_eq!(
        converter.convert("greeting", &props! { "n" => "bob" }).unwrap(),
        "hello"
    );
    assert_eq!(
        converter
            .convert("greeting", &props! { "who.n" => "bob" })
            .unwrap(),
        "hello bob"
    );
}

// =============================================================================
// Branched
// =============================================================================

const SIGN: &str = r#"
tags:
  sign:
    branched:
      script: "BRANCH = parse_int(INPUT_TABLE.n);"
      rules:
        - linear: { pattern: "zero" }
        - linear: { pattern: "one:{v}", fields: { 1: v } }
  silent:
    branched:
      script: "let unused = 1;"
      rules:
        - linear: { pattern: "never" }
"#;

#[test]
fn branching_script_selects_rule() {
    let mut converter = converter(SIGN);
    assert_eq!(converter.convert("sign", &props! { "n" => "0" }).unwrap(), "zero");
    assert_eq!(
        converter
            .convert("sign", &props! { "n" => "1", "v" => "x" })
            .unwrap(),
        "one:x"
    );
}

#[test]
fn unset_branch_fails() {
    let mut converter = converter(SIGN);
    let err = converter.convert("silent", &props! {}).unwrap_err();
    assert_eq!(err.kind, SerializeErrorKind::BranchNotSet);
    assert!(err.trace.is_empty());

    let err = converter
        .convert("sign", &props! { "n" => "-1" })
        .unwrap_err();
    assert_eq!(err.kind, SerializeErrorKind::BranchNotSet);
}

#[test]
fn out_of_bounds_branch_reports_last_index() {
    let mut converter = converter(SIGN);
    let err = converter
        .convert("sign", &props! { "n" => "2" })
        .unwrap_err();
    assert_eq!(
        err.kind,
        SerializeErrorKind::BranchOutOfBounds {
            selected: 2,
            max: 1
        }
    );
    insta::assert_snapshot!(err.to_string(), @"branch 2 selected, but the last branch is 1");
}

#[test]
fn negative_branch_is_out_of_bounds() {
    let mut converter = converter(SIGN);
    let err = converter
        .convert("sign", &props! { "n" => "-3" })
        .unwrap_err();
    assert!(matches!(
        err.kind,
        SerializeErrorKind::BranchOutOfBounds { selected: -3, .. }
    ));
}

#[test]
fn failing_branch_carries_branch_index() {
    let mut converter = converter(SIGN);
    let err = converter
        .convert("sign", &props! { "n" => "1" })
        .unwrap_err();
    assert_eq!(err.trace[0].tag, "sign");
    assert_eq!(err.trace[0].rule_index, 1);
}

// =============================================================================
// Recurrent
// =============================================================================

const LIST: &str = r#"
tags:
  list:
    recurrent:
      - linear: { pattern: "{v}", fields: { 1: v } }
      - infix: { pattern: "," }
  tagged:
    recurrent:
      - linear: { pattern: "{p}{v}", fields: { 1: p, 2: v } }
      - infix: { pattern: ";" }
  pairs:
    recurrent:
      - linear: { pattern: "{a}", fields: { 1: a } }
      - linear: { pattern: "{b}", fields: { 1: b }, priority: 1 }
      - infix: { pattern: " " }
"#;

#[test]
fn list_repeats_with_infix_between_elements() {
    let mut converter = converter(LIST);
    let text = converter
        .convert("list", &props! { "v" => vec!["1", "2", "3"] })
        .unwrap();
    assert_eq!(text, "1,2,3");
}

#[test]
fn single_element_has_no_infix() {
    let mut converter = converter(LIST);
    let text = converter
        .convert("list", &props! { "v" => vec!["7"] })
        .unwrap();
    assert_eq!(text, "7");
}

#[test]
fn empty_or_missing_list_produces_nothing() {
    let mut converter = converter(LIST);
    let empty: Vec<&str> = Vec::new();
    assert_eq!(converter.convert("list", &props! { "v" => empty }).unwrap(), "");
    assert_eq!(converter.convert("list", &props! {}).unwrap(), "");
}

#[test]
fn residual_fields_are_shared_by_every_repetition() {
    let mut converter = converter(LIST);
    let text = converter
        .convert("tagged", &props! { "p" => "#", "v" => vec!["a", "b"] })
        .unwrap();
    assert_eq!(text, "#a;#b");
}

#[test]
fn higher_priority_decides_repetition_count() {
    let mut converter = converter(LIST);
    let text = converter
        .convert(
            "pairs",
            &props! { "a" => vec!["1", "2", "3"], "b" => vec!["x"] },
        )
        .unwrap();
    assert_eq!(text, "1x");
}

#[test]
fn failing_repetition_reports_rule_and_slice() {
    let mut converter = converter(LIST);
    let err = converter
        .convert("tagged", &props! { "v" => vec!["a", "b"] })
        .unwrap_err();
    assert_eq!(
        err.kind,
        SerializeErrorKind::ScriptVariableNotFound {
            name: "p".to_string()
        }
    );
    assert_eq!(err.trace[0].tag, "tagged");
    assert_eq!(err.trace[0].rule_index, 0);
    assert_eq!(err.scope, props! { "v" => "a" });
}

#[test]
fn slice_scripts_run_without_a_repetition_count() {
    let mut converter = converter(
        r#"
tags:
  marked:
    serialization_script: 'CONTEXT.seen = "yes";'
    recurrent:
      - linear: { pattern: "{v}", fields: { 1: v } }
"#,
    );
    let text = converter
        .convert("marked", &props! { "other" => vec!["a"] })
        .unwrap();
    assert_eq!(text, "");
    assert_eq!(converter.context().get("seen"), Some(&"yes".into()));
}

#[test]
fn failing_slice_script_fails_without_a_repetition_count() {
    let mut converter = converter(
        r#"
tags:
  strict:
    serialization_script: 'throw "no slices allowed";'
    recurrent:
      - linear: { pattern: "{v}", fields: { 1: v } }
"#,
    );
    let err = converter
        .convert("strict", &props! { "other" => vec!["a"] })
        .unwrap_err();
    assert!(matches!(err.kind, SerializeErrorKind::ScriptError { .. }));
}

// =============================================================================
// RecurrentDict
// =============================================================================

const ENTRIES: &str = r#"
tags:
  entries:
    recurrent_dict: { key: items, tag: entry }
  entry:
    continual:
      - linear: { pattern: "{a}", fields: { 1: a } }
"#;

#[test]
fn recurrent_dict_converts_each_element() {
    let mut converter = converter(ENTRIES);
    let text = converter
        .convert(
            "entries",
            &props! { "items" => vec![props! { "a" => "1" }, props! { "a" => "2" }] },
        )
        .unwrap();
    assert_eq!(text, "12");
}

#[test]
fn recurrent_dict_element_failure_has_both_breadcrumbs() {
    let mut converter = converter(ENTRIES);
    let err = converter
        .convert(
            "entries",
            &props! { "items" => vec![props! { "a" => "1" }, props! { "b" => "2" }] },
        )
        .unwrap_err();
    assert_eq!(err.scope, props! { "b" => "2" });
    insta::assert_snapshot!(
        err.to_string(),
        @"in tag 'entries', rule 1 -> in tag 'entry', rule 0: script variable not found: 'a'"
    );
}

#[test]
fn recurrent_dict_requires_a_list() {
    let mut converter = converter(ENTRIES);
    let err = converter.convert("entries", &props! {}).unwrap_err();
    assert_eq!(
        err.kind,
        SerializeErrorKind::RecurrentDictKeyNotFound {
            key: "items".to_string()
        }
    );

    let err = converter
        .convert("entries", &props! { "items" => "1" })
        .unwrap_err();
    assert!(matches!(
        err.kind,
        SerializeErrorKind::RecurrentDictKeyNotFound { .. }
    ));
}

#[test]
fn recurrent_dict_elements_must_be_maps() {
    let mut converter = converter(ENTRIES);
    let err = converter
        .convert("entries", &props! { "items" => vec!["x"] })
        .unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"in tag 'entries', rule 0: element 0 of 'items' is not a map");
}

// =============================================================================
// Scripts and context
// =============================================================================

#[test]
fn serialization_script_derives_fields() {
    let mut converter = converter(
        r#"
tags:
  celsius:
    serialization_script: 'OUTPUT_TABLE.t = INPUT_TABLE.value + "C";'
    continual:
      - linear: { pattern: "{t}", fields: { 1: t } }
"#,
    );
    let text = converter
        .convert("celsius", &props! { "value" => "21" })
        .unwrap();
    assert_eq!(text, "21C");
}

#[test]
fn context_is_shared_with_nested_tags() {
    let mut converter = converter(
        r#"
tags:
  outer:
    serialization_script: 'CONTEXT.unit = "cm";'
    continual:
      - existing: { tag: inner }
  inner:
    serialization_script: 'OUTPUT_TABLE.v = INPUT_TABLE.v + CONTEXT.unit;'
    continual:
      - linear: { pattern: "{v}", fields: { 1: v } }
"#,
    );
    let text = converter.convert("outer", &props! { "v" => "3" }).unwrap();
    assert_eq!(text, "3cm");
    assert_eq!(converter.context().get("unit"), Some(&"cm".into()));
}

#[test]
fn failed_script_leaves_context_unchanged() {
    let mut converter = converter(
        r#"
tags:
  failing:
    serialization_script: 'CONTEXT.touched = "yes"; throw "boom";'
    continual:
      - linear: { pattern: "x" }
"#,
    );
    let err = converter
        .convert("failing", &props! { "v" => "1" })
        .unwrap_err();
    let SerializeErrorKind::ScriptError { message } = &err.kind else {
        panic!("expected script error, got {:?}", err.kind);
    };
    assert!(message.contains("boom"));
    assert!(converter.context().get("touched").is_none());
}

#[test]
fn dynamic_group_reads_pattern_from_context() {
    let mut converter = converter(
        r#"
tags:
  length:
    continual:
      - linear: { pattern: "{n}{unit}", fields: { 1: n }, dyn_groups: { 2: unit_pattern } }
"#,
    );
    let err = converter
        .convert("length", &props! { "n" => "12" })
        .unwrap_err();
    assert_eq!(
        err.kind,
        SerializeErrorKind::ScriptVariableNotFound {
            name: "unit_pattern".to_string()
        }
    );

    converter.context_mut().insert("unit_pattern", "px");
    let text = converter
        .convert("length", &props! { "n" => "12" })
        .unwrap();
    assert_eq!(text, "12px");
}

// =============================================================================
// Lookup and limits
// =============================================================================

#[test]
fn unknown_tag_suggests_close_names() {
    let mut converter = converter(POINT);
    let err = converter.convert("pont", &props! {}).unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"tag not found: 'pont', did you mean: point?");
}

#[test]
fn convert_without_schema_fails() {
    let mut converter = Converter::new();
    let err = converter.convert("point", &props! {}).unwrap_err();
    assert_eq!(err.kind, SerializeErrorKind::ConfigNotLoaded);
}

#[test]
fn self_reference_stops_at_max_depth() {
    let mut converter = Converter::builder().max_depth(4).build();
    converter
        .load_config_str(
            r#"
tags:
  endless:
    continual:
      - existing: { tag: endless }
"#,
        )
        .unwrap();
    let err = converter.convert("endless", &props! {}).unwrap_err();
    assert_eq!(err.kind, SerializeErrorKind::MaxDepthExceeded { depth: 4 });
    assert_eq!(err.trace.len(), 4);
}

#[test]
fn unrenderable_pattern_is_a_resolve_error() {
    let mut converter = converter(
        r#"
tags:
  digits:
    continual:
      - linear: { pattern: "\\d+" }
"#,
    );
    let err = converter.convert("digits", &props! {}).unwrap_err();
    assert!(matches!(
        err.kind,
        SerializeErrorKind::ResolveRegexError { .. }
    ));
}

#[test]
fn huge_repetition_count_fails_instead_of_rendering() {
    let mut converter = converter(
        r#"
tags:
  wide:
    continual:
      - linear: { pattern: "(?:abcdefgh){4294967295}" }
"#,
    );
    let err = converter.convert("wide", &props! {}).unwrap_err();
    assert!(matches!(
        err.kind,
        SerializeErrorKind::ResolveRegexError { .. }
    ));
}

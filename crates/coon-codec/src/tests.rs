use crate::*;
use crate::validator::diff;
use coon_core::error::EncodeError;
use coon_core::ir::{
    ClassDecl, FieldDecl, Literal, LiteralKind, MethodBody, MethodDecl, Param, Statement, TypeRef,
    Value, WidgetNode,
};
use coon_core::symbols::{Category, SymbolEntry};
use coon_registry::builtin::{email_input, password_input, primary_button};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

fn builtin() -> &'static SymbolTables {
    SymbolTables::builtin()
}

fn empty() -> RegistrySnapshot {
    RegistrySnapshot::empty()
}

fn enc(ir: &IrNode, strategy: Strategy, snapshot: &RegistrySnapshot) -> String {
    encode(ir, strategy, builtin(), snapshot, &EncodeOptions::default())
        .unwrap()
        .document
        .into_string()
}

fn dec(doc: &str, snapshot: &RegistrySnapshot) -> Result<IrNode, ParseError> {
    decode(doc, builtin(), snapshot)
}

fn text(s: &str) -> WidgetNode {
    WidgetNode::new("Text").prop("$0", Value::string(s))
}

fn widget(w: WidgetNode) -> IrNode {
    IrNode::Widget(w)
}

fn email_field(controller: &str) -> WidgetNode {
    let mut w = email_input();
    w.properties[0].value = Value::ident(controller);
    w
}

fn login_page() -> IrNode {
    let form = WidgetNode::new("Column")
        .prop("mainAxisAlignment", Value::ident("MainAxisAlignment.center"))
        .prop("crossAxisAlignment", Value::ident("CrossAxisAlignment.stretch"))
        .child(email_field("emailController"))
        .child(WidgetNode::new("SizedBox").prop("height", Value::number("16")))
        .child(password_input())
        .child(WidgetNode::new("SizedBox").prop("height", Value::number("24")))
        .child(primary_button());
    let scaffold = WidgetNode::new("Scaffold")
        .prop(
            "appBar",
            Value::widget(
                WidgetNode::new("AppBar")
                    .prop("title", Value::widget(text("Login")))
                    .prop("centerTitle", Value::boolean(true)),
            ),
        )
        .prop(
            "body",
            Value::widget(
                WidgetNode::new("Padding")
                    .prop("padding", Value::expr("EdgeInsets.all(16)"))
                    .child(form),
            ),
        );
    IrNode::Class(ClassDecl {
        name: "LoginPage".into(),
        super_type: Some(TypeRef::new("StatelessWidget")),
        fields: vec![
            FieldDecl {
                modifiers: vec!["final".into()],
                name: "emailController".into(),
                type_ref: Some(TypeRef::new("TextEditingController")),
                initializer: Some(Value::expr("TextEditingController()")),
            },
            FieldDecl {
                modifiers: vec!["final".into()],
                name: "tags".into(),
                type_ref: Some(TypeRef::new("List").arg(TypeRef::new("String"))),
                initializer: Some(Value::List(vec![Value::string("a"), Value::string("b, c")])),
            },
        ],
        methods: vec![
            MethodDecl {
                modifiers: vec!["override".into()],
                name: "build".into(),
                params: vec![Param {
                    name: "context".into(),
                    type_ref: Some(TypeRef::new("BuildContext")),
                }],
                return_type: Some(TypeRef::new("Widget")),
                body: MethodBody::Widget(scaffold),
            },
            MethodDecl {
                modifiers: vec!["static".into()],
                name: "isValid".into(),
                params: vec![Param {
                    name: "email".into(),
                    type_ref: Some(TypeRef::new("String")),
                }],
                return_type: Some(TypeRef::new("bool")),
                body: MethodBody::Statements(vec![Statement::new(
                    &["return"],
                    Some(Value::expr("email.contains('@')")),
                )]),
            },
        ],
    })
}

// ========== Scenarios ==========

#[test]
fn test_minimal_round_trip_exact_text() {
    let tables = SymbolTables::from_entries(vec![
        SymbolEntry::new(Category::Type, "Scaffold", "S"),
        SymbolEntry::new(Category::Type, "Text", "T"),
    ])
    .unwrap();
    let ir = widget(
        WidgetNode::new("Scaffold").child(WidgetNode::new("Text").prop("data", Value::string("Hi"))),
    );
    let snapshot = empty();
    let doc = encode(&ir, Strategy::Minimal, &tables, &snapshot, &EncodeOptions::default())
        .unwrap()
        .document;
    assert_eq!(doc.as_str(), r#"S{}[T{data:"Hi"}]"#);
    assert_eq!(decode(doc.as_str(), &tables, &snapshot).unwrap(), ir);
}

#[test]
fn test_reference_strategy_emits_reference_per_occurrence() {
    let tables = SymbolTables::from_entries(vec![
        SymbolEntry::new(Category::Type, "Scaffold", "S"),
        SymbolEntry::new(Category::Type, "Text", "T"),
    ])
    .unwrap();
    let hi = WidgetNode::new("Text").prop("data", Value::string("Hi"));
    let registry = PatternRegistry::new();
    assert_eq!(registry.register(&hi).unwrap(), "w1");
    let snapshot = registry.snapshot();

    let ir = IrNode::Unit(vec![
        widget(WidgetNode::new("Scaffold").child(hi.clone())),
        widget(WidgetNode::new("Scaffold").child(hi.clone())),
    ]);
    let encoded = encode(
        &ir,
        Strategy::PatternReference,
        &tables,
        &snapshot,
        &EncodeOptions::default(),
    )
    .unwrap();
    let doc = encoded.document.as_str();
    assert_eq!(doc.matches("@w1()").count(), 2);
    assert!(!doc.contains(r#"T{data:"Hi"}"#));
    assert_eq!(encoded.references, 2);

    let decoded = decode(doc, &tables, &snapshot).unwrap();
    let IrNode::Unit(items) = &decoded else {
        panic!("expected a unit, got {decoded:?}");
    };
    assert_eq!(items.len(), 2);
    for item in items {
        let IrNode::Widget(scaffold) = item else {
            panic!("expected a widget, got {item:?}");
        };
        assert_eq!(scaffold.children, vec![hi.clone()]);
    }
    assert_eq!(decoded, ir);
}

#[test]
fn test_unclosed_map_is_unbalanced() {
    let err = dec("S{b", &empty()).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::UnbalancedBracket);
    assert_eq!(err.position, 3);
}

#[test]
fn test_unassigned_code_is_unknown() {
    let err = dec("Q{}", &empty()).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::UnknownShortCode);
    assert_eq!(err.position, 0);
}

// ========== Encoder ==========

#[test]
fn test_children_group_only_when_present() {
    let ir = widget(WidgetNode::new("Center").child(WidgetNode::new("Divider")));
    assert_eq!(enc(&ir, Strategy::Minimal, &empty()), "N{}[dv{}]");
}

#[test]
fn test_class_layout_per_strategy() {
    let class = IrNode::Class(ClassDecl {
        name: "Counter".into(),
        super_type: Some(TypeRef::new("StatelessWidget")),
        fields: vec![FieldDecl {
            modifiers: vec!["final".into()],
            name: "count".into(),
            type_ref: Some(TypeRef::new("int")),
            initializer: None,
        }],
        methods: vec![MethodDecl {
            modifiers: vec!["override".into()],
            name: "build".into(),
            params: vec![Param {
                name: "context".into(),
                type_ref: Some(TypeRef::new("BuildContext")),
            }],
            return_type: Some(TypeRef::new("Widget")),
            body: MethodBody::Widget(text("Hi")),
        }],
    });
    assert_eq!(
        enc(&class, Strategy::Minimal, &empty()),
        "c:Counter<sw>;\n%f.count:I;\n%o.build(context:bc):W=T{$0:\"Hi\"}"
    );
    assert_eq!(
        enc(&class, Strategy::Aggressive, &empty()),
        "c:Counter<sw>;%f.count:I;%o.build(context:bc):W=T{$0:\"Hi\"}"
    );
}

#[test]
fn test_literal_folding_only_when_aggressive() {
    let ir = widget(
        WidgetNode::new("Column").prop("mainAxisAlignment", Value::ident("MainAxisAlignment.center")),
    );
    assert_eq!(enc(&ir, Strategy::Minimal, &empty()), "C{A:MainAxisAlignment.center}");
    assert_eq!(enc(&ir, Strategy::Aggressive, &empty()), "C{A:#mc}");
    assert_eq!(dec("C{A:#mc}", &empty()).unwrap(), ir);
}

#[test]
fn test_verbatim_names() {
    let ir = widget(
        WidgetNode::new("MyCard")
            .prop("b", Value::number("1"))
            .prop("data", Value::null()),
    );
    let doc = enc(&ir, Strategy::Minimal, &empty());
    assert_eq!(doc, "!MyCard{!b:1,data:~_}");
    assert_eq!(dec(&doc, &empty()).unwrap(), ir);
}

#[test]
fn test_unknown_keyword_written_verbatim() {
    let method = IrNode::Method(MethodDecl {
        modifiers: vec!["covariant".into()],
        name: "load".into(),
        params: vec![],
        return_type: None,
        body: MethodBody::Statements(vec![
            Statement::new(&["return"], Some(Value::boolean(false))),
            Statement::new(&["break"], None),
        ]),
    });
    let doc = enc(&method, Strategy::Minimal, &empty());
    assert_eq!(doc, "m:%!covariant.load(){%r.~0;%b.}");
    assert_eq!(dec(&doc, &empty()).unwrap(), method);
}

#[test]
fn test_string_escaping_round_trip() {
    let raw = r#"a\b "q" {x} [y], z; ü"#;
    let ir = widget(text(raw));
    let doc = enc(&ir, Strategy::Minimal, &empty());
    assert_eq!(doc, r#"T{$0:"a\\b \"q\" \{x\} \[y\]\, z\; ü"}"#);
    assert_eq!(dec(&doc, &empty()).unwrap(), ir);
}

#[test]
fn test_empty_unit_encodes_to_empty_document() {
    assert_eq!(enc(&IrNode::Unit(vec![]), Strategy::Hybrid, &empty()), "");
    assert_eq!(dec("", &empty()).unwrap(), IrNode::Unit(vec![]));
    assert_eq!(dec(" \n\t", &empty()).unwrap(), IrNode::Unit(vec![]));
}

#[test]
fn test_root_literal() {
    let ir = IrNode::Literal(Literal::new(LiteralKind::String, "a,b"));
    let doc = enc(&ir, Strategy::Minimal, &empty());
    assert_eq!(doc, r#""a\,b""#);
    assert_eq!(dec(&doc, &empty()).unwrap(), ir);
    let n = IrNode::Literal(Literal::new(LiteralKind::Number, "-2.5e-3"));
    assert_eq!(dec(&enc(&n, Strategy::Minimal, &empty()), &empty()).unwrap(), n);
}

#[test]
fn test_encode_rejects_invalid_ir() {
    let opts = EncodeOptions::default();
    let snap = empty();
    let bad_type = widget(WidgetNode::new("My Widget"));
    assert!(matches!(
        encode(&bad_type, Strategy::Minimal, builtin(), &snap, &opts),
        Err(EncodeError::InvalidIdentifier { context: "type", .. })
    ));

    let bad_number = widget(WidgetNode::new("SizedBox").prop("height", Value::number("1,5")));
    assert!(matches!(
        encode(&bad_number, Strategy::Minimal, builtin(), &snap, &opts),
        Err(EncodeError::InvalidNumber(_))
    ));

    let bad_bool = widget(WidgetNode::new("Text").prop(
        "softWrap",
        Value::Literal(Literal::new(LiteralKind::Bool, "yes")),
    ));
    assert!(matches!(
        encode(&bad_bool, Strategy::Minimal, builtin(), &snap, &opts),
        Err(EncodeError::InvalidLiteral { kind: "bool", .. })
    ));

    let nested = IrNode::Unit(vec![IrNode::Unit(vec![])]);
    assert_eq!(
        encode(&nested, Strategy::Minimal, builtin(), &snap, &opts).unwrap_err(),
        EncodeError::NestedUnit
    );

    let empty_stmt = IrNode::Method(MethodDecl {
        modifiers: vec![],
        name: "noop".into(),
        params: vec![],
        return_type: None,
        body: MethodBody::Statements(vec![Statement::new(&[], None)]),
    });
    assert_eq!(
        encode(&empty_stmt, Strategy::Minimal, builtin(), &snap, &opts).unwrap_err(),
        EncodeError::EmptyStatement
    );
}

#[test]
fn test_depth_limit() {
    let mut w = WidgetNode::new("Container");
    for _ in 0..5 {
        w = WidgetNode::new("Container").child(w);
    }
    let opts = EncodeOptions {
        max_depth: 3,
        ..EncodeOptions::default()
    };
    let err = encode(&widget(w), Strategy::Minimal, builtin(), &empty(), &opts).unwrap_err();
    assert_eq!(err, EncodeError::DepthLimitExceeded(3));
}

#[test]
fn test_depth_limit_counts_lists() {
    let mut v = Value::number("1");
    for _ in 0..4 {
        v = Value::List(vec![v]);
    }
    let ir = widget(WidgetNode::new("Container").prop("data", v));
    let opts = EncodeOptions {
        max_depth: 4,
        ..EncodeOptions::default()
    };
    let err = encode(&ir, Strategy::Minimal, builtin(), &empty(), &opts).unwrap_err();
    assert_eq!(err, EncodeError::DepthLimitExceeded(4));
    let opts = EncodeOptions {
        max_depth: 5,
        ..EncodeOptions::default()
    };
    assert!(encode(&ir, Strategy::Minimal, builtin(), &empty(), &opts).is_ok());
}

#[test]
fn test_non_path_ident_rejected_by_every_strategy() {
    let tables = SymbolTables::from_entries(vec![
        SymbolEntry::new(Category::Type, "Padding", "P"),
        SymbolEntry::new(Category::Literal, "EdgeInsets.all(8)", "e8"),
    ])
    .unwrap();
    let ir = widget(WidgetNode::new("Padding").prop("padding", Value::ident("EdgeInsets.all(8)")));
    for strategy in Strategy::ALL {
        let err = encode(&ir, strategy, &tables, &empty(), &EncodeOptions::default()).unwrap_err();
        assert!(
            matches!(err, EncodeError::InvalidIdentifier { context: "value", .. }),
            "{strategy}: {err}"
        );
    }
    // the same text as an expression still folds
    let expr = widget(WidgetNode::new("Padding").prop("padding", Value::expr("EdgeInsets.all(8)")));
    let doc = encode(&expr, Strategy::Aggressive, &tables, &empty(), &EncodeOptions::default())
        .unwrap()
        .document;
    assert_eq!(doc.as_str(), "P{padding:#e8}");
    assert_eq!(decode(doc.as_str(), &tables, &empty()).unwrap(), expr);
}

#[test]
fn test_reference_arguments_only_where_values_differ() {
    let registry = PatternRegistry::with_builtin_patterns();
    let snapshot = registry.snapshot();
    let ir = widget(
        WidgetNode::new("Column")
            .child(email_input())
            .child(email_field("emailController")),
    );
    let doc = enc(&ir, Strategy::PatternReference, &snapshot);
    assert_eq!(doc, "C{}[@email_input(),@email_input(emailController)]");
    assert_eq!(dec(&doc, &snapshot).unwrap(), ir);
}

#[test]
fn test_registration_mode_never_references_minted() {
    let tile = |label: &str| {
        WidgetNode::new("Padding")
            .prop("padding", Value::ident("EdgeInsets.zero"))
            .child(text(label))
    };
    let ir = widget(WidgetNode::new("Column").child(tile("a")).child(tile("b")));
    let opts = EncodeOptions {
        register_patterns: true,
        min_pattern_tokens: 8,
        ..EncodeOptions::default()
    };
    let encoded = encode(&ir, Strategy::PatternReference, builtin(), &empty(), &opts).unwrap();
    assert_eq!(encoded.minted.len(), 1);
    assert_eq!(encoded.references, 0);
    assert!(!encoded.document.as_str().contains('@'));
}

// ========== Decoder ==========

#[test]
fn test_decoder_errors() {
    let snap = empty();
    let cases = [
        ("S{}]", ParseErrorKind::UnbalancedBracket),
        ("S{}[T{}}", ParseErrorKind::UnbalancedBracket),
        ("S{}[T{}", ParseErrorKind::UnbalancedBracket),
        ("c:A<sw;;", ParseErrorKind::UnexpectedToken),
        ("T{$0:\"Hi}", ParseErrorKind::UnterminatedString),
        ("T{$0:\"a\\qb\"}", ParseErrorKind::InvalidEscape),
        ("T{$0:}", ParseErrorKind::UnexpectedToken),
        ("T{$0:\"x\",}", ParseErrorKind::UnexpectedToken),
        ("T{$0 \"x\"}", ParseErrorKind::UnexpectedToken),
        ("T{$0:#zz}", ParseErrorKind::UnknownShortCode),
        ("m:%zz.f(){}", ParseErrorKind::UnknownShortCode),
        ("@nope()", ParseErrorKind::UnknownReferenceId),
        ("x:S{}", ParseErrorKind::UnexpectedToken),
        ("u:S{}|u:T{}", ParseErrorKind::UnexpectedToken),
        ("S{} T{}", ParseErrorKind::UnexpectedToken),
        ("m:f(){;}", ParseErrorKind::UnexpectedToken),
    ];
    for (doc, kind) in cases {
        let err = dec(doc, &snap).unwrap_err();
        assert_eq!(err.kind, kind, "{doc}: {err}");
        assert!(err.position <= doc.len());
    }
}

#[test]
fn test_hostile_nesting_is_a_parse_error() {
    let deep_list = format!("T{{a:{}", "[".repeat(200_000));
    let err = dec(&deep_list, &empty()).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::DepthLimitExceeded);

    let deep_widgets = format!("{}{}", "C{}[".repeat(5000), "]".repeat(5000));
    let err = dec(&deep_widgets, &empty()).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::DepthLimitExceeded);

    let deep_types = format!("c:A<{}>;", "!L<".repeat(100_000));
    let err = dec(&deep_types, &empty()).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::DepthLimitExceeded);
}

#[test]
fn test_decoder_depth_matches_encoder_limit() {
    let mut w = WidgetNode::new("Container");
    for _ in 0..9 {
        w = WidgetNode::new("Container").child(w);
    }
    let ir = widget(w);
    let opts = EncodeOptions {
        max_depth: 10,
        ..EncodeOptions::default()
    };
    let doc = encode(&ir, Strategy::Minimal, builtin(), &empty(), &opts)
        .unwrap()
        .document;
    let snap = empty();
    let decoded = Decoder::new(builtin(), &snap)
        .with_max_depth(10)
        .decode(doc.as_str())
        .unwrap();
    assert_eq!(decoded, ir);
    let err = Decoder::new(builtin(), &snap)
        .with_max_depth(9)
        .decode(doc.as_str())
        .unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::DepthLimitExceeded);
}

#[test]
fn test_reference_argument_errors() {
    let registry = PatternRegistry::with_builtin_patterns();
    registry.register_as("plain", &WidgetNode::new("Scaffold")).unwrap();
    let snap = registry.snapshot();

    let err = dec("@plain(1)", &snap).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::ArityMismatch);

    let err = dec("@email_input(S{})", &snap).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::UnexpectedToken);

    let err = dec("@email_input(\"x\"", &snap).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::UnbalancedBracket);
}

#[test]
fn test_whitespace_between_tokens_ignored() {
    let ir = dec("S { b : N { } [ T { $0 : \"Hi\" } ] }", &empty()).unwrap();
    let expected = widget(
        WidgetNode::new("Scaffold").prop(
            "body",
            Value::widget(WidgetNode::new("Center").child(text("Hi"))),
        ),
    );
    assert_eq!(ir, expected);
}

#[test]
fn test_unknown_property_keys_taken_verbatim() {
    let ir = dec("T{semanticsLabel:\"x\"}", &empty()).unwrap();
    assert_eq!(
        ir,
        widget(WidgetNode::new("Text").prop("semanticsLabel", Value::string("x")))
    );
}

#[test]
fn test_positional_reference_arguments_fill_slots() {
    let registry = PatternRegistry::with_builtin_patterns();
    let snap = registry.snapshot();
    let ir = dec("@email_input(ctl,\"Mail\")", &snap).unwrap();
    let IrNode::Widget(w) = ir else {
        panic!("expected widget");
    };
    assert_eq!(w.property("controller"), Some(&Value::ident("ctl")));
    let Some(Value::Widget(decoration)) = w.property("decoration") else {
        panic!("expected decoration widget");
    };
    assert_eq!(decoration.property("labelText"), Some(&Value::string("Mail")));
    assert_eq!(
        decoration.property("hintText"),
        Some(&Value::string("you@example.com"))
    );
}

#[test]
fn test_value_ident_versus_widget() {
    let ir = dec("T{$0:S,style:Y{}}", &empty()).unwrap();
    let expected = widget(
        WidgetNode::new("Text")
            .prop("$0", Value::ident("S"))
            .prop("style", Value::widget(WidgetNode::new("TextStyle"))),
    );
    assert_eq!(ir, expected);
}

// ========== Round trip ==========

#[test]
fn test_login_page_round_trip_every_strategy() {
    let registry = PatternRegistry::with_builtin_patterns();
    let snap = registry.snapshot();
    let ir = login_page();
    for strategy in Strategy::ALL {
        let doc = enc(&ir, strategy, &snap);
        let back = dec(&doc, &snap).unwrap_or_else(|e| panic!("{strategy}: {e}\n{doc}"));
        assert_eq!(back, ir, "{strategy}");
        assert_eq!(enc(&back, strategy, &snap), doc, "{strategy} not idempotent");
    }
}

#[test]
fn test_pattern_strategies_shrink_documents() {
    let registry = PatternRegistry::with_builtin_patterns();
    let snap = registry.snapshot();
    let ir = login_page();
    let minimal = enc(&ir, Strategy::Minimal, &snap);
    let hybrid = enc(&ir, Strategy::Hybrid, &snap);
    assert!(hybrid.len() < minimal.len());
    assert!(hybrid.contains("@password_input()"));
    assert!(hybrid.contains("@primary_button()"));
    assert!(!hybrid.contains('\n'));
}

fn random_value(rng: &mut StdRng, depth: usize) -> Value {
    const STRINGS: [&str; 7] = ["Hi", "a\"b", "x\\y", "{[,;]}", "", "multi\nline", "ünï"];
    const NUMBERS: [&str; 5] = ["0", "-1", "3.14", "1e-3", "0xFF"];
    const IDENTS: [&str; 6] = ["controller", "Colors.blue", "MainAxisAlignment.center", "S", "u", "c"];
    const EXPRS: [&str; 3] = ["EdgeInsets.all(8)", "a, b; {c}", "Colors.blue"];
    match rng.gen_range(0..if depth > 0 { 9 } else { 7 }) {
        0 => Value::string(STRINGS[rng.gen_range(0..STRINGS.len())]),
        1 => Value::number(NUMBERS[rng.gen_range(0..NUMBERS.len())]),
        2 => Value::boolean(rng.gen_bool(0.5)),
        3 => Value::null(),
        4 => Value::ident(IDENTS[rng.gen_range(0..IDENTS.len())]),
        5 | 6 => Value::expr(EXPRS[rng.gen_range(0..EXPRS.len())]),
        7 => Value::widget(random_widget(rng, depth - 1)),
        _ => {
            let n = rng.gen_range(0..3);
            Value::List((0..n).map(|_| random_value(rng, depth - 1)).collect())
        }
    }
}

fn random_widget(rng: &mut StdRng, depth: usize) -> WidgetNode {
    const TYPES: [&str; 8] = ["Scaffold", "Column", "Text", "Card", "MyTile", "Q", "Icon", "ex"];
    const KEYS: [&str; 8] = ["body", "child", "data", "$0", "b", "title", "onTap", "color"];
    let mut w = WidgetNode::new(TYPES[rng.gen_range(0..TYPES.len())]);
    for _ in 0..rng.gen_range(0..4) {
        let key = KEYS[rng.gen_range(0..KEYS.len())];
        w = w.prop(key, random_value(rng, depth));
    }
    if depth > 0 {
        for _ in 0..rng.gen_range(0..3) {
            w = w.child(random_widget(rng, depth - 1));
        }
    }
    w
}

#[test]
fn test_random_trees_round_trip() {
    let mut rng = StdRng::seed_from_u64(7);
    let registry = PatternRegistry::with_builtin_patterns();
    let snap = registry.snapshot();
    for i in 0..200 {
        let ir = widget(random_widget(&mut rng, 4));
        for strategy in Strategy::ALL {
            let doc = enc(&ir, strategy, &snap);
            let back = dec(&doc, &snap)
                .unwrap_or_else(|e| panic!("tree {i} {strategy}: {e}\n{doc}"));
            assert_eq!(back, ir, "tree {i} {strategy}\n{doc}");
            assert_eq!(enc(&back, strategy, &snap), doc);
        }
    }
}

#[test]
fn test_random_references_round_trip() {
    let mut rng = StdRng::seed_from_u64(11);
    let registry = PatternRegistry::new();
    let pattern = WidgetNode::new("Card")
        .prop("elevation", Value::number("2"))
        .child(text("title"));
    registry.register(&pattern).unwrap();
    let snap = registry.snapshot();
    for _ in 0..50 {
        let mut card = pattern.clone();
        card.properties[0].value = random_value(&mut rng, 0);
        card.children[0].properties[0].value = random_value(&mut rng, 0);
        let ir = IrNode::Unit(vec![widget(card), widget(random_widget(&mut rng, 2))]);
        for strategy in [Strategy::PatternReference, Strategy::Hybrid] {
            let doc = enc(&ir, strategy, &snap);
            assert!(doc.contains("@w1("));
            assert_eq!(dec(&doc, &snap).unwrap(), ir, "{doc}");
        }
    }
}

// ========== Validator ==========

#[test]
fn test_validator_reports_lossless_round_trip() {
    let registry = PatternRegistry::with_builtin_patterns();
    let snap = registry.snapshot();
    for strategy in Strategy::ALL {
        let result = Validator::new(builtin(), &snap)
            .with_strategy(strategy)
            .validate(&login_page())
            .unwrap();
        assert!(result.reversible, "{strategy}: {:?}", result.diffs);
        assert!(result.idempotent);
        assert!(result.source_equivalent);
        assert_eq!(result.similarity, 1.0);
        assert_eq!(result.strategy, strategy);
    }
}

#[test]
fn test_validator_selects_strategy_when_unset() {
    let registry = PatternRegistry::with_builtin_patterns();
    let snap = registry.snapshot();
    let result = Validator::new(builtin(), &snap)
        .validate(&widget(email_input()))
        .unwrap();
    assert_eq!(result.strategy, Strategy::PatternReference);
    assert_eq!(result.document.as_str(), "@email_input()");
    assert!(result.reversible);
}

#[test]
fn test_validator_flags_near_match_as_lossy() {
    let registry = PatternRegistry::new();
    registry
        .register(
            &WidgetNode::new("Card")
                .prop("elevation", Value::number("2"))
                .child(text("a")),
        )
        .unwrap();
    let snap = registry.snapshot();
    let original = widget(
        WidgetNode::new("Card")
            .prop("elevation", Value::number("2"))
            .prop("color", Value::ident("Colors.red"))
            .child(text("b")),
    );
    let result = Validator::new(builtin(), &snap)
        .with_strategy(Strategy::PatternReference)
        .with_options(EncodeOptions {
            similarity_threshold: 0.5,
            ..EncodeOptions::default()
        })
        .validate(&original)
        .unwrap();
    assert_eq!(result.document.as_str(), "@w1(,\"b\")");
    assert!(!result.reversible);
    assert!(result.idempotent);
    assert!(!result.source_equivalent);
    assert!(result.similarity > 0.0 && result.similarity < 1.0);
    assert_eq!(result.diffs.len(), 1);
    assert_eq!(result.diffs[0].path, "root.properties");
    assert_eq!(
        result.diffs[0].kind,
        DiffKind::CountMismatch {
            expected: 2,
            actual: 1
        }
    );
}

#[test]
fn test_validator_propagates_encode_errors() {
    let err = Validator::new(builtin(), &empty())
        .validate(&widget(WidgetNode::new("bad name")))
        .unwrap_err();
    assert!(matches!(err, EncodeError::InvalidIdentifier { .. }));
}

#[test]
fn test_validate_batch_counts_outcomes() {
    let registry = PatternRegistry::new();
    registry
        .register(
            &WidgetNode::new("Card")
                .prop("elevation", Value::number("2"))
                .child(text("a")),
        )
        .unwrap();
    let snap = registry.snapshot();
    let lossy = widget(
        WidgetNode::new("Card")
            .prop("elevation", Value::number("2"))
            .prop("color", Value::ident("Colors.red"))
            .child(text("b")),
    );
    let trees = vec![lossy, widget(WidgetNode::new("bad name"))];
    let batch = Validator::new(builtin(), &snap)
        .with_strategy(Strategy::PatternReference)
        .with_options(EncodeOptions {
            similarity_threshold: 0.5,
            ..EncodeOptions::default()
        })
        .validate_batch(&trees);
    assert_eq!((batch.passed, batch.failed), (0, 2));
    assert_eq!(batch.results.len(), 1);
    assert!(!batch.results[0].reversible);
    assert_eq!(batch.rejected.len(), 1);
    assert_eq!(batch.rejected[0].0, 1);
    assert!(!batch.all_passed());

    let builtins = PatternRegistry::with_builtin_patterns();
    let snap = builtins.snapshot();
    let clean = Validator::new(builtin(), &snap).validate_batch(&[login_page(), widget(text("Hi"))]);
    assert_eq!((clean.passed, clean.failed), (2, 0));
    assert!(clean.rejected.is_empty());
    assert!(clean.all_passed());
}

#[test]
fn test_structural_diff_paths() {
    let a = widget(WidgetNode::new("Column").child(text("a")).child(text("b")));
    let b = widget(WidgetNode::new("Column").child(text("a")).child(text("c")));
    let diffs = diff(&a, &b);
    assert_eq!(diffs.len(), 1);
    assert_eq!(diffs[0].path, "root.children[1].properties.$0");
    assert!(matches!(diffs[0].kind, DiffKind::ValueMismatch { .. }));

    let c = widget(WidgetNode::new("Row"));
    assert!(matches!(diff(&a, &c)[0].kind, DiffKind::TypeMismatch { .. }));
    assert!(diff(&a, &a).is_empty());
}

#[test]
fn test_compare_source_normalizes_whitespace() {
    let same = compare_source("Text(\n  \"Hi\",\n)", "Text( \"Hi\", )");
    assert!(same.equivalent);
    assert_eq!(same.similarity, 1.0);

    let different = compare_source("Text( \"Hi\", )", "Text( \"Bye\", )");
    assert!(!different.equivalent);
    assert!(different.similarity > 0.0 && different.similarity < 1.0);
}

// ========== Codec ==========

#[test]
fn test_codec_compress_and_decompress() {
    let codec = Codec::with_builtin_tables(Arc::new(PatternRegistry::with_builtin_patterns()));
    let ir = login_page();
    let result = codec.compress(&ir).unwrap();
    // three registry hits out of seventeen subtrees: not enough for references
    assert_eq!(result.strategy, Strategy::Aggressive);
    assert_eq!(result.references, 0);
    assert!(result.reduction_pct > 30.0);
    assert!((result.ratio() - (1.0 - result.reduction_pct / 100.0)).abs() < 1e-9);
    assert!(result.token_savings() > 0);
    assert_eq!(result.compressed_len, result.output.len());
    assert_eq!(codec.decompress(&result.output).unwrap(), ir);

    let source = codec.decompress_to_source(&result.output).unwrap();
    assert!(source.starts_with("class LoginPage extends StatelessWidget {"));
    assert!(source.contains("@override"));
    assert_eq!(source.len(), result.source_len);
}

#[test]
fn test_codec_registration_mode_commits_minted() {
    let config = CodecConfig {
        strategy: Some(Strategy::PatternReference),
        register_patterns: true,
        min_pattern_tokens: 8,
        ..CodecConfig::default()
    };
    let codec = Codec::new(
        Arc::new(builtin().clone()),
        Arc::new(PatternRegistry::new()),
        config,
    );
    let tile = |label: &str| {
        WidgetNode::new("Padding")
            .prop("padding", Value::ident("EdgeInsets.zero"))
            .child(text(label))
    };
    let ir = widget(WidgetNode::new("Column").child(tile("a")).child(tile("b")));

    let first = codec.compress(&ir).unwrap();
    assert_eq!(first.minted, vec!["w1".to_string()]);
    assert_eq!(first.references, 0);
    assert_eq!(codec.registry().len(), 1);

    let second = codec.compress(&ir).unwrap();
    assert!(second.minted.is_empty());
    assert_eq!(second.output, "C{}[@w1(),@w1(,\"b\")]");
    assert_eq!(codec.decompress(&second.output).unwrap(), ir);
}

#[test]
fn test_codec_from_config_and_save_registry() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("patterns").join("registry.json");
    let config = CodecConfig {
        registry_path: Some(path.clone()),
        ..CodecConfig::default()
    };
    let codec = Codec::from_config(config.clone()).unwrap();
    assert!(codec.registry().is_empty());
    codec.registry().register(&primary_button()).unwrap();
    codec.save_registry().unwrap();

    let reloaded = Codec::from_config(config).unwrap();
    assert_eq!(reloaded.registry().len(), 1);
    let doc = reloaded.compress(&widget(primary_button())).unwrap().output;
    assert_eq!(doc, "@w1()");
}

#[test]
fn test_codec_rejects_bad_config() {
    let config = CodecConfig {
        similarity_threshold: 1.5,
        ..CodecConfig::default()
    };
    assert!(Codec::from_config(config).is_err());

    let codec = Codec::with_builtin_tables(Arc::new(PatternRegistry::new()));
    assert!(codec.save_registry().is_err());
}

#[test]
fn test_codec_validate_uses_configured_strategy() {
    let config = CodecConfig {
        strategy: Some(Strategy::Minimal),
        ..CodecConfig::default()
    };
    let codec = Codec::new(
        Arc::new(builtin().clone()),
        Arc::new(PatternRegistry::with_builtin_patterns()),
        config,
    );
    let result = codec.validate(&login_page()).unwrap();
    assert_eq!(result.strategy, Strategy::Minimal);
    assert!(result.reversible);
    assert!(!result.document.as_str().contains("@email_input"));
}

#[test]
fn test_validation_result_serializes() {
    let result = Validator::new(builtin(), &empty())
        .with_strategy(Strategy::Minimal)
        .validate(&widget(text("Hi")))
        .unwrap();
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["strategy"], "minimal");
    assert_eq!(json["document"], "T{$0:\"Hi\"}");
    assert_eq!(json["reversible"], true);
    assert_eq!(json["diffs"].as_array().map(Vec::len), Some(0));
}

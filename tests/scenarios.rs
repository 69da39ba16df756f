use json_decl::{
    Check, DataType, EnumDecl, ErrorKind, FieldOptions, Registry, SchemaError, SimpleDecl, StructDecl, compact,
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

fn shop() -> Registry {
    let mut registry = Registry::new();
    registry
        .declare_json(json!([
            {"name": "Item", "props": {"name": "String", "price": "Number|@optional|min,0"}},
            {"name": "Order", "props": {"id": "String", "items": "Array<Item>"}},
        ]))
        .unwrap();
    registry
}

#[test]
fn nested_array_failure_reports_dotted_path() {
    let registry = shop();
    let err = registry
        .get("Order")
        .unwrap()
        .extract(&json!({"id": "o1", "items": [{"name": "ok"}, {"name": ""}]}))
        .unwrap_err();
    assert_eq!(err.path.as_deref(), Some("items.1.name"));
    assert_eq!(err.field(), Some("name"));
    assert_eq!(err.to_string(), "Field [name] can not be empty");
}

#[test]
fn compact_spec_descriptor() {
    let spec = compact::parse("Number|@optional|len,4,10").unwrap();
    assert_eq!(spec.ty, "Number");
    assert_eq!(spec.flag("optional"), Some(&json!(true)));
    assert_eq!(spec.checks, vec![Check::new("len", [json!("4"), json!("10")])]);
    assert_eq!(
        serde_json::to_value(&spec).unwrap(),
        json!({"type": "Number", "optional": true, "checks": [["len", "4", "10"]]})
    );
}

#[test]
fn spec_cache_hands_out_independent_copies() {
    let mut registry = Registry::new();
    let mut first = registry.parse_spec("String|@optional").unwrap();
    let second = registry.parse_spec("String|@optional").unwrap();
    assert_eq!(first, second);
    first.flags.insert("nullable".into(), json!(true));
    assert_ne!(first, registry.parse_spec("String|@optional").unwrap());
}

#[test]
fn eql_compares_against_sibling() {
    let mut registry = Registry::new();
    registry
        .declare(StructDecl::new("Pair").prop("age", FieldOptions { eql: Some("age2".into()), ..FieldOptions::new("Number") }))
        .unwrap();
    let pair = registry.get("Pair").unwrap();
    assert_eq!(pair.extract(&json!({"age": 5, "age2": 5})).unwrap(), json!({"age": 5}));

    let err = pair.extract(&json!({"age": 5, "age2": 6})).unwrap_err();
    assert_eq!(err.kind, ErrorKind::EqualityMismatch { field: "age".into(), other: "age2".into() });
    assert_eq!(err.path.as_deref(), Some("age"));
}

#[test]
fn strict_enum_create_and_check() {
    let mut registry = Registry::new();
    let sex = registry
        .declare(EnumDecl {
            name: Some("Sex".into()),
            enums: vec![("male".into(), json!(1)), ("female".into(), json!(2))],
            strict: Some(true),
            default: Some(json!(2)),
        })
        .unwrap();
    let sex = registry.handle(sex).unwrap();
    assert_eq!(sex.data_type(), DataType::Enum);
    assert_eq!(sex.create(Some(&json!(3))), json!(2));
    assert_eq!(sex.create(Some(&json!(1))), json!(1));
    assert!(sex.check(&json!(1)));
    assert!(!sex.check(&json!(3)));
    assert!(!sex.check(&json!("1")));
}

#[test]
fn extract_is_idempotent() {
    let registry = shop();
    let order = registry.get("Order").unwrap();
    let once = order
        .extract(&json!({"id": 12, "extra": null, "items": [{"name": " a ", "price": "1.5"}]}))
        .unwrap();
    assert_eq!(once, json!({"id": "12", "items": [{"name": "a", "price": 1.5}]}));
    assert_eq!(order.extract(&once).unwrap(), once);
}

#[test]
fn required_and_optional_fields() {
    let registry = shop();
    let item = registry.get("Item").unwrap();
    assert_eq!(item.extract(&json!({"name": "a"})).unwrap(), json!({"name": "a"}));

    let err = item.extract(&json!({"price": 1})).unwrap_err();
    assert_eq!(err.kind, ErrorKind::RequiredFieldMissing { field: "name".into() });
    assert_eq!(err.to_string(), "Field [name] not found");
}

#[test]
fn nullable_null_is_dropped() {
    let mut registry = Registry::new();
    registry
        .declare_json(json!({"name": "Note", "props": {"text": "String|@nullable", "tag": "String|@optional"}}))
        .unwrap();
    let note = registry.get("Note").unwrap();
    assert_eq!(note.extract(&json!({"text": null})).unwrap(), json!({}));
    assert!(note.extract(&json!({"text": "x", "tag": null})).is_err());
}

#[test]
fn field_message_replaces_template() {
    let mut registry = Registry::new();
    registry
        .declare_json(json!({"name": "Login", "props": {"email": "String|@message:bad email|email"}}))
        .unwrap();
    let err = registry.get("Login").unwrap().extract(&json!({"email": "nope"})).unwrap_err();
    assert_eq!(err.to_string(), "bad email");
    assert_eq!(err.kind, ErrorKind::CheckedRuleFailed { field: "email".into(), rule: "email".into() });
}

#[test]
fn unknown_rule_fails_at_validation_time() {
    let mut registry = Registry::new();
    registry.declare_json(json!({"name": "T", "props": {"x": "String|bogus"}})).unwrap();
    let err = registry.get("T").unwrap().extract(&json!({"x": "a"})).unwrap_err();
    assert_eq!(err.kind, ErrorKind::NoSuchRule { rule: "bogus".into() });
}

#[test]
fn self_reference_and_inline_struct() {
    let mut registry = Registry::new();
    registry
        .declare_json(json!({
            "name": "Category",
            "props": {
                "title": "String",
                "children": "Array<Category>|@optional",
                "meta": {"props": {"slug": "String"}, "optional": true},
            },
        }))
        .unwrap();
    let category = registry.get("Category").unwrap();
    let tree = json!({
        "title": "root",
        "children": [{"title": "a", "children": [{"title": "b", "meta": {"slug": "b"}}]}],
    });
    assert_eq!(category.extract(&tree).unwrap(), tree);

    let err = category
        .extract(&json!({"title": "root", "children": [{"title": "a", "children": [{"meta": {}}]}]}))
        .unwrap_err();
    assert_eq!(err.path.as_deref(), Some("children.0.children.0.title"));
}

#[test]
fn create_stops_at_recursive_fields() {
    let mut registry = Registry::new();
    registry
        .declare_json(json!([
            {"name": "Node", "props": {"label": "String", "next": "Node|@optional"}},
            {"name": "Left", "props": {"right": "Right"}},
            {"name": "Right", "props": {"left": "Left", "n": "Int"}},
        ]))
        .unwrap();
    let node = registry.get("Node").unwrap();
    assert_eq!(node.create(None), json!({"label": ""}));
    assert_eq!(
        node.create(Some(&json!({"next": {"label": "b"}}))),
        json!({"label": "", "next": {"label": "b"}})
    );
    assert_eq!(registry.get("Left").unwrap().create(None), json!({"right": {"left": null, "n": 0}}));
}

#[test]
fn strictness_gates_coercion() {
    let mut registry = Registry::new();
    registry
        .declare(StructDecl::new("Loose").prop("n", "Number"))
        .unwrap();
    registry
        .declare(StructDecl::new("Tight").prop("n", "Number").strict(true))
        .unwrap();
    registry
        .declare(SimpleDecl::alias("Exact", "Number").strict(true))
        .unwrap();
    registry
        .declare(StructDecl::new("UsesExact").prop("n", "Exact"))
        .unwrap();

    let input = json!({"n": "3"});
    assert_eq!(registry.get("Loose").unwrap().extract(&input).unwrap(), json!({"n": 3}));
    assert!(registry.get("Tight").unwrap().extract(&input).is_err());
    assert!(registry.get("UsesExact").unwrap().extract(&input).is_err());

    let err = registry.get("Loose").unwrap().extract(&json!({"n": "abc"})).unwrap_err();
    assert_eq!(err.to_string(), "Value [abc] is not of [Number] type");
}

#[test]
fn malformed_declarations_are_rejected() {
    let mut registry = Registry::new();
    let empty_type = registry.declare_json(json!({"name": "A", "props": {"x": "|@optional"}}));
    assert!(matches!(empty_type, Err(SchemaError::MalformedSpec { .. })));

    let dup = registry.declare_json(json!({"name": "E", "enums": [{"key": "a", "value": 1}, {"key": "a", "value": 2}]}));
    assert!(matches!(dup, Err(SchemaError::DuplicateEnumMember { .. })));

    assert!(registry.get("A").is_none());
    assert!(registry.get("E").is_none());
}

#[test]
fn check_in_place_rewrites_document() {
    let registry = shop();
    let mut doc = json!({"id": " o1 ", "audit": {"by": "me"}, "items": [{"name": "a", "price": "2", "sku": 9}]});
    registry.get("Order").unwrap().check_in_place(&mut doc).unwrap();
    assert_eq!(
        doc,
        json!({"id": "o1", "audit": {"by": "me"}, "items": [{"name": "a", "price": 2, "sku": 9}]})
    );
}

#[tokio::test]
async fn async_wrappers_match_sync_path() {
    let registry = shop();
    let order = registry.get("Order").unwrap();
    let input = json!({"id": "o1", "items": [{"name": "a"}], "x": 1});

    let extracted = order.extract_then(&input).await.unwrap();
    assert_eq!(extracted, order.extract(&input).unwrap());

    let checked: Value = order.check_then(input.clone()).await.unwrap();
    assert_eq!(checked, input);

    let err = order.check_then(json!({"items": []})).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::RequiredFieldMissing { field: "id".into() });
}

use super::*;
use crate::error::{OrmError, OrmResult};
use crate::param::ParamSequencer;
use crate::testing::{models, operators, unchecked, widgets};
use proptest::prelude::*;
use std::sync::Arc;

fn compile_one(filter: Filter<'_>) -> Vec<Fragment> {
    let (ops, dialect) = (operators(), unchecked());
    let mut seq = ParamSequencer::new();
    FilterCompiler::new(&ops, &dialect)
        .compile(&[filter.into()], &mut seq)
        .unwrap()
}

#[test]
fn in_renders_one_placeholder_per_value() {
    let entity = models();
    let id = entity.field_by_name("id").unwrap();

    assert!(compile_one(Filter::new(id, Operator::In, Vec::<i32>::new())).is_empty());
    assert_eq!(
        compile_one(Filter::new(id, Operator::In, [12345])),
        vec![Fragment::new("id IN ($1)", vec![Value::I32(12345)])]
    );
    assert_eq!(
        compile_one(Filter::new(id, Operator::NotIn, [12345, 6789]))[0].sql,
        "id NOT IN ($1,$2)"
    );
}

#[test]
fn patterns_wrap_the_literal() {
    let entity = models();
    let id = entity.field_by_name("id").unwrap();
    for (op, bound) in [
        (Operator::Contains, "%name%"),
        (Operator::StartsWith, "name%"),
        (Operator::EndsWith, "%name"),
    ] {
        assert_eq!(
            compile_one(Filter::new(id, op, ["name"])),
            vec![Fragment::new("id LIKE $1", vec![Value::from(bound)])]
        );
    }
}

#[test]
fn patterns_reject_non_strings() {
    let (ops, dialect) = (operators(), unchecked());
    let entity = models();
    let id = entity.field_by_name("id").unwrap();
    let mut seq = ParamSequencer::new();
    let err = FilterCompiler::new(&ops, &dialect)
        .compile(&[Filter::new(id, Operator::Contains, [1]).into()], &mut seq)
        .unwrap_err();
    match err {
        OrmError::InvalidFilterValue {
            operator, field, ..
        } => {
            assert_eq!(operator, "contains");
            assert_eq!(field, "id");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn null_checks_bind_nothing() {
    let entity = models();
    let ptr = entity.field_by_name("string_ptr").unwrap();
    assert_eq!(
        compile_one(Filter::is_null(ptr)),
        vec![Fragment::new("string_ptr IS NULL", vec![])]
    );
    assert_eq!(
        compile_one(Filter::new(ptr, Operator::NotNull, Vec::<Value>::new()))[0].sql,
        "string_ptr IS NOT NULL"
    );
}

#[test]
fn multi_value_comparison_yields_one_fragment_per_value() {
    let entity = models();
    let int = entity.field_by_name("int").unwrap();
    let sql: Vec<String> = compile_one(Filter::new(int, Operator::Gt, [1, 2]))
        .into_iter()
        .map(|f| f.sql)
        .collect();
    assert_eq!(sql, ["int > $1", "int > $2"]);
}

#[test]
fn or_group_parenthesizes_members() {
    let (ops, dialect) = (operators(), unchecked());
    let entity = models();
    let id = entity.field_by_name("id").unwrap();
    let int = entity.field_by_name("int").unwrap();
    let compiler = FilterCompiler::new(&ops, &dialect);

    let mut seq = ParamSequencer::new();
    let group = FilterNode::or([
        Filter::eq(id, 12345),
        Filter::new(id, Operator::Ne, [54321]),
    ]);
    let where_ = compiler.compile_where(&[group], &mut seq).unwrap().unwrap();
    assert_eq!(where_.sql, "(id = $1 OR id <> $2)");
    assert_eq!(where_.values, vec![Value::I32(12345), Value::I32(54321)]);

    let mut seq = ParamSequencer::new();
    let group = FilterNode::or([
        Filter::new(int, Operator::Gt, [1, 2]),
        Filter::eq(id, 3),
    ]);
    let where_ = compiler.compile_where(&[group], &mut seq).unwrap().unwrap();
    assert_eq!(where_.sql, "((int > $1 AND int > $2) OR id = $3)");
}

#[test]
fn or_group_with_one_member_is_bare() {
    let (ops, dialect) = (operators(), unchecked());
    let entity = models();
    let id = entity.field_by_name("id").unwrap();
    let mut seq = ParamSequencer::new();
    let group = FilterNode::or([
        Filter::eq(id, 1),
        Filter::new(id, Operator::In, Vec::<i32>::new()),
    ]);
    let where_ = FilterCompiler::new(&ops, &dialect)
        .compile_where(&[group], &mut seq)
        .unwrap()
        .unwrap();
    assert_eq!(where_.sql, "id = $1");
}

#[test]
fn skipped_fields_are_dropped() {
    let (ops, dialect) = (operators(), unchecked());
    let entity = widgets();
    let cache = entity.field_by_name("cache").unwrap();
    let qty = entity.field_by_name("qty").unwrap();
    let mut seq = ParamSequencer::new();
    let where_ = FilterCompiler::new(&ops, &dialect)
        .compile_where(
            &[Filter::eq(cache, "x").into(), Filter::eq(qty, 2).into()],
            &mut seq,
        )
        .unwrap()
        .unwrap();
    assert_eq!(where_.sql, "qty = $1");
    assert_eq!(seq.issued(), 1);
}

#[test]
fn custom_operator_renders_after_registration() {
    let (mut ops, dialect) = (operators(), unchecked());
    let entity = models();
    let int = entity.field_by_name("int").unwrap();
    let between = Operator::Custom("between".into());
    let filter = Filter::new(int, between.clone(), [1, 9]);

    let mut seq = ParamSequencer::new();
    let err = FilterCompiler::new(&ops, &dialect)
        .compile(&[filter.clone().into()], &mut seq)
        .unwrap_err();
    assert!(matches!(err, OrmError::UnsupportedOperator { .. }));

    let render: CustomRenderer = Arc::new(
        |column: &str, token: &str, filter: &Filter<'_>, seq: &mut ParamSequencer| -> OrmResult<Vec<Fragment>> {
            let lo = seq.placeholder();
            let hi = seq.placeholder();
            Ok(vec![Fragment::new(
                format!("{column} {token} {lo} AND {hi}"),
                filter.values.clone(),
            )])
        },
    );
    ops.register(between, "BETWEEN", Renderer::Custom(render));
    let mut seq = ParamSequencer::new();
    let fragments = FilterCompiler::new(&ops, &dialect)
        .compile(&[filter.into()], &mut seq)
        .unwrap();
    assert_eq!(fragments[0].sql, "int BETWEEN $1 AND $2");
}

#[derive(Debug, Clone)]
enum Leaf {
    Eq(i32),
    In(Vec<i32>),
    Like(String),
    Null,
}

fn arb_leaf() -> impl Strategy<Value = Leaf> {
    prop_oneof![
        any::<i32>().prop_map(Leaf::Eq),
        proptest::collection::vec(any::<i32>(), 0..4).prop_map(Leaf::In),
        "[a-z]{1,6}".prop_map(Leaf::Like),
        Just(Leaf::Null),
    ]
}

fn arb_tree() -> impl Strategy<Value = Vec<Vec<Leaf>>> {
    // Inner vectors of length one are leaves, longer ones OR-groups.
    proptest::collection::vec(proptest::collection::vec(arb_leaf(), 1..4), 0..5)
}

fn build<'a>(entity: &'a crate::model::EntityDescriptor, leaf: &Leaf) -> Filter<'a> {
    let id = entity.field_by_name("id").unwrap();
    let text = entity.field_by_name("attr_string").unwrap();
    match leaf {
        Leaf::Eq(v) => Filter::eq(id, *v),
        Leaf::In(vs) => Filter::new(id, Operator::In, vs.clone()),
        Leaf::Like(s) => Filter::new(text, Operator::StartsWith, [s.as_str()]),
        Leaf::Null => Filter::is_null(text),
    }
}

proptest! {
    #[test]
    fn placeholders_match_values(tree in arb_tree()) {
        let (ops, dialect) = (operators(), unchecked());
        let entity = models();
        let nodes: Vec<FilterNode<'_>> = tree
            .iter()
            .map(|members| match members.as_slice() {
                [leaf] => build(&entity, leaf).into(),
                _ => FilterNode::or(members.iter().map(|leaf| build(&entity, leaf))),
            })
            .collect();

        let mut seq = ParamSequencer::new();
        let where_ = FilterCompiler::new(&ops, &dialect)
            .compile_where(&nodes, &mut seq)
            .unwrap();
        let (sql, values) = where_.map(|f| (f.sql, f.values)).unwrap_or_default();

        prop_assert_eq!(seq.issued(), values.len());
        // Placeholders appear in ascending order, starting at $1.
        let numbers: Vec<usize> = sql
            .split('$')
            .skip(1)
            .map(|rest| {
                rest.chars()
                    .take_while(char::is_ascii_digit)
                    .collect::<String>()
                    .parse()
                    .unwrap()
            })
            .collect();
        prop_assert_eq!(numbers, (1..=values.len()).collect::<Vec<_>>());
    }
}

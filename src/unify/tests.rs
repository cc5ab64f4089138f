use assert2::{assert, check, let_assert};
use test_log::test;

use crate::{
    bindings::Bindings,
    config::UnifyConfig,
    defs::FsRef,
    error::Failure,
    literal::parse,
    store::Store,
    unify::{subsumes, unify, unify_in, unify_scoped, UnifyCache, Unifier},
    value::Value,
};

fn fs(store: &mut Store, src: &str) -> FsRef {
    let_assert!(Ok(fs) = parse(store, src));
    fs
}

/// Parse both literals, unify them in separate scopes and render the result.
fn parse_and_unify(src1: &str, src2: &str) -> Result<String, Failure> {
    let mut store = Store::new();
    let a = fs(&mut store, src1);
    let b = fs(&mut store, src2);
    let unified = tracing::trace_span!("test unifying", src1, src2).in_scope(|| unify(&mut store, a, b))?;
    Ok(store.display(unified).to_string())
}

fn expect_struct(value: Value) -> FsRef {
    let_assert!(Value::Struct(fs) = value);
    fs
}

#[test]
fn unify_disjoint_and_nested_features() {
    check!(
        parse_and_unify("[a=1, b=[c=2]]", "[b=[d=3], e=4]").as_deref()
            == Ok("[a=1, b=[c=2, d=3], e=4]")
    );
    check!(parse_and_unify("[]", "[a=1]").as_deref() == Ok("[a=1]"));
    check!(parse_and_unify("[a=None]", "[a=[b=1]]").as_deref() == Ok("[a=[b=1]]"));
}

#[test]
fn unify_conflicting_atoms() {
    let_assert!(Err(Failure::StructureMismatch { path, left, right }) = parse_and_unify("[p=1]", "[p=2]"));
    check!(path == ["p"]);
    check!(left == "1");
    check!(right == "2");

    let_assert!(Err(failure) = parse_and_unify("[cat=NP, agr=[num=sg]]", "[cat=VP]"));
    check!(!failure.is_fatal());
    check!(failure.path() == ["cat"]);
    check!(failure.to_string() == r#"Structure mismatch at `cat`: `"NP"` does not unify with `"VP"`."#);
}

#[test]
fn unify_structure_with_atom() {
    let_assert!(Err(failure) = parse_and_unify("[a=[b=1]]", "[a=1]"));
    check!(failure.path() == ["a"]);
    let_assert!(Err(failure) = parse_and_unify("[x=[y=sg]]", "[x=[y=[z=1]]]"));
    check!(failure.path() == ["x", "y"]);
}

#[test]
fn unify_atoms_of_different_kinds() {
    check!(parse_and_unify("[a=1]", "[a='1']").is_err());
    check!(parse_and_unify("[a=True]", "[a=True]").as_deref() == Ok("[a=True]"));
    check!(parse_and_unify("[a=True]", "[a=False]").is_err());
}

#[test]
fn unify_bare_values() {
    let mut store = Store::new();
    let_assert!(Ok(one) = unify(&mut store, 1i64, Value::NONE));
    check!(one == Value::from(1i64));
    check!(unify(&mut store, "sg", "pl").is_err());
}

#[test]
fn unification_is_idempotent_and_commutative() {
    let mut store = Store::new();
    let a = fs(&mut store, "[f=(1)[v=1], g->(1), h=[x=?x]]");
    let b = fs(&mut store, "[h=[y=2], i=sg]");

    let_assert!(Ok(aa) = unify(&mut store, a, a));
    check!(store.equal_with_reentrance(&aa, &a.into()));

    let_assert!(Ok(ab) = unify(&mut store, a, b));
    let_assert!(Ok(ba) = unify(&mut store, b, a));
    check!(store.equal_with_reentrance(&ab, &ba));
}

#[test]
fn operands_are_left_untouched() {
    let mut store = Store::new();
    let a = fs(&mut store, "[x=?v, y=[z=1]]");
    let b = fs(&mut store, "[x=5, y=[w=2]]");
    let before = (store.display(a).to_string(), store.display(b).to_string());

    let_assert!(Ok(_) = unify(&mut store, a, b));
    check!(store.display(a).to_string() == before.0);
    check!(store.display(b).to_string() == before.1);

    let c = fs(&mut store, "[y=[z=2]]");
    let_assert!(Err(_) = unify(&mut store, a, c));
    check!(store.display(a).to_string() == before.0);
}

#[test]
fn variable_bound_in_its_own_scope() {
    let mut store = Store::new();
    let a = fs(&mut store, "[x=?v]");
    let b = fs(&mut store, "[x=5]");
    let (mut left, mut right) = (Bindings::new(), Bindings::new());

    let_assert!(Ok(unified) = unify_scoped(&mut store, a, b, &mut left, &mut right));
    check!(store.display(unified).to_string() == "[x=5]");
    check!(left.get("v") == Some(&Value::from(5i64)));
    check!(right.is_empty());
}

#[test]
fn separate_scopes_keep_names_apart() {
    let mut store = Store::new();
    let a = fs(&mut store, "[a=1, b=1, c=?x, d=?x]");
    let b = fs(&mut store, "[a=?x, b=?x, c=2, d=2]");
    let (mut left, mut right) = (Bindings::new(), Bindings::new());

    let_assert!(Ok(unified) = unify_scoped(&mut store, a, b, &mut left, &mut right));
    check!(store.display(unified).to_string() == "[a=1, b=1, c=2, d=2]");
    check!(left.display(&store).to_string() == "{x: 2}");
    check!(right.display(&store).to_string() == "{x: 1}");

    // The same pair in one scope is contradictory.
    let mut shared = Bindings::new();
    let_assert!(Err(Failure::StructureMismatch { .. }) = unify_in(&mut store, a, b, &mut shared));
    check!(shared.is_empty());
}

#[test]
fn unified_variables_become_aliases() {
    let mut store = Store::new();
    let a = fs(&mut store, "[a=?x, b=?x]");
    let b = fs(&mut store, "[b=?y, c=?y]");
    let mut bindings = Bindings::new();

    let_assert!(Ok(unified) = unify_in(&mut store, a, b, &mut bindings));
    check!(store.display(unified.clone()).to_string() == "[a=?y, b=?y, c=?y]");
    check!(bindings.display(&store).to_string() == "{x: ?y}");

    let unified = expect_struct(unified);
    check!(store.get(unified, "a") == store.get(unified, "c"));
}

#[test]
fn aliased_variable_carries_its_value() {
    let mut store = Store::new();
    let a = fs(&mut store, "[a=?x, b=?x, c=sg]");
    let b = fs(&mut store, "[a=?y, c=?y]");
    let mut bindings = Bindings::new();

    let_assert!(Ok(unified) = unify_in(&mut store, a, b, &mut bindings));
    check!(store.display(unified).to_string() == r#"[a="sg", b="sg", c="sg"]"#);
    check!(bindings.get("x") == Some(&Value::from("sg")));
    check!(bindings.get("y") == Some(&Value::from("sg")));
}

#[test]
fn bindings_are_reused_across_calls() {
    let mut store = Store::new();
    let a = fs(&mut store, "[a=?x]");
    let b = fs(&mut store, "[a=[]]");
    let mut bindings = Bindings::new();

    let_assert!(Ok(first) = unify_in(&mut store, a, b, &mut bindings));
    let first = expect_struct(first);
    let c = fs(&mut store, "[b=?x]");
    let_assert!(Ok(second) = unify_in(&mut store, first, c, &mut bindings));

    check!(store.display(second.clone()).to_string() == "[a=(1)[], b->(1)]");
    let second = expect_struct(second);
    check!(bindings.get("x") == store.get(second, "b"));
}

#[test]
fn pre_bound_names_are_substituted() {
    let mut store = Store::new();
    let a = fs(&mut store, "[num=?n]");
    let b = fs(&mut store, "[per=3]");
    let mut bindings = Bindings::new();
    bindings.insert("n", "sg");

    let_assert!(Ok(unified) = unify_in(&mut store, a, b, &mut bindings));
    check!(store.display(unified).to_string() == r#"[num="sg", per=3]"#);

    let c = fs(&mut store, "[num=pl]");
    let_assert!(Err(_) = unify_in(&mut store, a, c, &mut bindings));
    check!(bindings.get("n") == Some(&Value::from("sg")));
}

#[test]
fn reentrance_is_preserved() {
    let mut store = Store::new();
    let a = fs(&mut store, "[f=(1)[v=1], g->(1)]");
    let b = fs(&mut store, "[g=[v=1, w=2]]");

    let_assert!(Ok(unified) = unify(&mut store, a, b));
    let unified = expect_struct(unified);
    check!(store.get(unified, "f") == store.get(unified, "g"));
    check!(store.get_path(unified, &["f", "w"]) == Some(Value::from(2i64)));
    check!(store.display(unified).to_string() == "[f=(1)[v=1, w=2], g->(1)]");
}

#[test]
fn reentrance_from_either_side() {
    let expected = r#"[A=(1)[B="b", C="c", D="d"], E=[F->(1)]]"#;
    let left = "[A=(1)[B=b], E=[F->(1)]]";
    let right = "[A=[C=c], E=[F=[D=d]]]";
    check!(parse_and_unify(left, right).as_deref() == Ok(expected));
    check!(parse_and_unify(right, left).as_deref() == Ok(expected));
}

#[test]
fn reentrance_forces_equal_values() {
    let_assert!(Err(failure) = parse_and_unify("[a=(1)[], b->(1)]", "[a=[x=1], b=[x=2]]"));
    check!(failure.path() == ["b", "x"]);
}

#[test]
fn cycles_through_reentrance() {
    let mut store = Store::new();
    let a = fs(&mut store, "[F=(1)[], G->(1)]");
    let b = fs(&mut store, "[F=[H=(2)[]], G->(2)]");

    let_assert!(Ok(unified) = unify(&mut store, a, b));
    check!(store.display(unified.clone()).to_string() == "[F=(1)[H->(1)], G->(1)]");
    let unified = expect_struct(unified);
    let_assert!(Some(f) = store.get(unified, "F").cloned());
    check!(store.get_path(unified, &["F", "H"]) == Some(f.clone()));
    check!(store.get_path(unified, &["F", "H", "H", "H"]) == Some(f));
}

#[test]
fn cycles_through_shared_variable() {
    let mut store = Store::new();
    let a = fs(&mut store, "[F=[H=?x]]");
    let b = fs(&mut store, "[F=?x]");
    let mut bindings = Bindings::new();

    let_assert!(Ok(unified) = unify_in(&mut store, a, b, &mut bindings));
    check!(store.display(unified.clone()).to_string() == "[F=(1)[H->(1)]]");
    let unified = expect_struct(unified);
    check!(store.get_path(unified, &["F", "H"]) == store.get_path(unified, &["F"]));
}

#[test]
fn unifying_cyclic_structures_terminates() {
    let mut store = Store::new();
    let a = fs(&mut store, "(1)[next->(1), v=1]");
    let b = fs(&mut store, "[next=[next=[w=2]]]");

    let_assert!(Ok(unified) = unify(&mut store, a, b));
    let unified = expect_struct(unified);
    check!(store.get_path(unified, &["next", "next", "next", "w"]) == Some(Value::from(2i64)));
    check!(store.get_path(unified, &["next", "v"]) == Some(Value::from(1i64)));
}

fn nested(depth: usize, leaf: &str) -> String {
    format!("{}{leaf}{}", "[a=".repeat(depth), "]".repeat(depth))
}

#[test]
fn shallow_nesting_is_fine() {
    check!(parse_and_unify(&nested(20, "1"), &nested(20, "1")).is_ok());
    let_assert!(Err(failure) = parse_and_unify(&nested(20, "1"), &nested(20, "2")));
    check!(!failure.is_fatal());
    check!(failure.path().len() == 20);
}

#[test]
fn depth_limit_is_fatal() {
    let mut store = Store::new();
    let a = fs(&mut store, &nested(60, "1"));
    let b = fs(&mut store, &nested(60, "1"));
    let (structs, vars) = (store.struct_count(), store.var_count());

    let_assert!(Err(failure) = unify(&mut store, a, b));
    let_assert!(Failure::MaxRecursionExceeded { limit, .. } = &failure);
    check!(*limit == 50);
    check!(failure.is_fatal());
    check!(store.struct_count() == structs);
    check!(store.var_count() == vars);

    // Fatal failures are not "does not subsume".
    check!(subsumes(&mut store, a, b).is_err());

    let config = UnifyConfig { max_depth: 100 };
    check!(Unifier::with_config(&mut store, config).unify(a, b).is_ok());
}

#[test]
fn failure_restores_bindings_and_store() {
    let mut store = Store::new();
    let a = fs(&mut store, "[a=?x, b=1]");
    let b = fs(&mut store, "[a=2, b=2]");
    let (structs, vars) = (store.struct_count(), store.var_count());
    let mut bindings = Bindings::new();
    bindings.insert("y", "kept");

    let_assert!(Err(_) = unify_in(&mut store, a, b, &mut bindings));
    check!(bindings.len() == 1);
    check!(bindings.get("y") == Some(&Value::from("kept")));
    check!(store.struct_count() == structs);
    check!(store.var_count() == vars);
}

#[test]
fn cached_results_are_reused() {
    let mut store = Store::new();
    let a = fs(&mut store, "[a=1]");
    let b = fs(&mut store, "[b=2]");
    let c = fs(&mut store, "[a=2]");
    let mut cache = UnifyCache::new();
    let mut unifier = Unifier::new(&mut store).with_cache(&mut cache);

    let_assert!(Ok(first) = unifier.unify(a, b));
    let_assert!(Ok(second) = unifier.unify(a, b));
    check!(first == second);

    let_assert!(Err(first) = unifier.unify(a, c));
    let_assert!(Err(second) = unifier.unify(a, c));
    check!(first == second);

    drop(unifier);
    check!(cache.len() == 2);
    cache.clear();
    assert!(cache.is_empty());
}

#[test]
fn subsumption() {
    let mut store = Store::new();
    let general = fs(&mut store, "[a=1]");
    let specific = fs(&mut store, "[a=1, b=2]");
    let other = fs(&mut store, "[a=2]");
    let with_var = fs(&mut store, "[a=?x, b=2]");

    check!(subsumes(&mut store, general, specific) == Ok(true));
    check!(subsumes(&mut store, specific, general) == Ok(false));
    check!(subsumes(&mut store, general, other) == Ok(false));
    check!(subsumes(&mut store, with_var, specific) == Ok(true));
}

#[test]
fn displayed_results_parse_back() {
    let mut store = Store::new();
    let a = fs(&mut store, "[F=(1)[], G->(1), s='a \"q\"']");
    let b = fs(&mut store, "[F=[H=(2)[]], G->(2), n=-3, t=True]");

    let_assert!(Ok(unified) = unify(&mut store, a, b));
    let shown = store.display(unified.clone()).to_string();
    let reparsed = fs(&mut store, &shown);
    check!(store.equal_with_reentrance(&unified, &reparsed.into()));
}

#[test]
fn aliases_hold_across_calls() {
    let mut store = Store::new();
    let a = fs(&mut store, "[a=?x]");
    let b = fs(&mut store, "[a=?y]");
    let mut bindings = Bindings::new();

    let_assert!(Ok(_) = unify_in(&mut store, a, b, &mut bindings));
    check!(bindings.display(&store).to_string() == "{x: ?y}");

    let c = fs(&mut store, "[p=?x, q=?y]");
    let d = fs(&mut store, "[p=1]");
    let_assert!(Ok(unified) = unify_in(&mut store, c, d, &mut bindings));
    check!(store.display(unified).to_string() == "[p=1, q=1]");
    check!(bindings.get("x") == Some(&Value::from(1i64)));
    check!(bindings.get("y") == Some(&Value::from(1i64)));
}

#[test]
fn caller_supplied_alias_ties_names() {
    let mut store = Store::new();
    let a = fs(&mut store, "[a=?y, b=?x]");
    let b = fs(&mut store, "[b=sg]");
    let mut bindings = Bindings::new();
    let y = store.new_var(Some("y"));
    bindings.insert("x", y);

    let_assert!(Ok(unified) = unify_in(&mut store, a, b, &mut bindings));
    check!(store.display(unified).to_string() == r#"[a="sg", b="sg"]"#);
    check!(bindings.get("x") == Some(&Value::from("sg")));
    check!(store.var_value(y).is_none());
}

#[test]
fn shared_scope_unification_is_commutative() {
    let mut store = Store::new();
    let a = fs(&mut store, "[a=?x, b=1]");
    let b = fs(&mut store, "[a=2, c=?x]");

    let (mut ab_bindings, mut ba_bindings) = (Bindings::new(), Bindings::new());
    let_assert!(Ok(ab) = unify_in(&mut store, a, b, &mut ab_bindings));
    let_assert!(Ok(ba) = unify_in(&mut store, b, a, &mut ba_bindings));
    check!(store.display(ab.clone()).to_string() == "[a=2, b=1, c=2]");
    check!(store.equal_with_reentrance(&ab, &ba));
    check!(ab_bindings == ba_bindings);

    // Unbound on both sides: whichever name survives, all three share it.
    let c = fs(&mut store, "[a=?x, b=?y]");
    let d = fs(&mut store, "[a=?y, c=?x]");
    for (left, right) in [(c, d), (d, c)] {
        let mut bindings = Bindings::new();
        let_assert!(Ok(unified) = unify_in(&mut store, left, right, &mut bindings));
        let unified = expect_struct(unified);
        let_assert!(Some(Value::Var(shared)) = store.get(unified, "a").cloned());
        check!(store.get(unified, "b") == Some(&Value::Var(shared)));
        check!(store.get(unified, "c") == Some(&Value::Var(shared)));
        check!(bindings.len() == 1);
    }
}

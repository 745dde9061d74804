//! Scenario tests for the expression checker.
//!
//! These tests drive the public API only: an environment populated through the
//! declaration helpers, a 16-bit layout policy, and one checked expression.

use anyhow::Result;
use ember_sema::feedback::DiagnosticReport;
use ember_sema::frontend::ast::{Field, FunctionDecl, Param, StructDecl, TraitDecl};
use ember_sema::frontend::declarations::{
    declare_builtins, declare_function, declare_struct, declare_trait, declare_type_alias,
    declare_variable,
};
use ember_sema::types::{IntWidth, StorageClass, Visibility};
use ember_sema::{
    check_expression, BinOp, CompilerError, Environment, ErrorCategory, Expr, ExprChecker, Ident,
    MemoryLayout, Span, Type, TypeExpr,
};
use pretty_assertions::assert_eq;

/// Sizes on the 16-bit stack machine
struct StackMachineLayout;

impl MemoryLayout for StackMachineLayout {
    fn size_of(&self, ty: &Type) -> usize {
        match ty {
            Type::Void => 0,
            Type::Arithmetic(kind) => kind.width().map_or(2, |w| (w.bits() / 8) as usize),
            Type::Boolean(_) => 1,
            Type::Pointer(_) | Type::Function(_) => 2,
            Type::Array { count, element } => count.unwrap_or(0) * self.size_of(element),
            Type::DynamicArray(_) | Type::Trait(_) => 4,
            Type::Struct(s) => s.members.iter().map(|m| self.size_of(&m.ty)).sum(),
            Type::Union(members) => {
                1 + members.iter().map(|m| self.size_of(m)).max().unwrap_or(0)
            }
            Type::GenericFunction(_) | Type::GenericStruct(_) | Type::GenericTrait(_) => 0,
        }
    }
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn ident(name: &str) -> Ident {
    Ident::new(name, Span::dummy())
}

fn named(name: &str) -> TypeExpr {
    TypeExpr::named(name)
}

fn environment() -> Result<Environment> {
    let mut env = Environment::new();
    declare_builtins(&mut env, &StackMachineLayout)?;
    Ok(env)
}

fn variable(env: &mut Environment, name: &str, ty: Type) -> Result<()> {
    declare_variable(env, &ident(name), ty, StorageClass::Automatic, 0)?;
    Ok(())
}

fn struct_decl(name: &str, type_params: &[&str], fields: &[(&str, TypeExpr)]) -> StructDecl {
    StructDecl {
        name: ident(name),
        type_params: type_params.iter().map(|p| ident(p)).collect(),
        fields: fields
            .iter()
            .map(|(field, ty)| Field {
                name: ident(field),
                ty: ty.clone(),
                span: Span::dummy(),
            })
            .collect(),
        span: Span::dummy(),
    }
}

fn check(env: &Environment, expr: &Expr) -> ember_sema::Result<Type> {
    check_expression(env, &StackMachineLayout, expr)
}

// ==================== Promotion ====================

#[test]
fn test_literal_too_wide_for_u8_promotes_to_u16() -> Result<()> {
    init_logging();
    let mut env = environment()?;
    variable(&mut env, "x", Type::U8)?;

    let expr = Expr::binary(Expr::int(1000), BinOp::Add, Expr::ident("x"));
    assert_eq!(check(&env, &expr)?, Type::U16);

    let expr = Expr::binary(Expr::int(100), BinOp::Add, Expr::ident("x"));
    assert_eq!(check(&env, &expr)?, Type::U8);
    Ok(())
}

#[test]
fn test_widening_is_symmetric() -> Result<()> {
    let mut env = environment()?;
    variable(&mut env, "a", Type::U8)?;
    variable(&mut env, "b", Type::U16)?;

    let ops = [
        BinOp::Add,
        BinOp::Sub,
        BinOp::Mul,
        BinOp::Div,
        BinOp::Mod,
        BinOp::BitAnd,
        BinOp::BitOr,
        BinOp::BitXor,
        BinOp::Shl,
        BinOp::Shr,
    ];
    for op in ops {
        let forward = Expr::binary(Expr::ident("a"), op, Expr::ident("b"));
        let backward = Expr::binary(Expr::ident("b"), op, Expr::ident("a"));
        assert_eq!(check(&env, &forward)?, Type::U16, "a {} b", op);
        assert_eq!(check(&env, &backward)?, Type::U16, "b {} a", op);
    }
    Ok(())
}

#[test]
fn test_exact_folding() -> Result<()> {
    let env = environment()?;
    let cases = [
        (BinOp::Add, 40000, 40000, 80000),
        (BinOp::Sub, 3, 10, -7),
        (BinOp::Mul, -4, 9, -36),
        (BinOp::Div, -9, 2, -4),
        (BinOp::Mod, -9, 2, -1),
        (BinOp::Shr, 256, 4, 16),
    ];
    for (op, a, b, expected) in cases {
        let expr = Expr::binary(Expr::int(a), op, Expr::int(b));
        assert_eq!(check(&env, &expr)?, Type::comptime_int(expected), "{} {} {}", a, op, b);
    }

    let by_zero = Expr::binary(Expr::int(1), BinOp::Div, Expr::int(0));
    assert_eq!(check(&env, &by_zero).unwrap_err().category(), ErrorCategory::Overflow);
    Ok(())
}

#[test]
fn test_boolean_purity() -> Result<()> {
    let mut env = environment()?;
    variable(&mut env, "flag", Type::BOOL)?;
    variable(&mut env, "n", Type::U8)?;

    let ordered = Expr::binary(Expr::ident("flag"), BinOp::Lt, Expr::ident("flag"));
    assert!(matches!(
        check(&env, &ordered).unwrap_err(),
        CompilerError::InvalidBooleanOperands { .. }
    ));

    let equal = Expr::binary(Expr::ident("flag"), BinOp::Eq, Expr::ident("flag"));
    assert_eq!(check(&env, &equal)?, Type::BOOL);

    let logical = Expr::binary(Expr::ident("n"), BinOp::Or, Expr::ident("flag"));
    assert_eq!(check(&env, &logical).unwrap_err().category(), ErrorCategory::TypeMismatch);
    Ok(())
}

// ==================== Conversion ====================

#[test]
fn test_range_check_is_a_closed_interval() -> Result<()> {
    let mut env = environment()?;
    variable(&mut env, "small", Type::U8)?;
    variable(&mut env, "signed", Type::I8)?;

    for (value, fits) in [(0, true), (255, true), (256, false), (-1, false)] {
        let expr = Expr::assign(Expr::ident("small"), Expr::int(value));
        assert_eq!(check(&env, &expr).is_ok(), fits, "u8 = {}", value);
    }
    for (value, fits) in [(-128, true), (127, true), (128, false), (-129, false)] {
        let expr = Expr::assign(Expr::ident("signed"), Expr::int(value));
        assert_eq!(check(&env, &expr).is_ok(), fits, "i8 = {}", value);
    }
    Ok(())
}

#[test]
fn test_narrowing_is_one_directional() -> Result<()> {
    let mut env = environment()?;
    for (name, ty) in [("u8v", Type::U8), ("u16v", Type::U16), ("i8v", Type::I8), ("i16v", Type::I16)] {
        variable(&mut env, name, ty)?;
    }

    for (to, from) in [("u16v", "u8v"), ("i16v", "i8v")] {
        assert!(check(&env, &Expr::assign(Expr::ident(to), Expr::ident(from))).is_ok());
    }
    for (to, from, ty) in [
        ("u8v", "u16v", "u8"),
        ("i8v", "i16v", "i8"),
        ("i16v", "u16v", "i16"),
        ("i8v", "u8v", "i8"),
    ] {
        let assign = Expr::assign(Expr::ident(to), Expr::ident(from));
        assert!(check(&env, &assign).is_err(), "{} = {}", to, from);
        let cast = Expr::assign(Expr::ident(to), Expr::cast(Expr::ident(from), named(ty)));
        assert!(check(&env, &cast).is_ok(), "{} = {} as {}", to, from, ty);
    }
    Ok(())
}

#[test]
fn test_union_cast_names_signature() -> Result<()> {
    let mut env = environment()?;
    let union = TypeExpr::Union(vec![named("u8"), named("u16")], Span::dummy());
    let small = declare_type_alias(&mut env, &StackMachineLayout, &ident("Small"), &union)?;
    variable(&mut env, "v", small)?;

    let extract = Expr::cast(Expr::ident("v"), named("u16"));
    assert_eq!(check(&env, &extract)?, Type::U16);

    let err = check(&env, &Expr::cast(Expr::ident("v"), named("bool"))).unwrap_err();
    assert_eq!(err.to_string(), "cannot extract `bool` from union type `u8 | u16`");

    let store = Expr::assign(Expr::ident("v"), Expr::int(7));
    assert_eq!(check(&env, &store)?.to_string(), "u8 | u16");
    Ok(())
}

// ==================== Members and Subscripts ====================

#[test]
fn test_member_access_through_pointer() -> Result<()> {
    let mut env = environment()?;
    let decl = struct_decl("Struct", &[], &[("bar", named("u16"))]);
    let ty = declare_struct(&mut env, &StackMachineLayout, &decl)?;
    variable(&mut env, "foo", Type::pointer(ty))?;

    assert_eq!(check(&env, &Expr::member(Expr::ident("foo"), "bar"))?, Type::U16);
    Ok(())
}

#[test]
fn test_slice_of_fixed_array() -> Result<()> {
    let mut env = environment()?;
    variable(&mut env, "arr", Type::array(Some(10), Type::U8))?;

    let slice = Expr::index(Expr::ident("arr"), Expr::range(Expr::int(0), Expr::int(2)));
    assert_eq!(check(&env, &slice)?, Type::dynamic_array(Type::U8));
    Ok(())
}

// ==================== Generics ====================

#[test]
fn test_template_arity_error_names_application() -> Result<()> {
    let mut env = environment()?;
    let decl = struct_decl("Foo", &["T"], &[("value", named("T"))]);
    declare_struct(&mut env, &StackMachineLayout, &decl)?;

    let applied = TypeExpr::Apply {
        name: ident("Foo"),
        args: vec![named("u16"), named("u16")],
        span: Span::dummy(),
    };
    let expr = Expr::StructInit {
        ty: applied,
        fields: vec![],
        span: Span::dummy(),
    };
    let err = check(&env, &expr).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::ArityMismatch);
    assert!(err.to_string().contains("Foo@[u16, u16]"), "{}", err);

    let report = DiagnosticReport::from_error(&err, "main.em");
    assert_eq!(report.code, "E0004");
    Ok(())
}

#[test]
fn test_repeated_application_is_one_type() -> Result<()> {
    let mut env = environment()?;
    let decl = struct_decl("Foo", &["T"], &[("value", named("T")), ("next", named("u8"))]);
    declare_struct(&mut env, &StackMachineLayout, &decl)?;

    let applied = TypeExpr::Apply {
        name: ident("Foo"),
        args: vec![named("u16")],
        span: Span::dummy(),
    };
    let checker = ExprChecker::new(&env, &StackMachineLayout);
    let first = checker.resolve_type(&applied)?;
    let second = ExprChecker::new(&env, &StackMachineLayout).resolve_type(&applied)?;
    assert_eq!(first, second);
    assert_eq!(env.cache().len(), 1);

    let Type::Struct(foo) = &first else {
        anyhow::bail!("expected a struct, got {}", first);
    };
    let offsets: Vec<usize> = foo.members.iter().map(|m| m.offset).collect();
    assert_eq!(offsets, vec![0, 2]);
    Ok(())
}

#[test]
fn test_qualified_application_is_distinct() -> Result<()> {
    let mut env = environment()?;
    let decl = struct_decl("Foo", &["T"], &[("bar", named("T"))]);
    declare_struct(&mut env, &StackMachineLayout, &decl)?;

    let apply = |arg: TypeExpr| TypeExpr::Apply {
        name: ident("Foo"),
        args: vec![arg],
        span: Span::dummy(),
    };
    let constant = apply(TypeExpr::Const(Box::new(named("u16")), Span::dummy()));
    let frozen = ExprChecker::new(&env, &StackMachineLayout).resolve_type(&constant)?;
    let plain = ExprChecker::new(&env, &StackMachineLayout).resolve_type(&apply(named("u16")))?;
    assert_eq!(frozen.to_string(), "Foo@[const u16]");
    assert_eq!(plain.to_string(), "Foo@[u16]");
    assert_eq!(env.cache().len(), 2);

    variable(&mut env, "a", plain)?;
    variable(&mut env, "b", frozen)?;
    let store = |name: &str| Expr::assign(Expr::member(Expr::ident(name), "bar"), Expr::int(7));
    assert_eq!(check(&env, &store("a"))?, Type::U16);
    assert!(matches!(
        check(&env, &store("b")).unwrap_err(),
        CompilerError::AssignToImmutable { .. }
    ));
    Ok(())
}

#[test]
fn test_linked_struct() -> Result<()> {
    init_logging();
    let mut env = environment()?;
    let pointer = TypeExpr::Pointer(Box::new(named("Node")), Span::dummy());
    let decl = struct_decl("Node", &[], &[("value", named("i16")), ("next", pointer)]);
    let node = declare_struct(&mut env, &StackMachineLayout, &decl)?;
    variable(&mut env, "head", node)?;

    let hops = Expr::member(
        Expr::member(Expr::member(Expr::ident("head"), "next"), "next"),
        "value",
    );
    assert_eq!(check(&env, &hops)?, Type::I16);
    Ok(())
}

#[test]
fn test_pointer_extracted_from_union() -> Result<()> {
    let mut env = environment()?;
    let union = Type::union_of(vec![Type::pointer(Type::U8), Type::U16]);
    variable(&mut env, "v", union)?;

    let cast = Expr::cast(Expr::ident("v"), TypeExpr::Pointer(Box::new(named("u8")), Span::dummy()));
    assert_eq!(check(&env, &cast)?, Type::pointer(Type::U8));
    Ok(())
}

#[test]
fn test_generic_function_inference() -> Result<()> {
    let mut env = environment()?;
    let first = FunctionDecl {
        name: ident("first"),
        type_params: vec![ident("T")],
        params: vec![Param {
            name: ident("items"),
            ty: TypeExpr::DynamicArray(Box::new(named("T")), Span::dummy()),
            span: Span::dummy(),
        }],
        ret_type: Some(named("T")),
        span: Span::dummy(),
    };
    declare_function(&mut env, &StackMachineLayout, &first, Visibility::Public)?;
    variable(&mut env, "arr", Type::array(Some(4), Type::I16))?;

    let call = Expr::call(Expr::ident("first"), vec![Expr::ident("arr")]);
    assert_eq!(check(&env, &call)?, Type::I16);
    Ok(())
}

// ==================== Is-Test ====================

#[test]
fn test_static_is_test() -> Result<()> {
    let mut env = environment()?;
    assert_eq!(check(&env, &Expr::is(Expr::int(3), named("u8")))?, Type::comptime_bool(true));
    assert_eq!(check(&env, &Expr::is(Expr::int(3), named("bool")))?, Type::comptime_bool(false));

    variable(&mut env, "v", Type::union_of(vec![Type::U8, Type::BOOL]))?;
    assert_eq!(check(&env, &Expr::is(Expr::ident("v"), named("bool")))?, Type::BOOL);
    assert_eq!(
        check(&env, &Expr::is(Expr::ident("v"), named("i16")))?,
        Type::comptime_bool(false)
    );
    Ok(())
}

// ==================== Traits ====================

#[test]
fn test_trait_value_converts_to_trait_object() -> Result<()> {
    let mut env = environment()?;
    let area = FunctionDecl {
        name: ident("area"),
        type_params: vec![],
        params: vec![],
        ret_type: Some(named("u16")),
        span: Span::dummy(),
    };
    let decl = TraitDecl {
        name: ident("Shape"),
        type_params: vec![],
        methods: vec![area],
        span: Span::dummy(),
    };
    let shape = declare_trait(&mut env, &StackMachineLayout, &decl)?;
    variable(&mut env, "shape", shape)?;
    let object = env
        .lookup_type("__Shape_object")
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("trait object missing"))?;
    variable(&mut env, "handle", Type::pointer(object))?;

    let call = Expr::call(Expr::member(Expr::ident("shape"), "area"), vec![]);
    assert_eq!(check(&env, &call)?, Type::U16);

    let store = Expr::assign(Expr::ident("handle"), Expr::ident("shape"));
    assert_eq!(check(&env, &store)?.to_string(), "*__Shape_object");
    Ok(())
}

// ==================== Bindings ====================

#[test]
fn test_binding_inference() -> Result<()> {
    let env = environment()?;
    let mut checker = ExprChecker::new(&env, &StackMachineLayout);
    assert_eq!(checker.check_binding(&Expr::int(200), None, false)?, Type::U8);
    assert_eq!(checker.check_binding(&Expr::int(-200), None, false)?, Type::I16);
    assert_eq!(
        checker.check_binding(&Expr::int(200), None, true)?,
        Type::const_int(IntWidth::U8)
    );
    Ok(())
}

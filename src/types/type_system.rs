//! Type System for Ember
//!
//! The closed set of type variants the checker assigns to expressions. Every
//! concrete type is fully resolved; generic declarations live on as templates
//! until they are applied to type arguments.

use std::fmt;
use std::rc::Rc;

use crate::frontend::ast::{FunctionDecl, StructDecl, TraitDecl};
use crate::frontend::environment::ScopeId;

// ==================== Integer Widths ====================

/// Bit-size and signedness class of a sized integer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntWidth {
    I8,
    U8,
    I16,
    U16,
}

impl IntWidth {
    pub fn min_value(self) -> i64 {
        match self {
            Self::I8 => i8::MIN as i64,
            Self::U8 | Self::U16 => 0,
            Self::I16 => i16::MIN as i64,
        }
    }

    pub fn max_value(self) -> i64 {
        match self {
            Self::I8 => i8::MAX as i64,
            Self::U8 => u8::MAX as i64,
            Self::I16 => i16::MAX as i64,
            Self::U16 => u16::MAX as i64,
        }
    }

    /// Whether `value` lies in the closed interval this width can represent
    pub fn contains(self, value: i64) -> bool {
        self.min_value() <= value && value <= self.max_value()
    }

    pub fn is_signed(self) -> bool {
        matches!(self, Self::I8 | Self::I16)
    }

    pub fn bits(self) -> u32 {
        match self {
            Self::I8 | Self::U8 => 8,
            Self::I16 | Self::U16 => 16,
        }
    }

    /// Position in the promotion order i8 < u8 < i16 < u16
    fn rank(self) -> u8 {
        match self {
            Self::I8 => 0,
            Self::U8 => 1,
            Self::I16 => 2,
            Self::U16 => 3,
        }
    }

    /// Result width of a binary operation on two sized operands
    pub fn wider(self, other: IntWidth) -> IntWidth {
        if self.rank() >= other.rank() {
            self
        } else {
            other
        }
    }

    /// Narrowest width holding `value`, tried in the order u8, i8, u16, i16
    pub fn narrowest_for(value: i64) -> Option<IntWidth> {
        [Self::U8, Self::I8, Self::U16, Self::I16]
            .into_iter()
            .find(|w| w.contains(value))
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::I8 => "i8",
            Self::U8 => "u8",
            Self::I16 => "i16",
            Self::U16 => "u16",
        }
    }
}

// ==================== Kinds ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithmeticKind {
    /// Integer whose exact value is known during checking
    CompileTimeInt(i64),
    MutableInt(IntWidth),
    ImmutableInt(IntWidth),
}

impl ArithmeticKind {
    pub fn width(self) -> Option<IntWidth> {
        match self {
            Self::CompileTimeInt(_) => None,
            Self::MutableInt(w) | Self::ImmutableInt(w) => Some(w),
        }
    }

    pub fn constant(self) -> Option<i64> {
        match self {
            Self::CompileTimeInt(v) => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BooleanKind {
    CompileTimeBool(bool),
    MutableBool,
    ImmutableBool,
}

impl BooleanKind {
    pub fn constant(self) -> Option<bool> {
        match self {
            Self::CompileTimeBool(b) => Some(b),
            _ => None,
        }
    }
}

// ==================== Storage ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageClass {
    /// Fixed address in the data segment
    Static,
    /// Frame-relative slot on the stack
    Automatic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    Public,
    Private,
}

/// One row of a struct or trait field table
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub name: String,
    pub ty: Type,
    pub offset: usize,
    pub storage: StorageClass,
}

// ==================== Nominal Types ====================

#[derive(Debug, Clone)]
pub struct StructType {
    /// Display name, e.g. `Foo` or `Foo@[u16]`
    pub name: String,
    /// Deterministic symbol name, unique per concrete type
    pub mangled_name: String,
    pub members: Vec<Member>,
}

impl StructType {
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }
}

/// Structs are nominal; a struct referenced from its own fields compares
/// equal to the finished definition
impl PartialEq for StructType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.mangled_name == other.mangled_name
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TraitType {
    pub name: String,
    pub mangled_name: String,
    /// Method table; each entry is a function signature
    pub members: Vec<Member>,
    /// Name of the struct used as this trait's runtime object
    pub trait_object_name: String,
}

impl TraitType {
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct FunctionType {
    pub name: Option<String>,
    pub mangled_name: Option<String>,
    pub params: Vec<Type>,
    pub return_type: Type,
}

impl FunctionType {
    pub fn new(params: Vec<Type>, return_type: Type) -> Self {
        Self {
            name: None,
            mangled_name: None,
            params,
            return_type,
        }
    }

    pub fn named(name: &str, params: Vec<Type>, return_type: Type) -> Self {
        Self {
            name: Some(name.to_string()),
            mangled_name: Some(name.to_string()),
            params,
            return_type,
        }
    }
}

/// Function types are compared by signature only
impl PartialEq for FunctionType {
    fn eq(&self, other: &Self) -> bool {
        self.params == other.params && self.return_type == other.return_type
    }
}

// ==================== Templates ====================

/// An unsubstituted generic declaration and the scope it was declared in
#[derive(Debug, Clone)]
pub struct Template<D> {
    pub name: String,
    pub params: Vec<String>,
    pub decl: D,
    pub scope: ScopeId,
}

impl<D> PartialEq for Template<D> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.scope == other.scope
    }
}

pub type StructTemplate = Template<StructDecl>;
pub type FunctionTemplate = Template<FunctionDecl>;
pub type TraitTemplate = Template<TraitDecl>;

// ==================== Types ====================

/// Fully resolved type of an expression
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Void,
    Arithmetic(ArithmeticKind),
    Boolean(BooleanKind),
    Pointer(Box<Type>),
    Array { count: Option<usize>, element: Box<Type> },
    DynamicArray(Box<Type>),
    Function(Rc<FunctionType>),
    GenericFunction(Rc<FunctionTemplate>),
    Struct(Rc<StructType>),
    GenericStruct(Rc<StructTemplate>),
    /// Member order is the runtime tag order
    Union(Vec<Type>),
    Trait(Rc<TraitType>),
    GenericTrait(Rc<TraitTemplate>),
}

impl Type {
    pub const U8: Self = Self::Arithmetic(ArithmeticKind::MutableInt(IntWidth::U8));
    pub const I8: Self = Self::Arithmetic(ArithmeticKind::MutableInt(IntWidth::I8));
    pub const U16: Self = Self::Arithmetic(ArithmeticKind::MutableInt(IntWidth::U16));
    pub const I16: Self = Self::Arithmetic(ArithmeticKind::MutableInt(IntWidth::I16));
    pub const BOOL: Self = Self::Boolean(BooleanKind::MutableBool);

    pub fn int(width: IntWidth) -> Self {
        Self::Arithmetic(ArithmeticKind::MutableInt(width))
    }

    pub fn const_int(width: IntWidth) -> Self {
        Self::Arithmetic(ArithmeticKind::ImmutableInt(width))
    }

    pub fn comptime_int(value: i64) -> Self {
        Self::Arithmetic(ArithmeticKind::CompileTimeInt(value))
    }

    pub fn comptime_bool(value: bool) -> Self {
        Self::Boolean(BooleanKind::CompileTimeBool(value))
    }

    pub fn pointer(pointee: Type) -> Self {
        Self::Pointer(Box::new(pointee))
    }

    pub fn array(count: Option<usize>, element: Type) -> Self {
        Self::Array {
            count,
            element: Box::new(element),
        }
    }

    pub fn dynamic_array(element: Type) -> Self {
        Self::DynamicArray(Box::new(element))
    }

    /// Build a union, dropping members structurally equal to an earlier one
    pub fn union_of(members: Vec<Type>) -> Self {
        let mut unique: Vec<Type> = Vec::with_capacity(members.len());
        for member in members {
            if !unique.iter().any(|m| m.same_as(&member)) {
                unique.push(member);
            }
        }
        Self::Union(unique)
    }

    pub fn is_arithmetic(&self) -> bool {
        matches!(self, Self::Arithmetic(_))
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, Self::Boolean(_))
    }

    pub fn is_generic(&self) -> bool {
        matches!(
            self,
            Self::GenericFunction(_) | Self::GenericStruct(_) | Self::GenericTrait(_)
        )
    }

    pub fn is_immutable(&self) -> bool {
        matches!(
            self,
            Self::Arithmetic(ArithmeticKind::ImmutableInt(_))
                | Self::Boolean(BooleanKind::ImmutableBool)
        )
    }

    /// Same type with the top-level immutable qualifier removed
    pub fn unqualified(&self) -> Type {
        match self {
            Self::Arithmetic(ArithmeticKind::ImmutableInt(w)) => Self::int(*w),
            Self::Boolean(BooleanKind::ImmutableBool) => Self::BOOL,
            other => other.clone(),
        }
    }

    /// Same type with every immutable qualifier removed, recursively
    pub fn erased(&self) -> Type {
        match self {
            Self::Pointer(p) => Self::pointer(p.erased()),
            Self::Array { count, element } => Self::array(*count, element.erased()),
            Self::DynamicArray(e) => Self::dynamic_array(e.erased()),
            Self::Union(members) => Self::Union(members.iter().map(Type::erased).collect()),
            other => other.unqualified(),
        }
    }

    /// Structural comparison ignoring mutability qualifiers
    pub fn same_as(&self, other: &Type) -> bool {
        self.erased() == other.erased()
    }

    /// Position of the member structurally equal to `ty`, if any
    pub fn union_member_index(&self, ty: &Type) -> Option<usize> {
        match self {
            Self::Union(members) => members.iter().position(|m| m.same_as(ty)),
            _ => None,
        }
    }

    /// Name of the generic declaration behind a template type
    pub fn template_name(&self) -> Option<&str> {
        match self {
            Self::GenericFunction(t) => Some(&t.name),
            Self::GenericStruct(t) => Some(&t.name),
            Self::GenericTrait(t) => Some(&t.name),
            _ => None,
        }
    }

    /// Deterministic symbol-safe spelling used to name instantiations
    pub fn mangled(&self) -> String {
        match self {
            Self::Void => "void".to_string(),
            Self::Arithmetic(ArithmeticKind::CompileTimeInt(v)) => format!("ct{}", v),
            Self::Arithmetic(ArithmeticKind::MutableInt(w)) => w.name().to_string(),
            Self::Arithmetic(ArithmeticKind::ImmutableInt(w)) => format!("C{}", w.name()),
            Self::Boolean(BooleanKind::CompileTimeBool(b)) => format!("ct{}", b),
            Self::Boolean(BooleanKind::MutableBool) => "bool".to_string(),
            Self::Boolean(BooleanKind::ImmutableBool) => "Cbool".to_string(),
            Self::Pointer(p) => format!("P{}", p.mangled()),
            Self::Array { count, element } => match count {
                Some(n) => format!("A{}_{}", n, element.mangled()),
                None => format!("A_{}", element.mangled()),
            },
            Self::DynamicArray(e) => format!("D{}", e.mangled()),
            Self::Function(f) => format!(
                "F{}R{}",
                length_prefixed(&f.params),
                length_prefixed(std::slice::from_ref(&f.return_type))
            ),
            Self::Struct(s) => s.mangled_name.clone(),
            Self::Trait(t) => t.mangled_name.clone(),
            Self::Union(members) => format!("U{}E", length_prefixed(members)),
            Self::GenericFunction(t) => t.name.clone(),
            Self::GenericStruct(t) => t.name.clone(),
            Self::GenericTrait(t) => t.name.clone(),
        }
    }
}

/// Each component as `<len><mangled>` so that no two lists share a spelling
fn length_prefixed(types: &[Type]) -> String {
    types
        .iter()
        .map(|t| {
            let part = t.mangled();
            format!("{}{}", part.len(), part)
        })
        .collect()
}

/// Symbol name of `template@[args]`
pub fn mangle_application(template: &str, args: &[Type]) -> String {
    format!("__{}_{}", template, length_prefixed(args))
}

/// Source spelling of `template@[args]`, as used in diagnostics
pub fn render_application(template: &str, args: &[Type]) -> String {
    let parts: Vec<String> = args.iter().map(|t| t.to_string()).collect();
    format!("{}@[{}]", template, parts.join(", "))
}

// ==================== Rendering ====================

impl fmt::Display for IntWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Type {
    /// Rendering for positions where `|` would be ambiguous
    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Union(_) => write!(f, "({})", self),
            other => write!(f, "{}", other),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => f.write_str("void"),
            Self::Arithmetic(ArithmeticKind::CompileTimeInt(v)) => {
                write!(f, "integer constant {}", v)
            }
            Self::Arithmetic(ArithmeticKind::MutableInt(w)) => write!(f, "{}", w),
            Self::Arithmetic(ArithmeticKind::ImmutableInt(w)) => write!(f, "const {}", w),
            Self::Boolean(BooleanKind::CompileTimeBool(b)) => write!(f, "boolean constant {}", b),
            Self::Boolean(BooleanKind::MutableBool) => f.write_str("bool"),
            Self::Boolean(BooleanKind::ImmutableBool) => f.write_str("const bool"),
            Self::Pointer(p) => {
                f.write_str("*")?;
                p.fmt_operand(f)
            }
            Self::Array { count, element } => {
                match count {
                    Some(n) => write!(f, "[{}]", n)?,
                    None => f.write_str("[_]")?,
                }
                element.fmt_operand(f)
            }
            Self::DynamicArray(e) => {
                f.write_str("[]")?;
                e.fmt_operand(f)
            }
            Self::Function(func) => {
                let params: Vec<String> = func.params.iter().map(|p| p.to_string()).collect();
                write!(f, "func({}) -> {}", params.join(", "), func.return_type)
            }
            Self::Struct(s) => f.write_str(&s.name),
            Self::Trait(t) => f.write_str(&t.name),
            Self::Union(members) => {
                let parts: Vec<String> = members.iter().map(|m| m.to_string()).collect();
                f.write_str(&parts.join(" | "))
            }
            Self::GenericFunction(t) => f.write_str(&t.name),
            Self::GenericStruct(t) => f.write_str(&t.name),
            Self::GenericTrait(t) => f.write_str(&t.name),
        }
    }
}

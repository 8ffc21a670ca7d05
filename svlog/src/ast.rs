// Copyright (c) 2021 The mead authors

//! The syntax-node model consumed by elaboration.
//!
//! These nodes are what the parser hands to the compilation's
//! `add_syntax_tree`. Elaboration never mutates them; it keeps references
//! into the tree and materializes symbols from them on demand. A frontend
//! is expected to build these nodes; the constructors on [`Expr`] and
//! friends exist so that tests and tools can do the same.

use crate::crate_prelude::*;
use crate::diag::Diagnostic;
use crate::ty::{NetKind, TimeScale, UnconnectedDrive};
use num::BigInt;
use std::collections::HashMap;

/// A parsed compilation unit together with the side information the parser
/// collected for it: per-declaration directives, the names of all modules
/// instantiated anywhere in the unit, and the parse diagnostics.
///
/// All trees added to one compilation must share one source manager.
pub struct SyntaxTree<'a> {
    pub root: Vec<MemberSyntax>,
    pub metadata: HashMap<Name, ModuleMetadata>,
    pub global_instantiations: Vec<Name>,
    pub diagnostics: Vec<Diagnostic<'a>>,
    pub source_manager: &'a SourceManager,
}

impl<'a> SyntaxTree<'a> {
    pub fn new(source_manager: &'a SourceManager, root: Vec<MemberSyntax>) -> Self {
        SyntaxTree {
            root,
            metadata: HashMap::new(),
            global_instantiations: Vec::new(),
            diagnostics: Vec::new(),
            source_manager,
        }
    }

    /// Record the names of modules that are instantiated somewhere in this
    /// tree. Top-level detection uses these to rule out candidates.
    pub fn with_global_instantiations(mut self, names: Vec<Name>) -> Self {
        self.global_instantiations = names;
        self
    }

    /// Attach directive-derived metadata to a module declaration.
    pub fn with_metadata(mut self, module: Name, meta: ModuleMetadata) -> Self {
        self.metadata.insert(module, meta);
        self
    }
}

/// Directive state in effect at a module declaration.
#[derive(Clone, Debug, Default)]
pub struct ModuleMetadata {
    pub default_net_type: Option<NetKind>,
    pub unconnected_drive: UnconnectedDrive,
    pub time_scale: Option<TimeScale>,
}

/// A member of a scope-introducing construct.
#[derive(Debug)]
pub enum MemberSyntax {
    Module(ModuleDecl),
    Package(PackageDecl),
    Import(ImportDecl),
    HierarchyInst(HierarchyInst),
    IfGenerate(IfGenerate),
    LoopGenerate(LoopGenerate),
    GenerateRegion(GenerateRegion),
    Subroutine(SubroutineDecl),
    Data(DataDecl),
    Param(ParamDecl),
    Procedural(ProceduralBlock),
    ContinuousAssign(ContinuousAssign),
    Modport(ModportDecl),
    Typedef(TypedefDecl),
}

/// Whether a declaration introduces a module, interface, or program.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DefinitionKind {
    Module,
    Interface,
    Program,
}

#[derive(Debug)]
pub struct ModuleDecl {
    pub span: Span,
    pub kind: DefinitionKind,
    pub name: Spanned<Name>,
    pub params: Vec<ParamDecl>,
    pub ports: Vec<PortDecl>,
    pub members: Vec<MemberSyntax>,
}

#[derive(Debug)]
pub struct PackageDecl {
    pub span: Span,
    pub name: Spanned<Name>,
    pub members: Vec<MemberSyntax>,
}

#[derive(Debug)]
pub struct ImportDecl {
    pub span: Span,
    pub items: Vec<ImportItem>,
}

#[derive(Debug)]
pub struct ImportItem {
    pub span: Span,
    pub package: Spanned<Name>,
    pub kind: ImportItemKind,
}

#[derive(Clone, Copy, Debug)]
pub enum ImportItemKind {
    /// A `pkg::*` wildcard import.
    Star,
    /// A `pkg::name` explicit import.
    Named(Spanned<Name>),
}

#[derive(Debug)]
pub struct HierarchyInst {
    pub span: Span,
    pub attrs: Vec<AttributeSpec>,
    pub target: Spanned<Name>,
    pub params: Vec<NamedParamAssignment>,
    pub instances: Vec<InstanceDecl>,
}

#[derive(Debug)]
pub struct NamedParamAssignment {
    pub span: Span,
    pub name: Spanned<Name>,
    pub expr: Option<Expr>,
}

#[derive(Debug)]
pub struct InstanceDecl {
    pub span: Span,
    pub name: Spanned<Name>,
    pub conns: Vec<PortConnection>,
}

#[derive(Debug)]
pub struct PortConnection {
    pub span: Span,
    pub name: Spanned<Name>,
    pub expr: Option<Expr>,
}

#[derive(Debug)]
pub struct IfGenerate {
    pub span: Span,
    pub cond: Expr,
    pub block: GenerateBlockSyntax,
    pub else_block: Option<GenerateBlockSyntax>,
}

#[derive(Debug)]
pub struct LoopGenerate {
    pub span: Span,
    pub genvar: Spanned<Name>,
    pub init: Expr,
    pub stop: Expr,
    pub step: Expr,
    pub block: GenerateBlockSyntax,
}

#[derive(Debug)]
pub struct GenerateBlockSyntax {
    pub span: Span,
    pub label: Option<Spanned<Name>>,
    pub members: Vec<MemberSyntax>,
}

/// A `generate ... endgenerate` region. Members are absorbed into the
/// enclosing scope without introducing a new one.
#[derive(Debug)]
pub struct GenerateRegion {
    pub span: Span,
    pub members: Vec<MemberSyntax>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SubroutineKind {
    Task,
    Function,
}

#[derive(Debug)]
pub struct SubroutineDecl {
    pub span: Span,
    pub kind: SubroutineKind,
    pub name: Spanned<Name>,
    pub return_type: Option<TypeSyntax>,
    pub args: Vec<ArgDecl>,
    pub body: Vec<Stmt>,
}

#[derive(Debug)]
pub struct ArgDecl {
    pub span: Span,
    pub name: Spanned<Name>,
    pub direction: Direction,
    pub ty: TypeSyntax,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Direction {
    Input,
    Output,
    Inout,
    Ref,
}

#[derive(Debug)]
pub struct DataDecl {
    pub span: Span,
    pub attrs: Vec<AttributeSpec>,
    pub ty: TypeSyntax,
    pub declarators: Vec<Declarator>,
}

#[derive(Debug)]
pub struct Declarator {
    pub span: Span,
    pub name: Spanned<Name>,
    pub init: Option<Expr>,
}

#[derive(Debug)]
pub struct ParamDecl {
    pub span: Span,
    pub is_local: bool,
    pub ty: Option<TypeSyntax>,
    pub declarators: Vec<Declarator>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ProceduralBlockKind {
    Always,
    AlwaysComb,
    AlwaysLatch,
    AlwaysFf,
    Initial,
    Final,
}

#[derive(Debug)]
pub struct ProceduralBlock {
    pub span: Span,
    pub attrs: Vec<AttributeSpec>,
    pub kind: ProceduralBlockKind,
    pub body: Vec<Stmt>,
}

#[derive(Debug)]
pub struct ContinuousAssign {
    pub span: Span,
    pub attrs: Vec<AttributeSpec>,
    pub assignments: Vec<AssignExpr>,
}

#[derive(Debug)]
pub struct AssignExpr {
    pub span: Span,
    pub lhs: Expr,
    pub rhs: Expr,
}

#[derive(Debug)]
pub struct ModportDecl {
    pub span: Span,
    pub name: Spanned<Name>,
}

#[derive(Debug)]
pub struct TypedefDecl {
    pub span: Span,
    pub name: Spanned<Name>,
    pub ty: TypeSyntax,
}

#[derive(Debug)]
pub struct PortDecl {
    pub span: Span,
    pub name: Spanned<Name>,
    pub data: PortData,
}

#[derive(Debug)]
pub enum PortData {
    /// An ANSI port with a direction and data type.
    Ansi { direction: Direction, ty: TypeSyntax },
    /// A port typed by an interface.
    Interface { interface: Spanned<Name> },
}

/// A single `(* name = value *)` attribute.
#[derive(Debug)]
pub struct AttributeSpec {
    pub span: Span,
    pub name: Spanned<Name>,
    pub value: Option<Expr>,
}

#[derive(Debug)]
pub struct TypeSyntax {
    pub span: Span,
    pub data: TypeSyntaxData,
}

#[derive(Debug)]
pub enum TypeSyntaxData {
    Implicit,
    Named(Name),

    // Integer vector types
    Bit { signed: bool },
    Logic { signed: bool },
    Reg { signed: bool },

    // Integer atom types
    Byte,
    ShortInt,
    Int,
    LongInt,
    Integer,
    Time,

    // Floating types
    Real,
    RealTime,
    ShortReal,

    // Other builtins
    String,
    CHandle,
    Void,
    Event,

    Enum(EnumTypeSyntax),
}

#[derive(Debug)]
pub struct EnumTypeSyntax {
    pub base: Option<Box<TypeSyntax>>,
    pub members: Vec<EnumMemberSyntax>,
}

#[derive(Debug)]
pub struct EnumMemberSyntax {
    pub span: Span,
    pub name: Spanned<Name>,
    pub init: Option<Expr>,
}

/// The closed set of type syntax shapes, used to key the builtin type map.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum TypeSyntaxKind {
    Implicit,
    Named,
    Bit,
    Logic,
    Reg,
    Byte,
    ShortInt,
    Int,
    LongInt,
    Integer,
    Time,
    Real,
    RealTime,
    ShortReal,
    String,
    CHandle,
    Void,
    Event,
    Enum,
}

impl TypeSyntax {
    pub fn new(span: Span, data: TypeSyntaxData) -> TypeSyntax {
        TypeSyntax { span, data }
    }

    pub fn kind(&self) -> TypeSyntaxKind {
        match self.data {
            TypeSyntaxData::Implicit => TypeSyntaxKind::Implicit,
            TypeSyntaxData::Named(_) => TypeSyntaxKind::Named,
            TypeSyntaxData::Bit { .. } => TypeSyntaxKind::Bit,
            TypeSyntaxData::Logic { .. } => TypeSyntaxKind::Logic,
            TypeSyntaxData::Reg { .. } => TypeSyntaxKind::Reg,
            TypeSyntaxData::Byte => TypeSyntaxKind::Byte,
            TypeSyntaxData::ShortInt => TypeSyntaxKind::ShortInt,
            TypeSyntaxData::Int => TypeSyntaxKind::Int,
            TypeSyntaxData::LongInt => TypeSyntaxKind::LongInt,
            TypeSyntaxData::Integer => TypeSyntaxKind::Integer,
            TypeSyntaxData::Time => TypeSyntaxKind::Time,
            TypeSyntaxData::Real => TypeSyntaxKind::Real,
            TypeSyntaxData::RealTime => TypeSyntaxKind::RealTime,
            TypeSyntaxData::ShortReal => TypeSyntaxKind::ShortReal,
            TypeSyntaxData::String => TypeSyntaxKind::String,
            TypeSyntaxData::CHandle => TypeSyntaxKind::CHandle,
            TypeSyntaxData::Void => TypeSyntaxKind::Void,
            TypeSyntaxData::Event => TypeSyntaxKind::Event,
            TypeSyntaxData::Enum(_) => TypeSyntaxKind::Enum,
        }
    }
}

#[derive(Debug)]
pub struct Stmt {
    pub span: Span,
    pub data: StmtData,
}

#[derive(Debug)]
pub enum StmtData {
    VarDecl(DataDecl),
    Expr(Expr),
    Assign(Expr, Expr),
    Block(Vec<Stmt>),
}

#[derive(Debug)]
pub struct Expr {
    pub span: Span,
    pub data: ExprData,
}

#[derive(Debug)]
pub enum ExprData {
    IntLiteral(BigInt),
    RealLiteral(f64),
    StringLiteral(String),
    Ident(Name),
    /// A `pkg::name` reference.
    Scoped(Name, Name),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    Lt,
    Leq,
    Gt,
    Geq,
    Eq,
    Neq,
    LogicAnd,
    LogicOr,
    And,
    Or,
    Xor,
}

impl Expr {
    pub fn int(value: i64, span: Span) -> Expr {
        Expr {
            span,
            data: ExprData::IntLiteral(BigInt::from(value)),
        }
    }

    pub fn ident(name: Name, span: Span) -> Expr {
        Expr {
            span,
            data: ExprData::Ident(name),
        }
    }

    pub fn scoped(package: Name, name: Name, span: Span) -> Expr {
        Expr {
            span,
            data: ExprData::Scoped(package, name),
        }
    }

    pub fn unary(op: UnaryOp, arg: Expr, span: Span) -> Expr {
        Expr {
            span,
            data: ExprData::Unary(op, Box::new(arg)),
        }
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        let span = Span::union(lhs.span, rhs.span);
        Expr {
            span,
            data: ExprData::Binary(op, Box::new(lhs), Box::new(rhs)),
        }
    }
}

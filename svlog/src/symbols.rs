// Copyright (c) 2021 The mead authors

//! Symbols and their payloads.
//!
//! Every named or unnamed element of the elaborated hierarchy is a
//! [`Symbol`]: a common header (name, location, parent scope, sibling link,
//! index) plus a payload drawn from the closed [`SymbolData`] enumeration.
//! Scope-bearing payloads embed their [`Scope`] directly. Symbols are
//! allocated once in the compilation's arena and never move.

use crate::ast;
use crate::binding::{self, ConstantValue, EvalContext};
use crate::compilation::Compilation;
use crate::crate_prelude::*;
use crate::diag::{DiagCode, Diagnostic};
use crate::scope::{LookupRefPoint, Scope};
use crate::ty::{NetKind, TimeScale, Type, UnconnectedDrive};
use num::BigInt;
use once_cell::unsync::OnceCell;
use std::cell::{Cell, RefCell};
use std::fmt;

/// The closed set of symbol kinds.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum SymbolKind {
    CompilationUnit,
    Root,
    Package,
    Definition,
    ModuleInstance,
    ProgramInstance,
    InterfaceInstance,
    Variable,
    FormalArgument,
    Parameter,
    Subroutine,
    EnumType,
    EnumValue,
    TypeAlias,
    GenerateBlock,
    GenerateBlockArray,
    ProceduralBlock,
    ExplicitImport,
    WildcardImport,
    TransparentMember,
    Port,
    InterfacePort,
    ContinuousAssign,
    Attribute,
}

impl SymbolKind {
    /// Whether this kind is one of the instance kinds.
    pub fn is_instance(self) -> bool {
        matches!(
            self,
            SymbolKind::ModuleInstance | SymbolKind::ProgramInstance | SymbolKind::InterfaceInstance
        )
    }
}

/// A symbol in the hierarchy.
pub struct Symbol<'a> {
    pub name: Name,
    pub loc: Location,
    pub(crate) parent: Cell<Option<&'a Scope<'a>>>,
    pub(crate) next: Cell<Option<&'a Symbol<'a>>>,
    pub(crate) index: Cell<u32>,
    pub data: SymbolData<'a>,
}

impl<'a> Symbol<'a> {
    pub(crate) fn new(name: Name, loc: Location, data: SymbolData<'a>) -> Symbol<'a> {
        Symbol {
            name,
            loc,
            parent: Cell::new(None),
            next: Cell::new(None),
            index: Cell::new(0),
            data,
        }
    }

    pub fn kind(&self) -> SymbolKind {
        match self.data {
            SymbolData::CompilationUnit(_) => SymbolKind::CompilationUnit,
            SymbolData::Root(_) => SymbolKind::Root,
            SymbolData::Package(_) => SymbolKind::Package,
            SymbolData::Definition(_) => SymbolKind::Definition,
            SymbolData::ModuleInstance(_) => SymbolKind::ModuleInstance,
            SymbolData::ProgramInstance(_) => SymbolKind::ProgramInstance,
            SymbolData::InterfaceInstance(_) => SymbolKind::InterfaceInstance,
            SymbolData::Variable(_) => SymbolKind::Variable,
            SymbolData::FormalArgument(_) => SymbolKind::FormalArgument,
            SymbolData::Parameter(_) => SymbolKind::Parameter,
            SymbolData::Subroutine(_) => SymbolKind::Subroutine,
            SymbolData::EnumType(_) => SymbolKind::EnumType,
            SymbolData::EnumValue(_) => SymbolKind::EnumValue,
            SymbolData::TypeAlias(_) => SymbolKind::TypeAlias,
            SymbolData::GenerateBlock(_) => SymbolKind::GenerateBlock,
            SymbolData::GenerateBlockArray(_) => SymbolKind::GenerateBlockArray,
            SymbolData::ProceduralBlock(_) => SymbolKind::ProceduralBlock,
            SymbolData::ExplicitImport(_) => SymbolKind::ExplicitImport,
            SymbolData::WildcardImport(_) => SymbolKind::WildcardImport,
            SymbolData::TransparentMember(_) => SymbolKind::TransparentMember,
            SymbolData::Port(_) => SymbolKind::Port,
            SymbolData::InterfacePort(_) => SymbolKind::InterfacePort,
            SymbolData::ContinuousAssign(_) => SymbolKind::ContinuousAssign,
            SymbolData::Attribute(_) => SymbolKind::Attribute,
        }
    }

    /// The scope this symbol was inserted into, if any.
    pub fn parent_scope(&self) -> Option<&'a Scope<'a>> {
        self.parent.get()
    }

    /// The next sibling in the parent scope's member chain.
    pub fn next_in_scope(&self) -> Option<&'a Symbol<'a>> {
        self.next.get()
    }

    /// The position of this symbol within its scope. Strictly monotonic
    /// along the sibling chain, except that transparent members share the
    /// index of their splice anchor.
    pub fn index_in_scope(&self) -> u32 {
        self.index.get()
    }

    /// The scope this symbol itself introduces, for scope-bearing kinds.
    pub fn scope(&'a self) -> Option<&'a Scope<'a>> {
        match self.data {
            SymbolData::CompilationUnit(ref x) => Some(&x.scope),
            SymbolData::Root(ref x) => Some(&x.scope),
            SymbolData::Package(ref x) => Some(&x.scope),
            SymbolData::Definition(ref x) => Some(&x.scope),
            SymbolData::ModuleInstance(ref x)
            | SymbolData::ProgramInstance(ref x)
            | SymbolData::InterfaceInstance(ref x) => Some(&x.scope),
            SymbolData::Subroutine(ref x) => Some(&x.scope),
            SymbolData::EnumType(ref x) => Some(&x.scope),
            SymbolData::GenerateBlock(ref x) => Some(&x.scope),
            SymbolData::GenerateBlockArray(ref x) => Some(&x.scope),
            SymbolData::ProceduralBlock(ref x) => Some(&x.scope),
            _ => None,
        }
    }

    /// The lazily resolved type declared for this symbol, if it has one.
    pub fn declared_type(&'a self) -> Option<&'a DeclaredType<'a>> {
        match self.data {
            SymbolData::Variable(ref x) => Some(&x.declared_type),
            SymbolData::FormalArgument(ref x) => Some(&x.declared_type),
            SymbolData::Parameter(ref x) => Some(&x.declared_type),
            SymbolData::TypeAlias(ref x) => Some(&x.declared_type),
            SymbolData::Port(ref x) => Some(&x.declared_type),
            SymbolData::Subroutine(ref x) => Some(&x.return_type),
            _ => None,
        }
    }
}

impl fmt::Debug for Symbol<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Symbol({:?}, `{}`)", self.kind(), self.name)
    }
}

/// The payload of a symbol.
pub enum SymbolData<'a> {
    CompilationUnit(CompilationUnitSymbol<'a>),
    Root(RootSymbol<'a>),
    Package(PackageSymbol<'a>),
    Definition(DefinitionSymbol<'a>),
    ModuleInstance(InstanceSymbol<'a>),
    ProgramInstance(InstanceSymbol<'a>),
    InterfaceInstance(InstanceSymbol<'a>),
    Variable(VariableSymbol<'a>),
    FormalArgument(FormalArgumentSymbol<'a>),
    Parameter(ParameterSymbol<'a>),
    Subroutine(SubroutineSymbol<'a>),
    EnumType(EnumTypeSymbol<'a>),
    EnumValue(EnumValueSymbol<'a>),
    TypeAlias(TypeAliasSymbol<'a>),
    GenerateBlock(GenerateBlockSymbol<'a>),
    GenerateBlockArray(GenerateBlockArraySymbol<'a>),
    ProceduralBlock(ProceduralBlockSymbol<'a>),
    ExplicitImport(ExplicitImportSymbol<'a>),
    WildcardImport(WildcardImportSymbol<'a>),
    TransparentMember(TransparentMemberSymbol<'a>),
    Port(PortSymbol<'a>),
    InterfacePort(InterfacePortSymbol<'a>),
    ContinuousAssign(ContinuousAssignSymbol<'a>),
    Attribute(AttributeSymbol<'a>),
}

pub struct CompilationUnitSymbol<'a> {
    pub scope: Scope<'a>,
    pub tree: Cell<Option<&'a ast::SyntaxTree<'a>>>,
}

pub struct RootSymbol<'a> {
    pub scope: Scope<'a>,
    pub top_instances: RefCell<Vec<&'a Symbol<'a>>>,
    pub compilation_units: RefCell<Vec<&'a Symbol<'a>>>,
}

pub struct PackageSymbol<'a> {
    pub scope: Scope<'a>,
}

impl<'a> PackageSymbol<'a> {
    pub(crate) fn from_syntax(
        cx: &Compilation<'a>,
        decl: &'a ast::PackageDecl,
    ) -> &'a Symbol<'a> {
        let sym = cx.alloc_symbol(
            decl.name.value,
            decl.name.span.loc(),
            SymbolData::Package(PackageSymbol {
                scope: Scope::new(),
            }),
        );
        let scope = sym.scope().unwrap();
        for member in &decl.members {
            scope.add_members(cx, member);
        }
        sym
    }
}

pub struct DefinitionSymbol<'a> {
    pub scope: Scope<'a>,
    pub definition_kind: ast::DefinitionKind,
    pub default_net_type: NetKind,
    pub unconnected_drive: UnconnectedDrive,
    pub time_scale: Option<TimeScale>,
    pub parameters: RefCell<Vec<&'a Symbol<'a>>>,
    pub syntax: &'a ast::ModuleDecl,
}

impl<'a> DefinitionSymbol<'a> {
    /// Whether every parameter of this definition has a default value.
    pub fn all_parameters_defaulted(&self) -> bool {
        self.parameters.borrow().iter().all(|p| match p.data {
            SymbolData::Parameter(ref p) => p.has_default(),
            _ => true,
        })
    }
}

pub struct InstanceSymbol<'a> {
    pub scope: Scope<'a>,
    pub definition: &'a Symbol<'a>,
}

impl<'a> InstanceSymbol<'a> {
    /// Materialize the instances declared by one hierarchy instantiation.
    /// Produces one symbol per declarator; an unknown target produces none
    /// and raises a diagnostic at the instantiation site.
    pub(crate) fn from_syntax(
        cx: &Compilation<'a>,
        syntax: &'a ast::HierarchyInst,
        scope: &'a Scope<'a>,
    ) -> Vec<&'a Symbol<'a>> {
        let def_sym = match cx.get_definition(syntax.target.value, scope) {
            Some(d) => d,
            None => {
                cx.add_diag(
                    Diagnostic::new(
                        DiagCode::UnknownModule,
                        syntax.target.span.loc(),
                        format!("unknown module `{}`", syntax.target.value),
                    )
                    .symbol(scope.symbol()),
                );
                return Vec::new();
            }
        };
        let mut result = Vec::new();
        for decl in &syntax.instances {
            let sym = Self::instantiate(
                cx,
                decl.name.value,
                decl.name.span.loc(),
                def_sym,
                Some((&syntax.params[..], scope)),
                Some((&decl.conns[..], scope)),
            );
            if !syntax.attrs.is_empty() {
                cx.set_attributes(sym, cx.build_attributes(&syntax.attrs, scope));
            }
            result.push(sym);
        }
        result
    }

    /// Create an instance of a definition and elaborate its body.
    pub(crate) fn instantiate(
        cx: &Compilation<'a>,
        name: Name,
        loc: Location,
        def_sym: &'a Symbol<'a>,
        overrides: Option<(&'a [ast::NamedParamAssignment], &'a Scope<'a>)>,
        conns: Option<(&'a [ast::PortConnection], &'a Scope<'a>)>,
    ) -> &'a Symbol<'a> {
        let def = match def_sym.data {
            SymbolData::Definition(ref d) => d,
            _ => panic!("instantiate target must be a definition"),
        };
        let inner = InstanceSymbol {
            scope: Scope::new(),
            definition: def_sym,
        };
        let data = match def.definition_kind {
            ast::DefinitionKind::Module => SymbolData::ModuleInstance(inner),
            ast::DefinitionKind::Interface => SymbolData::InterfaceInstance(inner),
            ast::DefinitionKind::Program => SymbolData::ProgramInstance(inner),
        };
        let sym = cx.alloc_symbol(name, loc, data);
        let scope = sym.scope().unwrap();
        elaborate_body(cx, scope, def.syntax, overrides, conns, None);
        sym
    }
}

pub struct VariableSymbol<'a> {
    pub declared_type: DeclaredType<'a>,
}

pub struct FormalArgumentSymbol<'a> {
    pub declared_type: DeclaredType<'a>,
    pub direction: ast::Direction,
}

pub struct ParameterSymbol<'a> {
    pub declared_type: DeclaredType<'a>,
    pub is_local: bool,
    pub default_syntax: Option<&'a ast::Expr>,
    pub(crate) value: OnceCell<Option<ConstantValue>>,
}

impl<'a> ParameterSymbol<'a> {
    pub fn has_default(&self) -> bool {
        self.default_syntax.is_some()
    }

    /// The parameter's value: the instantiation override if one was bound,
    /// otherwise the default evaluated at the declaration site.
    pub fn get_value(&self, cx: &Compilation<'a>, host: &'a Symbol<'a>) -> Option<&ConstantValue> {
        self.value
            .get_or_init(|| {
                let expr = self.default_syntax?;
                let scope = host.parent_scope()?;
                let ctx = EvalContext {
                    cx,
                    scope,
                    ref_point: LookupRefPoint::before(host),
                    host,
                    genvar: None,
                    enum_scope: None,
                };
                binding::eval_const(&ctx, expr)
            })
            .as_ref()
    }
}

pub struct SubroutineSymbol<'a> {
    pub scope: Scope<'a>,
    pub kind: ast::SubroutineKind,
    pub return_type: DeclaredType<'a>,
}

impl<'a> SubroutineSymbol<'a> {
    pub(crate) fn from_syntax(
        cx: &Compilation<'a>,
        decl: &'a ast::SubroutineDecl,
    ) -> &'a Symbol<'a> {
        let sym = cx.alloc_symbol(
            decl.name.value,
            decl.name.span.loc(),
            SymbolData::Subroutine(SubroutineSymbol {
                scope: Scope::new(),
                kind: decl.kind,
                return_type: DeclaredType::new(decl.return_type.as_ref()),
            }),
        );
        let scope = sym.scope().unwrap();
        for arg in &decl.args {
            let arg_sym = cx.alloc_symbol(
                arg.name.value,
                arg.name.span.loc(),
                SymbolData::FormalArgument(FormalArgumentSymbol {
                    declared_type: DeclaredType::new(Some(&arg.ty)),
                    direction: arg.direction,
                }),
            );
            scope.add_member(cx, arg_sym);
        }
        cx.register_deferred_statement(scope, &decl.body);
        sym
    }
}

pub struct EnumTypeSymbol<'a> {
    pub scope: Scope<'a>,
    pub base_type: Type<'a>,
    /// The `TypeKind::Enum` referring back to this symbol.
    pub(crate) ty: Cell<Option<Type<'a>>>,
    /// The scope the enum was written in; value initializers bind here.
    pub(crate) defn_scope: &'a Scope<'a>,
    pub(crate) defn_ref_point: LookupRefPoint<'a>,
}

impl<'a> EnumTypeSymbol<'a> {
    /// The interned type for this enum.
    pub fn ty(&self) -> Type<'a> {
        self.ty.get().expect("enum type not yet interned")
    }

    /// Iterate the enum's values in declaration order.
    pub fn values(&'a self, cx: &Compilation<'a>) -> impl Iterator<Item = &'a Symbol<'a>> {
        self.scope
            .members(cx)
            .filter(|m| m.kind() == SymbolKind::EnumValue)
    }
}

pub struct EnumValueSymbol<'a> {
    pub init_syntax: Option<&'a ast::Expr>,
    pub(crate) prev: Option<&'a Symbol<'a>>,
    pub(crate) value: OnceCell<Option<ConstantValue>>,
}

impl<'a> EnumValueSymbol<'a> {
    /// The value of this enum member: the initializer if present, else one
    /// past the previous member, else zero.
    pub fn get_value(&self, cx: &Compilation<'a>, host: &'a Symbol<'a>) -> Option<&ConstantValue> {
        self.value
            .get_or_init(|| {
                let enum_scope = host.parent_scope().expect("enum value outside an enum");
                let enum_sym = enum_scope.symbol();
                let et = match enum_sym.data {
                    SymbolData::EnumType(ref e) => e,
                    _ => unreachable!(),
                };
                match self.init_syntax {
                    Some(expr) => {
                        let ctx = EvalContext {
                            cx,
                            scope: et.defn_scope,
                            ref_point: et.defn_ref_point,
                            host,
                            genvar: None,
                            enum_scope: Some(enum_scope),
                        };
                        binding::eval_const(&ctx, expr)
                    }
                    None => match self.prev {
                        Some(prev) => {
                            let pv = match prev.data {
                                SymbolData::EnumValue(ref v) => v.get_value(cx, prev),
                                _ => unreachable!(),
                            };
                            match pv {
                                Some(ConstantValue::Int(i)) => {
                                    Some(ConstantValue::Int(i + &BigInt::from(1)))
                                }
                                _ => None,
                            }
                        }
                        None => Some(ConstantValue::Int(BigInt::from(0))),
                    },
                }
            })
            .as_ref()
    }
}

pub struct TypeAliasSymbol<'a> {
    pub declared_type: DeclaredType<'a>,
}

pub struct GenerateBlockSymbol<'a> {
    pub scope: Scope<'a>,
    pub is_instantiated: bool,
}

impl<'a> GenerateBlockSymbol<'a> {
    pub(crate) fn from_syntax(
        cx: &Compilation<'a>,
        syntax: &'a ast::GenerateBlockSyntax,
        is_instantiated: bool,
    ) -> &'a Symbol<'a> {
        let name = match syntax.label {
            Some(label) => label.value,
            None => mead_common::name::intern(""),
        };
        let sym = cx.alloc_symbol(
            name,
            syntax.span.loc(),
            SymbolData::GenerateBlock(GenerateBlockSymbol {
                scope: Scope::new(),
                is_instantiated,
            }),
        );
        let scope = sym.scope().unwrap();
        for member in &syntax.members {
            scope.add_members(cx, member);
        }
        sym
    }
}

pub struct GenerateBlockArraySymbol<'a> {
    pub scope: Scope<'a>,
    pub entries: RefCell<Vec<&'a Symbol<'a>>>,
}

const MAX_GENERATE_STEPS: usize = 65_536;

impl<'a> GenerateBlockArraySymbol<'a> {
    /// Evaluate a loop generate and materialize one block per iteration.
    pub(crate) fn from_syntax(
        cx: &Compilation<'a>,
        syntax: &'a ast::LoopGenerate,
        outer: &'a Scope<'a>,
        anchor_point: LookupRefPoint<'a>,
    ) -> &'a Symbol<'a> {
        let name = match syntax.block.label {
            Some(label) => label.value,
            None => mead_common::name::intern(""),
        };
        let arr_sym = cx.alloc_symbol(
            name,
            syntax.span.loc(),
            SymbolData::GenerateBlockArray(GenerateBlockArraySymbol {
                scope: Scope::new(),
                entries: RefCell::new(Vec::new()),
            }),
        );
        let arr_scope = arr_sym.scope().unwrap();
        let arr = match arr_sym.data {
            SymbolData::GenerateBlockArray(ref a) => a,
            _ => unreachable!(),
        };

        let base_ctx = |genvar: Option<(Name, BigInt)>| EvalContext {
            cx,
            scope: outer,
            ref_point: anchor_point,
            host: arr_sym,
            genvar,
            enum_scope: None,
        };

        let mut value = match binding::eval_const(&base_ctx(None), &syntax.init) {
            Some(ConstantValue::Int(v)) => v,
            _ => return arr_sym,
        };
        let mut steps = 0;
        loop {
            let ctx = base_ctx(Some((syntax.genvar.value, value.clone())));
            match binding::eval_const(&ctx, &syntax.stop) {
                Some(v) if v.is_true() => {}
                _ => break,
            }
            steps += 1;
            if steps > MAX_GENERATE_STEPS {
                cx.add_diag(
                    Diagnostic::new(
                        DiagCode::GenerateLoopLimit,
                        syntax.span.loc(),
                        "generate loop iteration limit exceeded",
                    )
                    .symbol(arr_sym),
                );
                break;
            }

            let blk_sym = cx.alloc_symbol(
                name,
                syntax.block.span.loc(),
                SymbolData::GenerateBlock(GenerateBlockSymbol {
                    scope: Scope::new(),
                    is_instantiated: true,
                }),
            );
            let blk_scope = blk_sym.scope().unwrap();

            // The genvar is visible inside the block as a localparam bound
            // to this iteration's value.
            let genvar_value = OnceCell::new();
            genvar_value
                .set(Some(ConstantValue::Int(value.clone())))
                .ok();
            let genvar_sym = cx.alloc_symbol(
                syntax.genvar.value,
                syntax.genvar.span.loc(),
                SymbolData::Parameter(ParameterSymbol {
                    declared_type: DeclaredType::new(None),
                    is_local: true,
                    default_syntax: None,
                    value: genvar_value,
                }),
            );
            blk_scope.add_member(cx, genvar_sym);
            for member in &syntax.block.members {
                blk_scope.add_members(cx, member);
            }
            arr_scope.add_member(cx, blk_sym);
            arr.entries.borrow_mut().push(blk_sym);

            let ctx = base_ctx(Some((syntax.genvar.value, value.clone())));
            value = match binding::eval_const(&ctx, &syntax.step) {
                Some(ConstantValue::Int(v)) => v,
                _ => break,
            };
        }
        arr_sym
    }
}

pub struct ProceduralBlockSymbol<'a> {
    pub scope: Scope<'a>,
    pub kind: ast::ProceduralBlockKind,
}

pub struct ExplicitImportSymbol<'a> {
    pub package_name: Name,
    pub import_name: Name,
    pub(crate) resolved: OnceCell<Option<&'a Symbol<'a>>>,
}

impl<'a> ExplicitImportSymbol<'a> {
    pub fn package(&self, cx: &Compilation<'a>) -> Option<&'a Symbol<'a>> {
        cx.get_package(self.package_name)
    }

    /// Resolve the imported symbol in the package, once.
    pub fn imported_symbol(&self, cx: &Compilation<'a>) -> Option<&'a Symbol<'a>> {
        *self.resolved.get_or_init(|| {
            let pkg = cx.get_package(self.package_name)?;
            let scope = pkg.scope().expect("package has a scope");
            scope.lookup_direct(cx, self.import_name)
        })
    }
}

pub struct WildcardImportSymbol<'a> {
    pub package_name: Name,
    pub(crate) package: OnceCell<Option<&'a Symbol<'a>>>,
}

impl<'a> WildcardImportSymbol<'a> {
    pub fn package(&self, cx: &Compilation<'a>) -> Option<&'a Symbol<'a>> {
        *self
            .package
            .get_or_init(|| cx.get_package(self.package_name))
    }
}

/// Wraps another symbol and republishes its name one scope outward. Lookups
/// unwrap the wrapper; `lookup_direct` returns it as-is.
pub struct TransparentMemberSymbol<'a> {
    pub wrapped: &'a Symbol<'a>,
}

pub struct PortSymbol<'a> {
    pub direction: ast::Direction,
    pub declared_type: DeclaredType<'a>,
    pub(crate) connection_syntax: Option<(&'a ast::Expr, &'a Scope<'a>)>,
    pub(crate) bound: OnceCell<()>,
}

impl<'a> PortSymbol<'a> {
    /// The connection bound against the instantiating scope, if any.
    pub fn connection(&self, cx: &Compilation<'a>, host: &'a Symbol<'a>) -> Option<&'a ast::Expr> {
        self.bound.get_or_init(|| {
            if let Some((expr, scope)) = self.connection_syntax {
                let ctx = EvalContext {
                    cx,
                    scope,
                    ref_point: LookupRefPoint::max(),
                    host,
                    genvar: None,
                    enum_scope: None,
                };
                binding::bind_expr(&ctx, expr);
            }
        });
        self.connection_syntax.map(|(e, _)| e)
    }
}

pub struct InterfacePortSymbol<'a> {
    pub interface_name: Name,
    pub(crate) connection_syntax: Option<(&'a ast::Expr, &'a Scope<'a>)>,
    pub(crate) bound: OnceCell<()>,
}

impl<'a> InterfacePortSymbol<'a> {
    pub fn connection(&self, cx: &Compilation<'a>, host: &'a Symbol<'a>) -> Option<&'a ast::Expr> {
        self.bound.get_or_init(|| {
            if let Some((expr, scope)) = self.connection_syntax {
                let ctx = EvalContext {
                    cx,
                    scope,
                    ref_point: LookupRefPoint::max(),
                    host,
                    genvar: None,
                    enum_scope: None,
                };
                binding::bind_expr(&ctx, expr);
            }
        });
        self.connection_syntax.map(|(e, _)| e)
    }
}

pub struct ContinuousAssignSymbol<'a> {
    pub assign: &'a ast::AssignExpr,
    pub(crate) bound: OnceCell<()>,
}

impl<'a> ContinuousAssignSymbol<'a> {
    /// Bind both sides of the assignment, once, and return the syntax.
    pub fn get_assignment(
        &self,
        cx: &Compilation<'a>,
        host: &'a Symbol<'a>,
    ) -> &'a ast::AssignExpr {
        self.bound.get_or_init(|| {
            if let Some(scope) = host.parent_scope() {
                let ctx = EvalContext {
                    cx,
                    scope,
                    ref_point: LookupRefPoint::before(host),
                    host,
                    genvar: None,
                    enum_scope: None,
                };
                binding::bind_expr(&ctx, &self.assign.lhs);
                binding::bind_expr(&ctx, &self.assign.rhs);
            }
        });
        self.assign
    }
}

pub struct AttributeSymbol<'a> {
    pub value_syntax: Option<&'a ast::Expr>,
    pub(crate) scope: &'a Scope<'a>,
    pub(crate) value: OnceCell<Option<ConstantValue>>,
}

impl<'a> AttributeSymbol<'a> {
    /// The attribute's value; attributes without a value default to 1.
    pub fn get_value(&self, cx: &Compilation<'a>, host: &'a Symbol<'a>) -> Option<&ConstantValue> {
        self.value
            .get_or_init(|| match self.value_syntax {
                Some(expr) => {
                    let ctx = EvalContext {
                        cx,
                        scope: self.scope,
                        ref_point: LookupRefPoint::max(),
                        host,
                        genvar: None,
                        enum_scope: None,
                    };
                    binding::eval_const(&ctx, expr)
                }
                None => Some(ConstantValue::Int(BigInt::from(1))),
            })
            .as_ref()
    }
}

/// A lazily resolved declared type with an optional initializer.
///
/// The type is resolved against the host symbol's scope at the host's
/// reference point on first access; the initializer is bound the same way.
pub struct DeclaredType<'a> {
    syntax: Option<&'a ast::TypeSyntax>,
    init_syntax: Option<&'a ast::Expr>,
    ty: OnceCell<Type<'a>>,
    init: OnceCell<Option<ConstantValue>>,
}

impl<'a> DeclaredType<'a> {
    pub fn new(syntax: Option<&'a ast::TypeSyntax>) -> DeclaredType<'a> {
        DeclaredType {
            syntax,
            init_syntax: None,
            ty: OnceCell::new(),
            init: OnceCell::new(),
        }
    }

    pub fn with_initializer(mut self, init: Option<&'a ast::Expr>) -> DeclaredType<'a> {
        self.init_syntax = init;
        self
    }

    /// The type syntax this declared type was created from, if any.
    pub fn get_source(&self) -> Option<&'a ast::TypeSyntax> {
        self.syntax
    }

    pub fn initializer_syntax(&self) -> Option<&'a ast::Expr> {
        self.init_syntax
    }

    pub fn get_type(&self, cx: &Compilation<'a>, host: &'a Symbol<'a>) -> Type<'a> {
        *self.ty.get_or_init(|| match self.syntax {
            Some(ts) => {
                let scope = host
                    .parent_scope()
                    .expect("declared type host must be in a scope");
                cx.type_from_syntax(ts, scope, LookupRefPoint::before(host))
            }
            None => cx.logic_type,
        })
    }

    pub fn get_initializer(
        &self,
        cx: &Compilation<'a>,
        host: &'a Symbol<'a>,
    ) -> Option<&ConstantValue> {
        self.init
            .get_or_init(|| {
                let expr = self.init_syntax?;
                let scope = host.parent_scope()?;
                let ctx = EvalContext {
                    cx,
                    scope,
                    ref_point: LookupRefPoint::before(host),
                    host,
                    genvar: None,
                    enum_scope: None,
                };
                binding::bind_expr(&ctx, expr)
            })
            .as_ref()
    }
}

/// Expand one parameter declaration into symbols in a scope. Header
/// parameters of a definition are collected into `params_out`; when the
/// scope belongs to an instance, `overrides` carries the instantiation's
/// named assignments and the scope to bind them in.
pub(crate) fn add_parameters<'a>(
    cx: &Compilation<'a>,
    scope: &'a Scope<'a>,
    decl: &'a ast::ParamDecl,
    params_out: Option<&RefCell<Vec<&'a Symbol<'a>>>>,
    overrides: Option<(&'a [ast::NamedParamAssignment], &'a Scope<'a>)>,
) {
    for d in &decl.declarators {
        let sym = cx.alloc_symbol(
            d.name.value,
            d.name.span.loc(),
            SymbolData::Parameter(ParameterSymbol {
                declared_type: DeclaredType::new(decl.ty.as_ref()),
                is_local: decl.is_local,
                default_syntax: d.init.as_ref(),
                value: OnceCell::new(),
            }),
        );
        scope.add_member(cx, sym);
        if let Some(out) = params_out {
            out.borrow_mut().push(sym);
        }
        if let Some((assignments, inst_scope)) = overrides {
            let assn = assignments
                .iter()
                .find(|a| a.name.value == d.name.value)
                .and_then(|a| a.expr.as_ref());
            if let Some(expr) = assn {
                let ctx = EvalContext {
                    cx,
                    scope: inst_scope,
                    ref_point: LookupRefPoint::max(),
                    host: sym,
                    genvar: None,
                    enum_scope: None,
                };
                let value = binding::eval_const(&ctx, expr);
                if let SymbolData::Parameter(ref p) = sym.data {
                    p.value.set(value).ok();
                }
            }
        }
    }
}

/// Elaborate a definition body into a scope: header parameters (collected
/// into `params_out` when given), ports (connected when `conns` is given),
/// then the member list.
pub(crate) fn elaborate_body<'a>(
    cx: &Compilation<'a>,
    scope: &'a Scope<'a>,
    decl: &'a ast::ModuleDecl,
    overrides: Option<(&'a [ast::NamedParamAssignment], &'a Scope<'a>)>,
    conns: Option<(&'a [ast::PortConnection], &'a Scope<'a>)>,
    params_out: Option<&RefCell<Vec<&'a Symbol<'a>>>>,
) {
    for pd in &decl.params {
        add_parameters(cx, scope, pd, params_out, overrides);
    }

    for port in &decl.ports {
        let find_conn = |name: Name| {
            conns.and_then(|(list, inst_scope)| {
                list.iter()
                    .find(|c| c.name.value == name)
                    .and_then(|c| c.expr.as_ref())
                    .map(|e| (e, inst_scope))
            })
        };
        let sym = match port.data {
            ast::PortData::Ansi {
                direction,
                ref ty,
            } => cx.alloc_symbol(
                port.name.value,
                port.name.span.loc(),
                SymbolData::Port(PortSymbol {
                    direction,
                    declared_type: DeclaredType::new(Some(ty)),
                    connection_syntax: find_conn(port.name.value),
                    bound: OnceCell::new(),
                }),
            ),
            ast::PortData::Interface { interface } => cx.alloc_symbol(
                port.name.value,
                port.name.span.loc(),
                SymbolData::InterfacePort(InterfacePortSymbol {
                    interface_name: interface.value,
                    connection_syntax: find_conn(port.name.value),
                    bound: OnceCell::new(),
                }),
            ),
        };
        scope.add_member(cx, sym);
    }

    for member in &decl.members {
        scope.add_members(cx, member);
    }
}

// Copyright (c) 2021 The mead authors

//! The central data structure of the compiler.
//!
//! A [`Compilation`] owns everything elaboration produces: the root scope,
//! the builtin type singletons, the definition and package registries, the
//! side tables for deferred members, wildcard imports, and attributes, and
//! the diagnostic coalescing table. The caller constructs a
//! [`GlobalArenas`] and hands a reference to [`Compilation::new`]; all
//! symbols and types are allocated there and stay valid until the arenas
//! drop.
//!
//! # Example
//!
//! ```
//! use mead_svlog::{Compilation, GlobalArenas};
//! let arena = GlobalArenas::default();
//! let compilation = Compilation::new(&arena);
//! ```

use crate::ast;
use crate::builtins;
use crate::crate_prelude::*;
use crate::diag::{DiagCode, Diagnostic, Diagnostics};
use crate::scope::{
    DeferredMemberData, DeferredMemberIndex, ImportDataIndex, LookupRefPoint, LookupResult, Scope,
};
use crate::symbols::{
    AttributeSymbol, CompilationUnitSymbol, DeclaredType, DefinitionSymbol, EnumTypeSymbol,
    EnumValueSymbol, InstanceSymbol, RootSymbol, Symbol, SymbolData, SymbolKind,
};
use crate::ty::{
    IntegralFlags, MethodTarget, NetKind, NetType, PredefinedIntKind, ScalarKind, TimeScale, Type,
    TypeKind, UnconnectedDrive,
};
use crate::visit::DiagnosticVisitor;
use itertools::Itertools;
use log::trace;
use mead_common::make_arenas;
use mead_common::name::intern;
use mead_common::source::INVALID_LOCATION;
use once_cell::unsync::OnceCell;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

make_arenas! {
    /// The arenas that own everything allocated during elaboration.
    pub struct GlobalArenas<'a> {
        symbols: Symbol<'a>,
        types: TypeKind<'a>,
        net_types: NetType<'a>,
        symbol_lists: Vec<&'a Symbol<'a>>,
    }
}

/// The enumerated knobs of a compilation.
#[derive(Clone, Debug)]
pub struct CompilationOptions {
    /// Stop the semantic walk once this many distinct errors have been
    /// recorded. Zero disables the cap.
    pub error_limit: u32,
}

impl Default for CompilationOptions {
    fn default() -> Self {
        CompilationOptions { error_limit: 64 }
    }
}

/// The non-recoverable domain errors of a compilation.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum CompilationError {
    #[error("the compilation has already been finalized")]
    AlreadyFinalized,
    #[error("all syntax trees added to the compilation must use the same source manager")]
    MixedSourceManagers,
}

/// A builtin system task, function, or type method.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SystemSubroutine {
    pub name: Name,
    pub kind: ast::SubroutineKind,
}

/// A coalescing bucket: every diagnostic raised at one `(code, location)`
/// key, plus the index of the entry that was raised inside a definition.
struct DiagGroup<'a> {
    diags: Vec<Diagnostic<'a>>,
    definition_index: Option<usize>,
}

pub struct Compilation<'a> {
    pub options: CompilationOptions,
    pub arena: &'a GlobalArenas<'a>,
    root: &'a Symbol<'a>,

    // Builtin type singletons.
    pub bit_type: Type<'a>,
    pub logic_type: Type<'a>,
    pub reg_type: Type<'a>,
    pub signed_bit_type: Type<'a>,
    pub signed_logic_type: Type<'a>,
    pub signed_reg_type: Type<'a>,
    pub short_int_type: Type<'a>,
    pub int_type: Type<'a>,
    pub long_int_type: Type<'a>,
    pub byte_type: Type<'a>,
    pub integer_type: Type<'a>,
    pub time_type: Type<'a>,
    pub real_type: Type<'a>,
    pub real_time_type: Type<'a>,
    pub short_real_type: Type<'a>,
    pub string_type: Type<'a>,
    pub chandle_type: Type<'a>,
    pub void_type: Type<'a>,
    pub null_type: Type<'a>,
    pub event_type: Type<'a>,
    pub error_type: Type<'a>,
    pub default_time_scale: TimeScale,

    known_types: HashMap<ast::TypeSyntaxKind, Type<'a>>,
    known_net_types: HashMap<NetKind, &'a NetType<'a>>,
    wire_net_type: &'a NetType<'a>,
    scalar_type_table: [Option<Type<'a>>; 8],

    // Registries.
    definition_map: RefCell<HashMap<(Name, PtrKey<'a, Symbol<'a>>), &'a Symbol<'a>>>,
    package_map: RefCell<HashMap<Name, &'a Symbol<'a>>>,
    subroutine_map: RefCell<HashMap<Name, SystemSubroutine>>,
    method_map: RefCell<HashMap<(Name, MethodTarget), SystemSubroutine>>,
    attribute_map: RefCell<HashMap<usize, &'a [&'a Symbol<'a>]>>,

    // Per-declaration directive state, merged in from the syntax trees.
    default_net_type_map: RefCell<HashMap<Name, NetKind>>,
    unconnected_drive_map: RefCell<HashMap<Name, UnconnectedDrive>>,
    time_scale_directive_map: RefCell<HashMap<Name, TimeScale>>,

    global_instantiations: RefCell<HashSet<Name>>,
    compilation_units: RefCell<Vec<&'a Symbol<'a>>>,
    syntax_trees: RefCell<Vec<&'a ast::SyntaxTree<'a>>>,
    source_manager: Cell<Option<&'a SourceManager>>,

    // Side tables keeping per-scope footprint small.
    deferred_data: RefCell<Vec<Option<DeferredMemberData<'a>>>>,
    import_data: RefCell<Vec<Vec<&'a Symbol<'a>>>>,

    diag_map: RefCell<HashMap<(DiagCode, Location), DiagGroup<'a>>>,
    num_errors: Cell<usize>,
    finalized: Cell<bool>,
    finalizing: Cell<bool>,
    cached_parse_diagnostics: RefCell<Option<Diagnostics<'a>>>,
    cached_semantic_diagnostics: RefCell<Option<Diagnostics<'a>>>,
    cached_all_diagnostics: RefCell<Option<Diagnostics<'a>>>,
}

impl<'a> Compilation<'a> {
    pub fn new(arena: &'a GlobalArenas<'a>) -> Compilation<'a> {
        Self::with_options(arena, CompilationOptions::default())
    }

    pub fn with_options(
        arena: &'a GlobalArenas<'a>,
        options: CompilationOptions,
    ) -> Compilation<'a> {
        // Construct all builtin types.
        let scalar = |kind, signed| -> Type<'a> {
            arena.types.alloc(TypeKind::Scalar { kind, signed })
        };
        let predef = |kind| -> Type<'a> { arena.types.alloc(TypeKind::PredefinedInt(kind)) };
        let floating =
            |kind| -> Type<'a> { arena.types.alloc(TypeKind::Floating(kind)) };

        let bit_type = scalar(ScalarKind::Bit, false);
        let logic_type = scalar(ScalarKind::Logic, false);
        let reg_type = scalar(ScalarKind::Reg, false);
        let signed_bit_type = scalar(ScalarKind::Bit, true);
        let signed_logic_type = scalar(ScalarKind::Logic, true);
        let signed_reg_type = scalar(ScalarKind::Reg, true);
        let short_int_type = predef(PredefinedIntKind::ShortInt);
        let int_type = predef(PredefinedIntKind::Int);
        let long_int_type = predef(PredefinedIntKind::LongInt);
        let byte_type = predef(PredefinedIntKind::Byte);
        let integer_type = predef(PredefinedIntKind::Integer);
        let time_type = predef(PredefinedIntKind::Time);
        let real_type = floating(crate::ty::FloatingKind::Real);
        let real_time_type = floating(crate::ty::FloatingKind::RealTime);
        let short_real_type = floating(crate::ty::FloatingKind::ShortReal);
        let string_type: Type<'a> = arena.types.alloc(TypeKind::String);
        let chandle_type: Type<'a> = arena.types.alloc(TypeKind::CHandle);
        let void_type: Type<'a> = arena.types.alloc(TypeKind::Void);
        let null_type: Type<'a> = arena.types.alloc(TypeKind::Null);
        let event_type: Type<'a> = arena.types.alloc(TypeKind::Event);
        let error_type: Type<'a> = arena.types.alloc(TypeKind::Error);

        // Register builtin types for lookup by syntax kind.
        let mut known_types = HashMap::new();
        known_types.insert(ast::TypeSyntaxKind::ShortInt, short_int_type);
        known_types.insert(ast::TypeSyntaxKind::Int, int_type);
        known_types.insert(ast::TypeSyntaxKind::LongInt, long_int_type);
        known_types.insert(ast::TypeSyntaxKind::Byte, byte_type);
        known_types.insert(ast::TypeSyntaxKind::Bit, bit_type);
        known_types.insert(ast::TypeSyntaxKind::Logic, logic_type);
        known_types.insert(ast::TypeSyntaxKind::Reg, reg_type);
        known_types.insert(ast::TypeSyntaxKind::Integer, integer_type);
        known_types.insert(ast::TypeSyntaxKind::Time, time_type);
        known_types.insert(ast::TypeSyntaxKind::Real, real_type);
        known_types.insert(ast::TypeSyntaxKind::RealTime, real_time_type);
        known_types.insert(ast::TypeSyntaxKind::ShortReal, short_real_type);
        known_types.insert(ast::TypeSyntaxKind::String, string_type);
        known_types.insert(ast::TypeSyntaxKind::CHandle, chandle_type);
        known_types.insert(ast::TypeSyntaxKind::Void, void_type);
        known_types.insert(ast::TypeSyntaxKind::Event, event_type);
        known_types.insert(ast::TypeSyntaxKind::Implicit, logic_type);

        let mut known_net_types = HashMap::new();
        for &kind in NetKind::all() {
            let net: &'a NetType<'a> = arena.net_types.alloc(NetType {
                kind,
                name: intern(kind.to_str()),
                data_type: logic_type,
            });
            known_net_types.insert(kind, net);
        }
        let unknown_net: &'a NetType<'a> = arena.net_types.alloc(NetType {
            kind: NetKind::Unknown,
            name: intern("<error>"),
            data_type: logic_type,
        });
        known_net_types.insert(NetKind::Unknown, unknown_net);
        let wire_net_type = known_net_types[&NetKind::Wire];

        // Scalar types are indexed by bit flags.
        let mut scalar_type_table: [Option<Type<'a>>; 8] = [None; 8];
        let mut register_scalar = |ty: Type<'a>| {
            if let TypeKind::Scalar { kind, signed } = *ty {
                let flags = IntegralFlags::for_scalar(kind, signed);
                scalar_type_table[(flags.bits() & 0x7) as usize] = Some(ty);
            }
        };
        register_scalar(bit_type);
        register_scalar(logic_type);
        register_scalar(reg_type);
        register_scalar(signed_bit_type);
        register_scalar(signed_logic_type);
        register_scalar(signed_reg_type);

        let root: &'a Symbol<'a> = arena.symbols.alloc(Symbol::new(
            intern("$root"),
            INVALID_LOCATION,
            SymbolData::Root(RootSymbol {
                scope: Scope::new(),
                top_instances: RefCell::new(Vec::new()),
                compilation_units: RefCell::new(Vec::new()),
            }),
        ));
        root.scope().unwrap().this_sym.set(Some(root));

        let compilation = Compilation {
            options,
            arena,
            root,
            bit_type,
            logic_type,
            reg_type,
            signed_bit_type,
            signed_logic_type,
            signed_reg_type,
            short_int_type,
            int_type,
            long_int_type,
            byte_type,
            integer_type,
            time_type,
            real_type,
            real_time_type,
            short_real_type,
            string_type,
            chandle_type,
            void_type,
            null_type,
            event_type,
            error_type,
            default_time_scale: TimeScale::default(),
            known_types,
            known_net_types,
            wire_net_type,
            scalar_type_table,
            definition_map: RefCell::new(HashMap::new()),
            package_map: RefCell::new(HashMap::new()),
            subroutine_map: RefCell::new(HashMap::new()),
            method_map: RefCell::new(HashMap::new()),
            attribute_map: RefCell::new(HashMap::new()),
            default_net_type_map: RefCell::new(HashMap::new()),
            unconnected_drive_map: RefCell::new(HashMap::new()),
            time_scale_directive_map: RefCell::new(HashMap::new()),
            global_instantiations: RefCell::new(HashSet::new()),
            compilation_units: RefCell::new(Vec::new()),
            syntax_trees: RefCell::new(Vec::new()),
            source_manager: Cell::new(None),
            deferred_data: RefCell::new(Vec::new()),
            import_data: RefCell::new(Vec::new()),
            diag_map: RefCell::new(HashMap::new()),
            num_errors: Cell::new(0),
            finalized: Cell::new(false),
            finalizing: Cell::new(false),
            cached_parse_diagnostics: RefCell::new(None),
            cached_semantic_diagnostics: RefCell::new(None),
            cached_all_diagnostics: RefCell::new(None),
        };

        // Register all system tasks, functions, and methods.
        builtins::register_all(&compilation);
        compilation
    }

    /// Add a parsed tree to the compilation, absorbing its members into a
    /// fresh compilation unit under the root.
    pub fn add_syntax_tree(&self, tree: &'a ast::SyntaxTree<'a>) -> Result<(), CompilationError> {
        if self.finalized.get() {
            return Err(CompilationError::AlreadyFinalized);
        }
        match self.source_manager.get() {
            None => self.source_manager.set(Some(tree.source_manager)),
            Some(existing) => {
                if !std::ptr::eq(existing, tree.source_manager) {
                    return Err(CompilationError::MixedSourceManagers);
                }
            }
        }

        let unit = self.alloc_symbol(
            intern(""),
            INVALID_LOCATION,
            SymbolData::CompilationUnit(CompilationUnitSymbol {
                scope: Scope::new(),
                tree: Cell::new(Some(tree)),
            }),
        );
        self.root_scope().add_member(self, unit);
        self.compilation_units.borrow_mut().push(unit);

        for (&name, meta) in &tree.metadata {
            if let Some(kind) = meta.default_net_type {
                self.default_net_type_map.borrow_mut().insert(name, kind);
            }
            if meta.unconnected_drive != UnconnectedDrive::None {
                self.unconnected_drive_map
                    .borrow_mut()
                    .insert(name, meta.unconnected_drive);
            }
            if let Some(scale) = meta.time_scale {
                self.time_scale_directive_map
                    .borrow_mut()
                    .insert(name, scale);
            }
        }
        for &name in &tree.global_instantiations {
            self.global_instantiations.borrow_mut().insert(name);
        }

        let unit_scope = unit.scope().unwrap();
        for member in &tree.root {
            unit_scope.add_members(self, member);
        }

        self.syntax_trees.borrow_mut().push(tree);
        *self.cached_parse_diagnostics.borrow_mut() = None;
        Ok(())
    }

    pub fn get_syntax_trees(&self) -> Vec<&'a ast::SyntaxTree<'a>> {
        self.syntax_trees.borrow().clone()
    }

    pub fn get_compilation_units(&self) -> Vec<&'a Symbol<'a>> {
        self.compilation_units.borrow().clone()
    }

    /// The unit created for a specific syntax tree.
    pub fn get_compilation_unit(&self, tree: &ast::SyntaxTree<'a>) -> Option<&'a Symbol<'a>> {
        for &unit in self.compilation_units.borrow().iter() {
            if let SymbolData::CompilationUnit(ref u) = unit.data {
                if let Some(stored) = u.tree.get() {
                    if std::ptr::eq(stored, tree) {
                        return Some(unit);
                    }
                }
            }
        }
        None
    }

    /// An empty unit under the root, for interactive binding.
    pub fn create_script_scope(&self) -> &'a Symbol<'a> {
        let unit = self.alloc_symbol(
            intern(""),
            INVALID_LOCATION,
            SymbolData::CompilationUnit(CompilationUnitSymbol {
                scope: Scope::new(),
                tree: Cell::new(None),
            }),
        );
        self.root_scope().add_member(self, unit);
        unit
    }

    /// The root symbol. The first call finalizes the compilation: every
    /// module definition under the root that is not instantiated anywhere,
    /// and whose parameters all have defaults, is instantiated as a top
    /// level instance, in name order.
    pub fn get_root(&self) -> &'a Symbol<'a> {
        if self.finalized.get() {
            return self.root;
        }
        assert!(
            !self.finalizing.get(),
            "re-entrant finalization of a compilation"
        );
        self.finalizing.set(true);

        // Collect candidates before instantiating anything, since
        // instantiation can add nested definitions to the map.
        let mut top_definitions = Vec::new();
        {
            let map = self.definition_map.borrow();
            for (&(name, scope_key), &def_sym) in map.iter() {
                if !std::ptr::eq(scope_key.0, self.root) {
                    continue;
                }
                let def = match def_sym.data {
                    SymbolData::Definition(ref d) => d,
                    _ => unreachable!(),
                };
                if def.definition_kind != ast::DefinitionKind::Module {
                    continue;
                }
                if self.global_instantiations.borrow().contains(&name) {
                    continue;
                }
                if !def.all_parameters_defaulted() {
                    continue;
                }
                top_definitions.push(def_sym);
            }
        }

        // Sort by name for deterministic instance order in the face of
        // hash-map iteration.
        top_definitions.sort_by(|a, b| a.name.as_str().cmp(&b.name.as_str()));

        let mut top_list = Vec::new();
        for def_sym in top_definitions {
            trace!("instantiating top-level module `{}`", def_sym.name);
            let instance =
                InstanceSymbol::instantiate(self, def_sym.name, def_sym.loc, def_sym, None, None);
            self.root_scope().add_member(self, instance);
            top_list.push(instance);
        }

        match self.root.data {
            SymbolData::Root(ref r) => {
                *r.top_instances.borrow_mut() = top_list;
                *r.compilation_units.borrow_mut() = self.compilation_units.borrow().clone();
            }
            _ => unreachable!(),
        }
        self.finalizing.set(false);
        self.finalized.set(true);
        self.root
    }

    /// The root scope, without triggering finalization.
    pub fn root_scope(&self) -> &'a Scope<'a> {
        self.root.scope().expect("root is a scope")
    }

    // ------------------------------------------------------------------
    // Definitions and packages

    /// Register a definition symbol for a module/interface/program
    /// declaration, elaborate its body once in definition context, and key
    /// it by `(name, scope)`. Declarations in a compilation unit are
    /// re-keyed under the root so that other units find them.
    pub(crate) fn create_definition(
        &self,
        scope: &'a Scope<'a>,
        decl: &'a ast::ModuleDecl,
    ) -> &'a Symbol<'a> {
        let name = decl.name.value;
        let sym = self.alloc_symbol(
            name,
            decl.name.span.loc(),
            SymbolData::Definition(DefinitionSymbol {
                scope: Scope::new(),
                definition_kind: decl.kind,
                default_net_type: self.get_default_net_type(name),
                unconnected_drive: self.get_unconnected_drive(name),
                time_scale: self.get_directive_time_scale(name),
                parameters: RefCell::new(Vec::new()),
                syntax: decl,
            }),
        );
        scope.add_member(self, sym);

        let def_scope = sym.scope().unwrap();
        let params = match sym.data {
            SymbolData::Definition(ref d) => &d.parameters,
            _ => unreachable!(),
        };
        crate::symbols::elaborate_body(self, def_scope, decl, None, None, Some(params));

        let target = match scope.symbol().kind() {
            SymbolKind::CompilationUnit => self.root,
            _ => scope.symbol(),
        };
        self.definition_map
            .borrow_mut()
            .insert((name, PtrKey(target)), sym);
        sym
    }

    /// Find a definition visible from a scope, walking lexical parents up
    /// to and including the root.
    pub fn get_definition(&self, name: Name, scope: &'a Scope<'a>) -> Option<&'a Symbol<'a>> {
        let mut search = Some(scope);
        while let Some(current) = search {
            let sym = current.symbol();
            if let Some(&def) = self.definition_map.borrow().get(&(name, PtrKey(sym))) {
                return Some(def);
            }
            if sym.kind() == SymbolKind::Root {
                return None;
            }
            search = sym.parent_scope();
        }
        None
    }

    pub fn add_package(&self, package: &'a Symbol<'a>) {
        self.package_map.borrow_mut().insert(package.name, package);
    }

    pub fn get_package(&self, name: Name) -> Option<&'a Symbol<'a>> {
        self.package_map.borrow().get(&name).copied()
    }

    // ------------------------------------------------------------------
    // Builtins

    pub fn add_system_subroutine(&self, subroutine: SystemSubroutine) {
        self.subroutine_map
            .borrow_mut()
            .insert(subroutine.name, subroutine);
    }

    pub fn get_system_subroutine(&self, name: Name) -> Option<SystemSubroutine> {
        self.subroutine_map.borrow().get(&name).copied()
    }

    pub fn add_system_method(&self, target: MethodTarget, method: SystemSubroutine) {
        self.method_map
            .borrow_mut()
            .insert((method.name, target), method);
    }

    pub fn get_system_method(&self, target: MethodTarget, name: Name) -> Option<SystemSubroutine> {
        self.method_map.borrow().get(&(name, target)).copied()
    }

    // ------------------------------------------------------------------
    // Types

    /// The builtin type for a type syntax kind; `Error` for kinds that do
    /// not name a builtin.
    pub fn get_type(&self, kind: ast::TypeSyntaxKind) -> Type<'a> {
        self.known_types.get(&kind).copied().unwrap_or(self.error_type)
    }

    pub fn get_scalar_type(&self, flags: IntegralFlags) -> Type<'a> {
        self.scalar_type_table[(flags.bits() & 0x7) as usize]
            .expect("scalar type table entry missing")
    }

    pub fn get_net_type(&self, kind: NetKind) -> &'a NetType<'a> {
        self.known_net_types
            .get(&kind)
            .copied()
            .unwrap_or_else(|| self.known_net_types[&NetKind::Unknown])
    }

    pub fn wire_net_type(&self) -> &'a NetType<'a> {
        self.wire_net_type
    }

    /// Resolve a type syntax node against a scope at a reference point.
    pub fn type_from_syntax(
        &self,
        syntax: &'a ast::TypeSyntax,
        scope: &'a Scope<'a>,
        ref_point: LookupRefPoint<'a>,
    ) -> Type<'a> {
        match syntax.data {
            ast::TypeSyntaxData::Bit { signed } => {
                self.get_scalar_type(IntegralFlags::for_scalar(ScalarKind::Bit, signed))
            }
            ast::TypeSyntaxData::Logic { signed } => {
                self.get_scalar_type(IntegralFlags::for_scalar(ScalarKind::Logic, signed))
            }
            ast::TypeSyntaxData::Reg { signed } => {
                self.get_scalar_type(IntegralFlags::for_scalar(ScalarKind::Reg, signed))
            }
            ast::TypeSyntaxData::Named(name) => {
                let mut result = LookupResult::new();
                result.reference_point = ref_point;
                scope.lookup(self, name, &mut result);
                match result.symbol {
                    Some(sym) => match sym.data {
                        SymbolData::EnumType(ref e) => e.ty(),
                        SymbolData::TypeAlias(ref t) => t.declared_type.get_type(self, sym),
                        _ => {
                            self.add_diag(
                                Diagnostic::new(
                                    DiagCode::NotAType,
                                    syntax.span.loc(),
                                    format!("`{}` is not a type", name),
                                )
                                .symbol(scope.symbol()),
                            );
                            self.error_type
                        }
                    },
                    None => {
                        self.add_diag(
                            Diagnostic::new(
                                DiagCode::UndeclaredIdentifier,
                                syntax.span.loc(),
                                format!("`{}` is not declared", name),
                            )
                            .symbol(scope.symbol()),
                        );
                        self.error_type
                    }
                }
            }
            ast::TypeSyntaxData::Enum(_) => self.create_enum_type(syntax, scope, ref_point),
            _ => self.get_type(syntax.kind()),
        }
    }

    /// Build an enum type: the type symbol, its value symbols, and the
    /// interned `TypeKind::Enum` pointing back at it.
    fn create_enum_type(
        &self,
        syntax: &'a ast::TypeSyntax,
        scope: &'a Scope<'a>,
        ref_point: LookupRefPoint<'a>,
    ) -> Type<'a> {
        let enum_syntax = match syntax.data {
            ast::TypeSyntaxData::Enum(ref e) => e,
            _ => unreachable!(),
        };
        let base_type = match enum_syntax.base {
            Some(ref base) => self.type_from_syntax(base, scope, ref_point),
            None => self.int_type,
        };
        let sym = self.alloc_symbol(
            intern(""),
            syntax.span.loc(),
            SymbolData::EnumType(EnumTypeSymbol {
                scope: Scope::new(),
                base_type,
                ty: Cell::new(None),
                defn_scope: scope,
                defn_ref_point: ref_point,
            }),
        );
        let enum_scope = sym.scope().unwrap();
        let mut prev = None;
        for member in &enum_syntax.members {
            let value_sym = self.alloc_symbol(
                member.name.value,
                member.name.span.loc(),
                SymbolData::EnumValue(EnumValueSymbol {
                    init_syntax: member.init.as_ref(),
                    prev,
                    value: OnceCell::new(),
                }),
            );
            enum_scope.add_member(self, value_sym);
            prev = Some(value_sym);
        }
        let ty: Type<'a> = self.arena.types.alloc(TypeKind::Enum(sym));
        match sym.data {
            SymbolData::EnumType(ref e) => e.ty.set(Some(ty)),
            _ => unreachable!(),
        }
        ty
    }

    // ------------------------------------------------------------------
    // Per-declaration directives

    pub fn get_default_net_type(&self, module: Name) -> NetKind {
        self.default_net_type_map
            .borrow()
            .get(&module)
            .copied()
            .unwrap_or(NetKind::Wire)
    }

    pub fn get_unconnected_drive(&self, module: Name) -> UnconnectedDrive {
        self.unconnected_drive_map
            .borrow()
            .get(&module)
            .copied()
            .unwrap_or(UnconnectedDrive::None)
    }

    pub fn get_directive_time_scale(&self, module: Name) -> Option<TimeScale> {
        self.time_scale_directive_map.borrow().get(&module).copied()
    }

    // ------------------------------------------------------------------
    // Attributes

    /// Build attribute symbols for a list of attribute specs.
    pub(crate) fn build_attributes(
        &self,
        specs: &'a [ast::AttributeSpec],
        scope: &'a Scope<'a>,
    ) -> &'a [&'a Symbol<'a>] {
        let mut list = Vec::with_capacity(specs.len());
        for spec in specs {
            list.push(self.alloc_symbol(
                spec.name.value,
                spec.name.span.loc(),
                SymbolData::Attribute(AttributeSymbol {
                    value_syntax: spec.value.as_ref(),
                    scope,
                    value: OnceCell::new(),
                }),
            ));
        }
        let stored: &'a Vec<&'a Symbol<'a>> = self.arena.symbol_lists.alloc(list);
        stored.as_slice()
    }

    pub fn set_attributes(&self, symbol: &'a Symbol<'a>, attrs: &'a [&'a Symbol<'a>]) {
        self.attribute_map
            .borrow_mut()
            .insert(symbol as *const _ as usize, attrs);
    }

    pub fn set_stmt_attributes(&self, stmt: &'a ast::Stmt, attrs: &'a [&'a Symbol<'a>]) {
        self.attribute_map
            .borrow_mut()
            .insert(stmt as *const _ as usize, attrs);
    }

    pub fn set_expr_attributes(&self, expr: &'a ast::Expr, attrs: &'a [&'a Symbol<'a>]) {
        self.attribute_map
            .borrow_mut()
            .insert(expr as *const _ as usize, attrs);
    }

    pub fn get_attributes(&self, symbol: &Symbol<'a>) -> &'a [&'a Symbol<'a>] {
        self.attributes_for(symbol as *const _ as usize)
    }

    pub fn get_stmt_attributes(&self, stmt: &ast::Stmt) -> &'a [&'a Symbol<'a>] {
        self.attributes_for(stmt as *const _ as usize)
    }

    pub fn get_expr_attributes(&self, expr: &ast::Expr) -> &'a [&'a Symbol<'a>] {
        self.attributes_for(expr as *const _ as usize)
    }

    fn attributes_for(&self, addr: usize) -> &'a [&'a Symbol<'a>] {
        self.attribute_map
            .borrow()
            .get(&addr)
            .copied()
            .unwrap_or(&[])
    }

    // ------------------------------------------------------------------
    // Deferred member and import side tables

    fn deferred_slot(&self, scope: &Scope<'a>) -> usize {
        let index = scope.deferred_member_index.get();
        if index == DeferredMemberIndex::INVALID {
            let mut table = self.deferred_data.borrow_mut();
            table.push(Some(DeferredMemberData::default()));
            scope
                .deferred_member_index
                .set(DeferredMemberIndex(table.len() as u32));
            table.len() - 1
        } else {
            index.0 as usize - 1
        }
    }

    pub(crate) fn register_transparent_type(
        &self,
        scope: &Scope<'a>,
        anchor: Option<&'a Symbol<'a>>,
        declared: &'a DeclaredType<'a>,
        host: &'a Symbol<'a>,
    ) {
        let slot = self.deferred_slot(scope);
        self.deferred_data.borrow_mut()[slot]
            .as_mut()
            .expect("deferred slot detached")
            .transparent_types
            .push((anchor, declared, host));
    }

    pub(crate) fn add_deferred_member(
        &self,
        scope: &Scope<'a>,
        syntax: &'a ast::MemberSyntax,
        anchor: Option<&'a Symbol<'a>>,
    ) {
        let slot = self.deferred_slot(scope);
        self.deferred_data.borrow_mut()[slot]
            .as_mut()
            .expect("deferred slot detached")
            .members
            .push((syntax, anchor));
    }

    pub(crate) fn register_deferred_statement(&self, scope: &Scope<'a>, stmts: &'a [ast::Stmt]) {
        let slot = self.deferred_slot(scope);
        self.deferred_data.borrow_mut()[slot]
            .as_mut()
            .expect("deferred slot detached")
            .statement = Some(stmts);
    }

    pub(crate) fn take_deferred_data(&self, index: DeferredMemberIndex) -> DeferredMemberData<'a> {
        self.deferred_data.borrow_mut()[index.0 as usize - 1]
            .take()
            .expect("deferred slot already taken")
    }

    pub(crate) fn track_import(&self, scope: &Scope<'a>, import: &'a Symbol<'a>) {
        let index = scope.import_data_index.get();
        if index == ImportDataIndex::INVALID {
            let mut table = self.import_data.borrow_mut();
            table.push(vec![import]);
            scope
                .import_data_index
                .set(ImportDataIndex(table.len() as u32));
        } else {
            self.import_data.borrow_mut()[index.0 as usize - 1].push(import);
        }
    }

    pub(crate) fn query_imports(&self, index: ImportDataIndex) -> Vec<&'a Symbol<'a>> {
        if index == ImportDataIndex::INVALID {
            return Vec::new();
        }
        self.import_data.borrow()[index.0 as usize - 1].clone()
    }

    // ------------------------------------------------------------------
    // Diagnostics

    /// Record a semantic diagnostic, coalescing by `(code, location)`.
    /// Diagnostics raised under an uninstantiated generate block are
    /// dropped.
    pub fn add_diag(&self, diag: Diagnostic<'a>) {
        let symbol = diag
            .symbol
            .expect("semantic diagnostics must name a symbol");
        if self.is_suppressed(symbol) {
            trace!("suppressed diagnostic in uninstantiated block: {}", diag);
            return;
        }

        let inst = self.instance_or_def(symbol);
        let from_definition = inst.map_or(false, |s| s.kind() == SymbolKind::Definition);
        let key = (diag.code, diag.location);
        let is_error = diag.is_error();

        let mut map = self.diag_map.borrow_mut();
        if let Some(group) = map.get_mut(&key) {
            group.diags.push(diag);
            if from_definition {
                group.definition_index = Some(group.diags.len() - 1);
            }
            return;
        }
        if is_error {
            self.num_errors.set(self.num_errors.get() + 1);
        }
        map.insert(
            key,
            DiagGroup {
                diags: vec![diag],
                definition_index: if from_definition { Some(0) } else { None },
            },
        );
    }

    /// The number of distinct error buckets recorded so far.
    pub fn error_count(&self) -> usize {
        self.num_errors.get()
    }

    fn is_suppressed(&self, symbol: &'a Symbol<'a>) -> bool {
        let mut current = Some(symbol);
        while let Some(sym) = current {
            if let SymbolData::GenerateBlock(ref block) = sym.data {
                if !block.is_instantiated {
                    return true;
                }
            }
            current = sym.parent_scope().map(|s| s.symbol());
        }
        false
    }

    /// The nearest enclosing definition or instance symbol.
    fn instance_or_def(&self, symbol: &'a Symbol<'a>) -> Option<&'a Symbol<'a>> {
        let mut current = Some(symbol);
        while let Some(sym) = current {
            if sym.kind() == SymbolKind::Definition || sym.kind().is_instance() {
                return Some(sym);
            }
            current = sym.parent_scope().map(|s| s.symbol());
        }
        None
    }

    fn is_inside_def(&self, symbol: &'a Symbol<'a>) -> bool {
        let mut sym = symbol;
        loop {
            if sym.kind() == SymbolKind::Definition {
                return true;
            }
            match sym.parent_scope() {
                Some(scope) => sym = scope.symbol(),
                None => return false,
            }
        }
    }

    /// The diagnostics the parser attached to the added trees.
    pub fn get_parse_diagnostics(&self) -> Diagnostics<'a> {
        if let Some(cached) = self.cached_parse_diagnostics.borrow().as_ref() {
            return cached.clone();
        }
        let mut results = Diagnostics::new();
        for tree in self.syntax_trees.borrow().iter() {
            for diag in &tree.diagnostics {
                results.push(diag.clone());
            }
        }
        results.sort();
        *self.cached_parse_diagnostics.borrow_mut() = Some(results.clone());
        results
    }

    /// Force every lazy field in the hierarchy, then emit one diagnostic
    /// per `(code, location)` bucket.
    pub fn get_semantic_diagnostics(&self) -> Diagnostics<'a> {
        if let Some(cached) = self.cached_semantic_diagnostics.borrow().as_ref() {
            return cached.clone();
        }

        // Touch every symbol, scope, and deferred body so that all lazily
        // evaluated members have been realized and every diagnostic is in
        // the table.
        let error_limit = if self.options.error_limit == 0 {
            usize::max_value()
        } else {
            self.options.error_limit as usize
        };
        let root = self.get_root();
        let mut visitor = DiagnosticVisitor::new(self, error_limit);
        visitor.visit(root);

        let mut results = Diagnostics::new();
        let map = self.diag_map.borrow();
        for (_, group) in map.iter().sorted_by_key(|entry| *entry.0) {
            // If any entry was raised inside a definition (as opposed to
            // one or more instances), emit it verbatim.
            if let Some(index) = group.definition_index {
                results.push(group.diags[index].clone());
                continue;
            }

            // Otherwise look for an entry from an instance that is not at
            // the top level; printing a hierarchical path for a top-level
            // instance would be noise.
            let mut found: Option<&Diagnostic<'a>> = None;
            let mut inst: Option<&'a Symbol<'a>> = None;
            let mut count = 0usize;
            for diag in &group.diags {
                let symbol = match diag.symbol {
                    Some(s) => s,
                    None => continue,
                };
                let id_sym = match self.instance_or_def(symbol) {
                    Some(s) => s,
                    None => continue,
                };
                if id_sym.parent_scope().is_none() {
                    continue;
                }
                if self.is_inside_def(id_sym) {
                    continue;
                }
                count += 1;
                let parent = id_sym.parent_scope().unwrap().symbol();
                if parent.kind() != SymbolKind::Root
                    && parent.kind() != SymbolKind::CompilationUnit
                {
                    found = Some(diag);
                    inst = Some(id_sym);
                }
            }

            // If the diagnostic is present in all instances, emitting the
            // first entry without instance info reads better.
            let instance_total = inst
                .and_then(|i| match i.data {
                    SymbolData::ModuleInstance(ref x)
                    | SymbolData::ProgramInstance(ref x)
                    | SymbolData::InterfaceInstance(ref x) => Some(x.definition),
                    _ => None,
                })
                .and_then(|def| visitor.instance_count.get(&PtrKey(def)).copied())
                .unwrap_or(0);
            if let (Some(found), Some(inst)) = (found, inst) {
                if instance_total > count {
                    let mut diag = found.clone();
                    diag.symbol = Some(inst);
                    diag.coalesce_count = Some(count);
                    results.push(diag);
                    continue;
                }
            }
            results.push(group.diags[0].clone());
        }
        drop(map);

        results.sort();
        *self.cached_semantic_diagnostics.borrow_mut() = Some(results.clone());
        results
    }

    /// Parse and semantic diagnostics combined, in source order.
    pub fn get_all_diagnostics(&self) -> Diagnostics<'a> {
        if let Some(cached) = self.cached_all_diagnostics.borrow().as_ref() {
            return cached.clone();
        }
        let mut results = Diagnostics::new();
        results.extend_from(&self.get_parse_diagnostics());
        results.extend_from(&self.get_semantic_diagnostics());
        results.sort();
        *self.cached_all_diagnostics.borrow_mut() = Some(results.clone());
        results
    }

    // ------------------------------------------------------------------
    // Allocation

    pub(crate) fn alloc_symbol(
        &self,
        name: Name,
        loc: Location,
        data: SymbolData<'a>,
    ) -> &'a Symbol<'a> {
        let sym: &'a Symbol<'a> = self.arena.symbols.alloc(Symbol::new(name, loc, data));
        if let Some(scope) = sym.scope() {
            scope.this_sym.set(Some(sym));
        }
        sym
    }
}

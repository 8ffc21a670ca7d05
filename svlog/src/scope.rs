// Copyright (c) 2021 The mead authors

//! Scopes and name lookup.
//!
//! A scope owns an ordered, singly-linked chain of member symbols and a
//! name map pointing at the first member inserted under each name. Some
//! members are registered lazily: hierarchy instantiations and generate
//! constructs are recorded as syntax and only expanded into symbols the
//! first time the scope is observed, and inline enum declarations splice
//! transparent wrappers for their values next to the host declaration.
//! Both mechanisms live in side tables owned by the compilation so that
//! scopes without deferred work stay small.

use crate::ast;
use crate::binding;
use crate::compilation::Compilation;
use crate::crate_prelude::*;
use crate::symbols::{
    ContinuousAssignSymbol, DeclaredType, ExplicitImportSymbol, GenerateBlockArraySymbol,
    GenerateBlockSymbol, InstanceSymbol, PackageSymbol, ProceduralBlockSymbol, SubroutineSymbol,
    Symbol, SymbolData, SymbolKind, TransparentMemberSymbol, TypeAliasSymbol, VariableSymbol,
    WildcardImportSymbol,
};
use crate::ty::TypeKind;
use log::trace;
use once_cell::unsync::OnceCell;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

/// A slot into the compilation's deferred-member side table.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) struct DeferredMemberIndex(pub(crate) u32);

impl DeferredMemberIndex {
    pub(crate) const INVALID: DeferredMemberIndex = DeferredMemberIndex(0);
}

/// A slot into the compilation's wildcard-import side table.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) struct ImportDataIndex(pub(crate) u32);

impl ImportDataIndex {
    pub(crate) const INVALID: ImportDataIndex = ImportDataIndex(0);
}

/// Deferred work registered for a scope: members to expand, transparent
/// enum splices to perform, or a statement body to bind.
#[derive(Default)]
pub(crate) struct DeferredMemberData<'a> {
    pub members: Vec<(&'a ast::MemberSyntax, Option<&'a Symbol<'a>>)>,
    pub transparent_types: Vec<(Option<&'a Symbol<'a>>, &'a DeclaredType<'a>, &'a Symbol<'a>)>,
    pub statement: Option<&'a [ast::Stmt]>,
}

/// What kind of name reference a lookup serves.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LookupNameKind {
    /// An unqualified name. Subject to declaration-before-use.
    Local,
    /// The tail of a `pkg::name` reference. Subject to ordering, and falls
    /// back to the package registry at the root.
    Scoped,
    /// A hierarchical path element; ordering does not apply.
    Hierarchical,
}

/// A position inside a scope, used to enforce declaration-before-use.
/// Ordering is only meaningful between positions in the same scope.
#[derive(Clone, Copy, Debug)]
pub struct LookupRefPoint<'a> {
    pub scope: Option<&'a Scope<'a>>,
    pub index: u32,
}

impl<'a> LookupRefPoint<'a> {
    /// A sentinel larger than any real position.
    pub fn max() -> LookupRefPoint<'a> {
        LookupRefPoint {
            scope: None,
            index: u32::max_value(),
        }
    }

    /// A sentinel smaller than any real position.
    pub fn min() -> LookupRefPoint<'a> {
        LookupRefPoint {
            scope: None,
            index: 0,
        }
    }

    /// The position just before a symbol.
    pub fn before(symbol: &'a Symbol<'a>) -> LookupRefPoint<'a> {
        LookupRefPoint {
            scope: symbol.parent_scope(),
            index: symbol.index_in_scope(),
        }
    }

    /// The position just after a symbol.
    pub fn after(symbol: &'a Symbol<'a>) -> LookupRefPoint<'a> {
        LookupRefPoint {
            scope: symbol.parent_scope(),
            index: symbol.index_in_scope() + 1,
        }
    }

    pub fn start_of_scope(scope: &'a Scope<'a>) -> LookupRefPoint<'a> {
        LookupRefPoint {
            scope: Some(scope),
            index: 0,
        }
    }

    pub fn end_of_scope(scope: &'a Scope<'a>) -> LookupRefPoint<'a> {
        LookupRefPoint {
            scope: Some(scope),
            index: u32::max_value(),
        }
    }
}

impl PartialEq for LookupRefPoint<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl PartialOrd for LookupRefPoint<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.index.cmp(&other.index))
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LookupResultKind {
    NotFound,
    Found,
    AmbiguousImport,
}

/// The mutable carrier a lookup fills in.
pub struct LookupResult<'a> {
    pub name_kind: LookupNameKind,
    pub reference_point: LookupRefPoint<'a>,
    pub result_kind: LookupResultKind,
    pub result_was_imported: bool,
    pub symbol: Option<&'a Symbol<'a>>,
    /// Candidate symbols accumulated from wildcard imports, kept for
    /// ambiguity reporting.
    pub imports: Vec<&'a Symbol<'a>>,
}

impl<'a> LookupResult<'a> {
    pub fn new() -> LookupResult<'a> {
        LookupResult {
            name_kind: LookupNameKind::Local,
            reference_point: LookupRefPoint::max(),
            result_kind: LookupResultKind::NotFound,
            result_was_imported: false,
            symbol: None,
            imports: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        *self = LookupResult::new();
    }

    pub fn found(&self) -> bool {
        self.result_kind == LookupResultKind::Found
    }

    /// Whether the reference point constrains this lookup.
    pub fn reference_point_matters(&self) -> bool {
        self.name_kind == LookupNameKind::Local || self.name_kind == LookupNameKind::Scoped
    }

    pub fn set_symbol(&mut self, symbol: &'a Symbol<'a>, was_imported: bool) {
        self.symbol = Some(symbol);
        self.result_was_imported = was_imported;
        self.result_kind = LookupResultKind::Found;
    }

    pub fn add_potential_import(&mut self, import: &'a Symbol<'a>) {
        if !self.imports.is_empty() {
            self.result_kind = LookupResultKind::AmbiguousImport;
        }
        self.imports.push(import);
    }
}

impl<'a> Default for LookupResult<'a> {
    fn default() -> Self {
        LookupResult::new()
    }
}

/// The scope state embedded in scope-bearing symbols.
#[derive(Debug)]
pub struct Scope<'a> {
    pub(crate) this_sym: Cell<Option<&'a Symbol<'a>>>,
    first_member: Cell<Option<&'a Symbol<'a>>>,
    last_member: Cell<Option<&'a Symbol<'a>>>,
    name_map: RefCell<HashMap<Name, &'a Symbol<'a>>>,
    pub(crate) deferred_member_index: Cell<DeferredMemberIndex>,
    pub(crate) import_data_index: Cell<ImportDataIndex>,
}

impl<'a> Scope<'a> {
    pub fn new() -> Scope<'a> {
        Scope {
            this_sym: Cell::new(None),
            first_member: Cell::new(None),
            last_member: Cell::new(None),
            name_map: RefCell::new(HashMap::new()),
            deferred_member_index: Cell::new(DeferredMemberIndex::INVALID),
            import_data_index: Cell::new(ImportDataIndex::INVALID),
        }
    }

    /// The symbol this scope belongs to.
    pub fn symbol(&self) -> &'a Symbol<'a> {
        self.this_sym.get().expect("scope not attached to a symbol")
    }

    /// The scope lexically enclosing this one.
    pub fn parent(&self) -> Option<&'a Scope<'a>> {
        self.symbol().parent_scope()
    }

    /// Iterate the members of this scope in insertion order, expanding any
    /// deferred members first.
    pub fn members(&'a self, cx: &Compilation<'a>) -> MemberIter<'a> {
        self.ensure_members(cx);
        MemberIter {
            current: self.first_member.get(),
        }
    }

    /// Append a symbol to this scope.
    ///
    /// If the symbol declares a type whose source is an inline enum, a
    /// transparent-member splice is registered so the enum's value names
    /// become visible as siblings of the host declaration.
    pub fn add_member(&'a self, cx: &Compilation<'a>, member: &'a Symbol<'a>) {
        let lazy = match member.data {
            SymbolData::Variable(ref v) => Some(&v.declared_type),
            SymbolData::FormalArgument(ref f) => Some(&f.declared_type),
            SymbolData::Parameter(ref p) => Some(&p.declared_type),
            SymbolData::Subroutine(ref s) => Some(&s.return_type),
            _ => None,
        };
        if let Some(declared) = lazy {
            if let Some(source) = declared.get_source() {
                if let ast::TypeSyntaxData::Enum(_) = source.data {
                    cx.register_transparent_type(self, self.last_member.get(), declared, member);
                }
            }
        }
        self.insert_member(member, self.last_member.get());
    }

    /// Absorb a syntax node into this scope, dispatching on its kind.
    pub fn add_members(&'a self, cx: &Compilation<'a>, syntax: &'a ast::MemberSyntax) {
        match *syntax {
            ast::MemberSyntax::Module(ref decl) => {
                cx.create_definition(self, decl);
            }
            ast::MemberSyntax::Package(ref decl) => {
                // Packages exist in their own namespace and are tracked in
                // the compilation.
                cx.add_package(PackageSymbol::from_syntax(cx, decl));
            }
            ast::MemberSyntax::Import(ref decl) => {
                for item in &decl.items {
                    match item.kind {
                        ast::ImportItemKind::Star => {
                            let import = cx.alloc_symbol(
                                mead_common::name::intern(""),
                                item.span.loc(),
                                SymbolData::WildcardImport(WildcardImportSymbol {
                                    package_name: item.package.value,
                                    package: OnceCell::new(),
                                }),
                            );
                            self.add_member(cx, import);
                            cx.track_import(self, import);
                        }
                        ast::ImportItemKind::Named(name) => {
                            let import = cx.alloc_symbol(
                                name.value,
                                name.span.loc(),
                                SymbolData::ExplicitImport(ExplicitImportSymbol {
                                    package_name: item.package.value,
                                    import_name: name.value,
                                    resolved: OnceCell::new(),
                                }),
                            );
                            self.add_member(cx, import);
                        }
                    }
                }
            }
            ast::MemberSyntax::HierarchyInst(_)
            | ast::MemberSyntax::IfGenerate(_)
            | ast::MemberSyntax::LoopGenerate(_) => {
                self.add_deferred_member(cx, syntax);
            }
            ast::MemberSyntax::GenerateRegion(ref region) => {
                for member in &region.members {
                    self.add_members(cx, member);
                }
            }
            ast::MemberSyntax::Subroutine(ref decl) => {
                self.add_member(cx, SubroutineSymbol::from_syntax(cx, decl));
            }
            ast::MemberSyntax::Data(ref decl) => {
                for d in &decl.declarators {
                    let sym = cx.alloc_symbol(
                        d.name.value,
                        d.name.span.loc(),
                        SymbolData::Variable(VariableSymbol {
                            declared_type: DeclaredType::new(Some(&decl.ty))
                                .with_initializer(d.init.as_ref()),
                        }),
                    );
                    self.add_member(cx, sym);
                    if !decl.attrs.is_empty() {
                        cx.set_attributes(sym, cx.build_attributes(&decl.attrs, self));
                    }
                }
            }
            ast::MemberSyntax::Param(ref decl) => {
                crate::symbols::add_parameters(cx, self, decl, None, None);
            }
            ast::MemberSyntax::Procedural(ref block) => {
                let sym = cx.alloc_symbol(
                    mead_common::name::intern(""),
                    block.span.loc(),
                    SymbolData::ProceduralBlock(ProceduralBlockSymbol {
                        scope: Scope::new(),
                        kind: block.kind,
                    }),
                );
                cx.register_deferred_statement(sym.scope().unwrap(), &block.body);
                self.add_member(cx, sym);
                if !block.attrs.is_empty() {
                    cx.set_attributes(sym, cx.build_attributes(&block.attrs, self));
                }
            }
            ast::MemberSyntax::ContinuousAssign(ref decl) => {
                for assign in &decl.assignments {
                    let sym = cx.alloc_symbol(
                        mead_common::name::intern(""),
                        assign.span.loc(),
                        SymbolData::ContinuousAssign(ContinuousAssignSymbol {
                            assign,
                            bound: OnceCell::new(),
                        }),
                    );
                    self.add_member(cx, sym);
                    if !decl.attrs.is_empty() {
                        cx.set_attributes(sym, cx.build_attributes(&decl.attrs, self));
                    }
                }
            }
            ast::MemberSyntax::Modport(_) => {
                // TODO: modports
            }
            ast::MemberSyntax::Typedef(ref decl) => {
                let sym = cx.alloc_symbol(
                    decl.name.value,
                    decl.name.span.loc(),
                    SymbolData::TypeAlias(TypeAliasSymbol {
                        declared_type: DeclaredType::new(Some(&decl.ty)),
                    }),
                );
                self.add_member(cx, sym);
                if let ast::TypeSyntaxData::Enum(_) = decl.ty.data {
                    // Enum value names become siblings of the typedef.
                    let declared = match sym.data {
                        SymbolData::TypeAlias(ref t) => &t.declared_type,
                        _ => unreachable!(),
                    };
                    cx.register_transparent_type(self, Some(sym), declared, sym);
                }
            }
        }
    }

    /// Look up a name, honoring declaration order, imports, and the parent
    /// chain. The result is reported through `result`; lookups never fail.
    pub fn lookup(&'a self, cx: &Compilation<'a>, name: Name, result: &mut LookupResult<'a>) {
        // A missing identifier was already reported by the parser.
        if name.is_empty() {
            return;
        }

        // First do a direct search and see if we find anything.
        self.ensure_members(cx);
        let local = self.name_map.borrow().get(&name).copied();
        if let Some(symbol) = local {
            // If this is a local or scoped lookup, check that we can access
            // the symbol (it must be declared before use). Callables can be
            // referenced anywhere in the scope, so the position does not
            // matter for them.
            let mut location_good = true;
            if result.reference_point_matters() && symbol.kind() != SymbolKind::Subroutine {
                location_good = LookupRefPoint::before(symbol) < result.reference_point;
            }
            if location_good {
                match symbol.data {
                    SymbolData::ExplicitImport(ref import) => {
                        // A dangling import leaves the result at NotFound;
                        // the caller diagnoses.
                        if let Some(target) = import.imported_symbol(cx) {
                            result.set_symbol(target, true);
                        }
                    }
                    SymbolData::TransparentMember(ref member) => {
                        result.set_symbol(member.wrapped, false);
                    }
                    _ => result.set_symbol(symbol, false),
                }
                return;
            }
        }

        // We didn't find a viable symbol locally. Try looking in any
        // wildcard imports declared at or before the reference point.
        let mut import_results = Vec::new();
        for import in cx.query_imports(self.import_data_index.get()) {
            if result.reference_point < LookupRefPoint::after(import) {
                break;
            }
            let wildcard = match import.data {
                SymbolData::WildcardImport(ref w) => w,
                _ => unreachable!(),
            };
            let package = match wildcard.package(cx) {
                Some(p) => p,
                // A missing package leaves the result at NotFound.
                None => continue,
            };
            let package_scope = package.scope().expect("package has a scope");
            if let Some(found) = package_scope.lookup_direct(cx, name) {
                import_results.push(found);
                result.add_potential_import(found);
            }
        }
        if !import_results.is_empty() {
            if import_results.len() == 1 {
                result.set_symbol(import_results[0], true);
            }
            return;
        }

        let this_sym = self.symbol();
        if this_sym.kind() == SymbolKind::Root {
            // For scoped lookups, if we reach the root without finding
            // anything, look for a package.
            if result.name_kind == LookupNameKind::Scoped {
                if let Some(package) = cx.get_package(name) {
                    result.set_symbol(package, false);
                }
            }
            return;
        }

        // Continue up the scope chain. Visibility in the enclosing scope is
        // relative to where this scope's symbol was declared.
        let parent = match self.parent() {
            Some(p) => p,
            None => {
                trace!("lookup `{}` stopped at detached scope {:?}", name, this_sym);
                return;
            }
        };
        result.reference_point = LookupRefPoint::after(this_sym);
        parent.lookup(cx, name, result)
    }

    /// The non-recursive, import-excluding lookup used for package
    /// cross-references. Transparent members are returned unwrapped.
    pub fn lookup_direct(&'a self, cx: &Compilation<'a>, name: Name) -> Option<&'a Symbol<'a>> {
        // A missing identifier was already reported by the parser; bail
        // quietly so callers need not check.
        if name.is_empty() {
            return None;
        }
        self.ensure_members(cx);
        let result = self.name_map.borrow().get(&name).copied();
        match result {
            Some(symbol) if symbol.kind() != SymbolKind::ExplicitImport => Some(symbol),
            _ => None,
        }
    }

    /// Splice a member into the chain after `at`, or at the head when `at`
    /// is `None`.
    pub(crate) fn insert_member(&'a self, member: &'a Symbol<'a>, at: Option<&'a Symbol<'a>>) {
        assert!(member.parent.get().is_none(), "symbol already in a scope");
        assert!(member.next.get().is_none());

        match at {
            None => {
                member.index.set(1);
                member.next.set(self.first_member.replace(Some(member)));
            }
            Some(at) => {
                let at_is_tail = match self.last_member.get() {
                    Some(last) => std::ptr::eq(last, at),
                    None => false,
                };
                member.index.set(at.index.get() + at_is_tail as u32);
                member.next.set(at.next.replace(Some(member)));
            }
        }
        if member.next.get().is_none() {
            self.last_member.set(Some(member));
        }
        member.parent.set(Some(self));

        if !member.name.is_empty() {
            self.name_map
                .borrow_mut()
                .entry(member.name)
                .or_insert(member);
        }
    }

    fn add_deferred_member(&'a self, cx: &Compilation<'a>, syntax: &'a ast::MemberSyntax) {
        cx.add_deferred_member(self, syntax, self.last_member.get());
    }

    /// Expand deferred members if any are registered. Idempotent.
    pub(crate) fn ensure_members(&'a self, cx: &Compilation<'a>) {
        if self.deferred_member_index.get() != DeferredMemberIndex::INVALID {
            self.realize_deferred_members(cx);
        }
    }

    fn realize_deferred_members(&'a self, cx: &Compilation<'a>) {
        let index = self.deferred_member_index.get();
        assert!(index != DeferredMemberIndex::INVALID);
        // Detach the slot first so that lookups triggered below see the
        // scope as already realized.
        self.deferred_member_index.set(DeferredMemberIndex::INVALID);
        let data = cx.take_deferred_data(index);
        trace!("realizing deferred members of {:?}", self.symbol());

        for (anchor, declared, host) in data.transparent_types {
            let ty = declared.get_type(cx, host);
            if let TypeKind::Enum(enum_sym) = *ty {
                let et = match enum_sym.data {
                    SymbolData::EnumType(ref e) => e,
                    _ => unreachable!(),
                };
                let mut insert_at = anchor;
                for value in et.values(cx) {
                    let wrapped = cx.alloc_symbol(
                        value.name,
                        value.loc,
                        SymbolData::TransparentMember(TransparentMemberSymbol { wrapped: value }),
                    );
                    self.insert_member(wrapped, insert_at);
                    insert_at = Some(wrapped);
                }
            }
        }

        if let Some(stmts) = data.statement {
            binding::bind_body(cx, self, stmts);
        } else {
            for (node, anchor) in data.members {
                match *node {
                    ast::MemberSyntax::HierarchyInst(ref inst) => {
                        let symbols = InstanceSymbol::from_syntax(cx, inst, self);
                        let mut last = anchor;
                        for symbol in symbols {
                            self.insert_member(symbol, last);
                            last = Some(symbol);
                        }
                    }
                    ast::MemberSyntax::IfGenerate(ref gen) => {
                        let point = match anchor {
                            Some(at) => LookupRefPoint::after(at),
                            None => LookupRefPoint::start_of_scope(self),
                        };
                        let ctx = binding::EvalContext {
                            cx,
                            scope: self,
                            ref_point: point,
                            host: self.symbol(),
                            genvar: None,
                            enum_scope: None,
                        };
                        let taken = binding::eval_const(&ctx, &gen.cond)
                            .map(|v| v.is_true())
                            .unwrap_or(false);
                        let block = if taken {
                            GenerateBlockSymbol::from_syntax(cx, &gen.block, true)
                        } else if let Some(ref else_block) = gen.else_block {
                            GenerateBlockSymbol::from_syntax(cx, else_block, true)
                        } else {
                            // The untaken branch still exists in the tree so
                            // its names resolve; its diagnostics are
                            // suppressed.
                            GenerateBlockSymbol::from_syntax(cx, &gen.block, false)
                        };
                        self.insert_member(block, anchor);
                    }
                    ast::MemberSyntax::LoopGenerate(ref gen) => {
                        let point = match anchor {
                            Some(at) => LookupRefPoint::after(at),
                            None => LookupRefPoint::start_of_scope(self),
                        };
                        let block =
                            GenerateBlockArraySymbol::from_syntax(cx, gen, self, point);
                        self.insert_member(block, anchor);
                    }
                    _ => unreachable!("invalid deferred member"),
                }
            }
        }
    }
}

/// Iterator over a scope's sibling chain.
pub struct MemberIter<'a> {
    current: Option<&'a Symbol<'a>>,
}

impl<'a> Iterator for MemberIter<'a> {
    type Item = &'a Symbol<'a>;

    fn next(&mut self) -> Option<&'a Symbol<'a>> {
        let current = self.current?;
        self.current = current.next_in_scope();
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ref_point_ordering() {
        let min = LookupRefPoint::min();
        let max = LookupRefPoint::max();
        assert!(min < max);
        assert!(!(max < min));
        assert!(min <= min);
    }

    #[test]
    fn result_defaults() {
        let result = LookupResult::new();
        assert_eq!(result.result_kind, LookupResultKind::NotFound);
        assert!(result.reference_point_matters());
        assert!(!result.found());
    }

    #[test]
    fn ambiguity_after_second_candidate() {
        // The kind only flips once a second candidate arrives; a single
        // import is a clean hit.
        let a = Symbol::new(
            mead_common::name::intern("x"),
            mead_common::source::INVALID_LOCATION,
            SymbolData::Variable(VariableSymbol {
                declared_type: DeclaredType::new(None),
            }),
        );
        let b = Symbol::new(
            mead_common::name::intern("x"),
            mead_common::source::INVALID_LOCATION,
            SymbolData::Variable(VariableSymbol {
                declared_type: DeclaredType::new(None),
            }),
        );
        let mut result = LookupResult::new();
        result.add_potential_import(&a);
        assert_eq!(result.result_kind, LookupResultKind::NotFound);
        result.add_potential_import(&b);
        assert_eq!(result.result_kind, LookupResultKind::AmbiguousImport);
        assert_eq!(result.imports.len(), 2);
    }
}

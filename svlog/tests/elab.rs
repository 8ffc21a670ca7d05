// Copyright (c) 2021 The mead authors

//! End-to-end elaboration tests.
//!
//! The parser lives outside this crate, so these tests construct syntax
//! trees programmatically and drive the compilation through its public
//! surface: `add_syntax_tree`, `get_root`, lookups, and the diagnostic
//! getters.

use mead_common::name::{intern, Name};
use mead_common::source::{Source, SourceManager, Span, Spanned};
use mead_svlog::ast::*;
use mead_svlog::binding::ConstantValue;
use mead_svlog::diag::DiagCode;
use mead_svlog::symbols::Symbol;
use mead_svlog::ty::{NetKind, TimeScale, TimeScaleMagnitude, TimeScaleValue, TimeUnit};
use mead_svlog::{
    Compilation, CompilationError, CompilationOptions, GlobalArenas, LookupNameKind,
    LookupRefPoint, LookupResult, LookupResultKind, SymbolData, SymbolKind,
};
use num::BigInt;
use std::cell::Cell;

/// Hands out distinct, strictly increasing spans so declaration order and
/// diagnostic locations are controlled by construction order.
struct SpanGen {
    source: Source,
    next: Cell<u32>,
}

impl SpanGen {
    fn new(sm: &SourceManager, path: &str) -> SpanGen {
        SpanGen {
            source: sm.add_text(path, ""),
            next: Cell::new(0),
        }
    }

    fn span(&self) -> Span {
        let begin = self.next.get();
        self.next.set(begin + 10);
        Span::new(self.source, begin, begin + 5)
    }

    fn name(&self, name: &str) -> Spanned<Name> {
        Spanned::new(intern(name), self.span())
    }
}

fn int_ty(g: &SpanGen) -> TypeSyntax {
    TypeSyntax::new(g.span(), TypeSyntaxData::Int)
}

fn named_ty(g: &SpanGen, name: &str) -> TypeSyntax {
    TypeSyntax::new(g.span(), TypeSyntaxData::Named(intern(name)))
}

fn enum_ty(g: &SpanGen, members: &[&str]) -> TypeSyntax {
    TypeSyntax::new(
        g.span(),
        TypeSyntaxData::Enum(EnumTypeSyntax {
            base: None,
            members: members
                .iter()
                .map(|m| EnumMemberSyntax {
                    span: g.span(),
                    name: g.name(m),
                    init: None,
                })
                .collect(),
        }),
    )
}

fn data_decl(g: &SpanGen, ty: TypeSyntax, name: &str, init: Option<Expr>) -> MemberSyntax {
    MemberSyntax::Data(DataDecl {
        span: g.span(),
        attrs: Vec::new(),
        ty,
        declarators: vec![Declarator {
            span: g.span(),
            name: g.name(name),
            init,
        }],
    })
}

fn param_decl(g: &SpanGen, name: &str, default: Option<Expr>) -> ParamDecl {
    ParamDecl {
        span: g.span(),
        is_local: false,
        ty: None,
        declarators: vec![Declarator {
            span: g.span(),
            name: g.name(name),
            init: default,
        }],
    }
}

fn module(g: &SpanGen, name: &str, members: Vec<MemberSyntax>) -> MemberSyntax {
    module_with_params(g, name, Vec::new(), members)
}

fn module_with_params(
    g: &SpanGen,
    name: &str,
    params: Vec<ParamDecl>,
    members: Vec<MemberSyntax>,
) -> MemberSyntax {
    MemberSyntax::Module(ModuleDecl {
        span: g.span(),
        kind: DefinitionKind::Module,
        name: g.name(name),
        params,
        ports: Vec::new(),
        members,
    })
}

fn package(g: &SpanGen, name: &str, members: Vec<MemberSyntax>) -> MemberSyntax {
    MemberSyntax::Package(PackageDecl {
        span: g.span(),
        name: g.name(name),
        members,
    })
}

fn import_star(g: &SpanGen, pkg: &str) -> MemberSyntax {
    MemberSyntax::Import(ImportDecl {
        span: g.span(),
        items: vec![ImportItem {
            span: g.span(),
            package: g.name(pkg),
            kind: ImportItemKind::Star,
        }],
    })
}

fn import_named(g: &SpanGen, pkg: &str, name: &str) -> MemberSyntax {
    MemberSyntax::Import(ImportDecl {
        span: g.span(),
        items: vec![ImportItem {
            span: g.span(),
            package: g.name(pkg),
            kind: ImportItemKind::Named(g.name(name)),
        }],
    })
}

fn hier_inst(g: &SpanGen, target: &str, name: &str) -> MemberSyntax {
    hier_inst_with_params(g, target, name, Vec::new())
}

fn hier_inst_with_params(
    g: &SpanGen,
    target: &str,
    name: &str,
    params: Vec<NamedParamAssignment>,
) -> MemberSyntax {
    MemberSyntax::HierarchyInst(HierarchyInst {
        span: g.span(),
        attrs: Vec::new(),
        target: g.name(target),
        params,
        instances: vec![InstanceDecl {
            span: g.span(),
            name: g.name(name),
            conns: Vec::new(),
        }],
    })
}

fn find_top<'a>(cx: &Compilation<'a>, name: &str) -> &'a Symbol<'a> {
    let root = cx.get_root();
    let scope = root.scope().unwrap();
    scope
        .members(cx)
        .find(|s| s.kind().is_instance() && &s.name.as_str()[..] == name)
        .unwrap_or_else(|| panic!("no top instance named `{}`", name))
}

fn member_names<'a>(cx: &Compilation<'a>, sym: &'a Symbol<'a>) -> Vec<String> {
    sym.scope()
        .unwrap()
        .members(cx)
        .map(|m| m.name.as_str().to_string())
        .collect()
}

#[test]
fn transparent_enum_members() {
    let sm = SourceManager::new();
    let arena = GlobalArenas::default();
    let g = SpanGen::new(&sm, "enum.sv");

    // typedef enum { A, B, C } E; E v;
    let members = vec![
        MemberSyntax::Typedef(TypedefDecl {
            span: g.span(),
            name: g.name("E"),
            ty: enum_ty(&g, &["A", "B", "C"]),
        }),
        data_decl(&g, named_ty(&g, "E"), "v", None),
    ];
    let tree = SyntaxTree::new(&sm, vec![module(&g, "m", members)]);
    let cx = Compilation::new(&arena);
    cx.add_syntax_tree(&tree).unwrap();

    let m = find_top(&cx, "m");
    let scope = m.scope().unwrap();
    assert_eq!(member_names(&cx, m), ["E", "A", "B", "C", "v"]);

    // The spliced wrappers share their anchor's index; the trailing
    // variable stays strictly after.
    let chain: Vec<_> = scope.members(&cx).collect();
    assert_eq!(chain[0].index_in_scope(), 1);
    assert_eq!(chain[1].index_in_scope(), 1);
    assert_eq!(chain[3].index_in_scope(), 1);
    assert_eq!(chain[4].index_in_scope(), 2);

    // lookup unwraps the transparent member; lookup_direct does not.
    let mut result = LookupResult::new();
    scope.lookup(&cx, intern("A"), &mut result);
    assert_eq!(result.result_kind, LookupResultKind::Found);
    let a = result.symbol.unwrap();
    assert_eq!(a.kind(), SymbolKind::EnumValue);

    let direct = scope.lookup_direct(&cx, intern("A")).unwrap();
    assert_eq!(direct.kind(), SymbolKind::TransparentMember);
    match direct.data {
        SymbolData::TransparentMember(ref t) => assert!(std::ptr::eq(t.wrapped, a)),
        _ => unreachable!(),
    }

    // Values count up from zero.
    match a.data {
        SymbolData::EnumValue(ref v) => {
            assert_eq!(
                v.get_value(&cx, a),
                Some(&ConstantValue::Int(BigInt::from(0)))
            );
        }
        _ => unreachable!(),
    }
    let mut result = LookupResult::new();
    scope.lookup(&cx, intern("C"), &mut result);
    let c = result.symbol.unwrap();
    match c.data {
        SymbolData::EnumValue(ref v) => {
            assert_eq!(
                v.get_value(&cx, c),
                Some(&ConstantValue::Int(BigInt::from(2)))
            );
        }
        _ => unreachable!(),
    }
}

#[test]
fn declaration_before_use() {
    let sm = SourceManager::new();
    let arena = GlobalArenas::default();
    let g = SpanGen::new(&sm, "order.sv");

    // int a = b; int b;
    let b_ref = Expr::ident(intern("b"), g.span());
    let members = vec![
        data_decl(&g, int_ty(&g), "a", Some(b_ref)),
        data_decl(&g, int_ty(&g), "b", None),
    ];
    let tree = SyntaxTree::new(&sm, vec![module(&g, "m", members)]);
    let cx = Compilation::new(&arena);
    cx.add_syntax_tree(&tree).unwrap();

    let m = find_top(&cx, "m");
    let scope = m.scope().unwrap();
    let a = scope.lookup_direct(&cx, intern("a")).unwrap();
    let b = scope.lookup_direct(&cx, intern("b")).unwrap();

    // Before `a`'s initializer, `b` is not yet visible.
    let mut result = LookupResult::new();
    result.reference_point = LookupRefPoint::before(a);
    scope.lookup(&cx, intern("b"), &mut result);
    assert_eq!(result.result_kind, LookupResultKind::NotFound);

    // After `b`'s declaration it is.
    let mut result = LookupResult::new();
    result.reference_point = LookupRefPoint::after(b);
    scope.lookup(&cx, intern("b"), &mut result);
    assert_eq!(result.result_kind, LookupResultKind::Found);
    assert!(std::ptr::eq(result.symbol.unwrap(), b));

    // Forcing the hierarchy reports the forward reference exactly once.
    let diags = cx.get_semantic_diagnostics();
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].code, DiagCode::UndeclaredIdentifier);
}

#[test]
fn ambiguous_wildcard_import() {
    let sm = SourceManager::new();
    let arena = GlobalArenas::default();
    let g = SpanGen::new(&sm, "wildcard.sv");

    let tree = SyntaxTree::new(
        &sm,
        vec![
            package(&g, "P", vec![data_decl(&g, int_ty(&g), "x", None)]),
            package(&g, "Q", vec![data_decl(&g, int_ty(&g), "x", None)]),
            module(
                &g,
                "m",
                vec![import_star(&g, "P"), import_star(&g, "Q")],
            ),
        ],
    );
    let cx = Compilation::new(&arena);
    cx.add_syntax_tree(&tree).unwrap();

    let m = find_top(&cx, "m");
    let scope = m.scope().unwrap();
    let mut result = LookupResult::new();
    scope.lookup(&cx, intern("x"), &mut result);
    assert_eq!(result.result_kind, LookupResultKind::AmbiguousImport);
    assert_eq!(result.imports.len(), 2);
    assert!(result.symbol.is_none());
}

#[test]
fn wildcard_import_round_trip() {
    let sm = SourceManager::new();
    let arena = GlobalArenas::default();
    let g = SpanGen::new(&sm, "wildcard2.sv");

    let tree = SyntaxTree::new(
        &sm,
        vec![
            package(&g, "p", vec![data_decl(&g, int_ty(&g), "x", None)]),
            module(&g, "m", vec![import_star(&g, "p")]),
        ],
    );
    let cx = Compilation::new(&arena);
    cx.add_syntax_tree(&tree).unwrap();

    let m = find_top(&cx, "m");
    let scope = m.scope().unwrap();
    let mut result = LookupResult::new();
    scope.lookup(&cx, intern("x"), &mut result);
    assert_eq!(result.result_kind, LookupResultKind::Found);
    assert!(result.result_was_imported);

    let pkg = cx.get_package(intern("p")).unwrap();
    let direct = pkg.scope().unwrap().lookup_direct(&cx, intern("x")).unwrap();
    assert!(std::ptr::eq(result.symbol.unwrap(), direct));
}

#[test]
fn explicit_import_round_trip() {
    let sm = SourceManager::new();
    let arena = GlobalArenas::default();
    let g = SpanGen::new(&sm, "import.sv");

    let tree = SyntaxTree::new(
        &sm,
        vec![
            package(&g, "p", vec![data_decl(&g, int_ty(&g), "foo", None)]),
            module(&g, "m", vec![import_named(&g, "p", "foo")]),
        ],
    );
    let cx = Compilation::new(&arena);
    cx.add_syntax_tree(&tree).unwrap();

    let m = find_top(&cx, "m");
    let scope = m.scope().unwrap();
    let mut result = LookupResult::new();
    scope.lookup(&cx, intern("foo"), &mut result);
    assert_eq!(result.result_kind, LookupResultKind::Found);
    assert!(result.result_was_imported);

    let pkg = cx.get_package(intern("p")).unwrap();
    let direct = pkg
        .scope()
        .unwrap()
        .lookup_direct(&cx, intern("foo"))
        .unwrap();
    assert!(std::ptr::eq(result.symbol.unwrap(), direct));
}

#[test]
fn top_level_selection() {
    let sm = SourceManager::new();
    let arena = GlobalArenas::default();
    let g = SpanGen::new(&sm, "top.sv");

    // `sub` is instantiated inside `top1`; `top2` has one defaulted
    // parameter. Exactly top1 and top2 become tops, in name order.
    let tree = SyntaxTree::new(
        &sm,
        vec![
            module(&g, "top1", vec![hier_inst(&g, "sub", "s1")]),
            module_with_params(
                &g,
                "top2",
                vec![param_decl(&g, "W", Some(Expr::int(1, g.span())))],
                Vec::new(),
            ),
            module(&g, "sub", Vec::new()),
        ],
    )
    .with_global_instantiations(vec![intern("sub")]);
    let cx = Compilation::new(&arena);
    cx.add_syntax_tree(&tree).unwrap();

    let root = cx.get_root();
    let tops: Vec<String> = match root.data {
        SymbolData::Root(ref r) => r
            .top_instances
            .borrow()
            .iter()
            .map(|s| s.name.as_str().to_string())
            .collect(),
        _ => unreachable!(),
    };
    assert_eq!(tops, ["top1", "top2"]);

    // The nested instantiation is visible inside top1.
    let top1 = find_top(&cx, "top1");
    let scope = top1.scope().unwrap();
    let s1 = scope.lookup_direct(&cx, intern("s1")).unwrap();
    assert_eq!(s1.kind(), SymbolKind::ModuleInstance);
}

#[test]
fn uninstantiated_generate_suppresses_diagnostics() {
    let sm = SourceManager::new();
    let arena = GlobalArenas::default();
    let g = SpanGen::new(&sm, "gen.sv");

    // if (0) begin : g int x = undefined_symbol; end
    let undefined = Expr::ident(intern("undefined_symbol"), g.span());
    let members = vec![MemberSyntax::IfGenerate(IfGenerate {
        span: g.span(),
        cond: Expr::int(0, g.span()),
        block: GenerateBlockSyntax {
            span: g.span(),
            label: Some(g.name("g")),
            members: vec![data_decl(&g, int_ty(&g), "x", Some(undefined))],
        },
        else_block: None,
    })];
    let tree = SyntaxTree::new(&sm, vec![module(&g, "m", members)]);
    let cx = Compilation::new(&arena);
    cx.add_syntax_tree(&tree).unwrap();

    // The block exists, is named, and is marked uninstantiated.
    let m = find_top(&cx, "m");
    let scope = m.scope().unwrap();
    let mut result = LookupResult::new();
    scope.lookup(&cx, intern("g"), &mut result);
    let block = result.symbol.unwrap();
    assert_eq!(block.kind(), SymbolKind::GenerateBlock);
    match block.data {
        SymbolData::GenerateBlock(ref b) => assert!(!b.is_instantiated),
        _ => unreachable!(),
    }

    // Forcing the dead declaration by hand parks the diagnostic instead
    // of recording it.
    let block_scope = block.scope().unwrap();
    let x = block_scope.lookup_direct(&cx, intern("x")).unwrap();
    x.declared_type().unwrap().get_initializer(&cx, x);

    let diags = cx.get_semantic_diagnostics();
    assert!(diags.is_empty(), "unexpected diagnostics: {:?}", &diags[..]);
}

#[test]
fn instantiated_generate_branch() {
    let sm = SourceManager::new();
    let arena = GlobalArenas::default();
    let g = SpanGen::new(&sm, "gen2.sv");

    // localparam W = 1; if (W == 1) begin : yes int v; end
    let cond = Expr::binary(
        BinaryOp::Eq,
        Expr::ident(intern("W"), g.span()),
        Expr::int(1, g.span()),
    );
    let members = vec![
        MemberSyntax::Param(ParamDecl {
            span: g.span(),
            is_local: true,
            ty: None,
            declarators: vec![Declarator {
                span: g.span(),
                name: g.name("W"),
                init: Some(Expr::int(1, g.span())),
            }],
        }),
        MemberSyntax::IfGenerate(IfGenerate {
            span: g.span(),
            cond,
            block: GenerateBlockSyntax {
                span: g.span(),
                label: Some(g.name("yes")),
                members: vec![data_decl(&g, int_ty(&g), "v", None)],
            },
            else_block: None,
        }),
    ];
    let tree = SyntaxTree::new(&sm, vec![module(&g, "m", members)]);
    let cx = Compilation::new(&arena);
    cx.add_syntax_tree(&tree).unwrap();

    let m = find_top(&cx, "m");
    let scope = m.scope().unwrap();
    let mut result = LookupResult::new();
    scope.lookup(&cx, intern("yes"), &mut result);
    let block = result.symbol.unwrap();
    match block.data {
        SymbolData::GenerateBlock(ref b) => assert!(b.is_instantiated),
        _ => unreachable!(),
    }
    assert!(block
        .scope()
        .unwrap()
        .lookup_direct(&cx, intern("v"))
        .is_some());
    assert!(cx.get_semantic_diagnostics().is_empty());
}

#[test]
fn loop_generate_array() {
    let sm = SourceManager::new();
    let arena = GlobalArenas::default();
    let g = SpanGen::new(&sm, "loop.sv");

    // for (i = 0; i < 3; i = i + 1) begin : blk int v; end
    let members = vec![MemberSyntax::LoopGenerate(LoopGenerate {
        span: g.span(),
        genvar: g.name("i"),
        init: Expr::int(0, g.span()),
        stop: Expr::binary(
            BinaryOp::Lt,
            Expr::ident(intern("i"), g.span()),
            Expr::int(3, g.span()),
        ),
        step: Expr::binary(
            BinaryOp::Add,
            Expr::ident(intern("i"), g.span()),
            Expr::int(1, g.span()),
        ),
        block: GenerateBlockSyntax {
            span: g.span(),
            label: Some(g.name("blk")),
            members: vec![data_decl(&g, int_ty(&g), "v", None)],
        },
    })];
    let tree = SyntaxTree::new(&sm, vec![module(&g, "m", members)]);
    let cx = Compilation::new(&arena);
    cx.add_syntax_tree(&tree).unwrap();

    let m = find_top(&cx, "m");
    let scope = m.scope().unwrap();
    let array = scope.lookup_direct(&cx, intern("blk")).unwrap();
    assert_eq!(array.kind(), SymbolKind::GenerateBlockArray);

    let entries = match array.data {
        SymbolData::GenerateBlockArray(ref a) => a.entries.borrow().clone(),
        _ => unreachable!(),
    };
    assert_eq!(entries.len(), 3);
    for (k, entry) in entries.iter().enumerate() {
        let genvar = entry
            .scope()
            .unwrap()
            .lookup_direct(&cx, intern("i"))
            .unwrap();
        match genvar.data {
            SymbolData::Parameter(ref p) => {
                assert_eq!(
                    p.get_value(&cx, genvar),
                    Some(&ConstantValue::Int(BigInt::from(k)))
                );
            }
            _ => unreachable!(),
        }
        assert!(entry
            .scope()
            .unwrap()
            .lookup_direct(&cx, intern("v"))
            .is_some());
    }
}

#[test]
fn finalization_locks_the_compilation() {
    let sm = SourceManager::new();
    let arena = GlobalArenas::default();
    let g = SpanGen::new(&sm, "lock.sv");

    let first = SyntaxTree::new(&sm, vec![module(&g, "m", Vec::new())]);
    let second = SyntaxTree::new(&sm, vec![module(&g, "n", Vec::new())]);
    let cx = Compilation::new(&arena);
    cx.add_syntax_tree(&first).unwrap();
    cx.get_root();
    assert_eq!(
        cx.add_syntax_tree(&second),
        Err(CompilationError::AlreadyFinalized)
    );
}

#[test]
fn mixed_source_managers_are_rejected() {
    let sm1 = SourceManager::new();
    let sm2 = SourceManager::new();
    let arena = GlobalArenas::default();
    let g1 = SpanGen::new(&sm1, "a.sv");
    let g2 = SpanGen::new(&sm2, "b.sv");

    let first = SyntaxTree::new(&sm1, vec![module(&g1, "m", Vec::new())]);
    let second = SyntaxTree::new(&sm2, vec![module(&g2, "n", Vec::new())]);
    let cx = Compilation::new(&arena);
    cx.add_syntax_tree(&first).unwrap();
    assert_eq!(
        cx.add_syntax_tree(&second),
        Err(CompilationError::MixedSourceManagers)
    );
}

#[test]
fn realization_is_idempotent() {
    let sm = SourceManager::new();
    let arena = GlobalArenas::default();
    let g = SpanGen::new(&sm, "idem.sv");

    let members = vec![
        hier_inst(&g, "sub", "s1"),
        data_decl(&g, int_ty(&g), "v", None),
    ];
    let tree = SyntaxTree::new(
        &sm,
        vec![
            module(&g, "m", members),
            module(&g, "sub", Vec::new()),
        ],
    )
    .with_global_instantiations(vec![intern("sub")]);
    let cx = Compilation::new(&arena);
    cx.add_syntax_tree(&tree).unwrap();

    let m = find_top(&cx, "m");
    let scope = m.scope().unwrap();
    let first: Vec<_> = scope.members(&cx).collect();
    let second: Vec<_> = scope.members(&cx).collect();
    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(second.iter()) {
        assert!(std::ptr::eq(*a, *b));
    }

    // Every member belongs to this scope exactly once.
    let mut seen = Vec::new();
    for member in &first {
        assert!(std::ptr::eq(
            member.parent_scope().unwrap().symbol(),
            m
        ));
        assert!(!seen.iter().any(|s| std::ptr::eq(*s, *member)));
        seen.push(*member);
    }
}

#[test]
fn scoped_lookup_finds_packages_at_root() {
    let sm = SourceManager::new();
    let arena = GlobalArenas::default();
    let g = SpanGen::new(&sm, "pkg.sv");

    let tree = SyntaxTree::new(&sm, vec![package(&g, "pkg", Vec::new())]);
    let cx = Compilation::new(&arena);
    cx.add_syntax_tree(&tree).unwrap();

    let mut result = LookupResult::new();
    result.name_kind = LookupNameKind::Scoped;
    cx.root_scope().lookup(&cx, intern("pkg"), &mut result);
    assert_eq!(result.result_kind, LookupResultKind::Found);
    assert_eq!(result.symbol.unwrap().kind(), SymbolKind::Package);

    // Unqualified lookups never see package names.
    let mut result = LookupResult::new();
    cx.root_scope().lookup(&cx, intern("pkg"), &mut result);
    assert_eq!(result.result_kind, LookupResultKind::NotFound);
}

#[test]
fn definition_diagnostic_preferred_over_instances() {
    let sm = SourceManager::new();
    let arena = GlobalArenas::default();
    let g = SpanGen::new(&sm, "coal1.sv");

    // The same bad initializer is seen in the definition and in both
    // instances; the definition entry is emitted verbatim, once.
    let bad_init = Expr::ident(intern("nope"), g.span());
    let tree = SyntaxTree::new(
        &sm,
        vec![
            module(&g, "bad", vec![data_decl(&g, int_ty(&g), "z", Some(bad_init))]),
            module(
                &g,
                "top",
                vec![hier_inst(&g, "bad", "b1"), hier_inst(&g, "bad", "b2")],
            ),
        ],
    )
    .with_global_instantiations(vec![intern("bad")]);
    let cx = Compilation::new(&arena);
    cx.add_syntax_tree(&tree).unwrap();

    let diags = cx.get_semantic_diagnostics();
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].code, DiagCode::UndeclaredIdentifier);
    assert!(diags[0].coalesce_count.is_none());
}

#[test]
fn instance_diagnostics_coalesce_with_count() {
    let sm = SourceManager::new();
    let arena = GlobalArenas::default();
    let g = SpanGen::new(&sm, "coal2.sv");

    // `p` divides by its parameter in a generate condition. Only the
    // instance overridden with W=0 trips; the definition (W=1) does not,
    // so the diagnostic is attributed to the failing instance with a
    // coalesce count.
    let cond = Expr::binary(
        BinaryOp::Div,
        Expr::int(1, g.span()),
        Expr::ident(intern("W"), g.span()),
    );
    let p = module_with_params(
        &g,
        "p",
        vec![param_decl(&g, "W", Some(Expr::int(1, g.span())))],
        vec![MemberSyntax::IfGenerate(IfGenerate {
            span: g.span(),
            cond,
            block: GenerateBlockSyntax {
                span: g.span(),
                label: Some(g.name("g")),
                members: Vec::new(),
            },
            else_block: None,
        })],
    );
    let top = module(
        &g,
        "top",
        vec![
            hier_inst(&g, "p", "good"),
            hier_inst_with_params(
                &g,
                "p",
                "bad",
                vec![NamedParamAssignment {
                    span: g.span(),
                    name: g.name("W"),
                    expr: Some(Expr::int(0, g.span())),
                }],
            ),
        ],
    );
    let tree =
        SyntaxTree::new(&sm, vec![p, top]).with_global_instantiations(vec![intern("p")]);
    let cx = Compilation::new(&arena);
    cx.add_syntax_tree(&tree).unwrap();

    let diags = cx.get_semantic_diagnostics();
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].code, DiagCode::DivideByZero);
    assert_eq!(diags[0].coalesce_count, Some(1));
}

#[test]
fn error_limit_stops_the_walk() {
    let sm = SourceManager::new();
    let arena = GlobalArenas::default();
    let g = SpanGen::new(&sm, "limit.sv");

    let members = vec![
        data_decl(&g, int_ty(&g), "a", Some(Expr::ident(intern("u1"), g.span()))),
        data_decl(&g, int_ty(&g), "b", Some(Expr::ident(intern("u2"), g.span()))),
        data_decl(&g, int_ty(&g), "c", Some(Expr::ident(intern("u3"), g.span()))),
    ];
    let tree = SyntaxTree::new(&sm, vec![module(&g, "m", members)]);
    let cx = Compilation::with_options(
        &arena,
        CompilationOptions { error_limit: 1 },
    );
    cx.add_syntax_tree(&tree).unwrap();

    // The walk cuts off once the count exceeds the limit: the third
    // declaration is never forced.
    let diags = cx.get_semantic_diagnostics();
    assert_eq!(diags.len(), 2);
}

#[test]
fn directive_metadata_lands_on_the_definition() {
    let sm = SourceManager::new();
    let arena = GlobalArenas::default();
    let g = SpanGen::new(&sm, "meta.sv");

    let scale = TimeScale {
        base: TimeScaleValue {
            unit: TimeUnit::Picoseconds,
            magnitude: TimeScaleMagnitude::Ten,
        },
        precision: TimeScaleValue {
            unit: TimeUnit::Picoseconds,
            magnitude: TimeScaleMagnitude::One,
        },
    };
    let tree = SyntaxTree::new(&sm, vec![module(&g, "m", Vec::new())]).with_metadata(
        intern("m"),
        ModuleMetadata {
            default_net_type: Some(NetKind::UWire),
            unconnected_drive: mead_svlog::ty::UnconnectedDrive::Pull1,
            time_scale: Some(scale),
        },
    );
    let cx = Compilation::new(&arena);
    cx.add_syntax_tree(&tree).unwrap();

    let def = cx.get_definition(intern("m"), cx.root_scope()).unwrap();
    match def.data {
        SymbolData::Definition(ref d) => {
            assert_eq!(d.default_net_type, NetKind::UWire);
            assert_eq!(
                d.unconnected_drive,
                mead_svlog::ty::UnconnectedDrive::Pull1
            );
            assert_eq!(d.time_scale, Some(scale));
        }
        _ => unreachable!(),
    }
}

#[test]
fn parse_diagnostics_flow_through() {
    let sm = SourceManager::new();
    let arena = GlobalArenas::default();
    let g = SpanGen::new(&sm, "parse.sv");

    let mut tree = SyntaxTree::new(&sm, vec![module(&g, "m", Vec::new())]);
    tree.diagnostics.push(mead_svlog::diag::Diagnostic::new(
        DiagCode::SyntaxError,
        g.span().loc(),
        "expected `;`",
    ));
    let cx = Compilation::new(&arena);
    cx.add_syntax_tree(&tree).unwrap();

    assert_eq!(cx.get_parse_diagnostics().len(), 1);
    assert_eq!(cx.get_semantic_diagnostics().len(), 0);
    assert_eq!(cx.get_all_diagnostics().len(), 1);
    assert_eq!(cx.get_all_diagnostics()[0].code, DiagCode::SyntaxError);
}

#[test]
fn unknown_instantiation_target_is_diagnosed() {
    let sm = SourceManager::new();
    let arena = GlobalArenas::default();
    let g = SpanGen::new(&sm, "unknown.sv");

    let tree = SyntaxTree::new(&sm, vec![module(&g, "m", vec![hier_inst(&g, "ghost", "u")])]);
    let cx = Compilation::new(&arena);
    cx.add_syntax_tree(&tree).unwrap();

    let diags = cx.get_semantic_diagnostics();
    assert!(diags.iter().any(|d| d.code == DiagCode::UnknownModule));
}


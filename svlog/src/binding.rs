// Copyright (c) 2021 The mead authors

//! Expression binding and constant evaluation.
//!
//! The full expression and statement binder lives outside the elaboration
//! core. This module implements the slice the core cannot do without:
//! resolving identifiers (which is what surfaces undeclared-name
//! diagnostics), and folding the constant expressions that drive generate
//! conditions, loop trip counts, enum values, and parameter values.

use crate::ast::{self, BinaryOp, ExprData, StmtData, UnaryOp};
use crate::compilation::Compilation;
use crate::crate_prelude::*;
use crate::diag::{DiagCode, Diagnostic};
use crate::scope::{LookupRefPoint, LookupResult, LookupResultKind, Scope};
use crate::symbols::{DeclaredType, Symbol, SymbolData, VariableSymbol};
use num::{BigInt, ToPrimitive, Zero};

/// A folded constant.
#[derive(Clone, Debug, PartialEq)]
pub enum ConstantValue {
    Int(BigInt),
    Real(f64),
    String(String),
}

impl ConstantValue {
    /// Truthiness under SystemVerilog conversion rules.
    pub fn is_true(&self) -> bool {
        match self {
            ConstantValue::Int(i) => !i.is_zero(),
            ConstantValue::Real(r) => *r != 0.0,
            ConstantValue::String(s) => !s.is_empty(),
        }
    }

    pub fn as_int(&self) -> Option<&BigInt> {
        match self {
            ConstantValue::Int(i) => Some(i),
            _ => None,
        }
    }
}

/// Everything an expression needs to resolve names: the scope and position
/// to search from, the symbol diagnostics attach to, and the out-of-band
/// name sources (the genvar of a loop generate iteration, and the member
/// scope of the enum under construction).
pub struct EvalContext<'a, 'c> {
    pub cx: &'c Compilation<'a>,
    pub scope: &'a Scope<'a>,
    pub ref_point: LookupRefPoint<'a>,
    pub host: &'a Symbol<'a>,
    pub genvar: Option<(Name, BigInt)>,
    pub enum_scope: Option<&'a Scope<'a>>,
}

/// Resolve all names in an expression, raising diagnostics for undeclared
/// or ambiguous references. Returns the folded value when the expression
/// happens to be constant.
pub fn bind_expr<'a>(ctx: &EvalContext<'a, '_>, expr: &'a ast::Expr) -> Option<ConstantValue> {
    eval(ctx, expr, false)
}

/// Like [`bind_expr`], but additionally requires the expression to fold to
/// a constant, diagnosing references to non-constant symbols.
pub fn eval_const<'a>(ctx: &EvalContext<'a, '_>, expr: &'a ast::Expr) -> Option<ConstantValue> {
    eval(ctx, expr, true)
}

fn eval<'a>(
    ctx: &EvalContext<'a, '_>,
    expr: &'a ast::Expr,
    require_const: bool,
) -> Option<ConstantValue> {
    match expr.data {
        ExprData::IntLiteral(ref v) => Some(ConstantValue::Int(v.clone())),
        ExprData::RealLiteral(v) => Some(ConstantValue::Real(v)),
        ExprData::StringLiteral(ref s) => Some(ConstantValue::String(s.clone())),
        ExprData::Ident(name) => resolve_ident(ctx, name, expr.span, require_const),
        ExprData::Scoped(package, name) => {
            let pkg = match ctx.cx.get_package(package) {
                Some(p) => p,
                None => {
                    ctx.cx.add_diag(
                        Diagnostic::new(
                            DiagCode::UndeclaredIdentifier,
                            expr.span.loc(),
                            format!("unknown package `{}`", package),
                        )
                        .symbol(ctx.host),
                    );
                    return None;
                }
            };
            let scope = pkg.scope().expect("package has a scope");
            match scope.lookup_direct(ctx.cx, name) {
                Some(sym) => symbol_value(ctx, sym, expr.span, require_const),
                None => {
                    ctx.cx.add_diag(
                        Diagnostic::new(
                            DiagCode::UndeclaredIdentifier,
                            expr.span.loc(),
                            format!("`{}` is not declared in package `{}`", name, package),
                        )
                        .symbol(ctx.host),
                    );
                    None
                }
            }
        }
        ExprData::Unary(op, ref arg) => {
            let value = eval(ctx, arg, require_const)?;
            match (op, value) {
                (UnaryOp::Neg, ConstantValue::Int(i)) => Some(ConstantValue::Int(-i)),
                (UnaryOp::Neg, ConstantValue::Real(r)) => Some(ConstantValue::Real(-r)),
                (UnaryOp::Not, value) => Some(bool_value(!value.is_true())),
                (UnaryOp::BitNot, ConstantValue::Int(i)) => Some(ConstantValue::Int(!i)),
                _ => None,
            }
        }
        ExprData::Binary(op, ref lhs, ref rhs) => {
            // Evaluate both sides first so that diagnostics in the right
            // operand surface even when the left one fails.
            let lv = eval(ctx, lhs, require_const);
            let rv = eval(ctx, rhs, require_const);
            match (lv?, rv?) {
                (ConstantValue::Int(a), ConstantValue::Int(b)) => {
                    eval_int_binop(ctx, op, a, b, expr.span)
                }
                (ConstantValue::Real(a), ConstantValue::Real(b)) => eval_real_binop(op, a, b),
                _ => None,
            }
        }
        ExprData::Ternary(ref cond, ref then_expr, ref else_expr) => {
            let cv = eval(ctx, cond, require_const)?;
            let tv = eval(ctx, then_expr, require_const);
            let ev = eval(ctx, else_expr, require_const);
            if cv.is_true() {
                tv
            } else {
                ev
            }
        }
    }
}

fn bool_value(b: bool) -> ConstantValue {
    ConstantValue::Int(BigInt::from(b as i64))
}

fn eval_int_binop<'a>(
    ctx: &EvalContext<'a, '_>,
    op: BinaryOp,
    a: BigInt,
    b: BigInt,
    span: Span,
) -> Option<ConstantValue> {
    if (op == BinaryOp::Div || op == BinaryOp::Mod) && b.is_zero() {
        ctx.cx.add_diag(
            Diagnostic::new(
                DiagCode::DivideByZero,
                span.loc(),
                "division by zero in constant expression",
            )
            .symbol(ctx.host),
        );
        return None;
    }
    Some(match op {
        BinaryOp::Add => ConstantValue::Int(a + b),
        BinaryOp::Sub => ConstantValue::Int(a - b),
        BinaryOp::Mul => ConstantValue::Int(a * b),
        BinaryOp::Div => ConstantValue::Int(a / b),
        BinaryOp::Mod => ConstantValue::Int(a % b),
        BinaryOp::Shl => ConstantValue::Int(a << b.to_usize()?),
        BinaryOp::Shr => ConstantValue::Int(a >> b.to_usize()?),
        BinaryOp::Lt => bool_value(a < b),
        BinaryOp::Leq => bool_value(a <= b),
        BinaryOp::Gt => bool_value(a > b),
        BinaryOp::Geq => bool_value(a >= b),
        BinaryOp::Eq => bool_value(a == b),
        BinaryOp::Neq => bool_value(a != b),
        BinaryOp::LogicAnd => bool_value(!a.is_zero() && !b.is_zero()),
        BinaryOp::LogicOr => bool_value(!a.is_zero() || !b.is_zero()),
        BinaryOp::And => ConstantValue::Int(a & b),
        BinaryOp::Or => ConstantValue::Int(a | b),
        BinaryOp::Xor => ConstantValue::Int(a ^ b),
    })
}

fn eval_real_binop(op: BinaryOp, a: f64, b: f64) -> Option<ConstantValue> {
    Some(match op {
        BinaryOp::Add => ConstantValue::Real(a + b),
        BinaryOp::Sub => ConstantValue::Real(a - b),
        BinaryOp::Mul => ConstantValue::Real(a * b),
        BinaryOp::Div => ConstantValue::Real(a / b),
        BinaryOp::Lt => bool_value(a < b),
        BinaryOp::Leq => bool_value(a <= b),
        BinaryOp::Gt => bool_value(a > b),
        BinaryOp::Geq => bool_value(a >= b),
        BinaryOp::Eq => bool_value(a == b),
        BinaryOp::Neq => bool_value(a != b),
        _ => return None,
    })
}

fn resolve_ident<'a>(
    ctx: &EvalContext<'a, '_>,
    name: Name,
    span: Span,
    require_const: bool,
) -> Option<ConstantValue> {
    if let Some((genvar, ref value)) = ctx.genvar {
        if genvar == name {
            return Some(ConstantValue::Int(value.clone()));
        }
    }
    if let Some(enum_scope) = ctx.enum_scope {
        if let Some(sym) = enum_scope.lookup_direct(ctx.cx, name) {
            return symbol_value(ctx, sym, span, require_const);
        }
    }
    let mut result = LookupResult::new();
    result.reference_point = ctx.ref_point;
    ctx.scope.lookup(ctx.cx, name, &mut result);
    match result.result_kind {
        LookupResultKind::Found => {
            symbol_value(ctx, result.symbol.unwrap(), span, require_const)
        }
        LookupResultKind::AmbiguousImport => {
            ctx.cx.add_diag(
                Diagnostic::new(
                    DiagCode::AmbiguousImport,
                    span.loc(),
                    format!("`{}` is imported from multiple packages", name),
                )
                .symbol(ctx.host),
            );
            None
        }
        LookupResultKind::NotFound => {
            ctx.cx.add_diag(
                Diagnostic::new(
                    DiagCode::UndeclaredIdentifier,
                    span.loc(),
                    format!("`{}` is not declared", name),
                )
                .symbol(ctx.host),
            );
            None
        }
    }
}

fn symbol_value<'a>(
    ctx: &EvalContext<'a, '_>,
    sym: &'a Symbol<'a>,
    span: Span,
    require_const: bool,
) -> Option<ConstantValue> {
    match sym.data {
        SymbolData::Parameter(ref p) => p.get_value(ctx.cx, sym).cloned(),
        SymbolData::EnumValue(ref v) => v.get_value(ctx.cx, sym).cloned(),
        SymbolData::TransparentMember(ref t) => symbol_value(ctx, t.wrapped, span, require_const),
        _ => {
            if require_const {
                ctx.cx.add_diag(
                    Diagnostic::new(
                        DiagCode::NotAConstant,
                        span.loc(),
                        format!("`{}` is not a constant", sym.name),
                    )
                    .symbol(ctx.host),
                );
            }
            None
        }
    }
}

/// Bind the statement body of a bodied scope: local declarations become
/// members, and every expression is resolved so its diagnostics surface.
pub(crate) fn bind_body<'a>(cx: &Compilation<'a>, scope: &'a Scope<'a>, stmts: &'a [ast::Stmt]) {
    for stmt in stmts {
        bind_stmt(cx, scope, stmt);
    }
}

fn bind_stmt<'a>(cx: &Compilation<'a>, scope: &'a Scope<'a>, stmt: &'a ast::Stmt) {
    let ctx = || EvalContext {
        cx,
        scope,
        ref_point: LookupRefPoint::end_of_scope(scope),
        host: scope.symbol(),
        genvar: None,
        enum_scope: None,
    };
    match stmt.data {
        StmtData::VarDecl(ref decl) => {
            for d in &decl.declarators {
                let sym = cx.alloc_symbol(
                    d.name.value,
                    d.name.span.loc(),
                    SymbolData::Variable(VariableSymbol {
                        declared_type: DeclaredType::new(Some(&decl.ty))
                            .with_initializer(d.init.as_ref()),
                    }),
                );
                scope.add_member(cx, sym);
                // Statement binding is eager: force the declaration now.
                if let Some(declared) = sym.declared_type() {
                    declared.get_type(cx, sym);
                    declared.get_initializer(cx, sym);
                }
            }
        }
        StmtData::Expr(ref expr) => {
            bind_expr(&ctx(), expr);
        }
        StmtData::Assign(ref lhs, ref rhs) => {
            bind_expr(&ctx(), lhs);
            bind_expr(&ctx(), rhs);
        }
        StmtData::Block(ref stmts) => {
            for stmt in stmts {
                bind_stmt(cx, scope, stmt);
            }
        }
    }
}

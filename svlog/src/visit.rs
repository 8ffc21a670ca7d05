// Copyright (c) 2021 The mead authors

//! The post-elaboration walker.
//!
//! Semantic diagnostics are discovered by touching every symbol in the
//! hierarchy and forcing each lazily evaluated field: declared types,
//! initializers, parameter and enum values, import resolutions, port
//! connections, assignments, and deferred bodies. Walking a scope's
//! members realizes its deferred work as a side effect, which bounds
//! diagnostic discovery. The walk cuts off once the number of distinct
//! errors exceeds the configured limit.

use crate::compilation::Compilation;
use crate::crate_prelude::*;
use crate::symbols::{Symbol, SymbolData};
use std::collections::HashMap;

pub(crate) struct DiagnosticVisitor<'a, 'c> {
    cx: &'c Compilation<'a>,
    error_limit: usize,
    /// Instances visited outside any definition, per definition symbol.
    pub instance_count: HashMap<PtrKey<'a, Symbol<'a>>, usize>,
    in_def: bool,
}

impl<'a, 'c> DiagnosticVisitor<'a, 'c> {
    pub fn new(cx: &'c Compilation<'a>, error_limit: usize) -> Self {
        DiagnosticVisitor {
            cx,
            error_limit,
            instance_count: HashMap::new(),
            in_def: false,
        }
    }

    pub fn visit(&mut self, symbol: &'a Symbol<'a>) {
        if self.cx.error_count() > self.error_limit {
            return;
        }
        match symbol.data {
            // An untaken generate branch is not part of the design; nothing
            // inside it may produce diagnostics.
            SymbolData::GenerateBlock(ref block) if !block.is_instantiated => return,
            SymbolData::Definition(_) => {
                let saved = self.in_def;
                self.in_def = true;
                self.handle(symbol);
                self.in_def = saved;
                return;
            }
            SymbolData::ModuleInstance(ref inst)
            | SymbolData::ProgramInstance(ref inst)
            | SymbolData::InterfaceInstance(ref inst) => {
                if !self.in_def {
                    *self
                        .instance_count
                        .entry(PtrKey(inst.definition))
                        .or_insert(0) += 1;
                }
            }
            _ => {}
        }
        self.handle(symbol);
    }

    fn handle(&mut self, symbol: &'a Symbol<'a>) {
        match symbol.data {
            SymbolData::Variable(ref v) => {
                v.declared_type.get_type(self.cx, symbol);
                v.declared_type.get_initializer(self.cx, symbol);
            }
            SymbolData::FormalArgument(ref a) => {
                a.declared_type.get_type(self.cx, symbol);
            }
            SymbolData::Parameter(ref p) => {
                p.declared_type.get_type(self.cx, symbol);
                p.get_value(self.cx, symbol);
            }
            SymbolData::EnumValue(ref v) => {
                v.get_value(self.cx, symbol);
            }
            SymbolData::TransparentMember(ref t) => {
                if let SymbolData::EnumValue(ref v) = t.wrapped.data {
                    v.get_value(self.cx, t.wrapped);
                }
            }
            SymbolData::TypeAlias(ref t) => {
                t.declared_type.get_type(self.cx, symbol);
            }
            SymbolData::Subroutine(ref s) => {
                s.return_type.get_type(self.cx, symbol);
            }
            SymbolData::ExplicitImport(ref import) => {
                import.imported_symbol(self.cx);
            }
            SymbolData::WildcardImport(ref import) => {
                import.package(self.cx);
            }
            SymbolData::ContinuousAssign(ref assign) => {
                assign.get_assignment(self.cx, symbol);
            }
            SymbolData::Port(ref port) => {
                port.declared_type.get_type(self.cx, symbol);
                port.connection(self.cx, symbol);
            }
            SymbolData::InterfacePort(ref port) => {
                port.connection(self.cx, symbol);
            }
            _ => {}
        }

        for attr in self.cx.get_attributes(symbol) {
            if let SymbolData::Attribute(ref a) = attr.data {
                a.get_value(self.cx, attr);
            }
        }

        if let Some(scope) = symbol.scope() {
            let members: Vec<_> = scope.members(self.cx).collect();
            for member in members {
                self.visit(member);
            }
        }
    }
}

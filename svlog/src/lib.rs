// Copyright (c) 2021 The mead authors

//! This crate implements SystemVerilog elaboration for the mead compiler.
//!
//! Parsed syntax trees ([`ast::SyntaxTree`]) go in through
//! [`Compilation::add_syntax_tree`]; out come a symbol hierarchy rooted at
//! [`Compilation::get_root`], definition and package lookups, and three
//! diagnostic streams. Member expansion is partly deferred: hierarchy
//! instantiations and generate constructs are expanded the first time
//! their scope is observed.

pub mod ast;
pub mod binding;
mod builtins;
pub mod compilation;
pub mod diag;
pub mod scope;
pub mod symbols;
pub mod ty;
mod visit;

pub use crate::compilation::{
    Compilation, CompilationError, CompilationOptions, GlobalArenas, SystemSubroutine,
};
pub use crate::scope::{
    LookupNameKind, LookupRefPoint, LookupResult, LookupResultKind, MemberIter, Scope,
};
pub use crate::symbols::{Symbol, SymbolData, SymbolKind};

/// Items commonly used within the crate.
pub(crate) mod crate_prelude {
    pub use mead_common::errors::Severity;
    pub use mead_common::name::Name;
    pub use mead_common::source::{Location, SourceManager, Span, Spanned};
    pub use mead_common::util::PtrKey;
}

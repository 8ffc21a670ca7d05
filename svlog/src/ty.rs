// Copyright (c) 2021 The mead authors

//! Types and semantic facts.
//!
//! The elaboration core only needs enough of a type system to identify enum
//! types and hand out the builtin singletons; everything else stays opaque
//! references into the compilation's type arena.

use crate::crate_prelude::*;
use crate::symbols::Symbol;
use bitflags::bitflags;
use std::fmt;

/// An interned type. All types are allocated in the compilation's arena and
/// compared by reference where identity matters.
pub type Type<'a> = &'a TypeKind<'a>;

#[derive(Debug)]
pub enum TypeKind<'a> {
    Scalar { kind: ScalarKind, signed: bool },
    PredefinedInt(PredefinedIntKind),
    Floating(FloatingKind),
    String,
    CHandle,
    Void,
    Null,
    Event,
    Error,
    /// An enumeration; points at the EnumType symbol that owns the values.
    Enum(&'a Symbol<'a>),
}

impl<'a> TypeKind<'a> {
    pub fn is_error(&self) -> bool {
        matches!(self, TypeKind::Error)
    }

    pub fn is_enum(&self) -> bool {
        matches!(self, TypeKind::Enum(_))
    }

    /// The enum type symbol, if this is an enum.
    pub fn enum_symbol(&self) -> Option<&'a Symbol<'a>> {
        match *self {
            TypeKind::Enum(sym) => Some(sym),
            _ => None,
        }
    }
}

impl fmt::Display for TypeKind<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            TypeKind::Scalar { kind, signed } => {
                write!(f, "{}", kind.to_str())?;
                if signed {
                    write!(f, " signed")?;
                }
                Ok(())
            }
            TypeKind::PredefinedInt(kind) => write!(f, "{}", kind.to_str()),
            TypeKind::Floating(kind) => write!(f, "{}", kind.to_str()),
            TypeKind::String => write!(f, "string"),
            TypeKind::CHandle => write!(f, "chandle"),
            TypeKind::Void => write!(f, "void"),
            TypeKind::Null => write!(f, "null"),
            TypeKind::Event => write!(f, "event"),
            TypeKind::Error => write!(f, "<error>"),
            TypeKind::Enum(sym) => {
                if sym.name.is_empty() {
                    write!(f, "enum")
                } else {
                    write!(f, "enum {}", sym.name)
                }
            }
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ScalarKind {
    Bit,
    Logic,
    Reg,
}

impl ScalarKind {
    pub fn to_str(self) -> &'static str {
        match self {
            ScalarKind::Bit => "bit",
            ScalarKind::Logic => "logic",
            ScalarKind::Reg => "reg",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PredefinedIntKind {
    ShortInt,
    Int,
    LongInt,
    Byte,
    Integer,
    Time,
}

impl PredefinedIntKind {
    pub fn to_str(self) -> &'static str {
        match self {
            PredefinedIntKind::ShortInt => "shortint",
            PredefinedIntKind::Int => "int",
            PredefinedIntKind::LongInt => "longint",
            PredefinedIntKind::Byte => "byte",
            PredefinedIntKind::Integer => "integer",
            PredefinedIntKind::Time => "time",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FloatingKind {
    Real,
    RealTime,
    ShortReal,
}

impl FloatingKind {
    pub fn to_str(self) -> &'static str {
        match self {
            FloatingKind::Real => "real",
            FloatingKind::RealTime => "realtime",
            FloatingKind::ShortReal => "shortreal",
        }
    }
}

bitflags! {
    /// Properties of a scalar type, used to index the scalar type table.
    pub struct IntegralFlags: u8 {
        const SIGNED     = 0b001;
        const FOUR_STATE = 0b010;
        const REG        = 0b100;
    }
}

impl IntegralFlags {
    pub fn for_scalar(kind: ScalarKind, signed: bool) -> IntegralFlags {
        let mut flags = match kind {
            ScalarKind::Bit => IntegralFlags::empty(),
            ScalarKind::Logic => IntegralFlags::FOUR_STATE,
            ScalarKind::Reg => IntegralFlags::FOUR_STATE | IntegralFlags::REG,
        };
        if signed {
            flags |= IntegralFlags::SIGNED;
        }
        flags
    }
}

/// The builtin net type keywords, plus a sentinel for parse errors.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum NetKind {
    Unknown,
    Wire,
    WAnd,
    WOr,
    Tri,
    TriAnd,
    TriOr,
    Tri0,
    Tri1,
    TriReg,
    Supply0,
    Supply1,
    UWire,
}

impl NetKind {
    pub fn to_str(self) -> &'static str {
        match self {
            NetKind::Unknown => "<error>",
            NetKind::Wire => "wire",
            NetKind::WAnd => "wand",
            NetKind::WOr => "wor",
            NetKind::Tri => "tri",
            NetKind::TriAnd => "triand",
            NetKind::TriOr => "trior",
            NetKind::Tri0 => "tri0",
            NetKind::Tri1 => "tri1",
            NetKind::TriReg => "trireg",
            NetKind::Supply0 => "supply0",
            NetKind::Supply1 => "supply1",
            NetKind::UWire => "uwire",
        }
    }

    pub fn all() -> &'static [NetKind] {
        &[
            NetKind::Wire,
            NetKind::WAnd,
            NetKind::WOr,
            NetKind::Tri,
            NetKind::TriAnd,
            NetKind::TriOr,
            NetKind::Tri0,
            NetKind::Tri1,
            NetKind::TriReg,
            NetKind::Supply0,
            NetKind::Supply1,
            NetKind::UWire,
        ]
    }
}

/// A builtin net type. These live in a table in the compilation, keyed by
/// keyword; declarations refer to them by [`NetKind`].
#[derive(Debug)]
pub struct NetType<'a> {
    pub kind: NetKind,
    pub name: Name,
    pub data_type: Type<'a>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum UnconnectedDrive {
    None,
    Pull0,
    Pull1,
}

impl Default for UnconnectedDrive {
    fn default() -> Self {
        UnconnectedDrive::None
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TimeUnit {
    Seconds,
    Milliseconds,
    Microseconds,
    Nanoseconds,
    Picoseconds,
    Femtoseconds,
}

impl TimeUnit {
    pub fn to_str(self) -> &'static str {
        match self {
            TimeUnit::Seconds => "s",
            TimeUnit::Milliseconds => "ms",
            TimeUnit::Microseconds => "us",
            TimeUnit::Nanoseconds => "ns",
            TimeUnit::Picoseconds => "ps",
            TimeUnit::Femtoseconds => "fs",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TimeScaleMagnitude {
    One = 1,
    Ten = 10,
    Hundred = 100,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TimeScaleValue {
    pub unit: TimeUnit,
    pub magnitude: TimeScaleMagnitude,
}

/// A `base / precision` time scale pair.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TimeScale {
    pub base: TimeScaleValue,
    pub precision: TimeScaleValue,
}

impl Default for TimeScale {
    fn default() -> Self {
        let ns = TimeScaleValue {
            unit: TimeUnit::Nanoseconds,
            magnitude: TimeScaleMagnitude::One,
        };
        TimeScale {
            base: ns,
            precision: ns,
        }
    }
}

impl fmt::Display for TimeScale {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}{} / {}{}",
            self.base.magnitude as u32,
            self.base.unit.to_str(),
            self.precision.magnitude as u32,
            self.precision.unit.to_str()
        )
    }
}

/// The kinds of types that carry builtin methods.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum MethodTarget {
    Array,
    Enum,
    String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_type_names() {
        assert_eq!(format!("{}", TypeKind::PredefinedInt(PredefinedIntKind::Byte)), "byte");
        assert_eq!(format!("{}", TypeKind::PredefinedInt(PredefinedIntKind::Int)), "int");
        assert_eq!(
            format!(
                "{}",
                TypeKind::Scalar {
                    kind: ScalarKind::Logic,
                    signed: true
                }
            ),
            "logic signed"
        );
        let error: TypeKind = TypeKind::Error;
        assert_eq!(format!("{}", error), "<error>");
    }

    #[test]
    fn scalar_flags() {
        assert_eq!(
            IntegralFlags::for_scalar(ScalarKind::Bit, false),
            IntegralFlags::empty()
        );
        assert_eq!(
            IntegralFlags::for_scalar(ScalarKind::Reg, true).bits(),
            0b111
        );
    }

    #[test]
    fn default_time_scale() {
        assert_eq!(format!("{}", TimeScale::default()), "1ns / 1ns");
    }
}

// Copyright (c) 2021 The mead authors

//! Registration of the builtin system tasks, functions, and type methods.

use crate::ast::SubroutineKind;
use crate::compilation::{Compilation, SystemSubroutine};
use crate::ty::MethodTarget;
use mead_common::name::intern;

pub(crate) fn register_all(cx: &Compilation) {
    register_array_methods(cx);
    register_conversion_funcs(cx);
    register_enum_methods(cx);
    register_math_funcs(cx);
    register_misc_system_funcs(cx);
    register_nonconst_funcs(cx);
    register_query_funcs(cx);
    register_string_methods(cx);
    register_system_tasks(cx);
}

fn add_subroutines(cx: &Compilation, kind: SubroutineKind, names: &[&str]) {
    for name in names {
        cx.add_system_subroutine(SystemSubroutine {
            name: intern(name),
            kind,
        });
    }
}

fn add_methods(cx: &Compilation, target: MethodTarget, names: &[&str]) {
    for name in names {
        cx.add_system_method(
            target,
            SystemSubroutine {
                name: intern(name),
                kind: SubroutineKind::Function,
            },
        );
    }
}

fn register_array_methods(cx: &Compilation) {
    add_methods(
        cx,
        MethodTarget::Array,
        &[
            "size", "sum", "product", "and", "or", "xor", "min", "max", "unique", "sort", "rsort",
            "reverse", "shuffle",
        ],
    );
}

fn register_conversion_funcs(cx: &Compilation) {
    add_subroutines(
        cx,
        SubroutineKind::Function,
        &[
            "$signed",
            "$unsigned",
            "$itor",
            "$rtoi",
            "$realtobits",
            "$bitstoreal",
            "$shortrealtobits",
            "$bitstoshortreal",
            "$cast",
        ],
    );
}

fn register_enum_methods(cx: &Compilation) {
    add_methods(
        cx,
        MethodTarget::Enum,
        &["first", "last", "next", "prev", "num", "name"],
    );
}

fn register_math_funcs(cx: &Compilation) {
    add_subroutines(
        cx,
        SubroutineKind::Function,
        &[
            "$clog2", "$ln", "$log10", "$exp", "$sqrt", "$pow", "$floor", "$ceil", "$sin", "$cos",
            "$tan", "$asin", "$acos", "$atan", "$atan2", "$hypot", "$sinh", "$cosh", "$tanh",
            "$asinh", "$acosh", "$atanh",
        ],
    );
}

fn register_misc_system_funcs(cx: &Compilation) {
    add_subroutines(
        cx,
        SubroutineKind::Function,
        &["$isunknown", "$onehot", "$onehot0", "$countones", "$countbits", "$sformatf"],
    );
}

fn register_nonconst_funcs(cx: &Compilation) {
    add_subroutines(
        cx,
        SubroutineKind::Function,
        &[
            "$time",
            "$stime",
            "$realtime",
            "$random",
            "$urandom",
            "$urandom_range",
        ],
    );
}

fn register_query_funcs(cx: &Compilation) {
    add_subroutines(
        cx,
        SubroutineKind::Function,
        &[
            "$bits",
            "$left",
            "$right",
            "$low",
            "$high",
            "$size",
            "$increment",
            "$dimensions",
            "$unpacked_dimensions",
        ],
    );
}

fn register_string_methods(cx: &Compilation) {
    add_methods(
        cx,
        MethodTarget::String,
        &[
            "len", "putc", "getc", "toupper", "tolower", "compare", "icompare", "substr", "atoi",
            "atohex", "atooct", "atobin", "atoreal", "itoa", "hextoa", "octtoa", "bintoa",
            "realtoa",
        ],
    );
}

fn register_system_tasks(cx: &Compilation) {
    add_subroutines(
        cx,
        SubroutineKind::Task,
        &[
            "$display", "$displayb", "$displayo", "$displayh", "$write", "$writeb", "$writeo",
            "$writeh", "$strobe", "$monitor", "$error", "$warning", "$info", "$fatal", "$finish",
            "$stop", "$exit", "$dumpfile", "$dumpvars", "$readmemb", "$readmemh",
        ],
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compilation::GlobalArenas;

    #[test]
    fn builtins_are_registered() {
        let arena = GlobalArenas::default();
        let cx = Compilation::new(&arena);
        assert!(cx.get_system_subroutine(intern("$display")).is_some());
        assert!(cx.get_system_subroutine(intern("$clog2")).is_some());
        assert!(cx
            .get_system_method(MethodTarget::Enum, intern("first"))
            .is_some());
        assert!(cx
            .get_system_method(MethodTarget::String, intern("len"))
            .is_some());
        assert!(cx.get_system_subroutine(intern("$nope")).is_none());
        let display = cx.get_system_subroutine(intern("$display")).unwrap();
        assert_eq!(display.kind, SubroutineKind::Task);
    }
}

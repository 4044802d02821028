//! Built-in class registration.
//!
//! Registers the platform surface the checker knows without reading any
//! class files: the core of `java.lang`, `java.io.PrintStream`, a slice of
//! `java.util`, and one pseudo-class per primitive whose methods are the
//! arithmetic, comparison and bitwise operators.

use crate::context::{
    ClassInfo, FieldInfo, MethodInfo, TypeContext, EXCEPTION, OBJECT, RUNTIME_EXCEPTION, STRING,
    THROWABLE,
};
use crate::member::Visibility;
use crate::ty::{Prim, Ty};

const ARITH_OPS: [&str; 5] = ["+", "-", "*", "/", "%"];
const COMPARE_OPS: [&str; 6] = ["<", ">", "<=", ">=", "==", "!="];
const BIT_OPS: [&str; 5] = ["&", "|", "^", "<<", ">>"];

/// Register all built-in classes into the context.
pub fn register_builtins(ctx: &mut TypeContext) {
    register_primitives(ctx);
    register_java_lang(ctx);
    register_java_io(ctx);
    register_java_util(ctx);
}

// ── Primitives ─────────────────────────────────────────────────────────

fn register_primitives(ctx: &mut TypeContext) {
    for p in Prim::ALL {
        let mut info = ClassInfo::new(p.name()).final_();
        let lhs = Ty::Prim(p);
        if p.is_numeric() {
            for q in Prim::NUMERIC {
                let rhs = Ty::Prim(q);
                if let Some(result) = TypeContext::widen_arith(&lhs, &rhs) {
                    for op in ARITH_OPS {
                        info = info.method(MethodInfo::new(op, vec![rhs.clone()], result.clone()));
                    }
                    if p.is_integral() && q.is_integral() {
                        for op in BIT_OPS {
                            info = info.method(MethodInfo::new(op, vec![rhs.clone()], result.clone()));
                        }
                    }
                }
                for op in COMPARE_OPS {
                    info = info.method(MethodInfo::new(op, vec![rhs.clone()], Ty::boolean()));
                }
            }
            let negated = TypeContext::widen_arith(&lhs, &Ty::int()).unwrap_or(lhs);
            info = info.method(MethodInfo::new("-@", vec![], negated));
        } else {
            for op in ["==", "!=", "&", "|", "^"] {
                info = info.method(MethodInfo::new(op, vec![Ty::boolean()], Ty::boolean()));
            }
            info = info.method(MethodInfo::new("!", vec![], Ty::boolean()));
        }
        ctx.declare_class(info);
    }
}

// ── java.lang ──────────────────────────────────────────────────────────

fn register_java_lang(ctx: &mut TypeContext) {
    let object = ctx.object();
    let string = ctx.string();
    let objects = ctx.array_of(&object);
    let char_seq = ctx.class_type("java.lang.CharSequence");
    let comparable = ctx.class_type("java.lang.Comparable");
    let number = ctx.class_type("java.lang.Number");
    let integer = ctx.class_type("java.lang.Integer");
    let builder = ctx.class_type("java.lang.StringBuilder");
    let runnable = ctx.class_type("java.lang.Runnable");
    let throwable = ctx.class_type(THROWABLE);
    let exception = ctx.class_type(EXCEPTION);
    let runtime_exception = ctx.class_type(RUNTIME_EXCEPTION);
    let print_stream = ctx.class_type("java.io.PrintStream");
    let int = Ty::int();
    let long = Ty::long();
    let double = Ty::double();
    let boolean = Ty::boolean();
    let character = Ty::Prim(Prim::Char);
    let float = Ty::Prim(Prim::Float);

    ctx.declare_class(
        ClassInfo::new(OBJECT)
            .constructor(vec![])
            .method(MethodInfo::new("toString", vec![], string.clone()))
            .method(MethodInfo::new("equals", vec![object.clone()], boolean.clone()))
            .method(MethodInfo::new("hashCode", vec![], int.clone()))
            .method(MethodInfo::new("clone", vec![], object.clone()).visibility(Visibility::Protected)),
    );

    ctx.declare_class(
        ClassInfo::new("java.lang.CharSequence")
            .interface()
            .method(MethodInfo::new("length", vec![], int.clone()).abstract_())
            .method(MethodInfo::new("charAt", vec![int.clone()], character.clone()).abstract_()),
    );

    ctx.declare_class(
        ClassInfo::new("java.lang.Comparable")
            .interface()
            .method(MethodInfo::new("compareTo", vec![object.clone()], int.clone()).abstract_()),
    );

    ctx.declare_class(
        ClassInfo::new("java.lang.Runnable")
            .interface()
            .method(MethodInfo::new("run", vec![], Ty::Void).abstract_()),
    );

    let mut string_info = ClassInfo::new(STRING)
        .extends(object.clone())
        .implements(char_seq.clone())
        .implements(comparable.clone())
        .final_()
        .constructor(vec![])
        .constructor(vec![string.clone()])
        .method(MethodInfo::new("length", vec![], int.clone()))
        .method(MethodInfo::new("charAt", vec![int.clone()], character.clone()))
        .method(MethodInfo::new("isEmpty", vec![], boolean.clone()))
        .method(MethodInfo::new("substring", vec![int.clone()], string.clone()))
        .method(MethodInfo::new("substring", vec![int.clone(), int.clone()], string.clone()))
        .method(MethodInfo::new("concat", vec![string.clone()], string.clone()))
        .method(MethodInfo::new("indexOf", vec![string.clone()], int.clone()))
        .method(MethodInfo::new("indexOf", vec![int.clone()], int.clone()))
        .method(MethodInfo::new("compareTo", vec![string.clone()], int.clone()))
        .method(MethodInfo::new("equals", vec![object.clone()], boolean.clone()))
        .method(MethodInfo::new("toUpperCase", vec![], string.clone()))
        .method(MethodInfo::new("toLowerCase", vec![], string.clone()))
        .method(MethodInfo::new("trim", vec![], string.clone()))
        .method(MethodInfo::new("+", vec![object.clone()], string.clone()))
        .method(MethodInfo::new("format", vec![string.clone(), objects.clone()], string.clone()).static_().varargs());
    for arg in [object.clone(), int.clone(), long.clone(), double.clone(), boolean.clone(), character.clone()] {
        string_info = string_info.method(MethodInfo::new("valueOf", vec![arg], string.clone()).static_());
    }
    for p in Prim::ALL {
        string_info = string_info.method(MethodInfo::new("+", vec![Ty::Prim(p)], string.clone()));
    }
    ctx.declare_class(string_info);

    let mut builder_info = ClassInfo::new("java.lang.StringBuilder")
        .extends(object.clone())
        .implements(char_seq.clone())
        .final_()
        .constructor(vec![])
        .constructor(vec![string.clone()])
        .method(MethodInfo::new("length", vec![], int.clone()))
        .method(MethodInfo::new("charAt", vec![int.clone()], character.clone()))
        .method(MethodInfo::new("toString", vec![], string.clone()));
    for arg in [object.clone(), string.clone(), int.clone(), long.clone(), double.clone(), boolean.clone(), character.clone()] {
        builder_info = builder_info.method(MethodInfo::new("append", vec![arg], builder.clone()));
    }
    ctx.declare_class(builder_info);

    ctx.declare_class(
        ClassInfo::new("java.lang.Number")
            .extends(object.clone())
            .abstract_()
            .constructor(vec![])
            .method(MethodInfo::new("intValue", vec![], int.clone()).abstract_())
            .method(MethodInfo::new("longValue", vec![], long.clone()).abstract_())
            .method(MethodInfo::new("doubleValue", vec![], double.clone()).abstract_()),
    );

    ctx.declare_class(
        ClassInfo::new("java.lang.Integer")
            .extends(number.clone())
            .implements(comparable.clone())
            .final_()
            .constructor(vec![int.clone()])
            .field(FieldInfo::new("MAX_VALUE", int.clone()).static_().final_())
            .field(FieldInfo::new("MIN_VALUE", int.clone()).static_().final_())
            .method(MethodInfo::new("intValue", vec![], int.clone()))
            .method(MethodInfo::new("longValue", vec![], long.clone()))
            .method(MethodInfo::new("doubleValue", vec![], double.clone()))
            .method(MethodInfo::new("compareTo", vec![integer.clone()], int.clone()))
            .method(MethodInfo::new("parseInt", vec![string.clone()], int.clone()).static_())
            .method(MethodInfo::new("valueOf", vec![int.clone()], integer.clone()).static_())
            .method(MethodInfo::new("toString", vec![int.clone()], string.clone()).static_()),
    );

    let mut math = ClassInfo::new("java.lang.Math")
        .extends(object.clone())
        .final_()
        .field(FieldInfo::new("PI", double.clone()).static_().final_())
        .field(FieldInfo::new("E", double.clone()).static_().final_())
        .method(MethodInfo::new("sqrt", vec![double.clone()], double.clone()).static_())
        .method(MethodInfo::new("pow", vec![double.clone(), double.clone()], double.clone()).static_())
        .method(MethodInfo::new("random", vec![], double.clone()).static_());
    for t in [int.clone(), long.clone(), float.clone(), double.clone()] {
        math = math
            .method(MethodInfo::new("abs", vec![t.clone()], t.clone()).static_())
            .method(MethodInfo::new("max", vec![t.clone(), t.clone()], t.clone()).static_())
            .method(MethodInfo::new("min", vec![t.clone(), t.clone()], t.clone()).static_());
    }
    ctx.declare_class(math);

    ctx.declare_class(
        ClassInfo::new("java.lang.System")
            .extends(object.clone())
            .final_()
            .field(FieldInfo::new("out", print_stream.clone()).static_().final_())
            .field(FieldInfo::new("err", print_stream.clone()).static_().final_())
            .method(MethodInfo::new("currentTimeMillis", vec![], long.clone()).static_())
            .method(MethodInfo::new("exit", vec![int.clone()], Ty::Void).static_()),
    );

    ctx.declare_class(
        ClassInfo::new("java.lang.Thread")
            .extends(object.clone())
            .implements(runnable.clone())
            .constructor(vec![])
            .constructor(vec![runnable.clone()])
            .method(MethodInfo::new("run", vec![], Ty::Void))
            .method(MethodInfo::new("start", vec![], Ty::Void))
            .method(
                MethodInfo::new("sleep", vec![long.clone()], Ty::Void)
                    .static_()
                    .throws(exception.clone()),
            ),
    );

    ctx.declare_class(
        ClassInfo::new(THROWABLE)
            .extends(object.clone())
            .constructor(vec![])
            .constructor(vec![string.clone()])
            .method(MethodInfo::new("getMessage", vec![], string.clone()))
            .method(MethodInfo::new("printStackTrace", vec![], Ty::Void)),
    );
    for (name, parent) in [
        (EXCEPTION, throwable.clone()),
        (RUNTIME_EXCEPTION, exception.clone()),
        ("java.lang.IllegalArgumentException", runtime_exception.clone()),
        ("java.lang.IllegalStateException", runtime_exception.clone()),
    ] {
        ctx.declare_class(
            ClassInfo::new(name)
                .extends(parent)
                .constructor(vec![])
                .constructor(vec![string.clone()]),
        );
    }
}

// ── java.io ────────────────────────────────────────────────────────────

fn register_java_io(ctx: &mut TypeContext) {
    let object = ctx.object();
    let objects = ctx.array_of(&object);
    let string = ctx.string();
    let print_stream = ctx.class_type("java.io.PrintStream");

    let mut info = ClassInfo::new("java.io.PrintStream")
        .extends(object.clone())
        .method(MethodInfo::new("println", vec![], Ty::Void))
        .method(MethodInfo::new("flush", vec![], Ty::Void))
        .method(
            MethodInfo::new("printf", vec![string.clone(), objects], print_stream)
                .varargs(),
        );
    let mut printable = vec![object, string];
    printable.extend(Prim::ALL.iter().map(|p| Ty::Prim(*p)));
    for arg in printable {
        info = info
            .method(MethodInfo::new("println", vec![arg.clone()], Ty::Void))
            .method(MethodInfo::new("print", vec![arg], Ty::Void));
    }
    ctx.declare_class(info);
}

// ── java.util ──────────────────────────────────────────────────────────

fn register_java_util(ctx: &mut TypeContext) {
    let object = ctx.object();
    let objects = ctx.array_of(&object);
    let string = ctx.string();
    let list = ctx.class_type("java.util.List");
    let map = ctx.class_type("java.util.Map");
    let int = Ty::int();
    let boolean = Ty::boolean();

    ctx.declare_class(
        ClassInfo::new("java.util.List")
            .interface()
            .method(MethodInfo::new("size", vec![], int.clone()).abstract_())
            .method(MethodInfo::new("isEmpty", vec![], boolean.clone()).abstract_())
            .method(MethodInfo::new("get", vec![int.clone()], object.clone()).abstract_())
            .method(MethodInfo::new("add", vec![object.clone()], boolean.clone()).abstract_())
            .method(MethodInfo::new("contains", vec![object.clone()], boolean.clone()).abstract_()),
    );

    ctx.declare_class(
        ClassInfo::new("java.util.ArrayList")
            .extends(object.clone())
            .implements(list.clone())
            .constructor(vec![])
            .constructor(vec![int.clone()])
            .method(MethodInfo::new("size", vec![], int.clone()))
            .method(MethodInfo::new("isEmpty", vec![], boolean.clone()))
            .method(MethodInfo::new("get", vec![int.clone()], object.clone()))
            .method(MethodInfo::new("add", vec![object.clone()], boolean.clone()))
            .method(MethodInfo::new("contains", vec![object.clone()], boolean.clone())),
    );

    ctx.declare_class(
        ClassInfo::new("java.util.Arrays")
            .extends(object.clone())
            .final_()
            .method(MethodInfo::new("asList", vec![objects.clone()], list.clone()).static_().varargs())
            .method(MethodInfo::new("toString", vec![objects], string).static_()),
    );

    ctx.declare_class(
        ClassInfo::new("java.util.Map")
            .interface()
            .inner("Entry")
            .method(MethodInfo::new("size", vec![], int.clone()).abstract_())
            .method(MethodInfo::new("get", vec![object.clone()], object.clone()).abstract_())
            .method(
                MethodInfo::new("put", vec![object.clone(), object.clone()], object.clone())
                    .abstract_(),
            ),
    );

    ctx.declare_class(
        ClassInfo::new("java.util.Map$Entry")
            .interface()
            .method(MethodInfo::new("getKey", vec![], object.clone()).abstract_())
            .method(MethodInfo::new("getValue", vec![], object.clone()).abstract_()),
    );

    ctx.declare_class(
        ClassInfo::new("java.util.HashMap")
            .extends(object.clone())
            .implements(map)
            .constructor(vec![])
            .method(MethodInfo::new("size", vec![], int))
            .method(MethodInfo::new("get", vec![object.clone()], object.clone()))
            .method(MethodInfo::new("put", vec![object.clone(), object.clone()], object)),
    );
}

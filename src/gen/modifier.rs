//! Modifier-mode expansion: the DSL call keeps its shape and its lines;
//! only task function references are rewritten into annotated closure
//! literals that call the original inline. IDEs then see real call
//! expressions with real types at the original positions.

use flow::{CompiledFunc, DirectiveIr, FileIr};
use syntax::ByteSpan;

/// Collect the in-place rewrites for every directive: one per function
/// reference that is not already a closure literal.
pub fn rewrites(ir: &FileIr) -> Vec<(ByteSpan, String)> {
    let mut edits = Vec::new();
    for directive in &ir.directives {
        match directive {
            DirectiveIr::Flow(f) => {
                for task in &f.tasks {
                    push_rewrite(ir, &task.func, &mut edits);
                    if let Some(pred) = &task.predicate {
                        push_rewrite(ir, pred, &mut edits);
                    }
                    if let Some(fb) = &task.fallback {
                        push_rewrite(ir, fb, &mut edits);
                    }
                }
            }
            DirectiveIr::Parallel(p) => {
                for task in &p.tasks {
                    push_rewrite(ir, &task.func, &mut edits);
                }
                for slice in &p.slices {
                    push_rewrite(ir, &slice.func, &mut edits);
                }
            }
        }
    }
    edits
}

fn push_rewrite(ir: &FileIr, func: &CompiledFunc, edits: &mut Vec<(ByteSpan, String)>) {
    let original = ir.file.snippet(func.span);
    if original.starts_with('|') || original.starts_with("move") {
        // already a closure literal; nothing to inline.
        return;
    }

    let mut params = Vec::with_capacity(func.inputs.len() + 1);
    let mut args = Vec::with_capacity(func.inputs.len() + 1);
    if func.want_ctx {
        params.push("_cff_ctx: &::cff::Context".to_owned());
        args.push("_cff_ctx".to_owned());
    }
    for (i, &ty) in func.inputs.iter().enumerate() {
        params.push(format!(
            "_cff_a{i}: {}",
            ir.file.snippet(ir.types.spelling(ty))
        ));
        args.push(format!("_cff_a{i}"));
    }

    let ret = match func.ret_span {
        Some(span) => format!(" -> {}", ir.file.snippet(span)),
        None => String::new(),
    };

    edits.push((
        func.span,
        format!(
            "|{}|{ret} {{ {original}({}) }}",
            params.join(", "),
            args.join(", ")
        ),
    ));
}

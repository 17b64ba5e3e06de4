use syn::spanned::Spanned;
use syntax::ast::{describe, Scope};
use syntax::{ByteSpan, PosInfo, SourceFile};

use crate::{Diagnostics, TypeId, TypeTable};

/// A compiled function expression: the result of resolving an expression
/// that must denote a function.
///
/// Inputs exclude a leading context parameter; outputs exclude a trailing
/// error. If `want_ctx` is set, the context is always passed first.
#[derive(Debug)]
pub struct CompiledFunc {
    /// Original expression, for source splicing.
    pub span: ByteSpan,
    /// Short name inferred from the expression, for instrument defaults and
    /// error wrapping.
    pub name: String,
    pub inputs: Vec<TypeId>,
    pub outputs: Vec<TypeId>,
    pub want_ctx: bool,
    pub has_error: bool,
    /// Span of the declared return type, when there is one. The modifier
    /// generator reuses it to annotate inlined closures.
    pub ret_span: Option<ByteSpan>,
    pub pos: PosInfo,
}

/// Compile an expression that must denote a function: a path to a
/// file-local `fn`, or a closure with annotated parameters and return type.
/// Anything else gets a diagnostic and is skipped.
pub fn compile_function(
    expr: &syn::Expr,
    file: &SourceFile,
    types: &mut TypeTable,
    diags: &mut Diagnostics,
) -> Option<CompiledFunc> {
    let pos = file.pos(expr.span());
    let sig = match file.scope.signature_of(expr) {
        Some(sig) => sig,
        None => {
            diags.add(
                pos,
                format!("cannot determine the signature of {}", describe(expr)),
            );
            return None;
        }
    };

    let mut want_ctx = false;
    let mut inputs = Vec::with_capacity(sig.params.len());
    for (i, param) in sig.params.iter().enumerate() {
        if i == 0 && file.scope.is_context_ref(param) {
            want_ctx = true;
            continue;
        }
        inputs.push(intern_type(param, &file.scope, types));
    }

    let mut has_error = false;
    let mut outputs = Vec::new();
    if let Some(ret) = &sig.ret {
        let produced = match syntax::result_ok_type(ret) {
            Some(ok) => {
                has_error = true;
                ok.clone()
            }
            None => ret.clone(),
        };
        for ty in syntax::flatten_outputs(&produced) {
            outputs.push(intern_type(&ty, &file.scope, types));
        }
    }

    Some(CompiledFunc {
        span: ByteSpan::of(expr.span()),
        name: file.scope.func_name(expr, &file.name),
        inputs,
        outputs,
        want_ctx,
        has_error,
        ret_span: sig.ret.as_ref().map(|ty| ByteSpan::of(ty.span())),
        pos,
    })
}

pub fn intern_type(ty: &syn::Type, scope: &Scope, types: &mut TypeTable) -> TypeId {
    let canonical = scope.canonical_type(ty);
    types.intern(&canonical, ByteSpan::of(ty.span()))
}

use std::sync::Arc;

use syn::spanned::Spanned;

use crate::{ByteSpan, HashMap, HashSet, PosInfo, DSL_CRATE};

/// A Rust source file loaded for processing.
#[derive(Debug)]
pub struct SourceFile {
    /// Display path, used in positions and generated info records.
    pub name: Arc<str>,
    /// The raw source bytes; spans index into this.
    pub text: Arc<str>,
    /// Imports, declared functions, annotated locals.
    pub scope: Scope,
    /// Top-level `flow!` / `parallel!` sites, in source order.
    pub sites: Vec<DslSite>,
    /// Span of the `#![cfg(cff)]` inner attribute, if the file has one.
    pub cfg_tag: Option<ByteSpan>,
    /// Spans of `use` items that import the DSL crate (removed on output).
    pub dsl_uses: Vec<ByteSpan>,
    /// Byte offset just past the last top-level `use` item, where the
    /// generator inserts new imports.
    pub import_insertion: Option<usize>,
}

impl SourceFile {
    /// The source text of any spanned node.
    pub fn snippet(&self, span: ByteSpan) -> &str {
        span.text(&self.text)
    }

    pub fn pos(&self, span: proc_macro2::Span) -> PosInfo {
        PosInfo::of(&self.name, span)
    }
}

/// Everything name-resolution-shaped the loader can answer about a file.
#[derive(Debug, Default)]
pub struct Scope {
    /// Local name -> fully-qualified path, from `use` declarations.
    pub uses: HashMap<String, String>,
    /// Top-level functions declared in the file.
    pub fns: HashMap<String, FnDecl>,
    /// Names of types declared in the file (structs, enums, aliases).
    pub local_types: HashSet<String>,
    /// Per enclosing function: identifier -> declared type, covering
    /// function parameters and `let` bindings with explicit annotations.
    pub locals: HashMap<String, HashMap<String, syn::Type>>,
}

/// A top-level `fn` item.
#[derive(Debug, Clone)]
pub struct FnDecl {
    pub name: String,
    pub sig: FnSig,
    pub pos: PosInfo,
}

/// A function signature as written: parameter types and return type.
#[derive(Debug, Clone)]
pub struct FnSig {
    pub params: Vec<syn::Type>,
    pub ret: Option<syn::Type>,
}

/// A recognized DSL macro invocation, unwrapped to name and arguments.
#[derive(Debug)]
pub struct DslCall {
    /// Callee name within the DSL crate, e.g. `flow`, `task`, `results`.
    pub name: String,
    pub args: Vec<syn::Expr>,
    pub pos: PosInfo,
    pub span: ByteSpan,
}

/// A top-level DSL call site (`flow!` or `parallel!`) found in the file.
#[derive(Debug)]
pub struct DslSite {
    pub call: DslCall,
    /// Name of the function the site appears in, used for flow naming and
    /// for resolving the types of value expressions.
    pub enclosing_fn: Option<String>,
}

impl Scope {
    /// Resolve a path through the `use` map to its fully-qualified form.
    /// Only the leading segment is rewritten; a leading `::` is dropped.
    pub fn resolve_path(&self, path: &syn::Path) -> String {
        let mut segments: Vec<String> = path
            .segments
            .iter()
            .map(|s| s.ident.to_string())
            .collect();
        if path.leading_colon.is_none() {
            if let Some(full) = self.uses.get(&segments[0]) {
                let mapped: Vec<String> = full.split("::").map(str::to_owned).collect();
                segments.splice(0..1, mapped);
            }
        }
        segments.join("::")
    }

    /// If `expr` is a DSL macro invocation (possibly parenthesized),
    /// classify it. Returns `None` for anything else.
    pub fn dsl_call(&self, expr: &syn::Expr, file: &Arc<str>) -> Option<DslCall> {
        let mac = match unparen(expr) {
            syn::Expr::Macro(m) => &m.mac,
            _ => return None,
        };
        self.dsl_macro(mac, file, expr.span())
    }

    /// Classify a macro invocation node directly (used for statement-position
    /// sites, which syn models separately from expression-position ones).
    pub fn dsl_macro(
        &self,
        mac: &syn::Macro,
        file: &Arc<str>,
        whole: proc_macro2::Span,
    ) -> Option<DslCall> {
        let resolved = self.resolve_path(&mac.path);
        let name = resolved.strip_prefix(&format!("{DSL_CRATE}::"))?;
        let args = mac
            .parse_body_with(
                syn::punctuated::Punctuated::<syn::Expr, syn::Token![,]>::parse_terminated,
            )
            .ok()?;
        Some(DslCall {
            name: name.to_owned(),
            args: args.into_iter().collect(),
            pos: PosInfo::of(file, whole),
            span: ByteSpan::of(whole),
        })
    }

    /// Look up the declared type of a value expression inside `enclosing_fn`.
    /// Handles plain identifiers and `&mut ident` (the shape of a results
    /// destination). Returns `None` when the type cannot be determined
    /// syntactically.
    pub fn type_of_value<'a>(
        &'a self,
        enclosing_fn: Option<&str>,
        expr: &syn::Expr,
    ) -> Option<&'a syn::Type> {
        let locals = self.locals.get(enclosing_fn?)?;
        match unparen(expr) {
            syn::Expr::Path(p) => locals.get(&p.path.get_ident()?.to_string()),
            syn::Expr::Reference(r) => match unparen(&r.expr) {
                syn::Expr::Path(p) => locals.get(&p.path.get_ident()?.to_string()),
                _ => None,
            },
            _ => None,
        }
    }

    /// Find the signature of a function expression: a path to a file-local
    /// `fn`, or a closure literal with fully annotated parameters and return
    /// type.
    pub fn signature_of(&self, expr: &syn::Expr) -> Option<FnSig> {
        match unparen(expr) {
            syn::Expr::Path(p) => {
                let name = p.path.get_ident()?.to_string();
                Some(self.fns.get(&name)?.sig.clone())
            }
            syn::Expr::Closure(c) => closure_sig(c),
            _ => None,
        }
    }

    /// A short name for a function expression, used to infer instrument
    /// names. Closures fall back to their position.
    pub fn func_name(&self, expr: &syn::Expr, file: &Arc<str>) -> String {
        match unparen(expr) {
            syn::Expr::Path(p) => p
                .path
                .segments
                .last()
                .map(|s| s.ident.to_string())
                .unwrap_or_else(|| "func".to_owned()),
            other => {
                let pos = PosInfo::of(file, other.span());
                format!("closure:{}:{}", pos.line, pos.column)
            }
        }
    }
}

fn closure_sig(c: &syn::ExprClosure) -> Option<FnSig> {
    let mut params = Vec::with_capacity(c.inputs.len());
    for input in &c.inputs {
        match input {
            syn::Pat::Type(pt) => params.push((*pt.ty).clone()),
            _ => return None,
        }
    }
    let ret = match &c.output {
        syn::ReturnType::Type(_, ty) => Some((**ty).clone()),
        syn::ReturnType::Default => None,
    };
    Some(FnSig { params, ret })
}

/// Strip grouping from an expression.
pub fn unparen(expr: &syn::Expr) -> &syn::Expr {
    match expr {
        syn::Expr::Paren(p) => unparen(&p.expr),
        syn::Expr::Group(g) => unparen(&g.expr),
        _ => expr,
    }
}

/// A short human description of an expression, for "expected X, got Y"
/// diagnostics.
pub fn describe(expr: &syn::Expr) -> String {
    match unparen(expr) {
        syn::Expr::Macro(m) => format!("macro call {}!", path_text(&m.mac.path)),
        syn::Expr::Call(_) => "function call".to_owned(),
        syn::Expr::Path(p) => format!("identifier {}", path_text(&p.path)),
        syn::Expr::Lit(_) => "literal".to_owned(),
        syn::Expr::Closure(_) => "closure".to_owned(),
        syn::Expr::MethodCall(_) => "method call".to_owned(),
        syn::Expr::Reference(_) => "reference expression".to_owned(),
        _ => "expression".to_owned(),
    }
}

fn path_text(path: &syn::Path) -> String {
    let segments: Vec<String> = path.segments.iter().map(|s| s.ident.to_string()).collect();
    segments.join("::")
}

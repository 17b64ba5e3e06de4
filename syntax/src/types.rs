use quote::ToTokens;

use crate::ast::Scope;
use crate::DSL_CRATE;

/// Print a type compactly in Rust syntax, as written. Used for diagnostics.
pub fn render_type(ty: &syn::Type) -> String {
    let mut out = String::with_capacity(16);
    write_type(&mut out, ty, None);
    out
}

impl Scope {
    /// The canonical spelling of a type: the leading path segment is resolved
    /// through the file's `use` map, and types declared in the file itself
    /// are marked `self::`. Interned canonical spellings are the type
    /// identities the dependency resolver compares; two spellings of the same
    /// declaration canonicalize equal, while identically-named types from
    /// different modules stay distinct.
    pub fn canonical_type(&self, ty: &syn::Type) -> String {
        let mut out = String::with_capacity(16);
        write_type(&mut out, ty, Some(self));
        out
    }

    /// True for `&cff::Context` under any import spelling.
    pub fn is_context_ref(&self, ty: &syn::Type) -> bool {
        match ty {
            syn::Type::Reference(r) if r.mutability.is_none() => {
                self.canonical_type(&r.elem) == format!("{DSL_CRATE}::Context")
            }
            _ => false,
        }
    }
}

/// If `ty` is the ambient error form (an outermost `Result`, under any
/// alias), return its `Ok` type. `None` means `ty` is not a `Result`.
pub fn result_ok_type(ty: &syn::Type) -> Option<&syn::Type> {
    let path = match ty {
        syn::Type::Path(p) if p.qself.is_none() => &p.path,
        _ => return None,
    };
    let last = path.segments.last()?;
    if last.ident != "Result" {
        return None;
    }
    match &last.arguments {
        syn::PathArguments::AngleBracketed(args) => {
            args.args.iter().find_map(|arg| match arg {
                syn::GenericArgument::Type(t) => Some(t),
                _ => None,
            })
        }
        _ => None,
    }
}

/// Element type of a sliceable expression type: `Vec<T>`, `&[T]`, `[T; N]`
/// and references to those. `None` when `ty` is not sliceable or the
/// element cannot be named.
pub fn slice_elem_type(ty: &syn::Type) -> Option<&syn::Type> {
    match ty {
        syn::Type::Reference(r) => slice_elem_type(&r.elem),
        syn::Type::Slice(s) => Some(&s.elem),
        syn::Type::Array(a) => Some(&a.elem),
        syn::Type::Paren(p) => slice_elem_type(&p.elem),
        syn::Type::Path(p) if p.qself.is_none() => {
            let last = p.path.segments.last()?;
            if last.ident != "Vec" {
                return None;
            }
            match &last.arguments {
                syn::PathArguments::AngleBracketed(args) => {
                    args.args.iter().find_map(|arg| match arg {
                        syn::GenericArgument::Type(t) => Some(t),
                        _ => None,
                    })
                }
                _ => None,
            }
        }
        _ => None,
    }
}

/// Split a produced type into individual outputs: tuples flatten to one
/// output per element, unit means no outputs.
pub fn flatten_outputs(ty: &syn::Type) -> Vec<syn::Type> {
    match ty {
        syn::Type::Tuple(t) => t.elems.iter().cloned().collect(),
        syn::Type::Paren(p) => flatten_outputs(&p.elem),
        _ => vec![ty.clone()],
    }
}

fn write_type(out: &mut String, ty: &syn::Type, scope: Option<&Scope>) {
    match ty {
        syn::Type::Path(p) if p.qself.is_none() => write_path(out, &p.path, scope),
        syn::Type::Reference(r) => {
            out.push('&');
            if let Some(lt) = &r.lifetime {
                out.push('\'');
                out.push_str(&lt.ident.to_string());
                out.push(' ');
            }
            if r.mutability.is_some() {
                out.push_str("mut ");
            }
            write_type(out, &r.elem, scope);
        }
        syn::Type::Tuple(t) => {
            out.push('(');
            for (i, elem) in t.elems.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_type(out, elem, scope);
            }
            out.push(')');
        }
        syn::Type::Slice(s) => {
            out.push('[');
            write_type(out, &s.elem, scope);
            out.push(']');
        }
        syn::Type::Array(a) => {
            out.push('[');
            write_type(out, &a.elem, scope);
            out.push_str("; ");
            out.push_str(&collapse_ws(&a.len.to_token_stream().to_string()));
            out.push(']');
        }
        syn::Type::Paren(p) => write_type(out, &p.elem, scope),
        syn::Type::Ptr(p) => {
            out.push('*');
            out.push_str(if p.mutability.is_some() { "mut " } else { "const " });
            write_type(out, &p.elem, scope);
        }
        other => {
            // trait objects, fn pointers and the like: fall back to the
            // token stream, collapsed to stable whitespace.
            out.push_str(&collapse_ws(&other.to_token_stream().to_string()));
        }
    }
}

fn write_path(out: &mut String, path: &syn::Path, scope: Option<&Scope>) {
    // canonicalization: rewrite the leading segment through the use map,
    // mark bare file-local type names, and drop a leading `::`. without a
    // scope, print the path as written.
    let mut leading_text: Option<String> = None;
    match scope {
        Some(scope) if path.leading_colon.is_none() => {
            let first = path.segments[0].ident.to_string();
            if let Some(full) = scope.uses.get(&first) {
                leading_text = Some(full.clone());
            } else if path.segments.len() == 1 && scope.local_types.contains(&first) {
                leading_text = Some(format!("self::{first}"));
            }
        }
        Some(_) => {}
        None => {
            if path.leading_colon.is_some() {
                out.push_str("::");
            }
        }
    }

    for (i, seg) in path.segments.iter().enumerate() {
        if i > 0 {
            out.push_str("::");
        }
        match (i, &leading_text) {
            (0, Some(text)) => out.push_str(text),
            _ => out.push_str(&seg.ident.to_string()),
        }
        if let syn::PathArguments::AngleBracketed(args) = &seg.arguments {
            out.push('<');
            for (j, arg) in args.args.iter().enumerate() {
                if j > 0 {
                    out.push_str(", ");
                }
                match arg {
                    syn::GenericArgument::Type(t) => write_type(out, t, scope),
                    other => {
                        out.push_str(&collapse_ws(&other.to_token_stream().to_string()))
                    }
                }
            }
            out.push('>');
        }
    }
}

fn collapse_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_space = false;
    for c in s.chars() {
        if c.is_whitespace() {
            if !last_space {
                out.push(' ');
                last_space = true;
            }
        } else {
            out.push(c);
            last_space = false;
        }
    }
    out.trim().to_owned()
}

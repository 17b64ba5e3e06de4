use std::sync::Arc;

use syn::spanned::Spanned;
use syn::visit::Visit;

use crate::ast::{DslSite, FnDecl, FnSig, Scope, SourceFile};
use crate::{ByteSpan, Error, HashMap, PosInfo, DSL_CRATE};

/// Lower a parsed `syn::File` into our model. Two passes: first collect the
/// scope (imports, fn signatures, local types, annotated locals), then walk
/// function bodies for DSL call sites, which need the scope to resolve
/// macro paths.
pub fn lower(name: &str, text: &str, file: &syn::File) -> Result<SourceFile, Error> {
    let name: Arc<str> = Arc::from(name);
    let text: Arc<str> = Arc::from(text);

    let mut scope = Scope::default();
    let mut dsl_uses = Vec::new();
    let mut import_insertion = None;

    for item in &file.items {
        match item {
            syn::Item::Use(u) => {
                collect_use(&u.tree, String::new(), &mut scope.uses);
                if imports_dsl_crate(&u.tree) {
                    dsl_uses.push(ByteSpan::of(u.span()));
                }
                import_insertion = Some(ByteSpan::of(u.span()).end);
            }
            syn::Item::Fn(f) => {
                let decl = fn_decl(&name, f);
                let locals = fn_locals(f);
                scope.locals.insert(decl.name.clone(), locals);
                scope.fns.insert(decl.name.clone(), decl);
            }
            syn::Item::Struct(s) => {
                scope.local_types.insert(s.ident.to_string());
            }
            syn::Item::Enum(e) => {
                scope.local_types.insert(e.ident.to_string());
            }
            syn::Item::Type(t) => {
                scope.local_types.insert(t.ident.to_string());
            }
            syn::Item::Union(u) => {
                scope.local_types.insert(u.ident.to_string());
            }
            _ => {}
        }
    }

    let cfg_tag = find_cfg_tag(file);

    // second pass: find flow!/parallel! sites inside each fn body.
    let mut sites = Vec::new();
    for item in &file.items {
        if let syn::Item::Fn(f) = item {
            let mut finder = SiteFinder {
                scope: &scope,
                file: &name,
                enclosing_fn: f.sig.ident.to_string(),
                sites: &mut sites,
                error: None,
            };
            finder.visit_block(&f.block);
            if let Some(err) = finder.error {
                return Err(err);
            }
        }
    }
    sites.sort_by_key(|s: &DslSite| s.call.span.start);

    Ok(SourceFile {
        name,
        text,
        scope,
        sites,
        cfg_tag,
        dsl_uses,
        import_insertion,
    })
}

fn fn_decl(file: &Arc<str>, f: &syn::ItemFn) -> FnDecl {
    let params = f
        .sig
        .inputs
        .iter()
        .filter_map(|arg| match arg {
            syn::FnArg::Typed(pt) => Some((*pt.ty).clone()),
            syn::FnArg::Receiver(_) => None,
        })
        .collect();
    let ret = match &f.sig.output {
        syn::ReturnType::Type(_, ty) => Some((**ty).clone()),
        syn::ReturnType::Default => None,
    };
    FnDecl {
        name: f.sig.ident.to_string(),
        sig: FnSig { params, ret },
        pos: PosInfo::of(file, f.sig.ident.span()),
    }
}

/// Record the declared types of a function's parameters and of its `let`
/// bindings that carry an explicit annotation. This is the whole extent of
/// the loader's expression typing; everything else is out of scope.
fn fn_locals(f: &syn::ItemFn) -> HashMap<String, syn::Type> {
    let mut locals = HashMap::default();
    for arg in &f.sig.inputs {
        if let syn::FnArg::Typed(pt) = arg {
            if let syn::Pat::Ident(pi) = &*pt.pat {
                locals.insert(pi.ident.to_string(), (*pt.ty).clone());
            }
        }
    }

    struct LocalCollector<'a> {
        locals: &'a mut HashMap<String, syn::Type>,
    }
    impl<'ast> Visit<'ast> for LocalCollector<'_> {
        fn visit_local(&mut self, local: &'ast syn::Local) {
            if let syn::Pat::Type(pt) = &local.pat {
                if let syn::Pat::Ident(pi) = &*pt.pat {
                    self.locals.insert(pi.ident.to_string(), (*pt.ty).clone());
                }
            }
            syn::visit::visit_local(self, local);
        }
    }

    let mut collector = LocalCollector {
        locals: &mut locals,
    };
    collector.visit_block(&f.block);
    locals
}

fn collect_use(tree: &syn::UseTree, prefix: String, uses: &mut HashMap<String, String>) {
    match tree {
        syn::UseTree::Path(p) => {
            let prefix = join(&prefix, &p.ident.to_string());
            collect_use(&p.tree, prefix, uses);
        }
        syn::UseTree::Name(n) => {
            let full = join(&prefix, &n.ident.to_string());
            uses.insert(n.ident.to_string(), full);
        }
        syn::UseTree::Rename(r) => {
            let full = join(&prefix, &r.ident.to_string());
            uses.insert(r.rename.to_string(), full);
        }
        syn::UseTree::Group(g) => {
            for item in &g.items {
                collect_use(item, prefix.clone(), uses);
            }
        }
        syn::UseTree::Glob(_) => {}
    }
}

fn join(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_owned()
    } else {
        format!("{prefix}::{segment}")
    }
}

/// True for `use cff;` and `use cff as alias;`: imports of the bare DSL
/// crate, which generated output must delete because nothing references the
/// short name afterwards. Imports of items inside the crate stay.
fn imports_dsl_crate(tree: &syn::UseTree) -> bool {
    match tree {
        syn::UseTree::Name(n) => n.ident == DSL_CRATE,
        syn::UseTree::Rename(r) => r.ident == DSL_CRATE,
        _ => false,
    }
}

fn find_cfg_tag(file: &syn::File) -> Option<ByteSpan> {
    for attr in &file.attrs {
        if !matches!(attr.style, syn::AttrStyle::Inner(_)) {
            continue;
        }
        if !attr.path().is_ident("cfg") {
            continue;
        }
        if let syn::Meta::List(list) = &attr.meta {
            if list.tokens.to_string() == DSL_CRATE {
                return Some(ByteSpan::of(attr.span()));
            }
        }
    }
    None
}

/// Finds top-level DSL sites (`flow!` / `parallel!`) in a function body.
/// Nested option macros live inside the root macro's token stream, which
/// syn does not descend into, so every hit here really is a root.
struct SiteFinder<'a> {
    scope: &'a Scope,
    file: &'a Arc<str>,
    enclosing_fn: String,
    sites: &'a mut Vec<DslSite>,
    error: Option<Error>,
}

impl SiteFinder<'_> {
    fn check_macro(&mut self, mac: &syn::Macro, whole: proc_macro2::Span) {
        let resolved = self.scope.resolve_path(&mac.path);
        let name = match resolved.strip_prefix(&format!("{DSL_CRATE}::")) {
            Some(name) => name,
            None => return,
        };
        if name != "flow" && name != "parallel" {
            return;
        }
        match self.scope.dsl_macro(mac, self.file, whole) {
            Some(call) => self.sites.push(DslSite {
                call,
                enclosing_fn: Some(self.enclosing_fn.clone()),
            }),
            None => {
                // resolved to the DSL but the arguments don't parse as a
                // comma-separated expression list: a load error, same as any
                // other syntax problem in the file.
                if self.error.is_none() {
                    self.error = Some(Error::Parse {
                        line: PosInfo::of(self.file, whole).line,
                        msg: format!("invalid arguments to {DSL_CRATE}::{name}!"),
                    });
                }
            }
        }
    }
}

impl<'ast> Visit<'ast> for SiteFinder<'_> {
    fn visit_expr_macro(&mut self, em: &'ast syn::ExprMacro) {
        self.check_macro(&em.mac, em.span());
    }

    fn visit_stmt_macro(&mut self, sm: &'ast syn::StmtMacro) {
        // span of the macro itself, not the trailing semicolon.
        self.check_macro(&sm.mac, sm.mac.span());
    }
}

#[cfg(test)]
mod test {
    use crate::ast::describe;

    const BASIC: &str = r#"#![cfg(cff)]
use cff;
use std::io;

#[derive(Clone, Default)]
struct A(u32);

fn make() -> A {
    A(1)
}

fn grow(a: A) -> Result<A, io::Error> {
    Ok(a)
}

fn run(ctx: &cff::Context) -> cff::Result<()> {
    let mut out: A = A::default();
    cff::flow!(
        ctx,
        cff::task!(make),
        cff::task!(grow),
        cff::results!(&mut out),
    )
}
"#;

    #[test]
    fn test_collects_scope() {
        let file = crate::parse("demo.rs", BASIC).unwrap();
        assert!(file.scope.fns.contains_key("make"));
        assert!(file.scope.fns.contains_key("grow"));
        assert!(file.scope.local_types.contains("A"));
        assert_eq!(Some(&"std::io".to_owned()), file.scope.uses.get("io"));

        let locals = &file.scope.locals["run"];
        assert!(locals.contains_key("ctx"));
        assert!(locals.contains_key("out"));
    }

    #[test]
    fn test_finds_flow_site() {
        let file = crate::parse("demo.rs", BASIC).unwrap();
        assert_eq!(1, file.sites.len());
        let site = &file.sites[0];
        assert_eq!("flow", site.call.name);
        assert_eq!(Some("run"), site.enclosing_fn.as_deref());
        assert_eq!(4, site.call.args.len());
        assert!(file.snippet(site.call.span).starts_with("cff::flow!"));
    }

    #[test]
    fn test_detects_cfg_tag_and_dsl_use() {
        let file = crate::parse("demo.rs", BASIC).unwrap();
        let tag = file.cfg_tag.expect("cfg tag");
        assert_eq!("#![cfg(cff)]", file.snippet(tag));
        assert_eq!(1, file.dsl_uses.len());
        assert_eq!("use cff;", file.snippet(file.dsl_uses[0]));
    }

    #[test]
    fn test_nested_calls_classify() {
        let file = crate::parse("demo.rs", BASIC).unwrap();
        let site = &file.sites[0];
        let nested = file
            .scope
            .dsl_call(&site.call.args[1], &file.name)
            .expect("task call");
        assert_eq!("task", nested.name);
        assert_eq!(1, nested.args.len());

        // the ctx argument is not a DSL call.
        assert!(file.scope.dsl_call(&site.call.args[0], &file.name).is_none());
        assert_eq!("identifier ctx", describe(&site.call.args[0]));
    }

    #[test]
    fn test_renamed_import_resolves() {
        let src = r#"
use cff as c;

fn t() -> u32 {
    7
}

fn run(ctx: &c::Context) -> c::Result<()> {
    c::flow!(ctx, c::task!(t))
}
"#;
        let file = crate::parse("demo.rs", src).unwrap();
        assert_eq!(1, file.sites.len());
        assert_eq!("flow", file.sites[0].call.name);
        assert_eq!(1, file.dsl_uses.len());
    }

    #[test]
    fn test_signature_lookup() {
        let file = crate::parse("demo.rs", BASIC).unwrap();
        let site = &file.sites[0];
        let task = file.scope.dsl_call(&site.call.args[1], &file.name).unwrap();
        let sig = file.scope.signature_of(&task.args[0]).expect("signature");
        assert!(sig.params.is_empty());
        assert!(sig.ret.is_some());
    }

    #[test]
    fn test_parse_error_reported() {
        let err = crate::parse("bad.rs", "fn broken( {").unwrap_err();
        assert!(err.to_string().contains("parse error"));
    }
}

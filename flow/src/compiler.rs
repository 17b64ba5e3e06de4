use syn::spanned::Spanned;
use syntax::ast::{describe, DslCall, DslSite};
use syntax::{ByteSpan, SourceFile};

use crate::func::{compile_function, intern_type};
use crate::{
    CompiledFunc, Diagnostics, DirectiveIr, FileIr, Flow, Instrument, Output, Parallel,
    ParallelTask, Param, Serial, SliceTask, Task, TypeTable,
};

#[derive(Debug, Default, Clone, Copy)]
pub struct CompilerOpts {
    /// Opt every task into instrumentation with a name inferred from its
    /// function.
    pub instrument_all_tasks: bool,
}

/// Compiles a file's DSL sites into IR, accumulating diagnostics instead of
/// stopping at the first problem. Task and predicate serials increase
/// monotonically across the whole file.
pub struct Compiler {
    opts: CompilerOpts,
    serial: usize,
}

impl Compiler {
    pub fn new(opts: CompilerOpts) -> Self {
        Self { opts, serial: 0 }
    }

    /// Compile every DSL site in `file`. The returned diagnostics are the
    /// complete list for the file; the IR is usable only when they are
    /// empty.
    pub fn compile(mut self, file: SourceFile) -> (FileIr, Diagnostics) {
        let mut types = TypeTable::default();
        let mut diags = Diagnostics::default();
        let mut directives = Vec::with_capacity(file.sites.len());

        for site in &file.sites {
            match site.call.name.as_str() {
                "flow" => {
                    if let Some(flow) = self.compile_flow(site, &file, &mut types, &mut diags) {
                        directives.push(DirectiveIr::Flow(flow));
                    }
                }
                "parallel" => {
                    if let Some(par) = self.compile_parallel(site, &file, &mut types, &mut diags)
                    {
                        directives.push(DirectiveIr::Parallel(par));
                    }
                }
                other => {
                    // the loader only records flow/parallel roots; anything
                    // else here is a loader bug, but report it anyway.
                    diags.add(
                        site.call.pos.clone(),
                        format!("expected cff::flow or cff::parallel, got cff::{other}"),
                    );
                }
            }
        }

        (
            FileIr {
                file,
                directives,
                types,
            },
            diags,
        )
    }

    fn next_serial(&mut self) -> Serial {
        let s = Serial::from(self.serial);
        self.serial += 1;
        s
    }
}

// FLOWS ////////////////////
impl Compiler {
    fn compile_flow(
        &mut self,
        site: &DslSite,
        file: &SourceFile,
        types: &mut TypeTable,
        diags: &mut Diagnostics,
    ) -> Option<Flow> {
        let call = &site.call;
        if call.args.len() < 2 {
            diags.add(
                call.pos.clone(),
                "cff::flow expects a context argument and at least one task",
            );
            return None;
        }

        let mut flow = Flow {
            name: site
                .enclosing_fn
                .clone()
                .unwrap_or_else(|| "flow".to_owned()),
            ctx: ByteSpan::of(call.args[0].span()),
            emitters: Vec::new(),
            params: Vec::new(),
            results: Vec::new(),
            concurrency: None,
            instrument: None,
            tasks: Vec::new(),
            pos: call.pos.clone(),
            span: call.span,
        };

        for arg in &call.args[1..] {
            let nested = match file.scope.dsl_call(arg, &file.name) {
                Some(c) => c,
                None => {
                    diags.add(
                        file.pos(arg.span()),
                        format!("expected a cff call, got {}", describe(arg)),
                    );
                    continue;
                }
            };
            match nested.name.as_str() {
                "task" => {
                    if let Some(task) = self.compile_task(&nested, file, types, diags) {
                        flow.tasks.push(task);
                    }
                }
                "tasks" => {
                    for fn_expr in &nested.args {
                        if let Some(task) = self.compile_bare_task(fn_expr, file, types, diags) {
                            flow.tasks.push(task);
                        }
                    }
                }
                "results" => self.compile_results(&nested, site, &mut flow, file, types, diags),
                "params" => self.compile_params(&nested, site, &mut flow, file, types, diags),
                "with_emitter" => {
                    if let Some(expr) = one_arg(&nested, diags) {
                        flow.emitters.push(ByteSpan::of(expr.span()));
                    }
                }
                "instrument_flow" => {
                    if let Some(expr) = one_arg(&nested, diags) {
                        flow.instrument = Some(Instrument {
                            name_expr: Some(ByteSpan::of(expr.span())),
                            inferred: flow.name.clone(),
                        });
                    }
                }
                "concurrency" => {
                    if let Some(expr) = one_arg(&nested, diags) {
                        flow.concurrency = Some(ByteSpan::of(expr.span()));
                    }
                }
                other => diags.add(
                    nested.pos.clone(),
                    format!("expected a flow option, got cff::{other}"),
                ),
            }
        }

        if flow.tasks.is_empty() {
            diags.add(call.pos.clone(), "cff::flow has no tasks");
        }
        self.check_instrumented_emitters(
            flow.instrument.is_some(),
            "cff::instrument_flow",
            flow.tasks.iter().any(|t| t.instrument.is_some()),
            flow.emitters.is_empty(),
            &flow.pos,
            diags,
        );

        Some(flow)
    }

    /// `cff::task!(function, options...)`
    fn compile_task(
        &mut self,
        call: &DslCall,
        file: &SourceFile,
        types: &mut TypeTable,
        diags: &mut Diagnostics,
    ) -> Option<Task> {
        if call.args.is_empty() {
            diags.add(call.pos.clone(), "cff::task expects a function");
            return None;
        }
        let func = compile_function(&call.args[0], file, types, diags)?;
        let mut task = Task {
            func,
            predicate: None,
            predicate_serial: None,
            instrument: None,
            fallback: None,
            invoke: false,
            serial: self.next_serial(),
            pos: call.pos.clone(),
        };

        for opt in &call.args[1..] {
            let nested = match file.scope.dsl_call(opt, &file.name) {
                Some(c) => c,
                None => {
                    diags.add(
                        file.pos(opt.span()),
                        format!("expected a cff call, got {}", describe(opt)),
                    );
                    continue;
                }
            };
            match nested.name.as_str() {
                "predicate" => {
                    if let Some(expr) = one_arg(&nested, diags) {
                        if let Some(pred) = compile_function(expr, file, types, diags) {
                            self.check_predicate(&pred, types, diags);
                            task.predicate = Some(pred);
                            task.predicate_serial = Some(self.next_serial());
                        }
                    }
                }
                "fallback_with" => {
                    if let Some(expr) = one_arg(&nested, diags) {
                        if let Some(fallback) = compile_function(expr, file, types, diags) {
                            check_fallback(&task, &fallback, types, diags);
                            task.fallback = Some(fallback);
                        }
                    }
                }
                "instrument" => {
                    if let Some(expr) = one_arg(&nested, diags) {
                        task.instrument = Some(Instrument {
                            name_expr: Some(ByteSpan::of(expr.span())),
                            inferred: task.func.name.clone(),
                        });
                    }
                }
                "invoke" => {
                    if let Some(expr) = one_arg(&nested, diags) {
                        match bool_literal(expr) {
                            Some(v) => task.invoke = v,
                            None => diags.add(
                                nested.pos.clone(),
                                "cff::invoke expects a boolean literal",
                            ),
                        }
                    }
                }
                other => diags.add(
                    nested.pos.clone(),
                    format!("expected a task option, got cff::{other}"),
                ),
            }
        }

        self.finish_task(&mut task, diags);
        Some(task)
    }

    /// A function listed in `cff::tasks!(...)`: a task with no options.
    fn compile_bare_task(
        &mut self,
        fn_expr: &syn::Expr,
        file: &SourceFile,
        types: &mut TypeTable,
        diags: &mut Diagnostics,
    ) -> Option<Task> {
        let func = compile_function(fn_expr, file, types, diags)?;
        let mut task = Task {
            pos: func.pos.clone(),
            func,
            predicate: None,
            predicate_serial: None,
            instrument: None,
            fallback: None,
            invoke: false,
            serial: self.next_serial(),
        };
        self.finish_task(&mut task, diags);
        Some(task)
    }

    fn finish_task(&self, task: &mut Task, diags: &mut Diagnostics) {
        if task.invoke && !task.func.outputs.is_empty() {
            diags.add(task.pos.clone(), "cff::invoke tasks must not return values");
        }
        if !task.invoke && task.func.outputs.is_empty() {
            diags.add(
                task.pos.clone(),
                "task returns no values: use cff::invoke!(true) to run it for side effects",
            );
        }
        if self.opts.instrument_all_tasks && task.instrument.is_none() {
            task.instrument = Some(Instrument {
                name_expr: None,
                inferred: task.func.name.clone(),
            });
        }
    }

    fn check_predicate(&self, pred: &CompiledFunc, types: &TypeTable, diags: &mut Diagnostics) {
        let returns_bool =
            pred.outputs.len() == 1 && types.canonical(pred.outputs[0]) == "bool";
        if !returns_bool || pred.has_error {
            diags.add(
                pred.pos.clone(),
                "predicate must return exactly one bool and no error",
            );
        }
    }

    fn compile_results(
        &mut self,
        call: &DslCall,
        site: &DslSite,
        flow: &mut Flow,
        file: &SourceFile,
        types: &mut TypeTable,
        diags: &mut Diagnostics,
    ) {
        if call.args.is_empty() {
            diags.add(call.pos.clone(), "cff::results expects at least one destination");
            return;
        }
        for arg in &call.args {
            let is_mut_ref = matches!(
                syntax::ast::unparen(arg),
                syn::Expr::Reference(r) if r.mutability.is_some()
            );
            if !is_mut_ref {
                diags.add(
                    file.pos(arg.span()),
                    format!(
                        "results destination must be a mutable reference like &mut out, got {}",
                        describe(arg)
                    ),
                );
                continue;
            }
            match file.scope.type_of_value(site.enclosing_fn.as_deref(), arg) {
                Some(ty) => {
                    let ty = ty.clone();
                    flow.results.push(Output {
                        ty: intern_type(&ty, &file.scope, types),
                        dest: ByteSpan::of(arg.span()),
                        pos: file.pos(arg.span()),
                    });
                }
                None => diags.add(
                    file.pos(arg.span()),
                    format!(
                        "cannot determine the type of results destination {}: annotate the binding",
                        describe(arg)
                    ),
                ),
            }
        }
    }

    fn compile_params(
        &mut self,
        call: &DslCall,
        site: &DslSite,
        flow: &mut Flow,
        file: &SourceFile,
        types: &mut TypeTable,
        diags: &mut Diagnostics,
    ) {
        for arg in &call.args {
            match file.scope.type_of_value(site.enclosing_fn.as_deref(), arg) {
                Some(ty) => {
                    let ty = ty.clone();
                    let id = intern_type(&ty, &file.scope, types);
                    if flow.params.iter().any(|p| p.ty == id) {
                        diags.add(
                            file.pos(arg.span()),
                            format!("duplicate flow parameter type {}", types.canonical(id)),
                        );
                        continue;
                    }
                    flow.params.push(Param {
                        ty: id,
                        expr: ByteSpan::of(arg.span()),
                        pos: file.pos(arg.span()),
                    });
                }
                None => diags.add(
                    file.pos(arg.span()),
                    format!(
                        "cannot determine the type of flow parameter {}: annotate the binding",
                        describe(arg)
                    ),
                ),
            }
        }
    }

    /// Instrumentation is useless without somewhere to send the events, so
    /// it requires at least one emitter.
    fn check_instrumented_emitters(
        &self,
        directive_instrumented: bool,
        directive_macro: &str,
        any_task_instrumented: bool,
        no_emitters: bool,
        pos: &syntax::PosInfo,
        diags: &mut Diagnostics,
    ) {
        if !no_emitters {
            return;
        }
        if directive_instrumented {
            diags.add(
                pos.clone(),
                format!("{directive_macro} requires an emitter: use cff::with_emitter"),
            );
        }
        if any_task_instrumented {
            diags.add(
                pos.clone(),
                "cff::instrument requires an emitter: use cff::with_emitter",
            );
        }
    }
}

// PARALLELS ////////////////
impl Compiler {
    fn compile_parallel(
        &mut self,
        site: &DslSite,
        file: &SourceFile,
        types: &mut TypeTable,
        diags: &mut Diagnostics,
    ) -> Option<Parallel> {
        let call = &site.call;
        if call.args.len() < 2 {
            diags.add(
                call.pos.clone(),
                "cff::parallel expects a context argument and at least one task",
            );
            return None;
        }

        let mut par = Parallel {
            name: site
                .enclosing_fn
                .clone()
                .unwrap_or_else(|| "parallel".to_owned()),
            ctx: ByteSpan::of(call.args[0].span()),
            emitters: Vec::new(),
            concurrency: None,
            continue_on_error: None,
            instrument: None,
            tasks: Vec::new(),
            slices: Vec::new(),
            pos: call.pos.clone(),
            span: call.span,
        };

        for arg in &call.args[1..] {
            let nested = match file.scope.dsl_call(arg, &file.name) {
                Some(c) => c,
                None => {
                    diags.add(
                        file.pos(arg.span()),
                        format!("expected a cff call, got {}", describe(arg)),
                    );
                    continue;
                }
            };
            match nested.name.as_str() {
                "task" => {
                    if let Some(task) = self.compile_parallel_task(&nested, file, types, diags) {
                        par.tasks.push(task);
                    }
                }
                "tasks" => {
                    for fn_expr in &nested.args {
                        if let Some(task) =
                            self.compile_parallel_task_fn(fn_expr, None, file, types, diags)
                        {
                            par.tasks.push(task);
                        }
                    }
                }
                "slice" => {
                    if let Some(slice) = self.compile_slice(&nested, site, file, types, diags) {
                        par.slices.push(slice);
                    }
                }
                "concurrency" => {
                    if let Some(expr) = one_arg(&nested, diags) {
                        par.concurrency = Some(ByteSpan::of(expr.span()));
                    }
                }
                "continue_on_error" => {
                    if let Some(expr) = one_arg(&nested, diags) {
                        par.continue_on_error = Some(ByteSpan::of(expr.span()));
                    }
                }
                "instrument_parallel" => {
                    if let Some(expr) = one_arg(&nested, diags) {
                        par.instrument = Some(Instrument {
                            name_expr: Some(ByteSpan::of(expr.span())),
                            inferred: par.name.clone(),
                        });
                    }
                }
                "with_emitter" => {
                    if let Some(expr) = one_arg(&nested, diags) {
                        par.emitters.push(ByteSpan::of(expr.span()));
                    }
                }
                other => diags.add(
                    nested.pos.clone(),
                    format!("expected a parallel option, got cff::{other}"),
                ),
            }
        }

        if par.tasks.is_empty() && par.slices.is_empty() {
            diags.add(call.pos.clone(), "cff::parallel has no tasks");
        }
        self.check_instrumented_emitters(
            par.instrument.is_some(),
            "cff::instrument_parallel",
            par.tasks.iter().any(|t| t.instrument.is_some()),
            par.emitters.is_empty(),
            &par.pos,
            diags,
        );

        Some(par)
    }

    /// `cff::task!(function, options...)` inside a parallel.
    fn compile_parallel_task(
        &mut self,
        call: &DslCall,
        file: &SourceFile,
        types: &mut TypeTable,
        diags: &mut Diagnostics,
    ) -> Option<ParallelTask> {
        if call.args.is_empty() {
            diags.add(call.pos.clone(), "cff::task expects a function");
            return None;
        }
        let mut instrument = None;
        for opt in &call.args[1..] {
            let nested = match file.scope.dsl_call(opt, &file.name) {
                Some(c) => c,
                None => {
                    diags.add(
                        file.pos(opt.span()),
                        format!("expected a cff call, got {}", describe(opt)),
                    );
                    continue;
                }
            };
            match nested.name.as_str() {
                "instrument" => {
                    if let Some(expr) = one_arg(&nested, diags) {
                        instrument = Some(ByteSpan::of(expr.span()));
                    }
                }
                other => diags.add(
                    nested.pos.clone(),
                    format!("expected a parallel task option, got cff::{other}"),
                ),
            }
        }
        self.compile_parallel_task_fn(&call.args[0], instrument, file, types, diags)
    }

    fn compile_parallel_task_fn(
        &mut self,
        fn_expr: &syn::Expr,
        instrument: Option<ByteSpan>,
        file: &SourceFile,
        types: &mut TypeTable,
        diags: &mut Diagnostics,
    ) -> Option<ParallelTask> {
        let func = compile_function(fn_expr, file, types, diags)?;
        if !func.inputs.is_empty() {
            diags.add(
                func.pos.clone(),
                "parallel task functions take no parameters other than a cff::Context",
            );
            return None;
        }
        if !func.outputs.is_empty() {
            diags.add(
                func.pos.clone(),
                "the only allowed return value of a parallel task is an error",
            );
            return None;
        }
        let mut task = ParallelTask {
            pos: func.pos.clone(),
            instrument: instrument.map(|span| Instrument {
                name_expr: Some(span),
                inferred: func.name.clone(),
            }),
            func,
            serial: self.next_serial(),
        };
        if self.opts.instrument_all_tasks && task.instrument.is_none() {
            task.instrument = Some(Instrument {
                name_expr: None,
                inferred: task.func.name.clone(),
            });
        }
        Some(task)
    }

    /// `cff::slice!(function, slice_expr)`
    fn compile_slice(
        &mut self,
        call: &DslCall,
        site: &DslSite,
        file: &SourceFile,
        types: &mut TypeTable,
        diags: &mut Diagnostics,
    ) -> Option<SliceTask> {
        if call.args.len() != 2 {
            diags.add(
                call.pos.clone(),
                "cff::slice expects a function and a slice expression",
            );
            return None;
        }
        let func = compile_function(&call.args[0], file, types, diags)?;
        if !func.outputs.is_empty() {
            diags.add(
                func.pos.clone(),
                "the only allowed return value of a slice function is an error",
            );
            return None;
        }
        if func.inputs.len() != 2 {
            diags.add(
                func.pos.clone(),
                "slice function expects two arguments: element index and element",
            );
            return None;
        }
        if types.canonical(func.inputs[0]) != "usize" {
            diags.add(
                func.pos.clone(),
                format!(
                    "the first argument of the slice function must be a usize, got {}",
                    types.canonical(func.inputs[0])
                ),
            );
            return None;
        }

        let slice_expr = &call.args[1];
        // check the element type when the slice expression's type is known;
        // otherwise the generated file's build reports the mismatch.
        if let Some(slice_ty) = file
            .scope
            .type_of_value(site.enclosing_fn.as_deref(), slice_expr)
        {
            match syntax::slice_elem_type(slice_ty) {
                Some(elem) => {
                    let elem_id = intern_type(&elem.clone(), &file.scope, types);
                    if elem_id != func.inputs[1] {
                        diags.add(
                            file.pos(slice_expr.span()),
                            format!(
                                "slice element of type {} cannot be passed to a function expecting {}",
                                types.canonical(elem_id),
                                types.canonical(func.inputs[1])
                            ),
                        );
                        return None;
                    }
                }
                None => {
                    diags.add(
                        file.pos(slice_expr.span()),
                        format!(
                            "the second argument to cff::slice must be sliceable, got {}",
                            syntax::render_type(slice_ty)
                        ),
                    );
                    return None;
                }
            }
        }

        Some(SliceTask {
            pos: func.pos.clone(),
            func,
            slice: ByteSpan::of(slice_expr.span()),
            serial: self.next_serial(),
        })
    }
}

/// The fallback's signature, minus an optional leading context, must
/// produce exactly the task's outputs and cannot itself fail.
fn check_fallback(
    task: &Task,
    fallback: &CompiledFunc,
    types: &TypeTable,
    diags: &mut Diagnostics,
) {
    if fallback.has_error || fallback.outputs != task.func.outputs || !fallback.inputs.is_empty()
    {
        let want: Vec<&str> = task
            .func
            .outputs
            .iter()
            .map(|t| types.canonical(*t))
            .collect();
        diags.add(
            fallback.pos.clone(),
            format!(
                "fallback_with must take no inputs and return exactly ({}) without an error",
                want.join(", ")
            ),
        );
    }
}

fn one_arg<'a>(call: &'a DslCall, diags: &mut Diagnostics) -> Option<&'a syn::Expr> {
    if call.args.len() != 1 {
        diags.add(
            call.pos.clone(),
            format!("cff::{} expects exactly one argument", call.name),
        );
        return None;
    }
    Some(&call.args[0])
}

fn bool_literal(expr: &syn::Expr) -> Option<bool> {
    match syntax::ast::unparen(expr) {
        syn::Expr::Lit(l) => match &l.lit {
            syn::Lit::Bool(b) => Some(b.value),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn compile(src: &str) -> (FileIr, Diagnostics) {
        let file = syntax::parse("demo.rs", src).expect("load");
        Compiler::new(CompilerOpts::default()).compile(file)
    }

    fn compile_instrument_all(src: &str) -> (FileIr, Diagnostics) {
        let file = syntax::parse("demo.rs", src).expect("load");
        Compiler::new(CompilerOpts {
            instrument_all_tasks: true,
        })
        .compile(file)
    }

    fn messages(diags: &Diagnostics) -> Vec<String> {
        diags.iter().map(|d| d.msg.clone()).collect()
    }

    const LINEAR: &str = r#"#![cfg(cff)]
use cff;
use std::io;

#[derive(Clone, Default)]
struct A(u32);
#[derive(Clone, Default)]
struct B(u32);

fn make() -> A {
    A(1)
}

fn grow(a: A) -> Result<B, io::Error> {
    Ok(B(a.0))
}

fn run(ctx: &cff::Context) -> cff::Result<()> {
    let mut out: B = B::default();
    cff::flow!(
        ctx,
        cff::task!(make),
        cff::task!(grow),
        cff::results!(&mut out),
    )
}
"#;

    #[test]
    fn test_linear_flow_compiles() {
        let (ir, diags) = compile(LINEAR);
        assert!(diags.is_empty(), "unexpected diagnostics: {:?}", messages(&diags));
        assert_eq!(1, ir.directives.len());

        let flow = match &ir.directives[0] {
            DirectiveIr::Flow(f) => f,
            other => panic!("expected flow, got {other:?}"),
        };
        assert_eq!("run", flow.name);
        assert_eq!(2, flow.tasks.len());
        assert_eq!(Serial::from(0usize), flow.tasks[0].serial);
        assert_eq!(Serial::from(1usize), flow.tasks[1].serial);

        let make = &flow.tasks[0];
        assert!(make.func.inputs.is_empty());
        assert_eq!(1, make.func.outputs.len());
        assert!(!make.func.has_error);

        let grow = &flow.tasks[1];
        assert_eq!(1, grow.func.inputs.len());
        assert!(grow.func.has_error);
        assert_eq!(make.func.outputs[0], grow.func.inputs[0]);

        assert_eq!(1, flow.results.len());
        assert_eq!(grow.func.outputs[0], flow.results[0].ty);
    }

    #[test]
    fn test_instrument_without_emitter() {
        let src = r#"
use cff;

#[derive(Clone, Default)]
struct A(u32);

fn make() -> A {
    A(1)
}

fn run(ctx: &cff::Context) -> cff::Result<()> {
    let mut out: A = A::default();
    cff::flow!(
        ctx,
        cff::task!(make, cff::instrument!("make")),
        cff::results!(&mut out),
    )
}
"#;
        let (_, diags) = compile(src);
        assert_eq!(
            vec!["cff::instrument requires an emitter: use cff::with_emitter"],
            messages(&diags)
        );
    }

    #[test]
    fn test_unknown_flow_option() {
        let src = r#"
use cff;

#[derive(Clone, Default)]
struct A(u32);

fn make() -> A {
    A(1)
}

fn run(ctx: &cff::Context) -> cff::Result<()> {
    let mut out: A = A::default();
    cff::flow!(
        ctx,
        cff::task!(make),
        cff::continue_on_error!(true),
        cff::results!(&mut out),
    )
}
"#;
        let (_, diags) = compile(src);
        assert_eq!(
            vec!["expected a flow option, got cff::continue_on_error"],
            messages(&diags)
        );
    }

    #[test]
    fn test_non_dsl_argument() {
        let src = r#"
use cff;

#[derive(Clone, Default)]
struct A(u32);

fn make() -> A {
    A(1)
}

fn run(ctx: &cff::Context) -> cff::Result<()> {
    let mut out: A = A::default();
    cff::flow!(ctx, make, cff::task!(make), cff::results!(&mut out))
}
"#;
        let (_, diags) = compile(src);
        assert_eq!(
            vec!["expected a cff call, got identifier make"],
            messages(&diags)
        );
    }

    #[test]
    fn test_unresolvable_function() {
        let src = r#"
use cff;

fn run(ctx: &cff::Context) -> cff::Result<()> {
    cff::flow!(ctx, cff::task!(elsewhere::make))
}
"#;
        let (_, diags) = compile(src);
        let msgs = messages(&diags);
        assert!(
            msgs[0].starts_with("cannot determine the signature of"),
            "got {msgs:?}"
        );
    }

    #[test]
    fn test_predicate_must_return_bool() {
        let src = r#"
use cff;

#[derive(Clone, Default)]
struct A(u32);

fn make() -> A {
    A(1)
}

fn not_a_predicate(a: A) -> u32 {
    a.0
}

fn run(ctx: &cff::Context) -> cff::Result<()> {
    let mut out: A = A::default();
    cff::flow!(
        ctx,
        cff::task!(make, cff::predicate!(not_a_predicate)),
        cff::results!(&mut out),
    )
}
"#;
        let (_, diags) = compile(src);
        assert_eq!(
            vec!["predicate must return exactly one bool and no error"],
            messages(&diags)
        );
    }

    #[test]
    fn test_fallback_must_match_outputs() {
        let src = r#"
use cff;
use std::io;

#[derive(Clone, Default)]
struct A(u32);
#[derive(Clone, Default)]
struct B(u32);

fn make() -> Result<A, io::Error> {
    Ok(A(1))
}

fn wrong_fallback() -> B {
    B(0)
}

fn run(ctx: &cff::Context) -> cff::Result<()> {
    let mut out: A = A::default();
    cff::flow!(
        ctx,
        cff::task!(make, cff::fallback_with!(wrong_fallback)),
        cff::results!(&mut out),
    )
}
"#;
        let (_, diags) = compile(src);
        let msgs = messages(&diags);
        assert_eq!(1, msgs.len());
        assert!(msgs[0].starts_with("fallback_with must take no inputs"), "got {msgs:?}");
    }

    #[test]
    fn test_invoke_rules() {
        let src = r#"
use cff;

#[derive(Clone, Default)]
struct A(u32);

fn effect() {}

fn make() -> A {
    A(1)
}

fn run(ctx: &cff::Context) -> cff::Result<()> {
    let mut out: A = A::default();
    cff::flow!(
        ctx,
        cff::task!(effect, cff::invoke!(true)),
        cff::task!(make),
        cff::results!(&mut out),
    )
}
"#;
        let (ir, diags) = compile(src);
        assert!(diags.is_empty(), "{:?}", messages(&diags));
        let flow = match &ir.directives[0] {
            DirectiveIr::Flow(f) => f,
            _ => unreachable!(),
        };
        assert!(flow.tasks[0].invoke);
        assert!(flow.tasks[0].func.outputs.is_empty());
    }

    #[test]
    fn test_task_without_outputs_needs_invoke() {
        let src = r#"
use cff;

#[derive(Clone, Default)]
struct A(u32);

fn effect() {}

fn make() -> A {
    A(1)
}

fn run(ctx: &cff::Context) -> cff::Result<()> {
    let mut out: A = A::default();
    cff::flow!(ctx, cff::task!(effect), cff::task!(make), cff::results!(&mut out))
}
"#;
        let (_, diags) = compile(src);
        assert_eq!(
            vec!["task returns no values: use cff::invoke!(true) to run it for side effects"],
            messages(&diags)
        );
    }

    #[test]
    fn test_instrument_all_tasks_infers_names() {
        let src = r#"
use cff;

#[derive(Clone, Default)]
struct A(u32);

struct Metrics;

fn make() -> A {
    A(1)
}

fn run(ctx: &cff::Context, metrics: Metrics) -> cff::Result<()> {
    let mut out: A = A::default();
    cff::flow!(
        ctx,
        cff::with_emitter!(metrics),
        cff::task!(make),
        cff::results!(&mut out),
    )
}
"#;
        let (ir, diags) = compile_instrument_all(src);
        assert!(diags.is_empty(), "{:?}", messages(&diags));
        let flow = match &ir.directives[0] {
            DirectiveIr::Flow(f) => f,
            _ => unreachable!(),
        };
        let instrument = flow.tasks[0].instrument.as_ref().expect("instrumented");
        assert!(instrument.name_expr.is_none());
        assert_eq!("make", instrument.inferred);
    }

    #[test]
    fn test_parallel_compiles() {
        let src = r#"
use cff;
use std::io;

fn ping() -> Result<(), io::Error> {
    Ok(())
}

fn pong() {}

fn visit(idx: usize, item: String) -> Result<(), io::Error> {
    let _ = (idx, item);
    Ok(())
}

fn run(ctx: &cff::Context) -> cff::Result<()> {
    let items: Vec<String> = Vec::new();
    cff::parallel!(
        ctx,
        cff::task!(ping),
        cff::task!(pong),
        cff::slice!(visit, items),
        cff::concurrency!(2),
        cff::continue_on_error!(true),
    )
}
"#;
        let (ir, diags) = compile(src);
        assert!(diags.is_empty(), "{:?}", messages(&diags));
        let par = match &ir.directives[0] {
            DirectiveIr::Parallel(p) => p,
            other => panic!("expected parallel, got {other:?}"),
        };
        assert_eq!(2, par.tasks.len());
        assert_eq!(1, par.slices.len());
        assert!(par.concurrency.is_some());
        assert!(par.continue_on_error.is_some());
    }

    #[test]
    fn test_parallel_task_with_inputs() {
        let src = r#"
use cff;

#[derive(Clone, Default)]
struct A(u32);

fn needs_input(a: A) {
    let _ = a;
}

fn run(ctx: &cff::Context) -> cff::Result<()> {
    cff::parallel!(ctx, cff::task!(needs_input))
}
"#;
        let (_, diags) = compile(src);
        let msgs = messages(&diags);
        // the bad task plus the now-empty parallel.
        assert!(msgs
            .contains(&"parallel task functions take no parameters other than a cff::Context".to_owned()));
        assert!(msgs.contains(&"cff::parallel has no tasks".to_owned()));
    }

    #[test]
    fn test_slice_first_arg_must_be_usize() {
        let src = r#"
use cff;
use std::io;

fn visit(idx: u8, item: String) -> Result<(), io::Error> {
    let _ = (idx, item);
    Ok(())
}

fn run(ctx: &cff::Context) -> cff::Result<()> {
    let items: Vec<String> = Vec::new();
    cff::parallel!(ctx, cff::slice!(visit, items))
}
"#;
        let (_, diags) = compile(src);
        let msgs = messages(&diags);
        assert!(
            msgs[0].starts_with("the first argument of the slice function must be a usize"),
            "got {msgs:?}"
        );
    }

    #[test]
    fn test_slice_element_mismatch() {
        let src = r#"
use cff;
use std::io;

fn visit(idx: usize, item: String) -> Result<(), io::Error> {
    let _ = (idx, item);
    Ok(())
}

fn run(ctx: &cff::Context) -> cff::Result<()> {
    let items: Vec<u32> = Vec::new();
    cff::parallel!(ctx, cff::slice!(visit, items))
}
"#;
        let (_, diags) = compile(src);
        let msgs = messages(&diags);
        assert!(
            msgs[0].contains("slice element of type u32 cannot be passed"),
            "got {msgs:?}"
        );
    }

    #[test]
    fn test_multiple_sites_keep_serials_unique() {
        let src = r#"
use cff;

#[derive(Clone, Default)]
struct A(u32);

fn make() -> A {
    A(1)
}

fn one(ctx: &cff::Context) -> cff::Result<()> {
    let mut out: A = A::default();
    cff::flow!(ctx, cff::task!(make), cff::results!(&mut out))
}

fn two(ctx: &cff::Context) -> cff::Result<()> {
    let mut out: A = A::default();
    cff::flow!(ctx, cff::task!(make), cff::results!(&mut out))
}
"#;
        let (ir, diags) = compile(src);
        assert!(diags.is_empty(), "{:?}", messages(&diags));
        let serials: Vec<Serial> = ir
            .directives
            .iter()
            .flat_map(|d| match d {
                DirectiveIr::Flow(f) => f.tasks.iter().map(|t| t.serial).collect::<Vec<_>>(),
                DirectiveIr::Parallel(_) => Vec::new(),
            })
            .collect();
        assert_eq!(vec![Serial::from(0usize), Serial::from(1usize)], serials);
    }

    #[test]
    fn test_closure_task() {
        let src = r#"
use cff;

#[derive(Clone, Default)]
struct A(u32);

fn run(ctx: &cff::Context) -> cff::Result<()> {
    let mut out: A = A::default();
    cff::flow!(
        ctx,
        cff::task!(|| -> A { A(5) }),
        cff::results!(&mut out),
    )
}
"#;
        let (ir, diags) = compile(src);
        assert!(diags.is_empty(), "{:?}", messages(&diags));
        let flow = match &ir.directives[0] {
            DirectiveIr::Flow(f) => f,
            _ => unreachable!(),
        };
        assert!(flow.tasks[0].func.name.starts_with("closure:"));
    }
}

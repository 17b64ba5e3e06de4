//! Base-mode expansion: each DSL call site becomes an immediately-invoked
//! closure that builds the emitter stack, declares one value cell per
//! produced type, enqueues one job per task and predicate, runs the
//! scheduler, and materializes the declared results.

use flow::{Flow, Instrument, Parallel, ParallelTask, SliceTask, Task, TypeId};
use traverse::{NodeKind, Schedule};
use util::HashSet;

use super::writer::CodeWriter;

pub fn flow_expansion(w: &mut CodeWriter<'_>, flow: &Flow, schedule: &Schedule) {
    let instant = w.import("std::time::Instant");

    w.open("(|| -> ::cff::Result<()> {");
    w.line("use ::cff::Emitter as _;");
    w.line("use ::cff::FlowEmitter as _;");
    w.line("use ::cff::TaskEmitter as _;");
    w.line(&format!(
        "let _cff_ctx: &::cff::Context = {};",
        w.expr(flow.ctx)
    ));
    emitter_construction(w, &flow.emitters);

    let name = instrument_name(w, &flow.instrument, &flow.name);
    w.open("let _cff_flow_info = ::cff::FlowInfo {");
    w.line(&format!("name: {name},"));
    w.line(&format!("file: {:?}.into(),", &*flow.pos.file));
    w.line(&format!("line: {},", flow.pos.line));
    w.line(&format!("column: {},", flow.pos.column));
    w.close("};");
    directive_infos(w, "_cff_flow_info", "Flow");
    w.line("let _cff_flow_emitter = _cff_emitter.flow_init(&_cff_flow_info);");
    w.line(&format!("let _cff_start = {instant}::now();"));

    // one cell per produced or parameter type, in first-use order.
    let taken: Vec<TypeId> = flow.results.iter().map(|r| r.ty).collect();
    let mut declared: HashSet<u32> = HashSet::default();
    for task in &flow.tasks {
        for &ty in &task.func.outputs {
            declare_cell(w, ty, &taken, &mut declared);
        }
    }
    for param in &flow.params {
        declare_cell(w, param.ty, &taken, &mut declared);
    }
    for task in &flow.tasks {
        if let Some(pred_serial) = task.predicate_serial {
            w.line(&format!(
                "let _cff_p{pred_serial}: ::cff::Cell<bool> = ::cff::Cell::new();"
            ));
        }
    }
    for task in &flow.tasks {
        w.line(&format!("let _cff_ran{} = ::cff::Flag::new();", task.serial));
    }
    for task in &flow.tasks {
        task_emitter(w, task.serial.into(), &task.instrument, &task.pos);
    }
    for param in &flow.params {
        w.line(&format!(
            "_cff_v{}.set(({}).clone());",
            w.type_hash(param.ty),
            w.expr(param.expr)
        ));
    }

    let concurrency = match flow.concurrency {
        Some(span) => w.expr(span).to_owned(),
        None => "::cff::DEFAULT_CONCURRENCY".to_owned(),
    };
    w.line(&format!(
        "let mut _cff_sched = ::cff::Scheduler::new({concurrency}, \
         _cff_emitter.scheduler_init(&_cff_sched_info));"
    ));

    for node in &schedule.nodes {
        match node.kind {
            NodeKind::Task { index } => {
                task_job(w, &flow.tasks[index], node, &instant);
            }
            NodeKind::Predicate { task_index } => {
                predicate_job(w, &flow.tasks[task_index], node);
            }
        }
    }

    w.line("let _cff_result = _cff_sched.run(_cff_ctx);");
    for task in &flow.tasks {
        let s = task.serial;
        w.line(&format!(
            "if !_cff_ran{s}.load() {{ _cff_te{s}.task_skipped(_cff_ctx, _cff_result.as_ref().err()); }}"
        ));
    }

    w.open("match _cff_result {");
    w.open("Err(_cff_err) => {");
    w.open("let _cff_flow_emitter = match _cff_err.task_name() {");
    w.line("Some(_cff_task) => _cff_flow_emitter.flow_failed_task(_cff_ctx, _cff_task, &_cff_err),");
    w.line("None => _cff_flow_emitter,");
    w.close("};");
    w.line("_cff_flow_emitter.flow_error(_cff_ctx, &_cff_err);");
    w.line("_cff_flow_emitter.flow_done(_cff_ctx, _cff_start.elapsed());");
    w.line("Err(_cff_err)");
    w.close("}");
    w.open("Ok(()) => {");
    for result in &flow.results {
        w.line(&format!(
            "*({}) = _cff_v{}.take();",
            w.expr(result.dest),
            w.type_hash(result.ty)
        ));
    }
    w.line("_cff_flow_emitter.flow_success(_cff_ctx);");
    w.line("_cff_flow_emitter.flow_done(_cff_ctx, _cff_start.elapsed());");
    w.line("Ok(())");
    w.close("}");
    w.close("}");
    w.close("})()");
}

pub fn parallel_expansion(w: &mut CodeWriter<'_>, par: &Parallel) {
    let instant = w.import("std::time::Instant");

    w.open("(|| -> ::cff::Result<()> {");
    w.line("use ::cff::Emitter as _;");
    w.line("use ::cff::ParallelEmitter as _;");
    w.line("use ::cff::TaskEmitter as _;");
    w.line(&format!(
        "let _cff_ctx: &::cff::Context = {};",
        w.expr(par.ctx)
    ));
    emitter_construction(w, &par.emitters);

    let name = instrument_name(w, &par.instrument, &par.name);
    w.open("let _cff_parallel_info = ::cff::ParallelInfo {");
    w.line(&format!("name: {name},"));
    w.line(&format!("file: {:?}.into(),", &*par.pos.file));
    w.line(&format!("line: {},", par.pos.line));
    w.line(&format!("column: {},", par.pos.column));
    w.close("};");
    directive_infos(w, "_cff_parallel_info", "Parallel");
    w.line("let _cff_parallel_emitter = _cff_emitter.parallel_init(&_cff_parallel_info);");
    w.line(&format!("let _cff_start = {instant}::now();"));

    for task in &par.tasks {
        w.line(&format!("let _cff_ran{} = ::cff::Flag::new();", task.serial));
    }
    for task in &par.tasks {
        task_emitter(w, task.serial.into(), &task.instrument, &task.pos);
    }
    for slice in &par.slices {
        task_emitter(
            w,
            slice.serial.into(),
            &Some(Instrument {
                name_expr: None,
                inferred: slice.func.name.clone(),
            }),
            &slice.pos,
        );
    }

    let concurrency = match par.concurrency {
        Some(span) => w.expr(span).to_owned(),
        None => "::cff::DEFAULT_CONCURRENCY".to_owned(),
    };
    let continue_on_error = match par.continue_on_error {
        Some(span) => w.expr(span).to_owned(),
        None => "false".to_owned(),
    };
    w.line(&format!(
        "let mut _cff_sched = ::cff::Scheduler::new({concurrency}, \
         _cff_emitter.scheduler_init(&_cff_sched_info)).continue_on_error({continue_on_error});"
    ));

    for task in &par.tasks {
        parallel_task_job(w, task, &instant);
    }
    for slice in &par.slices {
        slice_jobs(w, slice, &instant);
    }

    w.line("let _cff_result = _cff_sched.run(_cff_ctx);");
    for task in &par.tasks {
        let s = task.serial;
        w.line(&format!(
            "if !_cff_ran{s}.load() {{ _cff_te{s}.task_skipped(_cff_ctx, _cff_result.as_ref().err()); }}"
        ));
    }
    for slice in &par.slices {
        let s = slice.serial;
        w.open(&format!("for _cff_ran in &_cff_sran{s} {{"));
        w.line(&format!(
            "if !_cff_ran.load() {{ _cff_te{s}.task_skipped(_cff_ctx, _cff_result.as_ref().err()); }}"
        ));
        w.close("}");
    }

    w.open("match _cff_result {");
    w.open("Err(_cff_err) => {");
    w.line("_cff_parallel_emitter.parallel_error(_cff_ctx, &_cff_err);");
    w.line("_cff_parallel_emitter.parallel_done(_cff_ctx, _cff_start.elapsed());");
    w.line("Err(_cff_err)");
    w.close("}");
    w.open("Ok(()) => {");
    w.line("_cff_parallel_emitter.parallel_success(_cff_ctx);");
    w.line("_cff_parallel_emitter.parallel_done(_cff_ctx, _cff_start.elapsed());");
    w.line("Ok(())");
    w.close("}");
    w.close("}");
    w.close("})()");
}

/// `NopEmitter` when nothing is configured, otherwise a stack of the
/// user's emitters in declaration order.
fn emitter_construction(w: &mut CodeWriter<'_>, emitters: &[syntax::ByteSpan]) {
    if emitters.is_empty() {
        w.line("let _cff_emitter = ::cff::NopEmitter;");
        return;
    }
    w.open("let _cff_emitter = ::cff::EmitterStack::new(::std::vec![");
    for &span in emitters {
        w.line(&format!("::std::boxed::Box::new({}),", w.expr(span)));
    }
    w.close("]);");
}

/// DirectiveInfo and SchedulerInfo mirror the directive's own info record.
fn directive_infos(w: &mut CodeWriter<'_>, info_var: &str, directive: &str) {
    w.line(&format!(
        "let _cff_directive_info = ::cff::DirectiveInfo {{ name: {info_var}.name.clone(), \
         directive: ::cff::Directive::{directive}, file: {info_var}.file.clone(), \
         line: {info_var}.line, column: {info_var}.column }};"
    ));
    w.line(&format!(
        "let _cff_sched_info = ::cff::SchedulerInfo {{ name: {info_var}.name.clone(), \
         directive: ::cff::Directive::{directive}, file: {info_var}.file.clone(), \
         line: {info_var}.line, column: {info_var}.column }};"
    ));
}

fn instrument_name(w: &CodeWriter<'_>, instrument: &Option<Instrument>, default: &str) -> String {
    match instrument {
        Some(Instrument {
            name_expr: Some(span),
            ..
        }) => format!("({}).into()", w.expr(*span)),
        Some(Instrument {
            name_expr: None,
            inferred,
        }) => format!("{inferred:?}.into()"),
        None => format!("{default:?}.into()"),
    }
}

fn declare_cell(w: &mut CodeWriter<'_>, ty: TypeId, taken: &[TypeId], declared: &mut HashSet<u32>) {
    let hash = w.type_hash(ty);
    if !declared.insert(hash) {
        return;
    }
    let mutable = if taken.contains(&ty) { "mut " } else { "" };
    w.line(&format!(
        "let {mutable}_cff_v{hash}: ::cff::Cell<{}> = ::cff::Cell::new();",
        w.ty(ty)
    ));
}

fn task_emitter(
    w: &mut CodeWriter<'_>,
    serial: usize,
    instrument: &Option<Instrument>,
    pos: &syntax::PosInfo,
) {
    match instrument {
        Some(inst) => {
            let name = match inst.name_expr {
                Some(span) => format!("({}).into()", w.expr(span)),
                None => format!("{:?}.into()", inst.inferred),
            };
            w.line(&format!(
                "let _cff_te{serial} = _cff_emitter.task_init(&::cff::TaskInfo {{ \
                 name: {name}, file: {:?}.into(), line: {}, column: {} }}, \
                 &_cff_directive_info);",
                &*pos.file, pos.line, pos.column
            ));
        }
        None => w.line(&format!(
            "let _cff_te{serial} = ::cff::nop_task_emitter();"
        )),
    }
}

/// The argument list for calling a user function: the context first when
/// asked for, then one cloned cell read per input.
fn call_args(w: &CodeWriter<'_>, want_ctx: bool, inputs: &[TypeId]) -> String {
    let mut args = Vec::with_capacity(inputs.len() + 1);
    if want_ctx {
        args.push("_cff_ctx".to_owned());
    }
    for &ty in inputs {
        args.push(format!("_cff_v{}.get_cloned()", w.type_hash(ty)));
    }
    args.join(", ")
}

fn emit_output_sets(w: &mut CodeWriter<'_>, outputs: &[TypeId], value: &str) {
    match outputs.len() {
        0 => {}
        1 => w.line(&format!(
            "_cff_v{}.set({value});",
            w.type_hash(outputs[0])
        )),
        n => {
            let names: Vec<String> = (0..n).map(|i| format!("_cff_o{i}")).collect();
            w.line(&format!("let ({}) = {value};", names.join(", ")));
            for (i, &ty) in outputs.iter().enumerate() {
                w.line(&format!(
                    "_cff_v{}.set(_cff_o{i});",
                    w.type_hash(ty)
                ));
            }
        }
    }
}

fn task_job(w: &mut CodeWriter<'_>, task: &Task, node: &traverse::Node, instant: &str) {
    let s = task.serial;
    w.line(&format!("// {}", task.pos));
    w.open(&format!(
        "let _cff_j{s} = _cff_sched.enqueue(::cff::Job::new(|_cff_ctx| {{"
    ));
    for gate in &node.gates {
        w.line(&format!(
            "if !_cff_p{gate}.get_cloned() {{ return Ok(()); }}"
        ));
    }
    w.line(&format!("let _cff_started = {instant}::now();"));
    w.line(&format!("_cff_ran{s}.store(true);"));
    w.open("let _cff_res = ::std::panic::catch_unwind(::std::panic::AssertUnwindSafe(|| {");
    w.line(&format!(
        "({})({})",
        w.expr(task.func.span),
        call_args(w, task.func.want_ctx, &task.func.inputs)
    ));
    w.close("}));");

    let fallback_call = task.fallback.as_ref().map(|fb| {
        format!(
            "({})({})",
            w.expr(fb.span),
            if fb.want_ctx { "_cff_ctx" } else { "" }
        )
    });

    w.open("let _cff_out = match _cff_res {");
    if task.func.has_error {
        w.open("Ok(Ok(_cff_val)) => {");
        emit_output_sets(w, &task.func.outputs, "_cff_val");
        w.line(&format!("_cff_te{s}.task_success(_cff_ctx);"));
        w.line("Ok(())");
        w.close("}");
        w.open("Ok(Err(_cff_user_err)) => {");
        w.line(&format!(
            "let _cff_err = ::cff::Error::task({:?}, _cff_user_err);",
            task.func.name
        ));
        match &fallback_call {
            Some(fb) => {
                w.line(&format!(
                    "_cff_te{s}.task_error_recovered(_cff_ctx, &_cff_err);"
                ));
                emit_output_sets(w, &task.func.outputs, fb);
                w.line("Ok(())");
            }
            None => {
                w.line(&format!("_cff_te{s}.task_error(_cff_ctx, &_cff_err);"));
                w.line("Err(_cff_err)");
            }
        }
        w.close("}");
    } else {
        w.open("Ok(_cff_val) => {");
        emit_output_sets(w, &task.func.outputs, "_cff_val");
        w.line(&format!("_cff_te{s}.task_success(_cff_ctx);"));
        w.line("Ok(())");
        w.close("}");
    }
    w.open("Err(_cff_payload) => {");
    w.line(&format!(
        "let _cff_err = ::cff::Error::task_panic({:?}, _cff_payload);",
        task.func.name
    ));
    match &fallback_call {
        Some(fb) => {
            w.line(&format!(
                "_cff_te{s}.task_panic_recovered(_cff_ctx, &_cff_err);"
            ));
            emit_output_sets(w, &task.func.outputs, fb);
            w.line("Ok(())");
        }
        None => {
            w.line(&format!("_cff_te{s}.task_panic(_cff_ctx, &_cff_err);"));
            w.line("Err(_cff_err)");
        }
    }
    w.close("}");
    w.close("};");

    w.line(&format!(
        "_cff_te{s}.task_done(_cff_ctx, _cff_started.elapsed());"
    ));
    w.line("_cff_out");
    w.close(&format!("}}){});", after_deps(&node.deps)));
}

fn predicate_job(w: &mut CodeWriter<'_>, task: &Task, node: &traverse::Node) {
    let pred = task.predicate.as_ref().expect("predicate node without predicate");
    let s = node.serial;
    w.line(&format!("// {}", pred.pos));
    w.open(&format!(
        "let _cff_j{s} = _cff_sched.enqueue(::cff::Job::new(|_cff_ctx| {{"
    ));
    w.line(&format!(
        "_cff_p{s}.set(({})({}));",
        w.expr(pred.span),
        call_args(w, pred.want_ctx, &pred.inputs)
    ));
    w.line("Ok(())");
    w.close(&format!("}}){});", after_deps(&node.deps)));
}

fn parallel_task_job(w: &mut CodeWriter<'_>, task: &ParallelTask, instant: &str) {
    let s = task.serial;
    w.line(&format!("// {}", task.pos));
    w.open("_cff_sched.enqueue(::cff::Job::new(|_cff_ctx| {");
    w.line(&format!("let _cff_started = {instant}::now();"));
    w.line(&format!("_cff_ran{s}.store(true);"));
    w.open("let _cff_res = ::std::panic::catch_unwind(::std::panic::AssertUnwindSafe(|| {");
    w.line(&format!(
        "({})({})",
        w.expr(task.func.span),
        if task.func.want_ctx { "_cff_ctx" } else { "" }
    ));
    w.close("}));");
    w.open("let _cff_out = match _cff_res {");
    if task.func.has_error {
        w.line(&format!(
            "Ok(Ok(())) => {{ _cff_te{s}.task_success(_cff_ctx); Ok(()) }}"
        ));
        w.open("Ok(Err(_cff_user_err)) => {");
        w.line(&format!(
            "let _cff_err = ::cff::Error::task({:?}, _cff_user_err);",
            task.func.name
        ));
        w.line(&format!("_cff_te{s}.task_error(_cff_ctx, &_cff_err);"));
        w.line("Err(_cff_err)");
        w.close("}");
    } else {
        w.line(&format!(
            "Ok(_cff_val) => {{ _cff_te{s}.task_success(_cff_ctx); Ok(()) }}"
        ));
    }
    w.open("Err(_cff_payload) => {");
    w.line(&format!(
        "let _cff_err = ::cff::Error::task_panic({:?}, _cff_payload);",
        task.func.name
    ));
    w.line(&format!("_cff_te{s}.task_panic(_cff_ctx, &_cff_err);"));
    w.line("Err(_cff_err)");
    w.close("}");
    w.close("};");
    w.line(&format!(
        "_cff_te{s}.task_done(_cff_ctx, _cff_started.elapsed());"
    ));
    w.line("_cff_out");
    w.close("}));");
}

fn slice_jobs(w: &mut CodeWriter<'_>, slice: &SliceTask, instant: &str) {
    let s = slice.serial;
    let elem_ty = slice.func.inputs[1];
    w.line(&format!("// {}", slice.pos));
    w.line(&format!(
        "let _cff_slice{s} = &({});",
        w.expr(slice.slice)
    ));
    w.line(&format!(
        "let _cff_sran{s}: ::std::vec::Vec<::cff::Flag> = \
         _cff_slice{s}.iter().map(|_| ::cff::Flag::new()).collect();"
    ));
    w.open(&format!(
        "for (_cff_idx, _cff_elem) in _cff_slice{s}.iter().enumerate() {{"
    ));
    w.line(&format!(
        "let _cff_elem: {} = ::std::clone::Clone::clone(_cff_elem);",
        w.ty(elem_ty)
    ));
    w.line(&format!("let _cff_ran = &_cff_sran{s}[_cff_idx];"));
    w.line(&format!("let _cff_te = &_cff_te{s};"));
    w.open("_cff_sched.enqueue(::cff::Job::new(move |_cff_ctx| {");
    w.line(&format!("let _cff_started = {instant}::now();"));
    w.line("_cff_ran.store(true);");
    w.open("let _cff_res = ::std::panic::catch_unwind(::std::panic::AssertUnwindSafe(|| {");
    let ctx_arg = if slice.func.want_ctx { "_cff_ctx, " } else { "" };
    w.line(&format!(
        "({})({ctx_arg}_cff_idx, _cff_elem)",
        w.expr(slice.func.span)
    ));
    w.close("}));");
    w.open("let _cff_out = match _cff_res {");
    if slice.func.has_error {
        w.line("Ok(Ok(())) => { _cff_te.task_success(_cff_ctx); Ok(()) }");
        w.open("Ok(Err(_cff_user_err)) => {");
        w.line(&format!(
            "let _cff_err = ::cff::Error::task(&::std::format!(\"{{}}[{{}}]\", {:?}, _cff_idx), _cff_user_err);",
            slice.func.name
        ));
        w.line("_cff_te.task_error(_cff_ctx, &_cff_err);");
        w.line("Err(_cff_err)");
        w.close("}");
    } else {
        w.line("Ok(_cff_val) => { _cff_te.task_success(_cff_ctx); Ok(()) }");
    }
    w.open("Err(_cff_payload) => {");
    w.line(&format!(
        "let _cff_err = ::cff::Error::task_panic(&::std::format!(\"{{}}[{{}}]\", {:?}, _cff_idx), _cff_payload);",
        slice.func.name
    ));
    w.line("_cff_te.task_panic(_cff_ctx, &_cff_err);");
    w.line("Err(_cff_err)");
    w.close("}");
    w.close("};");
    w.line("_cff_te.task_done(_cff_ctx, _cff_started.elapsed());");
    w.line("_cff_out");
    w.close("}));");
    w.close("}");
}

fn after_deps(deps: &[flow::Serial]) -> String {
    if deps.is_empty() {
        return String::new();
    }
    let handles: Vec<String> = deps.iter().map(|d| format!("_cff_j{d}")).collect();
    format!(".after(&[{}])", handles.join(", "))
}

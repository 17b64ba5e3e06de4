use std::path::{Path, PathBuf};

use anyhow::Result;
use cff_gen::{App, Args, GenMode};
use tempfile::{tempdir, TempDir};

fn base_args(package: String) -> Args {
    Args {
        files: Vec::new(),
        instrument_all_tasks: false,
        genmode: GenMode::Base,
        quiet: true,
        verbose: 0,
        package,
    }
}

fn write_package(files: &[(&str, &str)]) -> Result<TempDir> {
    let dir = tempdir()?;
    for (name, content) in files {
        std::fs::write(dir.path().join(name), content)?;
    }
    Ok(dir)
}

fn run_app(args: Args) -> Result<()> {
    let settings: cff_gen::Settings = args.try_into()?;
    App::new(settings).run()
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_else(|e| panic!("reading {path:?}: {e}"))
}

const LINEAR: &str = r#"#![cfg(cff)]
use cff;

#[derive(Clone, Default)]
pub struct Req(pub u32);
#[derive(Clone, Default)]
pub struct Res(pub u32);

fn build() -> Req {
    Req(1)
}

fn send(req: Req) -> Result<Res, std::io::Error> {
    Ok(Res(req.0))
}

pub fn handle(ctx: &cff::Context) -> cff::Result<()> {
    let mut res: Res = Res::default();
    cff::flow!(
        ctx,
        cff::task!(build),
        cff::task!(send),
        cff::results!(&mut res),
    )
}
"#;

/// A two-task linear flow generates scheduler code with the
/// dependency edge, the results assignment, and the flow lifecycle events.
#[test]
fn test_linear_flow_generation() -> Result<()> {
    let pkg = write_package(&[("demo.rs", LINEAR)])?;
    run_app(base_args(pkg.path().to_string_lossy().into_owned()))?;

    let output = pkg.path().join("demo_gen.rs");
    let generated = read(&output);

    // the build tag inverted, the DSL import gone, the rest intact.
    assert!(generated.starts_with("#![cfg(not(cff))]"));
    assert!(!generated.contains("use cff;"));
    assert!(generated.contains("fn build() -> Req"));
    assert!(generated.contains("use std::time::Instant;"));

    // scheduler construction and the producer -> consumer edge.
    assert!(generated.contains("::cff::Scheduler::new(::cff::DEFAULT_CONCURRENCY"));
    assert!(generated.contains("let _cff_j0 = _cff_sched.enqueue"));
    assert!(generated.contains(".after(&[_cff_j0]));"));

    // results materialize into the caller's variable on success.
    assert!(generated.contains("*(&mut res) = _cff_v"));
    assert!(generated.contains("flow_success"));
    assert!(generated.contains("flow_done"));

    // no DSL macros survive in base mode.
    assert!(!generated.contains("cff::flow!"));
    assert!(!generated.contains("cff::task!"));
    Ok(())
}

/// Regenerating with unchanged sources is byte-identical, and the
/// generated file itself (no DSL sites) never produces another file.
#[test]
fn test_regeneration_is_idempotent() -> Result<()> {
    let pkg = write_package(&[("demo.rs", LINEAR)])?;
    let package = pkg.path().to_string_lossy().into_owned();

    run_app(base_args(package.clone()))?;
    let output = pkg.path().join("demo_gen.rs");
    let first = read(&output);

    run_app(base_args(package))?;
    let second = read(&output);

    assert_eq!(first, second);
    assert!(!pkg.path().join("demo_gen_gen.rs").exists());
    Ok(())
}

/// A file with zero DSL call sites is never rewritten.
#[test]
fn test_no_dsl_no_output() -> Result<()> {
    let src = r#"
pub fn plain() -> u32 {
    7
}
"#;
    let pkg = write_package(&[("plain.rs", src)])?;
    run_app(base_args(pkg.path().to_string_lossy().into_owned()))?;
    assert!(!pkg.path().join("plain_gen.rs").exists());
    Ok(())
}

/// Instrumentation without an emitter is a diagnostic and the
/// output file is not written.
#[test]
fn test_instrument_without_emitter() -> Result<()> {
    let src = r#"#![cfg(cff)]
use cff;

#[derive(Clone, Default)]
pub struct Res(pub u32);

fn build() -> Res {
    Res(1)
}

pub fn handle(ctx: &cff::Context) -> cff::Result<()> {
    let mut res: Res = Res::default();
    cff::flow!(
        ctx,
        cff::task!(build, cff::instrument!("build")),
        cff::results!(&mut res),
    )
}
"#;
    let pkg = write_package(&[("demo.rs", src)])?;
    let err = run_app(base_args(pkg.path().to_string_lossy().into_owned())).unwrap_err();
    assert!(err.to_string().contains("1 of 1 files failed"), "{err}");
    assert!(!pkg.path().join("demo_gen.rs").exists());
    Ok(())
}

/// A predicate becomes its own job; the gated task waits for it
/// and checks it before running.
#[test]
fn test_predicate_generation() -> Result<()> {
    let src = r#"#![cfg(cff)]
use cff;

#[derive(Clone, Default)]
pub struct Req(pub u32);
#[derive(Clone, Default)]
pub struct Res(pub u32);

fn build() -> Req {
    Req(1)
}

fn wanted(req: Req) -> bool {
    req.0 > 0
}

fn send(req: Req) -> Result<Res, std::io::Error> {
    Ok(Res(req.0))
}

pub fn handle(ctx: &cff::Context) -> cff::Result<()> {
    let mut res: Res = Res::default();
    cff::flow!(
        ctx,
        cff::task!(build),
        cff::task!(send, cff::predicate!(wanted)),
        cff::results!(&mut res),
    )
}
"#;
    let pkg = write_package(&[("demo.rs", src)])?;
    run_app(base_args(pkg.path().to_string_lossy().into_owned()))?;
    let generated = read(&pkg.path().join("demo_gen.rs"));

    // serials: build=0, send=1, predicate=2.
    assert!(generated.contains("let _cff_p2: ::cff::Cell<bool>"));
    assert!(generated.contains("_cff_p2.set((wanted)("));
    assert!(generated.contains("if !_cff_p2.get_cloned() { return Ok(()); }"));
    assert!(generated.contains(".after(&[_cff_j0, _cff_j2]));"));
    Ok(())
}

/// A task with a fallback recovers instead of failing the flow.
#[test]
fn test_fallback_generation() -> Result<()> {
    let src = r#"#![cfg(cff)]
use cff;

#[derive(Clone, Default)]
pub struct Res(pub u32);

fn fetch() -> Result<Res, std::io::Error> {
    Err(std::io::Error::new(std::io::ErrorKind::Other, "nope"))
}

fn fetch_fallback() -> Res {
    Res(42)
}

pub fn handle(ctx: &cff::Context) -> cff::Result<()> {
    let mut res: Res = Res::default();
    cff::flow!(
        ctx,
        cff::task!(fetch, cff::fallback_with!(fetch_fallback)),
        cff::results!(&mut res),
    )
}
"#;
    let pkg = write_package(&[("demo.rs", src)])?;
    run_app(base_args(pkg.path().to_string_lossy().into_owned()))?;
    let generated = read(&pkg.path().join("demo_gen.rs"));

    assert!(generated.contains("task_error_recovered"));
    assert!(generated.contains("task_panic_recovered"));
    assert!(generated.contains("(fetch_fallback)()"));
    // an unrecovered error path must not exist for this task.
    assert!(!generated.contains(".task_error(_cff_ctx"));
    Ok(())
}

/// A parallel with a slice enqueues one job per element and
/// reports skipped elements after an error.
#[test]
fn test_parallel_slice_generation() -> Result<()> {
    let src = r#"#![cfg(cff)]
use cff;

fn visit(idx: usize, item: String) -> Result<(), std::io::Error> {
    let _ = (idx, item);
    Ok(())
}

pub fn fanout(ctx: &cff::Context) -> cff::Result<()> {
    let items: Vec<String> = Vec::new();
    cff::parallel!(
        ctx,
        cff::slice!(visit, items),
        cff::concurrency!(2),
    )
}
"#;
    let pkg = write_package(&[("demo.rs", src)])?;
    run_app(base_args(pkg.path().to_string_lossy().into_owned()))?;
    let generated = read(&pkg.path().join("demo_gen.rs"));

    assert!(generated.contains("::cff::Scheduler::new(2"));
    assert!(generated.contains(".continue_on_error(false)"));
    assert!(generated.contains("let _cff_slice0 = &(items);"));
    assert!(generated.contains("for (_cff_idx, _cff_elem) in _cff_slice0.iter().enumerate()"));
    assert!(generated.contains("\"visit\", _cff_idx"));
    assert!(generated.contains("task_skipped"));
    assert!(generated.contains("parallel_error"));
    Ok(())
}

/// --file restricts processing and can redirect output.
#[test]
fn test_file_filter_with_output_override() -> Result<()> {
    let other = r#"#![cfg(cff)]
use cff;

#[derive(Clone, Default)]
pub struct Res(pub u32);

fn build() -> Res {
    Res(1)
}

pub fn other(ctx: &cff::Context) -> cff::Result<()> {
    let mut res: Res = Res::default();
    cff::flow!(ctx, cff::task!(build), cff::results!(&mut res))
}
"#;
    let pkg = write_package(&[("demo.rs", LINEAR), ("other.rs", other)])?;
    let custom = pkg.path().join("custom_gen.rs");

    let mut args = base_args(pkg.path().to_string_lossy().into_owned());
    args.files = vec![format!("demo.rs={}", custom.display())];
    run_app(args)?;

    assert!(custom.exists());
    assert!(!pkg.path().join("demo_gen.rs").exists());
    assert!(!pkg.path().join("other_gen.rs").exists());
    Ok(())
}

/// Modifier mode keeps the DSL call shape and inlines function references
/// into annotated closures.
#[test]
fn test_modifier_mode() -> Result<()> {
    let pkg = write_package(&[("demo.rs", LINEAR)])?;
    let mut args = base_args(pkg.path().to_string_lossy().into_owned());
    args.genmode = GenMode::Modifier;
    run_app(args)?;

    let generated = read(&pkg.path().join("demo_gen.rs"));
    // still DSL-shaped, imports and build tag untouched.
    assert!(generated.starts_with("#![cfg(cff)]"));
    assert!(generated.contains("use cff;"));
    assert!(generated.contains("cff::flow!"));
    assert!(generated.contains("cff::results!(&mut res)"));
    // the path references became inlined closures.
    assert!(generated.contains("cff::task!(|| -> Req { build() })"));
    assert!(generated
        .contains("cff::task!(|_cff_a0: Req| -> Result<Res, std::io::Error> { send(_cff_a0) })"));
    Ok(())
}

/// Source-map mode is base mode plus markers pointing at the call sites.
#[test]
fn test_source_map_mode() -> Result<()> {
    let pkg = write_package(&[("demo.rs", LINEAR)])?;
    let mut args = base_args(pkg.path().to_string_lossy().into_owned());
    args.genmode = GenMode::SourceMap;
    run_app(args)?;

    let generated = read(&pkg.path().join("demo_gen.rs"));
    assert!(generated.contains("// cff:source"));
    assert!(generated.contains("::cff::Scheduler::new"));
    Ok(())
}

/// A file that fails to parse reports a load error naming the file.
#[test]
fn test_load_error() -> Result<()> {
    let pkg = write_package(&[("broken.rs", "fn broken( {")])?;
    let err = run_app(base_args(pkg.path().to_string_lossy().into_owned())).unwrap_err();
    assert!(err.to_string().contains("1 of 1 files failed"), "{err}");
    Ok(())
}

/// Duplicate --file names are rejected up front.
#[test]
fn test_duplicate_file_flag() -> Result<()> {
    let pkg = write_package(&[("demo.rs", LINEAR)])?;
    let mut args = base_args(pkg.path().to_string_lossy().into_owned());
    args.files = vec!["demo.rs".to_owned(), "demo.rs=elsewhere.rs".to_owned()];
    let err = run_app(args).unwrap_err();
    assert!(err.to_string().contains("already specified"), "{err}");
    Ok(())
}

/// Output path defaults: foo.rs -> foo_gen.rs next to the source.
#[test]
fn test_default_output_path() -> Result<()> {
    let pkg = write_package(&[("demo.rs", LINEAR)])?;
    let args = base_args(pkg.path().to_string_lossy().into_owned());
    let settings: cff_gen::Settings = args.try_into()?;
    assert_eq!(
        pkg.path().join("demo_gen.rs"),
        settings.output_path(&PathBuf::from(pkg.path().join("demo.rs")))
    );
    Ok(())
}

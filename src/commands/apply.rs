//! Apply command - run cloud-config files against this machine

use anyhow::{Context, Result, bail};
use colored::Colorize;
use provision::backend::Backend;
use provision::{Configurer, LocalBackend, Operation, RecordingBackend, ostype};
use std::path::PathBuf;

use crate::Context as AppContext;
use crate::cli::ApplyArgs;
use crate::ui;

const STDIN: &str = "-";

/// Where the configs come from.
#[derive(Debug, PartialEq, Eq)]
enum Source<'a> {
    Stdin,
    Files(&'a [PathBuf]),
}

fn source(files: &[PathBuf]) -> Result<Source<'_>> {
    let stdin_count = files.iter().filter(|f| f.as_os_str() == STDIN).count();
    match (stdin_count, files.len()) {
        (0, _) => Ok(Source::Files(files)),
        (1, 1) => Ok(Source::Stdin),
        _ => bail!("{STDIN} must be the only file when reading standard input"),
    }
}

pub fn run(ctx: &AppContext, args: &ApplyArgs) -> Result<()> {
    // Resolve everything that can fail before touching the system
    let os = ostype::from_name(&args.os)?;
    let source = source(&args.files)?;

    if args.dry_run {
        let mut configurer = Configurer::new(RecordingBackend::new()).with_os(os);
        let result = apply(&mut configurer, &source, args.merge);
        print_operations(ctx, &configurer.backend().operations());
        return result;
    }

    let mut configurer = Configurer::new(LocalBackend::new()).with_os(os);
    apply(&mut configurer, &source, args.merge)?;
    if !ctx.quiet {
        ui::success("Configuration applied");
    }
    Ok(())
}

fn apply<B: Backend>(
    configurer: &mut Configurer<B>,
    source: &Source<'_>,
    merge: bool,
) -> Result<()> {
    match source {
        Source::Stdin => configurer
            .apply_stdin()
            .context("failed to apply standard input")?,
        Source::Files(files) if merge => configurer.apply_merged(*files)?,
        Source::Files(files) => configurer.apply_config_files(*files)?,
    }
    Ok(())
}

fn print_operations(ctx: &AppContext, operations: &[Operation]) {
    ui::header("Dry run");
    if operations.is_empty() {
        ui::info("Nothing to do");
        return;
    }
    for (i, op) in operations.iter().enumerate() {
        ui::step(i + 1, operations.len(), &op.to_string());
        if ctx.verbose > 0
            && let Operation::Write { data, .. } | Operation::Append { data, .. } = op
        {
            for line in String::from_utf8_lossy(data).lines() {
                ui::dim(line);
            }
        }
    }
    println!();
    println!("{}", "Dry run - no changes made".yellow());
}

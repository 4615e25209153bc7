//! Read-only commands: print, parse and packages

use anyhow::Result;
use colored::Colorize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub fn print(file: &Path) -> Result<()> {
    let config = provision::read_config_file(file)?;
    print!("{}", provision::to_yaml(&config)?);
    Ok(())
}

pub fn parse(files: &[PathBuf]) -> Result<()> {
    check_files(&mut io::stdout().lock(), files)
}

pub fn packages(files: &[PathBuf]) -> Result<()> {
    list_packages(&mut io::stdout().lock(), files)
}

/// Report `OK` or `ERROR` per file, stopping at the first error.
fn check_files<W: Write>(out: &mut W, files: &[PathBuf]) -> Result<()> {
    for file in files {
        match provision::read_config_file(file) {
            Ok(_) => writeln!(out, "{} {}", file.display(), "OK".green())?,
            Err(e) => {
                writeln!(out, "{} {}", file.display(), "ERROR".red())?;
                return Err(e.into());
            }
        }
    }
    Ok(())
}

/// Print the package names of each file, one per line.
fn list_packages<W: Write>(out: &mut W, files: &[PathBuf]) -> Result<()> {
    for file in files {
        let config = provision::read_config_file(file)?;
        for package in &config.packages {
            writeln!(out, "{package}")?;
        }
    }
    Ok(())
}

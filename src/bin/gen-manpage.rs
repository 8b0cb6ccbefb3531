//! Man page generator for regbus
//!
//! Writes `regbus.1` plus one `regbus-<command>.1` page per subcommand.
//!
//! Usage: cargo run --bin gen-manpage -- [output-dir]

use clap::CommandFactory;
use std::fs;
use std::path::{Path, PathBuf};

#[path = "../cli.rs"]
#[allow(dead_code)]
mod cli;

fn render(man: clap_mangen::Man, path: &Path) -> std::io::Result<()> {
    let mut buffer = Vec::new();
    man.render(&mut buffer)?;
    fs::write(path, buffer)?;
    println!("Generated {}", path.display());
    Ok(())
}

fn main() -> std::io::Result<()> {
    let output_dir = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("man"));

    fs::create_dir_all(&output_dir)?;

    let cmd = cli::Cli::command();
    for sub in cmd.get_subcommands() {
        let page = format!("regbus-{}", sub.get_name());
        let man = clap_mangen::Man::new(sub.clone()).title(page.to_uppercase());
        render(man, &output_dir.join(format!("{}.1", page)))?;
    }

    let main_page = output_dir.join("regbus.1");
    render(clap_mangen::Man::new(cmd), &main_page)?;

    println!("\nTo view the man page:");
    println!("  man -l {}", main_page.display());

    Ok(())
}

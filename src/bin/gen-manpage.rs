//! Man page generator for u2fzero
//!
//! Usage: cargo run --bin gen-manpage -- [output-dir]

use clap::CommandFactory;
use std::fs;
use std::path::PathBuf;

#[path = "../cli.rs"]
mod cli;

fn main() -> std::io::Result<()> {
    // Default to ./man directory
    let output_dir = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("man"));

    fs::create_dir_all(&output_dir)?;

    let cmd = cli::Cli::command();
    let mut pages = vec![("u2fzero.1".to_string(), clap_mangen::Man::new(cmd.clone()))];
    for sub in cmd.get_subcommands() {
        let file = format!("u2fzero-{}.1", sub.get_name());
        pages.push((file, clap_mangen::Man::new(sub.clone())));
    }

    for (file, man) in pages {
        let mut buffer = Vec::new();
        man.render(&mut buffer)?;
        let output_path = output_dir.join(file);
        fs::write(&output_path, buffer)?;
        println!("Man page generated at: {}", output_path.display());
    }

    println!("\nTo view the man page:");
    println!("  man -l {}", output_dir.join("u2fzero.1").display());

    Ok(())
}

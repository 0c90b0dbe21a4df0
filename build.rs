//! Build script for the jukebox.
//!
//! Copies the `.env.example` configuration template from the crate root into
//! the jukebox's local data directory, next to the `.env` file that
//! `config::load_env` reads at startup:
//! - Linux: `~/.local/share/jukebox/.env.example`
//! - macOS: `~/Library/Application Support/jukebox/.env.example`
//! - Windows: `%LOCALAPPDATA%/jukebox/.env.example`
//!
//! A missing template only produces a cargo warning.

use std::{env, fs, path::PathBuf};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=.env.example");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let template = manifest_dir.join(".env.example");

    let mut out_dir = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    out_dir.push("jukebox");
    fs::create_dir_all(&out_dir)?;

    if template.is_file() {
        fs::copy(&template, out_dir.join(".env.example"))?;
    } else {
        println!(
            "cargo:warning=.env.example not found at {}",
            template.display()
        );
    }

    Ok(())
}

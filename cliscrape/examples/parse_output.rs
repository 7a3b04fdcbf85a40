//! Offline parsing: sanitize a saved capture and run a template over it
//!
//! No device needed. The capture is the raw text of a session (escape
//! sequences, pager banners and prompt included), for example recorded with
//! `script` or copied from a terminal log.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example parse_output -- \
//!     --template cliscrape/examples/templates/huawei_display_interface_brief.textfsm \
//!     --command "display interface brief" --profile huawei_vrp capture.log
//! ```
//!
//! Without `--template` the bundled index picks one from the command.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use cliscrape::{ProfileRegistry, Template, TemplateIndex};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let Some(capture) = &args.capture else {
        eprintln!("Error: no capture file given");
        std::process::exit(1);
    };

    let raw = String::from_utf8_lossy(&fs::read(capture)?).into_owned();
    let profile = ProfileRegistry::lookup(&args.profile)?;
    let text = profile.sanitizer().sanitize(&raw, &args.command);

    println!("--- Sanitized ({}) ---", profile.name);
    println!("{}", text);

    let template = match &args.template {
        Some(path) => Template::load(&fs::read_to_string(path)?)?,
        None => {
            let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("examples/templates");
            let index = TemplateIndex::from_index(&fs::read_to_string(dir.join("index"))?, |name| {
                let source = fs::read_to_string(dir.join(name)).map_err(|e| {
                    cliscrape::error::TemplateError::Load {
                        line: 0,
                        message: format!("{}: {}", name, e),
                    }
                })?;
                Template::load(&source)
            })?;
            match index.find(&profile.name, &args.command) {
                Some(template) => (*template).clone(),
                None => {
                    eprintln!("No template for '{}' on {}", args.command, profile.name);
                    std::process::exit(1);
                }
            }
        }
    };

    let mut records = template.records(&text);
    let parsed: Vec<_> = records.by_ref().collect();

    println!("\n--- Records ({}) ---", parsed.len());
    println!("{}", serde_json::to_string_pretty(&parsed)?);
    if let Some(message) = records.stopped() {
        println!("\nParse stopped early: {}", message);
    }

    Ok(())
}

/// Simple argument parser (avoiding external dependencies)
struct Args {
    template: Option<PathBuf>,
    command: String,
    profile: String,
    capture: Option<PathBuf>,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut template = None;
        let mut command = String::new();
        let mut profile = "generic".to_string();
        let mut capture = None;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--template" => {
                    i += 1;
                    if i < args.len() {
                        template = Some(PathBuf::from(&args[i]));
                    }
                }
                "--command" | "-c" => {
                    i += 1;
                    if i < args.len() {
                        command = args[i].clone();
                    }
                }
                "--profile" => {
                    i += 1;
                    if i < args.len() {
                        profile = args[i].clone();
                    }
                }
                "--help" => {
                    println!(
                        "USAGE:\n    cargo run --example parse_output -- [--template <FILE>] --command <CMD> [--profile <NAME>] <CAPTURE>"
                    );
                    std::process::exit(0);
                }
                path => capture = Some(PathBuf::from(path)),
            }
            i += 1;
        }

        Self {
            template,
            command,
            profile,
            capture,
        }
    }
}

//! Batch inspection of Huawei VRP devices
//!
//! Probes each host, logs in over SSH, collects CPU, memory, interface and
//! version data, parses it with the bundled templates and prints the alerts.
//! The full reports are written as JSON to stdout with `--json`.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example huawei_inspect -- --user admin --password Admin@123 \
//!     192.168.56.10 192.168.56.11 192.168.56.12
//! ```

use std::env;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use cliscrape::inspect::{CommandSpec, InspectionJob, Summary, Thresholds};
use cliscrape::{
    InspectorBuilder, ProfileRegistry, SshConfig, SshConnector, Target, Template, TemplateIndex,
    TimeoutPolicy,
};

const COMMANDS: &[&str] = &[
    "display cpu-usage",
    "display memory-usage",
    "display interface brief",
    "display version",
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if args.hosts.is_empty() {
        eprintln!("Error: no hosts given");
        std::process::exit(1);
    }

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

    let inspector = InspectorBuilder::new(SshConnector::new(SshConfig::default()))
        .max_workers(args.workers)
        .probe(true)
        .probe_timeout(Duration::from_secs(3))
        .timeout_policy(TimeoutPolicy {
            read: Duration::from_secs(args.timeout),
            ..TimeoutPolicy::default()
        })
        .thresholds(
            Thresholds::default()
                .with_limit("cpu_usage", args.cpu_limit)
                .with_limit("memory_usage", args.memory_limit),
        )
        .template_index(Arc::new(index))
        .build();

    let profile = ProfileRegistry::lookup("huawei_vrp")?;
    let jobs: Vec<InspectionJob> = args
        .hosts
        .iter()
        .map(|host| {
            InspectionJob::new(
                Target::new(host.as_str(), 22)
                    .with_username(&args.user)
                    .with_password(&args.password),
                profile.clone(),
                COMMANDS.iter().map(|c| CommandSpec::new(*c)).collect(),
            )
        })
        .collect();

    let mut reports = inspector.run(jobs).await;
    reports.sort_by(|a, b| a.name.cmp(&b.name));

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    println!("{}", "=".repeat(72));
    for report in &reports {
        let status = match (&report.error, &report.reachability) {
            (Some(error), _) => format!("FAILED ({})", error),
            (None, Some(r)) => format!("ok, rtt {:.1} ms", r.rtt_ms.unwrap_or_default()),
            (None, None) => "ok".to_string(),
        };
        println!("{:<20} {}", report.name, status);

        for command in &report.commands {
            let note = match (&command.template_error, &command.stopped) {
                (Some(e), _) => format!("template error: {}", e),
                (None, Some(stop)) => format!("{} records, stopped: {}", command.records.len(), stop),
                (None, None) => format!("{} records", command.records.len()),
            };
            println!("    {:<28} {}", command.command, note);
        }
        for alert in &report.alerts {
            println!("    ALERT {}", alert);
        }
    }
    println!("{}", "=".repeat(72));
    println!("{}", Summary::of(&reports));

    Ok(())
}

/// Simple argument parser (avoiding external dependencies)
struct Args {
    user: String,
    password: String,
    workers: usize,
    timeout: u64,
    cpu_limit: f64,
    memory_limit: f64,
    json: bool,
    hosts: Vec<String>,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut user = "admin".to_string();
        let mut password = String::new();
        let mut workers = 3usize;
        let mut timeout = 30u64;
        let mut cpu_limit = 80.0;
        let mut memory_limit = 70.0;
        let mut json = false;
        let mut hosts = Vec::new();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--user" | "-u" => {
                    i += 1;
                    if i < args.len() {
                        user = args[i].clone();
                    }
                }
                "--password" | "-P" => {
                    i += 1;
                    if i < args.len() {
                        password = args[i].clone();
                    }
                }
                "--workers" | "-w" => {
                    i += 1;
                    if i < args.len() {
                        workers = args[i].parse().unwrap_or(3);
                    }
                }
                "--timeout" | "-t" => {
                    i += 1;
                    if i < args.len() {
                        timeout = args[i].parse().unwrap_or(30);
                    }
                }
                "--cpu" => {
                    i += 1;
                    if i < args.len() {
                        cpu_limit = args[i].parse().unwrap_or(80.0);
                    }
                }
                "--memory" => {
                    i += 1;
                    if i < args.len() {
                        memory_limit = args[i].parse().unwrap_or(70.0);
                    }
                }
                "--json" => json = true,
                "--help" => {
                    println!(
                        "USAGE:\n    cargo run --example huawei_inspect -- --user <USER> --password <PASS> \
                         [--workers N] [--timeout SECS] [--cpu PCT] [--memory PCT] [--json] <HOST>..."
                    );
                    std::process::exit(0);
                }
                other if other.starts_with('-') => {
                    eprintln!("Unknown argument: {}", other);
                }
                host => hosts.push(host.to_string()),
            }
            i += 1;
        }

        Self {
            user,
            password,
            workers,
            timeout,
            cpu_limit,
            memory_limit,
            json,
            hosts,
        }
    }
}

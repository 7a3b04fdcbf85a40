//! Interactive sequences and configuration mode on Huawei VRP
//!
//! Demonstrates `send_interactive` for mode changes that move the prompt
//! (`<R1>` to `[R1]` and back) and `configure` for pushing a few lines.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example interactive -- --host 192.168.56.10 --user admin --password Admin@123
//! ```
//!
//! Add `--apply` to push the sample configuration (sets an interface
//! description on GigabitEthernet0/0/1).

use std::env;
use std::time::Duration;

use cliscrape::{InteractiveBuilder, SessionBuilder};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    println!("=== cliscrape interactive example ===\n");

    let mut session = SessionBuilder::new(&args.host)
        .port(args.port)
        .username(&args.user)
        .password(&args.password)
        .profile("huawei_vrp")
        .read_timeout(Duration::from_secs(20))
        .build_ssh()?;

    println!("Connecting to {}:{}...", args.host, args.port);
    session.open().await?;
    println!("Connected!\n");

    // Example 1: enter system view and come back, one step per prompt
    println!("--- Example 1: system-view round trip ---");
    let events = InteractiveBuilder::new()
        .send("system-view")
        .expect("]")
        .send("display this | include sysname")
        .expect("]")
        .send("return")
        .expect(">")
        .with_timeout(Duration::from_secs(10))
        .build();

    let result = session.send_interactive(&events).await?;
    for (i, step) in result.steps.iter().enumerate() {
        println!("Step {}: sent {:?}, matched {:?}", i + 1, step.input, step.matched);
        if !step.output.is_empty() {
            println!("{}", step.output);
        }
    }
    println!("Sequence took {:?}\n", result.elapsed);

    // Example 2: configuration mode with per-line failure detection
    if args.apply {
        println!("--- Example 2: configure ---");
        let results = session
            .configure(&[
                "interface GigabitEthernet0/0/1",
                "description managed-by-cliscrape",
                "quit",
            ])
            .await?;
        for result in &results {
            match &result.failure_message {
                Some(failure) => println!("  {:<40} REJECTED: {}", result.command, failure),
                None => println!("  {:<40} ok", result.command),
            }
        }
        println!();
    }

    let check = session
        .execute("display current-configuration interface GigabitEthernet0/0/1")
        .await?;
    println!("{}", check.sanitized);

    session.close().await?;
    println!("\nDone!");
    Ok(())
}

/// Simple argument parser (avoiding external dependencies)
struct Args {
    host: String,
    port: u16,
    user: String,
    password: String,
    apply: bool,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut host = "localhost".to_string();
        let mut port = 22u16;
        let mut user = "admin".to_string();
        let mut password = String::new();
        let mut apply = false;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--host" | "-h" => {
                    i += 1;
                    if i < args.len() {
                        host = args[i].clone();
                    }
                }
                "--port" | "-p" => {
                    i += 1;
                    if i < args.len() {
                        port = args[i].parse().unwrap_or(22);
                    }
                }
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
                "--apply" => apply = true,
                "--help" => {
                    println!(
                        "USAGE:\n    cargo run --example interactive -- --host <HOST> --user <USER> --password <PASS> [--apply]"
                    );
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {}", args[i]);
                }
            }
            i += 1;
        }

        Self {
            host,
            port,
            user,
            password,
            apply,
        }
    }
}

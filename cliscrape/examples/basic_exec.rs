//! Basic example: connect to a device and run a few commands
//!
//! Connects over SSH (or telnet with `--telnet`), waits for the prompt of the
//! selected device profile and prints the sanitized output of each command.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example basic_exec -- --host 192.168.56.10 --user admin --password Admin@123 \
//!     --profile huawei_vrp "display version" "display clock"
//! ```
//!
//! Over telnet:
//! ```bash
//! cargo run --example basic_exec -- --telnet --host 192.168.56.10 --user admin --password Admin@123 \
//!     --profile huawei_vrp "display ip interface brief"
//! ```

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use cliscrape::{Connector, Session, SessionBuilder};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (set RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if args.commands.is_empty() {
        eprintln!("Error: no commands given");
        std::process::exit(1);
    }

    let mut builder = SessionBuilder::new(&args.host)
        .username(&args.user)
        .profile(&args.profile)
        .connect_timeout(Duration::from_secs(args.timeout))
        .read_timeout(Duration::from_secs(args.timeout));
    if let Some(port) = args.port {
        builder = builder.port(port);
    }
    if let Some(password) = &args.password {
        builder = builder.password(password);
    } else if let Some(key_path) = &args.key {
        builder = builder.private_key(key_path);
    }

    if args.telnet {
        run(builder.build_telnet()?, &args.commands).await
    } else {
        run(builder.build_ssh()?, &args.commands).await
    }
}

async fn run<C: Connector>(
    mut session: Session<C>,
    commands: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Connecting to {}...", session.target().socket_addr());
    let greeting = session.open().await?;
    println!("Connected! ({} bytes of banner)", greeting.len());

    for command in commands {
        println!("\nExecuting: {}", command);
        println!("{}", "-".repeat(50));

        match session.execute(command).await {
            Ok(result) => {
                println!("{}", result.sanitized);
                println!("{}", "-".repeat(50));
                if let Some(failure) = &result.failure_message {
                    eprintln!("Device rejected the command: {}", failure);
                }
                println!(
                    "Completed in {:?} ({} pages, prompt {:?})",
                    result.elapsed,
                    result.pages,
                    result.prompt.as_deref().unwrap_or("")
                );
            }
            Err(e) if e.is_timeout() => {
                eprintln!("Timed out: {}", e);
                if let Some(partial) = e.partial_result() {
                    eprintln!("Partial output:\n{}", partial.sanitized);
                }
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }

    println!("\nClosing connection...");
    session.close().await?;
    println!("Done!");
    Ok(())
}

/// Simple argument parser (avoiding external dependencies)
struct Args {
    host: String,
    port: Option<u16>,
    user: String,
    password: Option<String>,
    key: Option<PathBuf>,
    profile: String,
    timeout: u64,
    telnet: bool,
    commands: Vec<String>,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut host = "localhost".to_string();
        let mut port = None;
        let mut user = env::var("USER").unwrap_or_else(|_| "admin".to_string());
        let mut password = None;
        let mut key = None;
        let mut profile = "generic".to_string();
        let mut timeout = 30u64;
        let mut telnet = false;
        let mut commands = Vec::new();

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
                        port = args[i].parse().ok();
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
                        password = Some(args[i].clone());
                    }
                }
                "--key" | "-k" => {
                    i += 1;
                    if i < args.len() {
                        key = Some(PathBuf::from(&args[i]));
                    }
                }
                "--profile" => {
                    i += 1;
                    if i < args.len() {
                        profile = args[i].clone();
                    }
                }
                "--timeout" | "-t" => {
                    i += 1;
                    if i < args.len() {
                        timeout = args[i].parse().unwrap_or(30);
                    }
                }
                "--telnet" => telnet = true,
                "--help" => {
                    Self::print_help();
                    std::process::exit(0);
                }
                other if other.starts_with('-') => {
                    eprintln!("Unknown argument: {}", other);
                }
                command => commands.push(command.to_string()),
            }
            i += 1;
        }

        Self {
            host,
            port,
            user,
            password,
            key,
            profile,
            timeout,
            telnet,
            commands,
        }
    }

    fn print_help() {
        println!(
            r#"cliscrape basic_exec example

USAGE:
    cargo run --example basic_exec -- [OPTIONS] <COMMAND>...

OPTIONS:
    -h, --host <HOST>        Target host [default: localhost]
    -p, --port <PORT>        Port [default: 22, or 23 with --telnet]
    -u, --user <USER>        Username [default: $USER]
    -P, --password <PASS>    Password for authentication
    -k, --key <PATH>         Path to SSH private key
        --profile <NAME>     Device profile: generic, huawei_vrp, cisco_ios, linux
    -t, --timeout <SECS>     Connect and read timeout [default: 30]
        --telnet             Use telnet instead of SSH
    --help                   Print this help message
"#
        );
    }
}

//! # cliscrape
//!
//! Async interactive CLI sessions and output parsing for network devices.
//!
//! cliscrape drives a device's command line over SSH or telnet the way an
//! operator would: it waits for the prompt, sends a command, dismisses
//! `--More--` pagers, and treats the prompt's return as the end of the
//! output. The captured text is cleaned of escape sequences, pager banners,
//! the echoed command and the trailing prompt, and can then be turned into
//! records with TextFSM-style templates.
//!
//! ## Features
//!
//! - One session engine over any [`transport::Transport`] (russh SSH, telnet)
//! - Prompt memory, pagination and completion detection with bounded timeouts
//! - Output sanitizer configurable per device family
//! - TextFSM-compatible template parser with a lazy record iterator
//! - Device profiles for Huawei VRP, Cisco IOS and Linux
//! - Batch inspection over a bounded worker pool with threshold alerts
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cliscrape::{SessionBuilder, Template};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), cliscrape::Error> {
//!     let mut session = SessionBuilder::new("192.168.1.1")
//!         .username("admin")
//!         .password("secret")
//!         .profile("huawei_vrp")
//!         .build_ssh()?;
//!
//!     session.open().await?;
//!
//!     let template = Template::load(
//!         "Value CPU (\\d+)\n\nStart\n  ^CPU utilization for five seconds: ${CPU}% -> Record\n",
//!     )?;
//!     let parsed = session.execute_and_parse("display cpu-usage", &template).await?;
//!     println!("{:?}", parsed.records);
//!
//!     session.close().await?;
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod error;
pub mod inspect;
pub mod platform;
pub mod sanitize;
pub mod session;
pub mod template;
pub mod transport;

// Re-export main types for convenience
pub use error::{Error, Result};
pub use inspect::{Inspector, InspectorBuilder};
pub use platform::{DeviceProfile, ProfileRegistry};
pub use sanitize::{Sanitizer, sanitize};
pub use session::{
    CommandResult, ExecuteOptions, InteractiveBuilder, InteractiveEvent, InteractiveResult,
    ParsedOutput, Session, SessionBuilder, SessionState, TimeoutPolicy,
};
pub use template::{Record, Template, TemplateIndex};
pub use transport::{
    AuthMethod, Connector, SshConfig, SshConnector, Target, TelnetConfig, TelnetConnector, Transport,
};

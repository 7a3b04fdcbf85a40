//! Batch inspection of many devices.
//!
//! An [`Inspector`] probes, logs into and runs a fixed command list on every
//! target, parsing each output with its template and checking the records
//! against [`Thresholds`]. Targets run on a bounded pool of workers, each
//! with its own [`Session`]. A failing target never stops the batch; a
//! failing template never stops its target.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use cliscrape::inspect::{CommandSpec, InspectionJob, InspectorBuilder};
//! use cliscrape::platform::ProfileRegistry;
//! use cliscrape::transport::{SshConfig, SshConnector, Target};
//!
//! # async fn example() -> Result<(), cliscrape::Error> {
//! let inspector = InspectorBuilder::new(SshConnector::new(SshConfig::default()))
//!     .max_workers(5)
//!     .build();
//!
//! let profile = ProfileRegistry::lookup("huawei_vrp")?;
//! let jobs = vec![InspectionJob::new(
//!     Target::new("192.0.2.1", 22)
//!         .with_username("admin")
//!         .with_password("secret"),
//!     profile,
//!     vec![CommandSpec::new("display version")],
//! )];
//!
//! for report in inspector.run(jobs).await {
//!     println!("{}: {} alerts", report.name, report.alerts.len());
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod probe;
mod report;
mod thresholds;

pub use config::InspectionConfig;
pub use probe::{Reachability, probe};
pub use report::{CommandReport, Summary, TargetReport};
pub use thresholds::{Alert, Thresholds};

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use futures_util::stream;
use log::{debug, info, warn};

use crate::error::Result;
use crate::platform::DeviceProfile;
use crate::session::{CommandResult, Session, TimeoutPolicy};
use crate::template::{Template, TemplateIndex};
use crate::transport::{Connector, Target};

/// The template used to parse a command's output.
#[derive(Debug, Clone)]
pub enum TemplateRef {
    /// Already compiled.
    Compiled(Arc<Template>),
    /// Template source compiled when the command runs; a load failure is
    /// reported on the command instead of failing the target.
    Source(String),
}

/// A command to run and how to parse it.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub command: String,

    /// Without a template the inspector's [`TemplateIndex`] is consulted.
    pub template: Option<TemplateRef>,
}

impl CommandSpec {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            template: None,
        }
    }

    pub fn with_template(mut self, template: Arc<Template>) -> Self {
        self.template = Some(TemplateRef::Compiled(template));
        self
    }

    pub fn with_template_source(mut self, source: impl Into<String>) -> Self {
        self.template = Some(TemplateRef::Source(source.into()));
        self
    }
}

/// One target and what to run on it.
#[derive(Debug)]
pub struct InspectionJob {
    pub target: Target,
    pub profile: Arc<DeviceProfile>,
    pub commands: Vec<CommandSpec>,
}

impl InspectionJob {
    pub fn new(target: Target, profile: Arc<DeviceProfile>, commands: Vec<CommandSpec>) -> Self {
        Self {
            target,
            profile,
            commands,
        }
    }
}

/// Builder for [`Inspector`].
pub struct InspectorBuilder<C: Connector> {
    connector: C,
    config: InspectionConfig,
    index: Option<Arc<TemplateIndex>>,
}

impl<C: Connector> InspectorBuilder<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            config: InspectionConfig::default(),
            index: None,
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: InspectionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn max_workers(mut self, workers: usize) -> Self {
        self.config.max_workers = workers;
        self
    }

    /// Enable or disable the reachability probe.
    pub fn probe(mut self, enabled: bool) -> Self {
        self.config.probe = enabled;
        self
    }

    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.config.probe_timeout = timeout;
        self
    }

    pub fn timeout_policy(mut self, policy: TimeoutPolicy) -> Self {
        self.config.timeouts = policy;
        self
    }

    pub fn thresholds(mut self, thresholds: Thresholds) -> Self {
        self.config.thresholds = thresholds;
        self
    }

    /// Look up templates for commands that do not name one.
    pub fn template_index(mut self, index: Arc<TemplateIndex>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn build(self) -> Inspector<C> {
        Inspector {
            connector: Arc::new(self.connector),
            config: self.config,
            index: self.index,
        }
    }
}

/// Runs inspection jobs over a bounded worker pool.
pub struct Inspector<C: Connector> {
    connector: Arc<C>,
    config: InspectionConfig,
    index: Option<Arc<TemplateIndex>>,
}

impl<C: Connector> Inspector<C> {
    pub fn config(&self) -> &InspectionConfig {
        &self.config
    }

    /// Inspect every job, at most `max_workers` at a time.
    ///
    /// Reports come back in completion order, one per job.
    pub async fn run(&self, jobs: Vec<InspectionJob>) -> Vec<TargetReport> {
        let total = jobs.len();
        info!(
            "inspecting {} targets with {} workers",
            total,
            self.config.workers()
        );

        let reports: Vec<TargetReport> = stream::iter(jobs)
            .map(|job| self.inspect(job))
            .buffer_unordered(self.config.workers())
            .collect()
            .await;

        info!("{}", Summary::of(&reports));
        reports
    }

    /// Inspect a single target.
    pub async fn inspect(&self, job: InspectionJob) -> TargetReport {
        let InspectionJob {
            target,
            profile,
            commands,
        } = job;
        let mut report = TargetReport::new(&target.name, &target.host);

        if self.config.probe {
            let reachability = probe(&target.host, target.port, self.config.probe_timeout).await;
            let reachable = reachability.reachable;
            let reason = reachability.error.clone();
            report.reachability = Some(reachability);
            if !reachable {
                let reason = reason.unwrap_or_else(|| "unreachable".to_string());
                warn!("[{}] unreachable: {}", report.name, reason);
                report.alerts.push(Alert::Unreachable {
                    reason: reason.clone(),
                });
                report.error = Some(reason);
                return report;
            }
        }

        let mut session = Session::new(
            self.connector.clone(),
            target,
            profile.clone(),
            self.config.timeouts,
        );

        if let Err(e) = session.open().await {
            warn!("[{}] {}", report.name, e);
            if e.is_connect() {
                report.alerts.push(Alert::Unreachable {
                    reason: e.to_string(),
                });
            }
            report.error = Some(e.to_string());
            if let Err(e) = session.close().await {
                debug!("[{}] close: {}", report.name, e);
            }
            return report;
        }

        for spec in &commands {
            match session.execute(&spec.command).await {
                Ok(result) => {
                    let command = self.parse(&profile, spec, &result);
                    report
                        .alerts
                        .extend(self.config.thresholds.evaluate(&command.command, &command.records));
                    report.commands.push(command);
                }
                Err(e) => {
                    warn!("[{}] '{}' failed: {}", report.name, spec.command, e);
                    if let Some(partial) = e.partial_result() {
                        let mut command = CommandReport::from_result(partial);
                        command.error = Some(e.to_string());
                        report.commands.push(command);
                    }
                    report.error = Some(e.to_string());
                    break;
                }
            }
        }

        if let Err(e) = session.close().await {
            debug!("[{}] close: {}", report.name, e);
        }
        info!(
            "[{}] {} commands, {} alerts",
            report.name,
            report.commands.len(),
            report.alerts.len()
        );
        report
    }

    fn parse(&self, profile: &DeviceProfile, spec: &CommandSpec, result: &CommandResult) -> CommandReport {
        let mut command = CommandReport::from_result(result);

        let template = match self.template_for(profile, spec) {
            Ok(Some(template)) => template,
            Ok(None) => return command,
            Err(e) => {
                warn!("template for '{}' failed to load: {}", spec.command, e);
                command.template_error = Some(e.to_string());
                return command;
            }
        };

        let mut records = template.records(&result.sanitized);
        command.records = records.by_ref().collect();
        command.stopped = records.stopped().map(String::from);
        debug!(
            "'{}' produced {} records",
            spec.command,
            command.records.len()
        );
        command
    }

    fn template_for(&self, profile: &DeviceProfile, spec: &CommandSpec) -> Result<Option<Arc<Template>>> {
        match &spec.template {
            Some(TemplateRef::Compiled(template)) => Ok(Some(template.clone())),
            Some(TemplateRef::Source(source)) => Ok(Some(Arc::new(Template::load(source)?))),
            None => Ok(self
                .index
                .as_ref()
                .and_then(|index| index.find(&profile.name, &spec.command))),
        }
    }
}

//! Command to template lookup in the ntc-templates index style.

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;
use regex::Regex;

use super::Template;
use crate::error::{Result, TemplateError};

#[derive(Debug)]
struct Entry {
    platform: String,
    command: Regex,
    template: Arc<Template>,
}

/// Maps `(platform, command)` to the template that parses its output.
///
/// Command patterns are regexes matched against the whole command, with
/// `[[...]]` marking an optional completion: `sh[[ow]] ver[[sion]]` accepts
/// `sh ver`, `show vers` and `show version`.
#[derive(Debug, Default)]
pub struct TemplateIndex {
    entries: Vec<Entry>,
}

impl TemplateIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `template` for commands matching `command` on `platform`.
    ///
    /// Entries are searched in registration order.
    pub fn register(
        &mut self,
        platform: impl Into<String>,
        command: &str,
        template: Arc<Template>,
    ) -> Result<()> {
        self.push(platform.into(), command, template, 0)?;
        Ok(())
    }

    fn push(
        &mut self,
        platform: String,
        command: &str,
        template: Arc<Template>,
        line: usize,
    ) -> std::result::Result<(), TemplateError> {
        let pattern = format!("^(?:{})$", expand_completions(command.trim()));
        let command = Regex::new(&pattern).map_err(|source| TemplateError::Pattern { line, source })?;
        self.entries.push(Entry {
            platform,
            command,
            template,
        });
        Ok(())
    }

    /// The template for `command` on `platform`, if any.
    ///
    /// Runs of whitespace in the command are collapsed before matching.
    pub fn find(&self, platform: &str, command: &str) -> Option<Arc<Template>> {
        let command = command.split_whitespace().collect::<Vec<_>>().join(" ");
        let found = self
            .entries
            .iter()
            .find(|e| e.platform == platform && e.command.is_match(&command))
            .map(|e| e.template.clone());
        if found.is_none() {
            debug!("no template for '{}' on {}", command, platform);
        }
        found
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build an index from the text of an ntc-templates style index file.
    ///
    /// The first non-comment line must be the header
    /// `Template, Hostname, Platform, Command`. `load` is called once per
    /// distinct template name and returns the compiled template. The
    /// hostname column is not used.
    pub fn from_index<F>(text: &str, mut load: F) -> Result<Self>
    where
        F: FnMut(&str) -> Result<Template>,
    {
        let mut index = Self::new();
        let mut cache: HashMap<String, Arc<Template>> = HashMap::new();
        let mut header_seen = false;

        for (number, line) in text.lines().enumerate().map(|(i, l)| (i + 1, l)) {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = trimmed.splitn(4, ',').map(str::trim).collect();
            if !header_seen {
                if fields != ["Template", "Hostname", "Platform", "Command"] {
                    return Err(TemplateError::load(
                        number,
                        "expected header 'Template, Hostname, Platform, Command'",
                    )
                    .into());
                }
                header_seen = true;
                continue;
            }

            let [name, _hostname, platform, command] = fields.as_slice() else {
                return Err(TemplateError::load(number, "expected four columns").into());
            };
            if name.contains(':') {
                return Err(TemplateError::load(
                    number,
                    "multiple templates per entry are not supported",
                )
                .into());
            }

            let template = match cache.get(*name) {
                Some(template) => template.clone(),
                None => {
                    let template = Arc::new(load(name)?);
                    cache.insert(name.to_string(), template.clone());
                    template
                }
            };
            index.push(platform.to_string(), command, template, number)?;
        }

        Ok(index)
    }
}

/// Rewrite `[[abc]]` as `(a(b(c)?)?)?`.
fn expand_completions(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut rest = pattern;

    while let Some(open) = rest.find("[[") {
        let inner_start = open + 2;
        let Some(len) = rest[inner_start..].find("]]") else {
            break;
        };
        out.push_str(&rest[..open]);

        let inner = &rest[inner_start..inner_start + len];
        let mut buf = [0u8; 4];
        for c in inner.chars() {
            out.push('(');
            out.push_str(&regex::escape(c.encode_utf8(&mut buf)));
        }
        for _ in inner.chars() {
            out.push_str(")?");
        }
        rest = &rest[inner_start + len + 2..];
    }
    out.push_str(rest);
    out
}

//! Lazy record emission over input text.

use std::collections::VecDeque;
use std::str::Lines;

use log::trace;

use super::rule::{LineAction, RecordAction, Transition};
use super::value::ValueOption;
use super::{Record, Template};

/// Iterator over the records a [`Template`] produces for one text.
///
/// All parse state lives here, so the same template can drive any number of
/// iterators, one after the other or concurrently.
pub struct Records<'a> {
    template: &'a Template,
    lines: Lines<'a>,
    state: usize,
    current: Vec<Option<String>>,
    pending: VecDeque<Record>,
    stopped: Option<String>,
    done: bool,
}

impl<'a> Records<'a> {
    pub(crate) fn new(template: &'a Template, text: &'a str) -> Self {
        Self {
            template,
            lines: text.lines(),
            state: template.start,
            current: vec![None; template.values.len()],
            pending: VecDeque::new(),
            stopped: None,
            done: false,
        }
    }

    /// The message of the `Error` rule that ended the parse, if one did.
    pub fn stopped(&self) -> Option<&str> {
        self.stopped.as_deref()
    }

    fn process(&mut self, line: &str) {
        let template = self.template;
        let state = &template.states[self.state];

        for rule in &state.rules {
            let Some(caps) = rule.regex.captures(line) else {
                continue;
            };

            for (slot, value) in self.current.iter_mut().zip(&template.values) {
                if let Some(m) = caps.name(&value.name) {
                    *slot = Some(m.as_str().to_string());
                }
            }

            match rule.record_action {
                RecordAction::NoRecord => {}
                RecordAction::Record => self.emit(),
                RecordAction::Clear => self.clear(false),
                RecordAction::Clearall => self.clear(true),
            }

            if let LineAction::Error(message) = &rule.line_action {
                let message = message
                    .clone()
                    .unwrap_or_else(|| format!("error rule on template line {}", rule.line));
                trace!("template stopped: {}", message);
                self.stopped = Some(message);
                self.done = true;
                return;
            }

            match rule.transition {
                Transition::Stay => {}
                Transition::To(next) => self.state = next,
                Transition::Stop => {
                    self.done = true;
                    return;
                }
            }

            if rule.line_action != LineAction::Continue {
                break;
            }
        }
    }

    fn emit(&mut self) {
        let values = &self.template.values;

        let empty = self
            .current
            .iter()
            .all(|v| v.as_deref().is_none_or(str::is_empty));
        let missing_required = values
            .iter()
            .zip(&self.current)
            .any(|(value, v)| value.has(ValueOption::Required) && v.as_deref().is_none_or(str::is_empty));

        if !empty && !missing_required {
            let record: Record = values
                .iter()
                .zip(&self.current)
                .map(|(value, v)| (value.name.to_lowercase(), v.clone().unwrap_or_default()))
                .collect();
            self.pending.push_back(record);
        }

        self.clear(false);
    }

    fn clear(&mut self, all: bool) {
        for (slot, value) in self.current.iter_mut().zip(&self.template.values) {
            if all || !value.has(ValueOption::Filldown) {
                *slot = None;
            }
        }
    }
}

impl Iterator for Records<'_> {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        loop {
            if let Some(record) = self.pending.pop_front() {
                return Some(record);
            }
            if self.done {
                return None;
            }
            match self.lines.next() {
                Some(line) => self.process(line),
                None => self.done = true,
            }
        }
    }
}

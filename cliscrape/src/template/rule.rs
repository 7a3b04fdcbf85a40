//! State rules: `^regex -> LineAction.RecordAction NewState`.

use regex::Regex;

use super::value::Value;
use crate::error::TemplateError;

/// What to do with the input line after a rule matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineAction {
    /// Move on to the next input line.
    Next,
    /// Keep trying the remaining rules of the state on the same line.
    Continue,
    /// Stop parsing; the message is reported through `Records::stopped`.
    Error(Option<String>),
}

/// What to do with the current record after a rule matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordAction {
    NoRecord,
    /// Emit the record and clear its non-filldown values.
    Record,
    /// Clear non-filldown values.
    Clear,
    /// Clear every value.
    Clearall,
}

/// Where the state pointer goes after a rule matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transition {
    Stay,
    To(usize),
    /// `End` or `EOF`: stop consuming input.
    Stop,
}

/// A compiled rule.
#[derive(Debug, Clone)]
pub struct Rule {
    pub(crate) regex: Regex,
    pub(crate) line_action: LineAction,
    pub(crate) record_action: RecordAction,
    pub(crate) transition: Transition,
    /// Template line the rule was defined on.
    pub(crate) line: usize,
}

impl Rule {
    /// The compiled rule regex (values already substituted).
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// The line action.
    pub fn line_action(&self) -> &LineAction {
        &self.line_action
    }

    /// The record action.
    pub fn record_action(&self) -> RecordAction {
        self.record_action
    }
}

/// A rule before its target state is resolved.
#[derive(Debug)]
pub(crate) struct ParsedRule {
    pub regex: Regex,
    pub line_action: LineAction,
    pub record_action: RecordAction,
    pub target: Option<String>,
    pub line: usize,
}

/// Parse one rule line (already trimmed, starting with `^`).
pub(crate) fn parse_rule(text: &str, line: usize, values: &[Value]) -> Result<ParsedRule, TemplateError> {
    let (pattern, action) = split_action(text);
    let regex_text = substitute(pattern, line, values)?;
    let regex = Regex::new(&regex_text).map_err(|source| TemplateError::Pattern { line, source })?;

    let (line_action, record_action, target) = parse_action(action.unwrap_or(""), line)?;
    if line_action == LineAction::Continue && target.is_some() {
        return Err(TemplateError::load(
            line,
            "Continue cannot be combined with a state change",
        ));
    }

    Ok(ParsedRule {
        regex,
        line_action,
        record_action,
        target,
        line,
    })
}

/// Split at the last `->` that follows whitespace.
fn split_action(text: &str) -> (&str, Option<&str>) {
    let split = text
        .match_indices("->")
        .filter(|(i, _)| text[..*i].ends_with(char::is_whitespace))
        .map(|(i, _)| i)
        .last();
    match split {
        Some(i) => (text[..i].trim_end(), Some(text[i + 2..].trim())),
        None => (text, None),
    }
}

/// Replace `${Name}` (and `$Name`) with the value's named group; `$$` is a
/// literal `$`.
fn substitute(pattern: &str, line: usize, values: &[Value]) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut rest = pattern;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(stripped) = after.strip_prefix('$') {
            out.push('$');
            rest = stripped;
        } else if let Some(braced) = after.strip_prefix('{') {
            let Some(close) = braced.find('}') else {
                return Err(TemplateError::load(line, "unterminated '${'"));
            };
            out.push_str(&lookup(&braced[..close], line, values)?);
            rest = &braced[close + 1..];
        } else {
            let len = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            if len == 0 {
                // A bare `$` is the regex end anchor.
                out.push('$');
            } else {
                out.push_str(&lookup(&after[..len], line, values)?);
            }
            rest = &after[len..];
        }
    }
    out.push_str(rest);
    Ok(out)
}

fn lookup(name: &str, line: usize, values: &[Value]) -> Result<String, TemplateError> {
    values
        .iter()
        .find(|v| v.name == name)
        .map(Value::named_group)
        .ok_or_else(|| TemplateError::load(line, format!("undefined value '{}'", name)))
}

fn parse_action(
    action: &str,
    line: usize,
) -> Result<(LineAction, RecordAction, Option<String>), TemplateError> {
    let mut line_action = LineAction::Next;
    let mut record_action = RecordAction::NoRecord;

    if let Some(message) = action.strip_prefix("Error") {
        if !message.is_empty() && !message.starts_with(char::is_whitespace) {
            return Err(TemplateError::load(line, format!("unknown action '{}'", action)));
        }
        let message = message.trim().trim_matches('"');
        let message = (!message.is_empty()).then(|| message.to_string());
        return Ok((LineAction::Error(message), record_action, None));
    }

    let mut tokens = action.split_whitespace();
    let mut target = None;

    if let Some(first) = tokens.next() {
        if let Some((l, r)) = first.split_once('.') {
            line_action = parse_line_action(l)
                .ok_or_else(|| TemplateError::load(line, format!("unknown line action '{}'", l)))?;
            record_action = parse_record_action(r)
                .ok_or_else(|| TemplateError::load(line, format!("unknown record action '{}'", r)))?;
        } else if let Some(action) = parse_line_action(first) {
            line_action = action;
        } else if let Some(action) = parse_record_action(first) {
            record_action = action;
        } else {
            target = Some(first.to_string());
        }
    }

    if let Some(state) = tokens.next() {
        if target.is_some() {
            return Err(TemplateError::load(line, format!("unexpected '{}' in action", state)));
        }
        target = Some(state.to_string());
    }
    if let Some(extra) = tokens.next() {
        return Err(TemplateError::load(line, format!("unexpected '{}' in action", extra)));
    }

    Ok((line_action, record_action, target))
}

fn parse_line_action(text: &str) -> Option<LineAction> {
    match text {
        "Next" => Some(LineAction::Next),
        "Continue" => Some(LineAction::Continue),
        _ => None,
    }
}

fn parse_record_action(text: &str) -> Option<RecordAction> {
    match text {
        "NoRecord" => Some(RecordAction::NoRecord),
        "Record" => Some(RecordAction::Record),
        "Clear" => Some(RecordAction::Clear),
        "Clearall" => Some(RecordAction::Clearall),
        _ => None,
    }
}

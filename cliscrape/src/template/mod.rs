//! Template parser turning sanitized CLI text into records.
//!
//! Templates use the TextFSM layout: `Value` declarations, a blank line,
//! then named states holding ordered `^regex -> Action` rules.
//!
//! ```rust
//! use cliscrape::template::Template;
//!
//! let template = Template::load(
//!     "Value Required INTERFACE (\\S+)\n\
//!      Value STATUS (up|down)\n\
//!      \n\
//!      Start\n  \
//!        ^${INTERFACE}\\s+${STATUS} -> Record\n",
//! )
//! .unwrap();
//!
//! let records = template.parse("GE0/0/1 up\nGE0/0/2 down\n");
//! assert_eq!(records.len(), 2);
//! assert_eq!(records[1]["status"], "down");
//! ```

mod index;
mod records;
mod rule;
mod value;

pub use index::TemplateIndex;
pub use records::Records;
pub use rule::{LineAction, RecordAction, Rule};
pub use value::{Value, ValueOption};

use std::str::FromStr;

use indexmap::IndexMap;

use crate::error::{Error, Result, TemplateError};
use rule::{ParsedRule, Transition, parse_rule};

/// One parsed record: lower-cased value name to captured text, in
/// declaration order. Values never captured map to an empty string.
pub type Record = IndexMap<String, String>;

/// A named block of rules.
#[derive(Debug, Clone)]
pub struct State {
    name: String,
    rules: Vec<Rule>,
}

impl State {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }
}

/// A compiled template.
///
/// Immutable once loaded; share it through an `Arc` between workers.
#[derive(Debug, Clone)]
pub struct Template {
    pub(crate) values: Vec<Value>,
    pub(crate) states: Vec<State>,
    pub(crate) start: usize,
}

const RESERVED_STOP_STATES: [&str; 2] = ["End", "EOF"];

impl Template {
    /// Compile a template from its source text.
    pub fn load(source: &str) -> Result<Self> {
        Ok(Loader::default().load(source)?)
    }

    /// Lazily parse `text`.
    pub fn records<'a>(&'a self, text: &'a str) -> Records<'a> {
        Records::new(self, text)
    }

    /// Parse `text` and collect every record.
    pub fn parse(&self, text: &str) -> Vec<Record> {
        self.records(text).collect()
    }

    /// Declared values.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Record keys in declaration order.
    pub fn header(&self) -> Vec<String> {
        self.values.iter().map(|v| v.name.to_lowercase()).collect()
    }

    /// States in declaration order.
    pub fn states(&self) -> &[State] {
        &self.states
    }
}

impl FromStr for Template {
    type Err = Error;

    fn from_str(source: &str) -> Result<Self> {
        Template::load(source)
    }
}

/// Raw state while loading, before target names are resolved.
struct PendingState {
    name: String,
    line: usize,
    rules: Vec<ParsedRule>,
}

#[derive(Default)]
struct Loader {
    values: Vec<Value>,
    states: Vec<PendingState>,
}

impl Loader {
    fn load(mut self, source: &str) -> std::result::Result<Template, TemplateError> {
        let mut lines = source.lines().enumerate().map(|(i, l)| (i + 1, l));

        // Value section, ended by the first blank line after a declaration.
        for (number, line) in lines.by_ref() {
            let trimmed = line.trim();
            if trimmed.starts_with('#') {
                continue;
            }
            if trimmed.is_empty() {
                if self.values.is_empty() {
                    continue;
                }
                break;
            }
            let Some(rest) = line.strip_prefix("Value ") else {
                return Err(TemplateError::load(
                    number,
                    "expected a Value declaration or a blank line",
                ));
            };
            let value = Value::parse(rest, number)?;
            if self.values.iter().any(|v| v.name == value.name) {
                return Err(TemplateError::load(
                    number,
                    format!("duplicate value '{}'", value.name),
                ));
            }
            self.values.push(value);
        }

        if self.values.is_empty() {
            return Err(TemplateError::load(0, "template declares no values"));
        }

        let mut current: Option<usize> = None;
        for (number, line) in lines {
            let trimmed = line.trim();
            if trimmed.starts_with('#') {
                continue;
            }
            if trimmed.is_empty() {
                current = None;
                continue;
            }

            if !line.starts_with(char::is_whitespace) {
                current = Some(self.open_state(trimmed, number)?);
                continue;
            }

            let Some(index) = current else {
                return Err(TemplateError::load(number, "rule outside of a state"));
            };
            if !trimmed.starts_with('^') {
                return Err(TemplateError::load(number, "rules must begin with '^'"));
            }
            let rule = parse_rule(trimmed, number, &self.values)?;
            self.states[index].rules.push(rule);
        }

        self.resolve()
    }

    fn open_state(&mut self, name: &str, line: usize) -> std::result::Result<usize, TemplateError> {
        if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(TemplateError::load(
                line,
                format!("invalid state name '{}'", name),
            ));
        }
        if self.states.iter().any(|s| s.name == name) {
            return Err(TemplateError::load(
                line,
                format!("duplicate state '{}'", name),
            ));
        }
        self.states.push(PendingState {
            name: name.to_string(),
            line,
            rules: Vec::new(),
        });
        Ok(self.states.len() - 1)
    }

    fn resolve(self) -> std::result::Result<Template, TemplateError> {
        let Some(start) = self.states.iter().position(|s| s.name == "Start") else {
            return Err(TemplateError::load(0, "missing 'Start' state"));
        };

        for state in &self.states {
            if RESERVED_STOP_STATES.contains(&state.name.as_str()) && !state.rules.is_empty() {
                return Err(TemplateError::load(
                    state.line,
                    format!("state '{}' must be empty", state.name),
                ));
            }
        }

        let names: Vec<String> = self.states.iter().map(|s| s.name.clone()).collect();
        let mut states = Vec::with_capacity(self.states.len());
        for pending in self.states {
            let mut rules = Vec::with_capacity(pending.rules.len());
            for parsed in pending.rules {
                let transition = match parsed.target.as_deref() {
                    None => Transition::Stay,
                    Some(name) if RESERVED_STOP_STATES.contains(&name) => Transition::Stop,
                    Some(name) => match names.iter().position(|n| n == name) {
                        Some(index) => Transition::To(index),
                        None => {
                            return Err(TemplateError::load(
                                parsed.line,
                                format!("undefined state '{}'", name),
                            ));
                        }
                    },
                };
                rules.push(Rule {
                    regex: parsed.regex,
                    line_action: parsed.line_action,
                    record_action: parsed.record_action,
                    transition,
                    line: parsed.line,
                });
            }
            states.push(State {
                name: pending.name,
                rules,
            });
        }

        Ok(Template {
            values: self.values,
            states,
            start,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERFACES: &str = "\
# display interface brief
Value Required INTERFACE (\\S+)
Value PHY (\\*?(?:up|down))
Value PROTOCOL (\\S+)
Value IN_UTI (\\S+)
Value OUT_UTI (\\S+)

Start
  ^Interface\\s+PHY -> Table

Table
  ^${INTERFACE}\\s+${PHY}\\s+${PROTOCOL}\\s+${IN_UTI}\\s+${OUT_UTI} -> Record
";

    const HUAWEI_OUTPUT: &str = "\
PHY: Physical
*down: administratively down
Interface                   PHY   Protocol  InUti OutUti   inErrors  outErrors
GigabitEthernet0/0/0        up    up        0.01%  0.01%          0          0
GigabitEthernet0/0/1        down  down         0%     0%          0          0
NULL0                       up    up(s)        0%     0%          0          0
";

    fn load(source: &str) -> Template {
        Template::load(source).unwrap()
    }

    #[test]
    fn test_huawei_interface_brief() {
        let template = load(INTERFACES);
        let records = template.parse(HUAWEI_OUTPUT);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0]["interface"], "GigabitEthernet0/0/0");
        assert_eq!(records[0]["in_uti"], "0.01%");
        assert_eq!(records[1]["phy"], "down");
        assert_eq!(records[2]["protocol"], "up(s)");
        assert_eq!(
            template.header(),
            vec!["interface", "phy", "protocol", "in_uti", "out_uti"]
        );
        assert_eq!(
            records[0].keys().cloned().collect::<Vec<_>>(),
            template.header()
        );
    }

    #[test]
    fn test_parse_is_idempotent() {
        let template = load(INTERFACES);
        assert_eq!(template.parse(HUAWEI_OUTPUT), template.parse(HUAWEI_OUTPUT));
    }

    #[test]
    fn test_filldown_persists_across_emissions() {
        let template = load(
            "Value Filldown NAME (\\S+)\n\nStart\n  ^name: ${NAME}\n  ^emit -> Record\n",
        );
        let records = template.parse("name: A\nemit\nemit\n");
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r["name"] == "A"));
    }

    #[test]
    fn test_required_drops_incomplete_records() {
        let template = load(
            "Value NAME (\\S+)\nValue Required STATUS (\\S+)\n\n\
             Start\n  ^name: ${NAME}\n  ^status: ${STATUS}\n  ^end -> Record\n",
        );
        let text = "name: a\nstatus: ok\nend\nname: b\nend\nname: c\nstatus: fail\nend\n";
        let records = template.parse(text);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["name"], "a");
        assert_eq!(records[1]["name"], "c");
        assert_eq!(records[1]["status"], "fail");
    }

    #[test]
    fn test_no_implicit_record_at_end_of_input() {
        let template = load("Value NAME (\\S+)\n\nStart\n  ^name: ${NAME}\n");
        assert!(template.parse("name: a\nname: b\n").is_empty());
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let template = load(
            "Value KIND (\\S+)\n\nStart\n  ^error.* -> Clear\n  ^${KIND}.* -> Record\n",
        );
        let records = template.parse("error here\nwarning there\n");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["kind"], "warning");
    }

    #[test]
    fn test_continue_evaluates_later_rules() {
        let template = load(
            "Value A (\\d+)\nValue B (\\d+)\n\n\
             Start\n  ^${A} -> Continue\n  ^\\d+ ${B} -> Record\n",
        );
        let records = template.parse("1 2\n3 4\n");
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["a"], "3");
        assert_eq!(records[1]["b"], "4");
    }

    #[test]
    fn test_clear_and_clearall() {
        let source = "Value Filldown HOST (\\S+)\nValue PORT (\\S+)\n\n\
                      Start\n  ^host ${HOST}\n  ^port ${PORT}\n  ^reset -> Clear\n  \
                      ^wipe -> Clearall\n  ^emit -> Record\n";
        let template = load(source);

        let records = template.parse("host r1\nport p1\nreset\nemit\n");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["host"], "r1");
        assert_eq!(records[0]["port"], "");

        assert!(template.parse("host r1\nport p1\nwipe\nemit\n").is_empty());
    }

    #[test]
    fn test_state_transitions_and_end() {
        let template = load(
            "Value NAME (\\S+)\n\n\
             Start\n  ^begin -> Body\n\n\
             Body\n  ^stop -> End\n  ^${NAME} -> Record\n",
        );
        let records = template.parse("a\nbegin\nb\nc\nstop\nd\n");
        let names: Vec<&str> = records.iter().map(|r| r["name"].as_str()).collect();
        assert_eq!(names, vec!["b", "c"]);
    }

    #[test]
    fn test_error_action_stops_parse() {
        let template = load(
            "Value NAME (\\S+)\n\n\
             Start\n  ^% -> Error \"device rejected command\"\n  ^${NAME} -> Record\n",
        );
        let mut records = template.records("a\n% Invalid input\nb\n");
        assert_eq!(records.next().unwrap()["name"], "a");
        assert!(records.next().is_none());
        assert_eq!(records.stopped(), Some("device rejected command"));

        let mut clean = template.records("a\nb\n");
        assert_eq!(clean.by_ref().count(), 2);
        assert!(clean.stopped().is_none());
    }

    #[test]
    fn test_unmatched_input_yields_nothing() {
        let template = load(INTERFACES);
        assert!(template.parse("").is_empty());
        assert!(template.parse("garbage\n\x00\n").is_empty());
    }

    #[test]
    fn test_load_errors() {
        let cases = [
            ("Value NAME (\\S+)\n\nBody\n  ^x\n", "Start"),
            ("Value NAME (\\S+)\n\nStart\n  ^x -> Missing\n", "Missing"),
            ("Value NAME (\\S+)\n\nStart\n  ^${OTHER}\n", "OTHER"),
            ("Value NAME (\\S+)\nValue NAME (\\d+)\n\nStart\n", "duplicate"),
            ("Value NAME (\\S+)\n\nStart\n\nStart\n", "duplicate"),
            ("Value NAME (\\S+)\n\nStart\n  ^x\n\nEnd\n  ^y\n", "End"),
            ("Value NAME (\\S+)\n\nStart\n  ^x -> Continue.Record Body\n\nBody\n", "Continue"),
            ("Value NAME (\\S+)\nStart\n", "blank line"),
            ("# only a comment\n", "no values"),
        ];
        for (source, needle) in cases {
            match Template::load(source) {
                Err(Error::Template(err @ TemplateError::Load { .. })) => {
                    assert!(err.to_string().contains(needle), "{}: {}", needle, err)
                }
                other => panic!("expected load error for {:?}, got {:?}", needle, other),
            }
        }
    }

    #[test]
    fn test_pattern_error_reports_line() {
        let err = Template::load("Value NAME (\\S+)\n\nStart\n  ^(${NAME}\n").unwrap_err();
        assert!(matches!(
            err,
            Error::Template(TemplateError::Pattern { line: 4, .. })
        ));
    }

    #[test]
    fn test_from_str_and_sharing() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Template>();

        let template: Template = INTERFACES.parse().unwrap();
        assert_eq!(template.states().len(), 2);
        assert_eq!(template.states()[1].name(), "Table");
        assert_eq!(template.states()[1].rules().len(), 1);
        assert!(template.values()[0].has(ValueOption::Required));
    }
}

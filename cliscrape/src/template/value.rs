//! `Value` declarations.

use regex::Regex;

use crate::error::TemplateError;

/// Options a value can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueOption {
    /// Keep the last captured value across records.
    Filldown,
    /// Records without this value are dropped.
    Required,
    /// Marks the value as identifying a record. Informational only.
    Key,
}

impl ValueOption {
    fn parse(text: &str, line: usize) -> Result<Self, TemplateError> {
        match text {
            "Filldown" => Ok(ValueOption::Filldown),
            "Required" => Ok(ValueOption::Required),
            "Key" => Ok(ValueOption::Key),
            other => Err(TemplateError::load(
                line,
                format!("unsupported value option '{}'", other),
            )),
        }
    }
}

/// A named capture declared in the template header.
#[derive(Debug, Clone)]
pub struct Value {
    /// Name as written in the template.
    pub name: String,

    /// The capture regex, including its outer parentheses.
    pub pattern: String,

    /// Options in declaration order.
    pub options: Vec<ValueOption>,
}

impl Value {
    /// Parse the text after the `Value` keyword.
    pub(crate) fn parse(rest: &str, line: usize) -> Result<Self, TemplateError> {
        let rest = rest.trim();
        let Some(open) = rest.find('(') else {
            return Err(TemplateError::load(
                line,
                "value pattern must be enclosed in parentheses",
            ));
        };
        let (head, pattern) = rest.split_at(open);
        let pattern = pattern.trim();
        if !pattern.ends_with(')') {
            return Err(TemplateError::load(
                line,
                "value pattern must be enclosed in parentheses",
            ));
        }

        let tokens: Vec<&str> = head.split_whitespace().collect();
        let (options_text, name) = match tokens.as_slice() {
            [name] => (None, *name),
            [options, name] => (Some(*options), *name),
            _ => {
                return Err(TemplateError::load(
                    line,
                    "expected 'Value [Options] Name (pattern)'",
                ));
            }
        };

        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(TemplateError::load(
                line,
                format!("invalid value name '{}'", name),
            ));
        }

        let mut options = Vec::new();
        if let Some(text) = options_text {
            for option in text.split(',') {
                let option = ValueOption::parse(option.trim(), line)?;
                if options.contains(&option) {
                    return Err(TemplateError::load(
                        line,
                        format!("duplicate option {:?} on value '{}'", option, name),
                    ));
                }
                options.push(option);
            }
        }

        Regex::new(pattern).map_err(|source| TemplateError::Pattern { line, source })?;

        Ok(Self {
            name: name.to_string(),
            pattern: pattern.to_string(),
            options,
        })
    }

    /// Whether the value carries `option`.
    pub fn has(&self, option: ValueOption) -> bool {
        self.options.contains(&option)
    }

    /// The pattern rewritten as a named group for use inside a rule.
    pub(crate) fn named_group(&self) -> String {
        format!("(?P<{}>{}", self.name, &self.pattern[1..])
    }
}

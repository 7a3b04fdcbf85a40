//! Output sanitizer: turns a raw command capture into clean text.
//!
//! The steps run in a fixed order:
//!
//! 1. banner redraw sequences are removed,
//! 2. escape sequences and control characters are stripped,
//! 3. pagination banners (with their leading padding) are removed,
//! 4. the echoed command is dropped,
//! 5. a trailing prompt line is dropped and trailing whitespace trimmed.

mod ansi;

pub use ansi::strip_escapes;

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

/// Prompt-line shape used when the device family is unknown.
///
/// Matches `<R1>`, `[R1-GigabitEthernet0/0/1]`, `switch#`, `router>` and
/// shell prompts such as `user@host:~$`.
pub const DEFAULT_PROMPT_SHAPE: &str =
    r"^\s*(?:<[^<>\r\n]+>|\[[^\[\]\r\n]+\][$#]?|[\w.\-@/:~()]+[>#$%])\s*$";

const DEFAULT_BANNERS: [&str; 3] = ["---- More ----", " --More-- ", "--More--"];

const DEFAULT_REDRAWS: [&str; 2] = [r"[ ]*\x1b\[\d+D[ ]*\x1b\[\d+D", r"\x08+[ ]+\x08+"];

static DEFAULT_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(DEFAULT_PROMPT_SHAPE).expect("valid built-in pattern"));

static DEFAULT_SANITIZER: LazyLock<Sanitizer> = LazyLock::new(|| {
    let mut sanitizer = Sanitizer::bare();
    for banner in DEFAULT_BANNERS {
        sanitizer = sanitizer.with_banner(banner);
    }
    for redraw in DEFAULT_REDRAWS {
        sanitizer = sanitizer.with_redraw(Regex::new(redraw).expect("valid built-in pattern"));
    }
    sanitizer
});

/// The default prompt-shape regex.
pub fn default_prompt_shape() -> Regex {
    DEFAULT_SHAPE.clone()
}

/// Sanitize `raw` captured for `command` with the default rules.
pub fn sanitize(raw: &str, command: &str) -> String {
    DEFAULT_SANITIZER.sanitize(raw, command)
}

/// Configurable output sanitizer.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    banners: Vec<String>,
    banner_pattern: Option<Regex>,
    redraws: Vec<Regex>,
    prompt_shape: Regex,
}

impl Sanitizer {
    /// The default rules: Huawei and Cisco style pagers and the generic
    /// prompt shape.
    pub fn new() -> Self {
        DEFAULT_SANITIZER.clone()
    }

    /// No banners or redraw sequences; generic prompt shape.
    pub fn bare() -> Self {
        Self {
            banners: Vec::new(),
            banner_pattern: None,
            redraws: Vec::new(),
            prompt_shape: default_prompt_shape(),
        }
    }

    /// Add a pagination banner to remove.
    pub fn with_banner(mut self, banner: impl AsRef<str>) -> Self {
        let banner = banner.as_ref();
        if banner.trim().is_empty() || self.banners.iter().any(|b| b == banner) {
            return self;
        }
        self.banners.push(banner.to_string());
        self.banners.sort_by(|a, b| b.len().cmp(&a.len()));
        let alternatives: Vec<String> = self.banners.iter().map(|b| regex::escape(b)).collect();
        self.banner_pattern = Regex::new(&format!(
            r"[ \t]*?(?:{})(?:[ \t]*(\n|\z))?",
            alternatives.join("|")
        ))
        .ok();
        self
    }

    /// Add a banner redraw sequence to remove.
    pub fn with_redraw(mut self, pattern: Regex) -> Self {
        self.redraws.push(pattern);
        self
    }

    /// Replace the prompt-shape regex.
    pub fn with_prompt_shape(mut self, shape: Regex) -> Self {
        self.prompt_shape = shape;
        self
    }

    /// Banners this sanitizer removes, longest first.
    pub fn banners(&self) -> &[String] {
        &self.banners
    }

    /// Clean `raw`, the full capture of `command` including its echo and the
    /// closing prompt.
    pub fn sanitize(&self, raw: &str, command: &str) -> String {
        let text = self.remove_redraws(raw);
        let text = strip_escapes(&text);
        let text = self.remove_banners(&text);
        let text = strip_echo(&text, command);
        self.strip_trailing_prompt(text)
    }

    fn remove_redraws<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let mut text = Cow::Borrowed(text);
        for pattern in &self.redraws {
            if let Cow::Owned(replaced) = pattern.replace_all(&text, "") {
                text = Cow::Owned(replaced);
            }
        }
        text
    }

    fn remove_banners<'a>(&self, text: &'a str) -> Cow<'a, str> {
        match &self.banner_pattern {
            // Trailing padding goes only when the line ends there; otherwise
            // it is the indentation of the next content line.
            Some(pattern) => pattern.replace_all(text, "${1}"),
            None => Cow::Borrowed(text),
        }
    }

    /// Drop the last line if it has the shape of a prompt, then trim
    /// trailing whitespace.
    pub fn strip_trailing_prompt(&self, text: &str) -> String {
        let trimmed = text.trim_end();
        let (head, last) = match trimmed.rfind('\n') {
            Some(pos) => (&trimmed[..pos], &trimmed[pos + 1..]),
            None => ("", trimmed),
        };
        if !last.is_empty() && self.prompt_shape.is_match(last) {
            head.trim_end().to_string()
        } else {
            trimmed.to_string()
        }
    }
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Drop everything up to and including the first echo of `command`, plus
/// the rest of the echo line when it is blank.
pub fn strip_echo<'a>(text: &'a str, command: &str) -> &'a str {
    let command = command.trim();
    if command.is_empty() {
        return text;
    }
    let Some(pos) = text.find(command) else {
        return text;
    };
    let rest = &text[pos + command.len()..];
    match rest.find('\n') {
        Some(nl) if rest[..nl].trim().is_empty() => &rest[nl + 1..],
        None if rest.trim().is_empty() => "",
        _ => rest,
    }
}

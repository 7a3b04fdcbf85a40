//! Device profile: everything that differs between CLI families.

use regex::Regex;

use crate::sanitize::{Sanitizer, default_prompt_shape};

/// Per device family settings for the session engine and the sanitizer.
///
/// Nothing here is tied to one vendor's heuristics; the built-in profiles in
/// [`vendors`](super::vendors) are just pre-filled instances.
#[derive(Debug, Clone)]
pub struct DeviceProfile {
    /// Profile name (e.g., "huawei_vrp", "cisco_ios").
    pub name: String,

    /// Prompt markers seen in the normal (non-configuration) mode.
    pub prompt_markers: Vec<Vec<u8>>,

    /// Marker that ends output in configuration mode.
    pub config_prompt: Option<Vec<u8>>,

    /// Command that enters configuration mode.
    pub config_enter: Option<String>,

    /// Command that leaves configuration mode.
    pub config_exit: Option<String>,

    /// Pagination banner the device prints mid-output. Empty disables paging.
    pub page_prompt: Vec<u8>,

    /// Bytes sent to dismiss the pagination banner.
    pub continuation: Vec<u8>,

    /// Additional banners the sanitizer removes besides `page_prompt`.
    pub extra_banners: Vec<String>,

    /// Sequences the device uses to erase and redraw the banner line.
    pub redraw_patterns: Vec<Regex>,

    /// Shape of a prompt line, used to drop the trailing prompt from output.
    pub prompt_shape: Regex,

    /// Patterns that indicate command failure.
    pub failed_when_contains: Vec<String>,

    /// Commands to run once the first prompt is seen.
    pub on_open_commands: Vec<String>,
}

impl DeviceProfile {
    /// Create a profile with generic defaults.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prompt_markers: vec![b">".to_vec()],
            config_prompt: None,
            config_enter: None,
            config_exit: None,
            page_prompt: b"--More--".to_vec(),
            continuation: b" ".to_vec(),
            extra_banners: vec![],
            redraw_patterns: vec![],
            prompt_shape: default_prompt_shape(),
            failed_when_contains: vec![],
            on_open_commands: vec![],
        }
    }

    /// Replace the prompt markers.
    pub fn with_prompt_markers<M: AsRef<[u8]>>(mut self, markers: &[M]) -> Self {
        self.prompt_markers = markers.iter().map(|m| m.as_ref().to_vec()).collect();
        self
    }

    /// Describe configuration mode: how to enter and leave it and its prompt.
    pub fn with_config_mode(
        mut self,
        enter: impl Into<String>,
        prompt: impl AsRef<[u8]>,
        exit: impl Into<String>,
    ) -> Self {
        self.config_enter = Some(enter.into());
        self.config_prompt = Some(prompt.as_ref().to_vec());
        self.config_exit = Some(exit.into());
        self
    }

    /// Set the pagination banner and the keystrokes that dismiss it.
    pub fn with_pager(mut self, banner: impl AsRef<[u8]>, continuation: impl AsRef<[u8]>) -> Self {
        self.page_prompt = banner.as_ref().to_vec();
        self.continuation = continuation.as_ref().to_vec();
        self
    }

    /// Disable pagination handling.
    pub fn without_pager(mut self) -> Self {
        self.page_prompt.clear();
        self
    }

    /// Add a banner for the sanitizer to remove.
    pub fn with_extra_banner(mut self, banner: impl Into<String>) -> Self {
        self.extra_banners.push(banner.into());
        self
    }

    /// Add a banner-redraw sequence pattern.
    pub fn with_redraw_pattern(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.redraw_patterns.push(Regex::new(pattern)?);
        Ok(self)
    }

    /// Set the prompt-shape pattern.
    pub fn with_prompt_shape(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.prompt_shape = Regex::new(pattern)?;
        Ok(self)
    }

    /// Add a failure pattern.
    pub fn with_failure_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.failed_when_contains.push(pattern.into());
        self
    }

    /// Add an on_open command.
    pub fn with_on_open_command(mut self, command: impl Into<String>) -> Self {
        self.on_open_commands.push(command.into());
        self
    }

    /// Build the sanitizer configured for this device family.
    pub fn sanitizer(&self) -> Sanitizer {
        let mut sanitizer = Sanitizer::bare().with_prompt_shape(self.prompt_shape.clone());
        if !self.page_prompt.is_empty() {
            sanitizer = sanitizer.with_banner(String::from_utf8_lossy(&self.page_prompt));
        }
        for banner in &self.extra_banners {
            sanitizer = sanitizer.with_banner(banner.as_str());
        }
        for pattern in &self.redraw_patterns {
            sanitizer = sanitizer.with_redraw(pattern.clone());
        }
        sanitizer
    }

    /// First failure pattern found in `output`, if any.
    pub fn detect_failure(&self, output: &str) -> Option<String> {
        self.failed_when_contains
            .iter()
            .find(|pattern| output.contains(pattern.as_str()))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let profile = DeviceProfile::new("custom");
        assert_eq!(profile.page_prompt, b"--More--");
        assert_eq!(profile.continuation, b" ");
        assert!(profile.config_enter.is_none());
    }

    #[test]
    fn test_detect_failure() {
        let profile = DeviceProfile::new("custom").with_failure_pattern("% Invalid input");
        assert_eq!(
            profile.detect_failure("   ^\n% Invalid input detected at '^' marker."),
            Some("% Invalid input".to_string())
        );
        assert!(profile.detect_failure("all good").is_none());
    }

    #[test]
    fn test_sanitizer_uses_profile_banner() {
        let profile = DeviceProfile::new("custom").with_pager("<<more>>", "\n");
        let clean = profile.sanitizer().sanitize("show x\nline1\n<<more>>line2\nR1>", "show x");
        assert_eq!(clean, "line1\nline2");
    }

    #[test]
    fn test_without_pager() {
        let profile = DeviceProfile::new("custom").without_pager();
        assert!(profile.page_prompt.is_empty());
    }

    #[test]
    fn test_invalid_prompt_shape() {
        assert!(DeviceProfile::new("x").with_prompt_shape("([").is_err());
    }
}

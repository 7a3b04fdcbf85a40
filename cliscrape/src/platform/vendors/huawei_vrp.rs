//! Huawei VRP profile.
//!
//! # Prompt Examples
//!
//! ```text
//! <R1>                 # user view
//! [R1]                 # system view
//! [R1-GigabitEthernet0/0/1]
//! ```
//!
//! The pager prints `---- More ----` and, once dismissed, erases it with
//! `ESC[16D`, a run of spaces and another `ESC[16D` before continuing.

use crate::platform::DeviceProfile;

/// Create the Huawei VRP profile.
pub fn profile() -> DeviceProfile {
    DeviceProfile::new("huawei_vrp")
        .with_prompt_markers(&[">", "]"])
        .with_config_mode("system-view", "]", "return")
        .with_pager("---- More ----", " ")
        .with_redraw_pattern(r"[ ]*\x1b\[\d+D[ ]*\x1b\[\d+D")
        .expect("valid built-in pattern")
        .with_prompt_shape(r"^\s*[<\[][^\r\n]+[>\]]\s*$")
        .expect("valid built-in pattern")
        .with_failure_pattern("Error: Unrecognized command")
        .with_failure_pattern("Error: Wrong parameter")
        .with_failure_pattern("Error: Incomplete command")
        .with_failure_pattern("Error: Too many parameters")
        .with_failure_pattern("Error: Ambiguous command")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_huawei_profile() {
        let profile = profile();
        assert_eq!(profile.name, "huawei_vrp");
        assert_eq!(profile.prompt_markers, vec![b">".to_vec(), b"]".to_vec()]);
        assert_eq!(profile.config_enter.as_deref(), Some("system-view"));
        assert_eq!(profile.page_prompt, b"---- More ----");
    }

    #[test]
    fn test_prompt_shape() {
        let profile = profile();
        assert!(profile.prompt_shape.is_match("<R1>"));
        assert!(profile.prompt_shape.is_match("[R1-GigabitEthernet0/0/1]"));
        assert!(!profile.prompt_shape.is_match("CPU utilization for five seconds: 5%"));
    }

    #[test]
    fn test_redraw_and_banner_removed() {
        let raw = "display cpu\r\nline1\r\n  ---- More ----  \x1b[16D                \x1b[16Dline2\r\n<R1>";
        let clean = profile().sanitizer().sanitize(raw, "display cpu");
        assert_eq!(clean, "line1\nline2");
    }

    #[test]
    fn test_failure_detection() {
        let output = "              ^\nError: Unrecognized command found at '^' position.";
        assert!(profile().detect_failure(output).is_some());
    }
}

//! Cisco IOS profile.
//!
//! # Prompt Examples
//!
//! ```text
//! switch>              # user exec
//! switch#              # privileged exec
//! switch(config)#      # configuration
//! ```
//!
//! The pager prints ` --More-- ` and erases it with backspaces, spaces and
//! backspaces again.

use crate::platform::DeviceProfile;

/// Create the Cisco IOS profile.
pub fn profile() -> DeviceProfile {
    DeviceProfile::new("cisco_ios")
        .with_prompt_markers(&[">", "#"])
        .with_config_mode("configure terminal", ")#", "end")
        .with_pager(" --More-- ", " ")
        .with_redraw_pattern(r"\x08+[ ]+\x08+")
        .expect("valid built-in pattern")
        .with_prompt_shape(r"^[\w.\-@()/:]{1,63}[>#]\s*$")
        .expect("valid built-in pattern")
        .with_failure_pattern("% Ambiguous command")
        .with_failure_pattern("% Incomplete command")
        .with_failure_pattern("% Invalid input")
        .with_failure_pattern("% Unknown command")
}

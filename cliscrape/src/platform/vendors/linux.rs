//! Linux profile.
//!
//! Standard Linux/Unix shells with `$` (user) and `#` (root) prompts. There
//! is no pager on a non-interactive shell.

use crate::platform::DeviceProfile;

/// Create the Linux profile.
pub fn profile() -> DeviceProfile {
    DeviceProfile::new("linux")
        .with_prompt_markers(&["$ ", "# "])
        .without_pager()
        .with_prompt_shape(r"^[^\r\n]*[$#]\s*$")
        .expect("valid built-in pattern")
        .with_failure_pattern("command not found")
        .with_failure_pattern("No such file or directory")
        .with_failure_pattern("Permission denied")
        .with_failure_pattern("Operation not permitted")
}

//! Generic profile for devices without a dedicated one.
//!
//! Waits for any of the common prompt terminators and strips both the
//! Huawei and the Cisco style pagination banners.

use crate::platform::DeviceProfile;

/// Create the generic profile.
pub fn profile() -> DeviceProfile {
    DeviceProfile::new("generic")
        .with_prompt_markers(&[">", "#", "]", "$"])
        .with_pager("--More--", " ")
        .with_extra_banner(" --More-- ")
        .with_extra_banner("---- More ----")
        .with_redraw_pattern(r"[ ]*\x1b\[\d+D[ ]*\x1b\[\d+D")
        .expect("valid built-in pattern")
        .with_redraw_pattern(r"\x08+[ ]+\x08+")
        .expect("valid built-in pattern")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_profile() {
        let profile = profile();
        assert_eq!(profile.name, "generic");
        assert_eq!(profile.prompt_markers.len(), 4);
        assert!(profile.config_enter.is_none());
    }

    #[test]
    fn test_strips_both_banner_styles() {
        let sanitizer = profile().sanitizer();
        let raw = "show x\na\n---- More ----b\n --More-- c\nR1#";
        assert_eq!(sanitizer.sanitize(raw, "show x"), "a\nb\nc");
    }
}

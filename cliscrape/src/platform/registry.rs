//! Global profile registry for looking up device profiles by name.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, RwLock};

use super::definition::DeviceProfile;
use super::vendors;
use crate::error::{PlatformError, Result};

/// Global profile registry.
static REGISTRY: LazyLock<RwLock<ProfileRegistry>> = LazyLock::new(|| {
    let mut registry = ProfileRegistry::new();
    registry.register_builtin_profiles();
    RwLock::new(registry)
});

/// Registry for device profiles.
#[derive(Debug, Default)]
pub struct ProfileRegistry {
    profiles: HashMap<String, Arc<DeviceProfile>>,
}

impl ProfileRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            profiles: HashMap::new(),
        }
    }

    /// Get the global registry.
    pub fn global() -> &'static RwLock<ProfileRegistry> {
        &REGISTRY
    }

    /// Look up a profile in the global registry.
    pub fn lookup(name: &str) -> Result<Arc<DeviceProfile>> {
        let registry = Self::global()
            .read()
            .map_err(|_| PlatformError::InvalidDefinition {
                message: "Failed to acquire registry lock".to_string(),
            })?;
        registry.get(name).ok_or_else(|| {
            PlatformError::UnknownProfile {
                name: name.to_string(),
            }
            .into()
        })
    }

    /// Register built-in profiles.
    fn register_builtin_profiles(&mut self) {
        for profile in [
            vendors::generic::profile(),
            vendors::huawei_vrp::profile(),
            vendors::cisco_ios::profile(),
            vendors::linux::profile(),
        ] {
            self.profiles.insert(profile.name.clone(), Arc::new(profile));
        }
    }

    /// Register a profile.
    pub fn register(&mut self, profile: DeviceProfile) -> Result<()> {
        if profile.name.is_empty() {
            return Err(PlatformError::InvalidDefinition {
                message: "profile name must not be empty".to_string(),
            }
            .into());
        }
        if self.profiles.contains_key(&profile.name) {
            return Err(PlatformError::AlreadyRegistered {
                name: profile.name.clone(),
            }
            .into());
        }
        self.profiles.insert(profile.name.clone(), Arc::new(profile));
        Ok(())
    }

    /// Get a profile by name.
    pub fn get(&self, name: &str) -> Option<Arc<DeviceProfile>> {
        self.profiles.get(name).cloned()
    }

    /// Check if a profile is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.profiles.contains_key(name)
    }

    /// List all registered profile names.
    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.profiles.keys()
    }
}

//! Device profiles for multi-vendor support.
//!
//! A profile carries the prompt markers, pager behaviour, output cleanup
//! rules and failure patterns of one CLI family.

mod definition;
mod registry;
pub mod vendors;

pub use definition::DeviceProfile;
pub use registry::ProfileRegistry;

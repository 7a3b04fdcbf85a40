//! Built-in device profiles.

pub mod cisco_ios;
pub mod generic;
pub mod huawei_vrp;
pub mod linux;

//! Command handlers grouped by concern.

pub(crate) mod quiet;
pub(crate) mod reset;
pub(crate) mod set;
pub(crate) mod show;

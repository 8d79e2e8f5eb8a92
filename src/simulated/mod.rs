//! In-process application under test
//!
//! A recording panel and a background workload that behave like the real
//! thing closely enough to drive the built-in subtests, without a browser.

pub mod panel;
pub mod subtests;
pub mod workload;

pub use panel::{PanelTiming, SimulatedPanel, HIGH_RES_INTERVAL, LOW_RES_INTERVAL};
pub use subtests::{register_builtin_subtests, BuiltinSettings, BUILTIN_SUBTESTS};
pub use workload::SimulatedWorkload;

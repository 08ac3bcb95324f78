//! IPsec tunnel auditing: normalize the firewall's child SA list, probe every remote
//! endpoint concurrently, report, and terminate what is down.

pub mod audit;
pub mod fanout;
pub mod inventory;
pub mod normalizer;
pub mod prober;
pub mod remediation;
pub mod report;

pub use audit::{AuditSummary, run_audit};

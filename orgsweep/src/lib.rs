pub mod config;
pub mod github;
pub mod markers;
pub mod orgs;
pub mod paging;
pub mod repos;
pub mod runner;
pub mod scanner;

pub use config::{Config, Token};
pub use runner::{OrgStatus, RunSummary, Runner};
pub use scanner::{ProcessRunner, ScanOutcome, ScannerRunner};

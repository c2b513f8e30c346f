pub mod archive;
pub mod cli;
pub mod config;
pub mod contract;
pub mod descriptor;
pub mod error;
pub mod http;
pub mod ledger;
pub mod load_config;
pub mod locator;
pub mod probe;
pub mod reconcile;
pub mod signals;
pub mod store;
pub mod synchronise;
pub mod track;

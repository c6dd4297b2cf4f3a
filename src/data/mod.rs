pub mod output;
pub mod snapshot;

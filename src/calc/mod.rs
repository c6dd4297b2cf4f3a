pub mod iv_statistics;

// Adapters layer: CSV in, CSV tables out. The filesystem side lives in config::cli.

pub mod csv_source;
pub mod csv_table;

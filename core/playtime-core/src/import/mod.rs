//! One-off imports of metadata kept outside any data source.

pub mod gauge;

pub use gauge::{import_gauge_csv, import_rows, normalize_name, parse_gauge_csv, GaugeRow, ImportReport};

pub mod icons;
pub mod output;
pub mod progress;
pub mod table;

pub use icons::Icons;
pub use output::{
    backend_icon, error, header, info, json, resolution_warnings, section, success, summary_row,
    timing, warn,
};
pub use progress::{ProgressSink, Spinner};
pub use table::{counts_table, TableBuilder};

pub mod icons;
pub mod output;
pub mod progress;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{dim, edge_line, header, section, status, success, warn};
pub use progress::{BatchProgress, Spinner};
pub use table::{graph_stats_table, metrics_table, TableBuilder};
pub use theme::{theme, Theme};

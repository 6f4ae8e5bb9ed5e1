pub mod header;
pub mod utils;

pub use header::draw_header;
pub use utils::{
  fmt_date, fmt_datetime, fmt_time_range, integration_color, priority_color, sentiment_color,
  truncate,
};

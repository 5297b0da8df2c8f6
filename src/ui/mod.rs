pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{error, header, info, section, success, summary_row, warn};
pub use table::{student_table, StudentRow};
pub use theme::{stderr_palette, stdout_palette, Palette};

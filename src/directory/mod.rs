pub mod record;
pub mod selection;

pub use record::{load_barangays, read_barangays_csv, BarangayRecord};
pub use selection::{filter_barangays, DirectorySelection, DisplayState, SelectionChange};

mod error;
mod paths;
mod store;

pub use error::HistoryStoreError;
pub use paths::{history_file, temp_path_for, DEFAULT_CAPACITY, HISTORY_FILE_NAME};
pub use store::HistoryStore;

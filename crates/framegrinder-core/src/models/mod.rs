pub mod frame;
pub mod job;
pub mod result;
pub mod storage;

pub use frame::Frame;
pub use job::JobTimestamp;
pub use result::ProcessingResult;
pub use storage::{DownloadLocation, StorageObject};

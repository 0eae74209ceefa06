pub mod live;
pub mod preview;
pub mod store;

pub use live::{LiveRunReport, LiveScheduler};
pub use preview::{preview, PreviewResult};
pub use store::CalendarStore;

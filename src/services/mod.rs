pub mod dashscope;
pub mod download;
pub mod job_client;
pub mod payload;
pub mod video;

pub use dashscope::{DashScopeClient, DashScopeError, TaskApi};
pub use download::VideoDownloader;
pub use job_client::{AsyncJobClient, PollPolicy};
pub use video::VideoService;

// Worker constants (No magic values)
use std::time::Duration;

/// How long the idle worker waits for an item before re-checking shutdown
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// How long `stop()` waits for the worker to finish its current item
pub const STOP_GRACE_PERIOD: Duration = Duration::from_secs(2);

/// Upper bound on concurrent text agents within one job
pub const TEXT_AGENT_POOL_CAP: usize = 6;

/// Retention pass interval (24 hours)
pub const RETENTION_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Number of shorts clips rendered per job
pub const SHORTS_CLIP_COUNT: usize = 3;

/// Key messages extracted for the brief
pub const KEY_MESSAGE_COUNT: usize = 5;

/// Failure recorded for jobs found RUNNING at startup
pub const INTERRUPTED_MESSAGE: &str = "interrupted by daemon restart";

pub const DALI_WS_URL: &str = "DALI_WS_URL";

pub const DEFAULT_URL: &str = "ws://localhost:8765";
pub const DEFAULT_CAPACITY: usize = 1024;

pub const USER_AGENT_HEADER: &str = "User-Agent";

/// How long a requested close waits for the backend's close frame.
pub const CLOSE_GRACE_SECS: u64 = 5;

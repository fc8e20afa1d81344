// Luck domain
pub const MIN_LUCK_VALUE: u8 = 0;
pub const MAX_LUCK_VALUE: u8 = 100;
pub const LUCK_PIVOT: i64 = 50;

// Fixed-point resolution for combining probability deltas
pub const RATE_SCALE: f64 = 1_000_000.0;

// Scheduler timing
pub const DEFAULT_TICK_INTERVAL_SECONDS: i64 = 5 * 60;
pub const DEFAULT_MAX_CATCH_UP_INTERVALS: u32 = 7 * 24 * 12; // one week of 5-minute ticks
pub const SCHEDULER_POLL_SECONDS: u64 = 1;
pub const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

// Attributes
pub const NUM_ATTRIBUTE_KINDS: usize = 5;

// Snapshot files
pub const SNAPSHOT_VERSION_MAGIC: u64 = 0x4153_4345_4E44_0001;
pub const SNAPSHOT_FILE_NAME: &str = "characters.snap";

// Environment override for the configuration path
pub const CONFIG_PATH_ENV: &str = "ASCEND_CONFIG";

// Intel frequency MSR addresses
pub const INTEL_PERF_STATUS_MSR: u32 = 0x198;
pub const INTEL_PLATFORM_INFO_MSR: u32 = 0xCE;

// Bus clock multiplied by the ratio fields of the MSRs above
pub const BUS_CLOCK_MHZ: f64 = 100.0;

// Benchmark timing settings
pub const SAMPLING_INTERVAL_MS: u64 = 100;
pub const WARMUP_MS: u64 = 100;
pub const ITERATIONS_PER_BATCH: u64 = 10_000_000;
// One day per core
pub const MAX_DURATION_SECS: i64 = 86_400;

// Monitor settings
pub const MONITOR_INTERVAL_MS: u64 = 1000;

// Report settings
pub const MAX_TIMELINE_ROWS: usize = 50;

// Host paths read by the frequency probe and feature detection
pub const PROC_CPUINFO: &str = "/proc/cpuinfo";
pub const SYS_CPU_DIR: &str = "/sys/devices/system/cpu";

pub mod cli;
pub mod config;
pub mod constants;
pub mod coordinator;
pub mod cpu_type;
pub mod display;
pub mod error;
pub mod feature;
pub mod instruction;
pub mod monitor;
pub mod probe;
pub mod result;
pub mod runner;
pub mod sampler;
pub mod util;
pub mod workload;

pub use config::{OutputFormat, RunConfig, RunMode};
pub use coordinator::{MultiCoreCoordinator, MultiCoreReport, SweepMode};
pub use error::{BenchError, PinError};
pub use feature::{CpuFeature, FeatureDetector, HostFeatures};
pub use instruction::InstructionSetKind;
pub use probe::{CpuFreqProbe, FrequencyProbe};
pub use result::{BenchmarkResult, FrequencySample, FrequencyStats, RunStatus, ZeroReadingPolicy};
pub use runner::{BenchmarkRunner, HostRunner, RunnerSettings};
pub use sampler::{FrequencySampler, StopToken};
pub use util::affinity::{CoreAffinity, LinuxAffinity};

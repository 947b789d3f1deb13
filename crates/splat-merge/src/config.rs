use std::fmt;
use std::path::PathBuf;

use clap::Args;
use serde::{Deserialize, Serialize};
use splat_ply::{SchemaError, ShDegree};

#[derive(Clone, Debug, Args, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MergeArgs {
    /// Path to an input `.ply` file. Repeat for multiple parts, they are merged in order.
    #[arg(
        long,
        short = 'i',
        required = true,
        value_name = "PATH",
        help_heading = "Merge options"
    )]
    pub input: Vec<PathBuf>,

    /// Output path. Directories, or paths without a `.ply` extension, get a
    /// `point_cloud.ply` inside them.
    #[arg(long, short = 'o', value_name = "PATH", help_heading = "Merge options")]
    pub output: PathBuf,

    /// Spherical harmonics degree every input must have.
    #[arg(
        long,
        help_heading = "Merge options",
        default_value = "3",
        allow_negative_numbers = true
    )]
    pub sh_degree: i64,

    /// Device preference, 'cuda' or 'cpu'. Falls back to the CPU when no accelerator is available.
    #[arg(long, help_heading = "Merge options", default_value = "cuda")]
    pub device: String,

    /// Read all inputs concurrently. Records are still appended in input order.
    #[arg(long, help_heading = "Merge options", default_value = "false")]
    pub parallel: bool,
}

impl MergeArgs {
    pub fn into_config(self) -> MergeConfig {
        MergeConfig {
            inputs: self.input,
            output: self.output,
            sh_degree: self.sh_degree,
            parallel: self.parallel,
        }
    }
}

/// Everything a merge needs to run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeConfig {
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
    /// Unvalidated degree, checked before any input is opened.
    pub sh_degree: i64,
    pub parallel: bool,
}

impl MergeConfig {
    pub fn new(inputs: Vec<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            inputs,
            output: output.into(),
            sh_degree: i64::from(ShDegree::MAX.get()),
            parallel: false,
        }
    }

    pub fn with_sh_degree(mut self, sh_degree: i64) -> Self {
        self.sh_degree = sh_degree;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn degree(&self) -> Result<ShDegree, SchemaError> {
        ShDegree::try_from(self.sh_degree)
    }
}

/// Where any numeric work would run. The merge itself only moves bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Cuda,
}

impl Device {
    pub fn from_preference(preference: &str) -> Self {
        let preference = preference.trim().to_ascii_lowercase();
        if preference.starts_with("cuda") {
            Self::Cuda
        } else {
            if preference != "cpu" {
                log::warn!("Unknown device preference '{preference}', using CPU");
            }
            Self::Cpu
        }
    }

    /// Resolve a preference string to a device that is actually available.
    /// No accelerator backend is built in, so asking for one falls back to the CPU.
    pub fn resolve(preference: &str) -> Self {
        match Self::from_preference(preference) {
            Self::Cuda => {
                log::info!("No CUDA device available, falling back to CPU");
                Self::Cpu
            }
            Self::Cpu => Self::Cpu,
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => f.write_str("cpu"),
            Self::Cuda => f.write_str("cuda"),
        }
    }
}

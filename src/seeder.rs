//! Populating the cache under test.
//!
//! The oracle never renders tiles itself. It asks an external seeding tool to
//! fill the cache through the narrow [`Seeder`] trait and then reads back
//! whatever the tool stored.

use std::path::Path;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tracing::{error, info, warn};

use crate::error::{OracleError, OracleResult};

/// Captured output of a successful seeding run
#[derive(Debug, Clone, Default)]
pub struct SeedOutput {
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

/// Anything able to populate a tileset for a set of zoom levels
pub trait Seeder {
    fn seed(&self, config: &Path, tileset: &str, zoom_levels: &[u32]) -> OracleResult<SeedOutput>;
}

/// Runs `mapcache_seed -c <config> -t <tileset> --force -z <zooms>`.
///
/// The process is killed when it exceeds its timeout.
#[derive(Debug, Clone)]
pub struct MapcacheSeeder {
    program: String,
    leading_args: Vec<String>,
    timeout: Duration,
}

impl MapcacheSeeder {
    pub fn new(program: &str, timeout: Duration) -> Self {
        Self { program: program.to_string(), leading_args: Vec::new(), timeout }
    }

    /// Argument placed before the seeding arguments, e.g. a wrapper script
    #[must_use]
    pub fn with_arg(mut self, arg: &str) -> Self {
        self.leading_args.push(arg.to_string());
        self
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn command(&self, config: &Path, tileset: &str, zoom_levels: &[u32]) -> Command {
        let zooms = zoom_levels.iter().map(u32::to_string).collect::<Vec<_>>().join(",");
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading_args)
            .arg("-c")
            .arg(config)
            .arg("-t")
            .arg(tileset)
            .arg("--force")
            .arg("-z")
            .arg(zooms)
            .kill_on_drop(true);
        cmd
    }

    /// Run the seeder on the current tokio runtime
    pub async fn seed_async(
        &self,
        config: &Path,
        tileset: &str,
        zoom_levels: &[u32],
    ) -> OracleResult<SeedOutput> {
        info!(program = %self.program, tileset, ?zoom_levels, "Running seeder");
        let start = Instant::now();

        let output = match tokio::time::timeout(
            self.timeout,
            self.command(config, tileset, zoom_levels).output(),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                error!(timeout_secs = self.timeout.as_secs_f64(), "Seeder timed out, killed");
                return Err(OracleError::SeederTimeout(self.timeout));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            error!(status = %output.status, "Seeder failed");
            error!(stdout = %stdout, "Seeder stdout");
            error!(stderr = %stderr, "Seeder stderr");
            return Err(OracleError::SeederFailed { status: output.status, stdout, stderr });
        }

        info!(stdout = %stdout, "Seeder stdout");
        if !stderr.is_empty() {
            warn!(stderr = %stderr, "Seeder stderr");
        }
        let elapsed = start.elapsed();
        info!(elapsed_ms = elapsed.as_millis() as u64, "Seeder finished");

        Ok(SeedOutput { stdout, stderr, elapsed })
    }
}

impl Seeder for MapcacheSeeder {
    /// Blocking run on a private single-threaded runtime.
    ///
    /// Must not be called from inside a tokio runtime; use
    /// [`MapcacheSeeder::seed_async`] there.
    fn seed(&self, config: &Path, tileset: &str, zoom_levels: &[u32]) -> OracleResult<SeedOutput> {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        runtime.block_on(self.seed_async(config, tileset, zoom_levels))
    }
}

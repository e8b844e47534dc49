//! Start/Stop Orchestrator
//!
//! Bootstrap protocol:
//! 1. raise `group_replication_bootstrap_group`
//! 2. `START GROUP_REPLICATION`; on failure lower the flag again
//! 3. lower the flag, then wait for `super_read_only` to clear
//!
//! The flag must never stay raised: a later restart of that server would
//! bootstrap a second group under the same name.

use std::time::Duration;
use uuid::Uuid;

use super::settings::LifecycleSettings;
use super::BOOTSTRAP_GROUP_VAR;
use crate::errors::{GrError, GrResult};
use crate::instance::{Instance, VarScope};
use crate::observability::{log_event, trace_event, Event, ObservationScope};

const START_SQL: &str = "START GROUP_REPLICATION";
const STOP_SQL: &str = "STOP GROUP_REPLICATION";
const SUPER_READ_ONLY_VAR: &str = "super_read_only";

/// Blocks the calling thread between read-only polls
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// `std::thread::sleep`
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Deadline for `super_read_only` to clear after a bootstrap.
///
/// Counts polls, not wall time: `elapsed` grows by one per sleep and the
/// wait gives up once `elapsed >= timeout_seconds`.
pub struct ReadOnlyWait<'a> {
    timeout_seconds: u32,
    interval: Duration,
    sleeper: &'a dyn Sleeper,
}

impl<'a> ReadOnlyWait<'a> {
    /// One-second polls
    pub fn new(timeout_seconds: u32, sleeper: &'a dyn Sleeper) -> Self {
        Self {
            timeout_seconds,
            interval: Duration::from_secs(1),
            sleeper,
        }
    }

    pub fn from_settings(settings: &LifecycleSettings, sleeper: &'a dyn Sleeper) -> Self {
        Self {
            timeout_seconds: settings.read_only_timeout_seconds,
            interval: settings.poll_interval(),
            sleeper,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn timeout_seconds(&self) -> u32 {
        self.timeout_seconds
    }

    fn wait(&self, instance: &dyn Instance) -> GrResult<()> {
        let endpoint = instance.get_connection_endpoint();
        let mut elapsed: u32 = 0;

        loop {
            let read_only = instance
                .get_sysvar_bool(SUPER_READ_ONLY_VAR, VarScope::Global)?
                .unwrap_or(false);
            if !read_only {
                return Ok(());
            }
            if elapsed >= self.timeout_seconds {
                log_event(
                    Event::ReadOnlyTimeout,
                    &endpoint,
                    &[("timeout_seconds", &self.timeout_seconds.to_string())],
                );
                return Err(GrError::Timeout {
                    instance: endpoint,
                    seconds: self.timeout_seconds,
                });
            }
            trace_event(Event::ReadOnlyPoll, &endpoint, &[("elapsed", &elapsed.to_string())]);
            self.sleeper.sleep(self.interval);
            elapsed += 1;
        }
    }
}

/// On failure, attempt `cleanup`, discard whatever it returns, and hand
/// back the original error. Success passes through without cleanup.
///
/// This is the crate's only place where an error is dropped.
pub(crate) fn rollback_on_error<T>(
    result: GrResult<T>,
    endpoint: &str,
    cleanup: impl FnOnce() -> GrResult<()>,
) -> GrResult<T> {
    match result {
        Ok(value) => Ok(value),
        Err(original) => {
            match cleanup() {
                Ok(()) => log_event(
                    Event::BootstrapRollback,
                    endpoint,
                    &[("error", &original.to_string())],
                ),
                Err(discarded) => log_event(
                    Event::BootstrapRollbackFailed,
                    endpoint,
                    &[
                        ("error", &original.to_string()),
                        ("rollback_error", &discarded.to_string()),
                    ],
                ),
            }
            Err(original)
        }
    }
}

fn set_bootstrap_flag(instance: &dyn Instance, on: bool) -> GrResult<()> {
    let value = if on { "ON" } else { "OFF" };
    Ok(instance.set_sysvar(BOOTSTRAP_GROUP_VAR, value, VarScope::Global)?)
}

/// Start Group Replication, waiting up to `read_only_timeout_seconds` for
/// `super_read_only` to clear when bootstrapping.
pub fn start_group_replication(
    instance: &dyn Instance,
    bootstrap: bool,
    read_only_timeout_seconds: u32,
) -> GrResult<()> {
    let sleeper = ThreadSleeper;
    let wait = ReadOnlyWait::new(read_only_timeout_seconds, &sleeper);
    start_group_replication_with(instance, bootstrap, &wait)
}

/// `start_group_replication` with an explicit wait policy
pub fn start_group_replication_with(
    instance: &dyn Instance,
    bootstrap: bool,
    wait: &ReadOnlyWait<'_>,
) -> GrResult<()> {
    let endpoint = instance.get_connection_endpoint();
    let scope = ObservationScope::with_fields(
        "GR_START",
        &[
            ("instance", &endpoint),
            ("bootstrap", if bootstrap { "true" } else { "false" }),
        ],
    );
    scope.close(start_steps(instance, bootstrap, wait, &endpoint))
}

fn start_steps(
    instance: &dyn Instance,
    bootstrap: bool,
    wait: &ReadOnlyWait<'_>,
    endpoint: &str,
) -> GrResult<()> {
    if bootstrap {
        set_bootstrap_flag(instance, true)?;
        log_event(Event::BootstrapFlagSet, endpoint, &[]);
    }

    let started = instance
        .session()
        .execute(START_SQL)
        .map_err(GrError::from);

    if started.is_err() {
        if bootstrap {
            return rollback_on_error(started, endpoint, || {
                set_bootstrap_flag(instance, false)
            });
        }
        return started;
    }

    if bootstrap {
        set_bootstrap_flag(instance, false)?;
        // The wait is not gated on server version.
        wait.wait(instance)?;
    }
    Ok(())
}

/// `STOP GROUP_REPLICATION`; failures propagate unchanged
pub fn stop_group_replication(instance: &dyn Instance) -> GrResult<()> {
    instance.session().execute(STOP_SQL)?;
    log_event(
        Event::GroupReplicationStopped,
        &instance.get_connection_endpoint(),
        &[],
    );
    Ok(())
}

/// Fresh group name: a random UUID in lowercase hyphenated form
pub fn generate_group_name() -> String {
    Uuid::new_v4().hyphenated().to_string()
}

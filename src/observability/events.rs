//! Lifecycle events emitted by the provisioning core
//!
//! Events are explicit and typed; the string form is what lands in the
//! `event` field of a log line.

use std::fmt;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Plugin
    /// Group Replication plugin installed
    PluginInstalled,
    /// Plugin already active, nothing done
    PluginAlreadyActive,
    /// Plugin uninstalled
    PluginUninstalled,

    // Start / stop
    /// Bootstrap flag raised before START
    BootstrapFlagSet,
    /// Bootstrap flag reset after a failed START
    BootstrapRollback,
    /// The rollback itself failed; its error is discarded
    BootstrapRollbackFailed,
    /// One poll of super_read_only during the bootstrap wait
    ReadOnlyPoll,
    /// super_read_only did not clear in time
    ReadOnlyTimeout,
    /// STOP GROUP_REPLICATION issued
    GroupReplicationStopped,

    // Configuration
    /// Invalid setting found by the checker
    InvalidSetting,
    /// Setting written by the remediator
    SettingApplied,
    /// Option file written to disk
    OptionFileSaved,

    // Replication user
    /// Recovery account created
    ReplicationUserCreated,

    // Leave
    /// STOP skipped because the member is not active
    LeaveStopSkipped,
    /// Member state re-read after STOP
    LeaveStateAfterStop,
    /// Operator must finish the change by hand
    ManualActionRequired,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::PluginInstalled => "GR_PLUGIN_INSTALLED",
            Event::PluginAlreadyActive => "GR_PLUGIN_ALREADY_ACTIVE",
            Event::PluginUninstalled => "GR_PLUGIN_UNINSTALLED",

            Event::BootstrapFlagSet => "GR_BOOTSTRAP_FLAG_SET",
            Event::BootstrapRollback => "GR_BOOTSTRAP_ROLLBACK",
            Event::BootstrapRollbackFailed => "GR_BOOTSTRAP_ROLLBACK_FAILED",
            Event::ReadOnlyPoll => "GR_READ_ONLY_POLL",
            Event::ReadOnlyTimeout => "GR_READ_ONLY_TIMEOUT",
            Event::GroupReplicationStopped => "GR_STOPPED",

            Event::InvalidSetting => "GR_INVALID_SETTING",
            Event::SettingApplied => "GR_SETTING_APPLIED",
            Event::OptionFileSaved => "GR_OPTION_FILE_SAVED",

            Event::ReplicationUserCreated => "GR_REPLICATION_USER_CREATED",

            Event::LeaveStopSkipped => "GR_LEAVE_STOP_SKIPPED",
            Event::LeaveStateAfterStop => "GR_LEAVE_STATE_AFTER_STOP",
            Event::ManualActionRequired => "GR_MANUAL_ACTION_REQUIRED",
        }
    }

    /// Returns true if the operator has to act on this event
    pub fn needs_attention(&self) -> bool {
        matches!(
            self,
            Event::BootstrapRollbackFailed | Event::ReadOnlyTimeout | Event::ManualActionRequired
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

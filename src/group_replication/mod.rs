//! # Group Replication provisioning
//!
//! Operations an orchestrator runs against one instance, in the order a
//! provisioning flow normally calls them:
//!
//! - `checks`: find and fix settings that block Group Replication
//! - `replication_user`: the recovery account
//! - `plugin`: install or remove the plugin
//! - `lifecycle`: start (optionally bootstrapping) and stop
//! - `member_state`: where the instance stands in its group
//! - `leave`: take the instance out of its group
//!
//! Every operation borrows the instance for the duration of the call and
//! returns the first error it hits. Only a failed bootstrap start undoes
//! its own partial work.

mod checks;
mod leave;
mod lifecycle;
mod member_state;
mod plugin;
mod replication_user;
mod settings;

/// Plugin name as registered with the server
pub const GR_PLUGIN_NAME: &str = "group_replication";

/// Raised only for the START that creates a new group
pub const BOOTSTRAP_GROUP_VAR: &str = "group_replication_bootstrap_group";

pub use checks::{
    check_instance_config, configure_instance, persist_gr_configurations, requires_restart,
    InvalidConfig, UNIQUE_SERVER_ID,
};
pub use leave::{leave_replicaset, LeaveOutcome};
pub use lifecycle::{
    generate_group_name, start_group_replication, start_group_replication_with,
    stop_group_replication, ReadOnlyWait, Sleeper, ThreadSleeper,
};
pub use member_state::{
    get_member_state, get_members, has_quorum, is_member, is_member_of, to_member_role,
    to_member_state, Member, MemberRole, MemberState, QuorumStatus,
};
pub use plugin::{get_plugin_status, install_plugin, uninstall_plugin};
pub use replication_user::{
    check_replication_user, check_replication_user_with, create_replication_user,
    create_replication_user_with, get_recovery_user,
};
pub use settings::LifecycleSettings;

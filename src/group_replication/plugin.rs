//! Plugin Lifecycle Manager
//!
//! The plugin's activation state cannot change while the server runs: a
//! plugin that is present but not ACTIVE needs a restart, so it is
//! reported instead of touched.

use super::GR_PLUGIN_NAME;
use crate::errors::{GrError, GrResult};
use crate::instance::Instance;
use crate::observability::{log_event, Event};

const ACTIVE: &str = "ACTIVE";

/// Current plugin status, `None` when not installed
pub fn get_plugin_status(instance: &dyn Instance) -> GrResult<Option<String>> {
    Ok(instance.get_plugin_status(GR_PLUGIN_NAME)?)
}

/// Install the plugin. Returns true when it was installed by this call.
pub fn install_plugin(instance: &dyn Instance) -> GrResult<bool> {
    let endpoint = instance.get_connection_endpoint();
    let mut installed = false;

    let mut status = instance.get_plugin_status(GR_PLUGIN_NAME)?;
    if status.is_none() {
        instance.install_plugin(GR_PLUGIN_NAME)?;
        installed = true;
        status = instance.get_plugin_status(GR_PLUGIN_NAME)?;
    }

    match status.as_deref() {
        Some(ACTIVE) if installed => {
            log_event(Event::PluginInstalled, &endpoint, &[]);
            Ok(true)
        }
        Some(ACTIVE) => {
            log_event(Event::PluginAlreadyActive, &endpoint, &[]);
            Ok(false)
        }
        Some(other) => Err(GrError::PluginDisabled {
            status: other.to_string(),
        }),
        None => Err(GrError::PluginDisabled {
            status: "NOT FOUND".to_string(),
        }),
    }
}

/// Uninstall the plugin. Returns false, touching nothing, when absent.
pub fn uninstall_plugin(instance: &dyn Instance) -> GrResult<bool> {
    if instance.get_plugin_status(GR_PLUGIN_NAME)?.is_none() {
        return Ok(false);
    }

    instance.uninstall_plugin(GR_PLUGIN_NAME)?;
    log_event(
        Event::PluginUninstalled,
        &instance.get_connection_endpoint(),
        &[],
    );
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeInstance;
    use crate::version::Version;

    fn fake() -> FakeInstance {
        FakeInstance::new(Version::new(8, 0, 36))
    }

    #[test]
    fn test_install_twice() {
        let instance = fake();
        assert!(install_plugin(&instance).unwrap());
        assert!(!install_plugin(&instance).unwrap());
        assert_eq!(instance.plugin_calls(), vec!["INSTALL"]);
    }

    #[test]
    fn test_install_on_active_plugin_is_noop() {
        let instance = fake().with_plugin_status(Some("ACTIVE"));
        assert!(!install_plugin(&instance).unwrap());
        assert!(instance.plugin_calls().is_empty());
    }

    #[test]
    fn test_disabled_plugin_is_reported() {
        let instance = fake().with_plugin_status(Some("DISABLED"));
        let err = install_plugin(&instance).unwrap_err();
        assert_eq!(
            err,
            GrError::PluginDisabled {
                status: "DISABLED".into()
            }
        );
        assert!(instance.plugin_calls().is_empty());
    }

    #[test]
    fn test_freshly_installed_but_inactive() {
        let instance = fake().with_plugin_status_after_install(Some("INACTIVE"));
        let err = install_plugin(&instance).unwrap_err();
        assert!(err.to_string().contains("INACTIVE"));
        assert_eq!(instance.plugin_calls(), vec!["INSTALL"]);
    }

    #[test]
    fn test_uninstall_absent_is_noop() {
        let instance = fake();
        assert!(!uninstall_plugin(&instance).unwrap());
        assert!(instance.plugin_calls().is_empty());
    }

    #[test]
    fn test_uninstall_present() {
        let instance = fake().with_plugin_status(Some("DISABLED"));
        assert!(uninstall_plugin(&instance).unwrap());
        assert_eq!(get_plugin_status(&instance).unwrap(), None);
        assert!(!uninstall_plugin(&instance).unwrap());
    }
}

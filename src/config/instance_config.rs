//! Config backed by a live instance plus an optional option file

use super::option_file::{OptionFile, MYSQLD_SECTION};
use super::{Config, ConfigScope};
use crate::errors::{GrError, GrResult};
use crate::group_replication::requires_restart;
use crate::instance::{Instance, VarScope};
use crate::observability::{log_event, Event};

struct PendingChange {
    variable: String,
    value: String,
    scope: ConfigScope,
}

/// Server handler for RUNTIME/PERSISTED, option-file handler for CONFIG_FILE.
///
/// PERSISTED writes to variables that cannot change at runtime go out as
/// `SET PERSIST_ONLY`; everything else as `SET PERSIST`.
pub struct InstanceConfig<'a> {
    instance: &'a dyn Instance,
    option_file: Option<OptionFile>,
    pending: Vec<PendingChange>,
}

impl<'a> InstanceConfig<'a> {
    /// Server-only config
    pub fn new(instance: &'a dyn Instance) -> Self {
        Self {
            instance,
            option_file: None,
            pending: Vec::new(),
        }
    }

    /// Server config plus an option file
    pub fn with_option_file(instance: &'a dyn Instance, option_file: OptionFile) -> Self {
        Self {
            instance,
            option_file: Some(option_file),
            pending: Vec::new(),
        }
    }

    pub fn option_file(&self) -> Option<&OptionFile> {
        self.option_file.as_ref()
    }

    /// Number of staged, unapplied changes
    pub fn pending_changes(&self) -> usize {
        self.pending.len()
    }
}

impl Config for InstanceConfig<'_> {
    fn read(&self, variable: &str) -> GrResult<Option<String>> {
        Ok(self
            .option_file
            .as_ref()
            .and_then(|file| file.get(MYSQLD_SECTION, variable)))
    }

    fn write(&mut self, variable: &str, value: &str, scope: ConfigScope) -> GrResult<()> {
        if scope == ConfigScope::ConfigFile && self.option_file.is_none() {
            return Err(GrError::validation(format!(
                "cannot change '{}' in the option file: no option file was given for '{}'",
                variable,
                self.instance.get_connection_endpoint()
            )));
        }
        self.pending.push(PendingChange {
            variable: variable.to_string(),
            value: value.to_string(),
            scope,
        });
        Ok(())
    }

    fn apply(&mut self) -> GrResult<()> {
        let endpoint = self.instance.get_connection_endpoint();
        let mut file_changed = false;

        for change in std::mem::take(&mut self.pending) {
            match change.scope {
                ConfigScope::Runtime => {
                    self.instance
                        .set_sysvar(&change.variable, &change.value, VarScope::Global)?;
                }
                ConfigScope::Persisted => {
                    let scope = if requires_restart(&change.variable) {
                        VarScope::PersistOnly
                    } else {
                        VarScope::Persist
                    };
                    self.instance
                        .set_sysvar(&change.variable, &change.value, scope)?;
                }
                ConfigScope::ConfigFile => {
                    // write() refuses CONFIG_FILE without a file
                    if let Some(file) = self.option_file.as_mut() {
                        file.set(MYSQLD_SECTION, &change.variable, &change.value);
                        file_changed = true;
                    }
                }
            }
            log_event(
                Event::SettingApplied,
                &endpoint,
                &[
                    ("variable", &change.variable),
                    ("value", &change.value),
                    ("scope", change.scope.as_str()),
                ],
            );
        }

        if file_changed {
            if let Some(file) = self.option_file.as_ref() {
                file.save()?;
                let path = file.path().display().to_string();
                log_event(Event::OptionFileSaved, &endpoint, &[("path", &path)]);
            }
        }
        Ok(())
    }

    fn has_option_file(&self) -> bool {
        self.option_file.is_some()
    }
}

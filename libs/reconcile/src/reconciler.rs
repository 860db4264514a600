//! Read, test and apply a single instance configuration option.
//!
//! Each call is self-contained:
//! - connect to the instance
//! - locate the option by display name
//! - compare or assign its value
//! - decide whether the instance needs a restart
//!
//! Nothing is cached between calls and nothing is retried.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::capability::{
    ActiveNodeDetector, ConfigOption, Connector, HostNameResolver, InstanceConnection,
    ServiceRestarter,
};
use crate::error::{ReconcileError, Result};
use crate::messages::{MessageKey, Messages};
use crate::types::{
    require_non_empty, ApplyOutcome, DesiredState, ObservedState, TestOutcome,
    DEFAULT_RESTART_TIMEOUT_SECS,
};

/// External capabilities used by the reconciler.
#[derive(Clone)]
pub struct Capabilities {
    pub connector: Arc<dyn Connector>,
    pub active_node: Arc<dyn ActiveNodeDetector>,
    pub restarter: Arc<dyn ServiceRestarter>,
    pub host: Arc<dyn HostNameResolver>,
}

/// Reconciler for one named configuration option.
pub struct Reconciler {
    caps: Capabilities,
    messages: Arc<Messages>,
}

impl Reconciler {
    /// Create a new reconciler.
    pub fn new(caps: Capabilities, messages: Arc<Messages>) -> Self {
        Self { caps, messages }
    }

    /// Message table used for diagnostics.
    pub fn messages(&self) -> &Messages {
        &self.messages
    }

    /// Read the current value of an option.
    ///
    /// Restart settings in the result carry their defaults; use
    /// [`Reconciler::read_state`] to echo a caller's desired state.
    pub fn read(
        &self,
        server_name: Option<&str>,
        instance_name: &str,
        option_name: &str,
    ) -> Result<ObservedState> {
        require_non_empty("instance_name", instance_name)?;
        require_non_empty("option_name", option_name)?;
        let server = self.resolve_server(server_name);
        self.observe(&server, instance_name, option_name, false, DEFAULT_RESTART_TIMEOUT_SECS)
    }

    /// Read the option named by a desired state, echoing its restart settings.
    pub fn read_state(&self, desired: &DesiredState) -> Result<ObservedState> {
        desired.validate()?;
        let server = self.resolve_server(desired.explicit_server_name());
        self.observe(
            &server,
            &desired.instance_name,
            &desired.option_name,
            desired.restart_service,
            desired.restart_timeout_secs,
        )
    }

    /// Compare the live value against the desired value.
    pub fn test(&self, desired: &DesiredState) -> Result<TestOutcome> {
        self.evaluate(desired).map(|(outcome, _)| outcome)
    }

    /// Like [`Reconciler::test`], also returning the snapshot it compared.
    pub fn evaluate(&self, desired: &DesiredState) -> Result<(TestOutcome, ObservedState)> {
        let observed = self.read_state(desired)?;

        if desired.process_only_on_active_node && !observed.is_active_node {
            info!(
                server = %observed.server_name,
                instance = %observed.instance_name,
                "{}",
                self.messages.format(
                    MessageKey::NotActiveNode,
                    &[("server", &observed.server_name), ("instance", &observed.instance_name)],
                )
            );
            return Ok((TestOutcome::NotApplicable, observed));
        }

        if observed.option_value == desired.option_value {
            info!(
                option = %observed.option_name,
                value = observed.option_value,
                "{}",
                self.messages.format(
                    MessageKey::InDesiredState,
                    &[("option", &observed.option_name), ("value", &observed.option_value)],
                )
            );
            Ok((TestOutcome::Satisfied, observed))
        } else {
            info!(
                option = %observed.option_name,
                actual = observed.option_value,
                expected = desired.option_value,
                "{}",
                self.messages.format(
                    MessageKey::NotInDesiredState,
                    &[
                        ("option", &observed.option_name),
                        ("actual", &observed.option_value),
                        ("expected", &desired.option_value),
                    ],
                )
            );
            Ok((TestOutcome::Unsatisfied, observed))
        }
    }

    /// Assign the desired value, commit it and run the restart decision.
    ///
    /// Active-node gating is not evaluated here; callers that want it must
    /// run [`Reconciler::test`] first.
    pub fn apply(&self, desired: &DesiredState) -> Result<ApplyOutcome> {
        desired.validate()?;
        let server = self.resolve_server(desired.explicit_server_name());
        let instance = desired.instance_name.as_str();
        let mut connection = self.connect(&server, instance)?;

        let index = self.locate(connection.options(), &desired.option_name)?;
        let option = connection
            .options_mut()
            .get_mut(index)
            .ok_or_else(|| not_found(&desired.option_name))?;
        let option_name = option.display_name().to_string();
        let is_dynamic = option.is_dynamic();

        if option.configured_value() == desired.option_value {
            debug!(
                option = %option_name,
                value = desired.option_value,
                "Value already set, committing anyway"
            );
        }
        info!(
            option = %option_name,
            value = desired.option_value,
            "{}",
            self.messages.format(
                MessageKey::UpdatingOption,
                &[("option", &option_name), ("value", &desired.option_value)],
            )
        );
        option.assign(desired.option_value);
        connection.commit()?;
        info!(
            option = %option_name,
            value = desired.option_value,
            "{}",
            self.messages.format(
                MessageKey::OptionUpdated,
                &[("option", &option_name), ("value", &desired.option_value)],
            )
        );

        if is_dynamic {
            info!(
                option = %option_name,
                "{}",
                self.messages
                    .format(MessageKey::NoRestartNeeded, &[("option", &option_name)])
            );
            return Ok(ApplyOutcome::NoRestartNeeded);
        }

        if desired.restart_service {
            info!(
                server = %server,
                instance = %instance,
                timeout_secs = desired.restart_timeout_secs,
                "{}",
                self.messages.format(
                    MessageKey::RestartingService,
                    &[
                        ("server", &server),
                        ("instance", &instance),
                        ("timeout", &desired.restart_timeout_secs),
                    ],
                )
            );
            self.caps
                .restarter
                .restart(&server, instance, desired.restart_timeout())?;
            info!(
                server = %server,
                instance = %instance,
                "{}",
                self.messages.format(
                    MessageKey::RestartCompleted,
                    &[("server", &server), ("instance", &instance)],
                )
            );
            return Ok(ApplyOutcome::Restarted);
        }

        warn!(
            server = %server,
            instance = %instance,
            option = %option_name,
            value = desired.option_value,
            "{}",
            self.messages.format(
                MessageKey::RestartRequired,
                &[
                    ("option", &option_name),
                    ("value", &desired.option_value),
                    ("server", &server),
                    ("instance", &instance),
                ],
            )
        );
        Ok(ApplyOutcome::RestartRequired)
    }

    fn observe(
        &self,
        server: &str,
        instance: &str,
        option_name: &str,
        restart_service: bool,
        restart_timeout_secs: u32,
    ) -> Result<ObservedState> {
        let connection = self.connect(server, instance)?;
        let is_active_node = self.caps.active_node.is_active(connection.as_ref());

        info!(
            server = %server,
            instance = %instance,
            option = %option_name,
            "{}",
            self.messages.format(
                MessageKey::ReadingOption,
                &[("option", &option_name), ("server", &server), ("instance", &instance)],
            )
        );
        let options = connection.options();
        let option = self
            .locate(options, option_name)
            .and_then(|index| options.get(index).ok_or_else(|| not_found(option_name)))?;

        info!(
            option = %option.display_name(),
            value = option.configured_value(),
            "{}",
            self.messages.format(
                MessageKey::OptionValue,
                &[("option", &option.display_name()), ("value", &option.configured_value())],
            )
        );

        Ok(ObservedState {
            server_name: server.to_string(),
            instance_name: instance.to_string(),
            option_name: option.display_name().to_string(),
            option_value: option.configured_value(),
            restart_service,
            restart_timeout_secs,
            is_active_node,
        })
    }

    fn connect(&self, server: &str, instance: &str) -> Result<Box<dyn InstanceConnection>> {
        debug!(
            server = %server,
            instance = %instance,
            "{}",
            self.messages.format(
                MessageKey::Connecting,
                &[("server", &server), ("instance", &instance)],
            )
        );
        Ok(self.caps.connector.connect(server, instance)?)
    }

    /// Index of the first option whose display name matches exactly.
    fn locate(&self, options: &[ConfigOption], option_name: &str) -> Result<usize> {
        let mut matches = options
            .iter()
            .enumerate()
            .filter(|(_, option)| option.display_name() == option_name)
            .map(|(index, _)| index);

        let first = matches.next().ok_or_else(|| not_found(option_name))?;
        let extra = matches.count();
        if extra > 0 {
            let count = extra + 1;
            warn!(
                option = %option_name,
                count,
                "{}",
                self.messages.format(
                    MessageKey::DuplicateOption,
                    &[("count", &count), ("option", &option_name)],
                )
            );
        }
        Ok(first)
    }

    fn resolve_server(&self, server_name: Option<&str>) -> String {
        match server_name.filter(|s| !s.trim().is_empty()) {
            Some(server) => server.to_string(),
            None => self.caps.host.local_computer_name(),
        }
    }
}

fn not_found(option_name: &str) -> ReconcileError {
    ReconcileError::OptionNotFound {
        option: option_name.to_string(),
    }
}

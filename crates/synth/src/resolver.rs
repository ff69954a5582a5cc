use agentconf_topology::{
    Application, ApplicationType, InstrumentationPolicy, InstrumentationSettings,
};
use std::net::IpAddr;

use crate::entry::InstrumentationEntry;

/// Where a resolved instrumentation came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsSource {
    Override,
    Default,
}

/// Read-only instrumentation template for one application type.
///
/// Borrows the settings it was resolved from; [`Instrumentation::instantiate`]
/// builds an owned entry per instance.
#[derive(Debug, Clone, Copy)]
pub struct Instrumentation<'a> {
    application_type: ApplicationType,
    settings: &'a InstrumentationSettings,
    source: SettingsSource,
}

impl<'a> Instrumentation<'a> {
    pub fn application_type(&self) -> ApplicationType {
        self.application_type
    }

    pub fn port(&self) -> u16 {
        self.settings.port
    }

    pub fn settings(&self) -> &'a InstrumentationSettings {
        self.settings
    }

    pub fn source(&self) -> SettingsSource {
        self.source
    }

    /// Copy the template into a new entry targeting `host`
    pub fn instantiate(&self, host: IpAddr) -> InstrumentationEntry {
        InstrumentationEntry {
            application_type: self.application_type,
            enabled: self.settings.enabled,
            port: self.settings.port,
            host: host.to_string(),
            credentials: self.settings.credentials.clone(),
            params: self.settings.params.clone(),
        }
    }
}

/// Decide whether `t` is instrumentable for `app`.
///
/// Override first, then the policy default. Disabled settings and
/// credential-requiring types without a full username/password pair yield
/// `None`.
pub fn resolve<'a>(
    app: &'a Application,
    t: ApplicationType,
    policy: &'a InstrumentationPolicy,
) -> Option<Instrumentation<'a>> {
    let (settings, source) = match app.instrumentation_override(t) {
        Some(settings) => (settings, SettingsSource::Override),
        None => (policy.default_for(t)?, SettingsSource::Default),
    };

    if !settings.enabled {
        log::debug!("{}: {t} instrumentation disabled", app.id);
        return None;
    }

    if policy.requires_credentials(t) && !settings.has_complete_credentials() {
        log::debug!("{}: {t} instrumentation skipped, credentials missing", app.id);
        return None;
    }

    Some(Instrumentation {
        application_type: t,
        settings,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentconf_topology::{ApplicationId, ApplicationKind};

    fn policy() -> InstrumentationPolicy {
        InstrumentationPolicy::builtin().unwrap()
    }

    fn app() -> Application {
        Application::new(ApplicationId::new(ApplicationKind::Deployment, "svc"))
    }

    #[test]
    fn default_is_used_without_override() {
        let policy = policy();
        let app = app();

        let resolved = resolve(&app, ApplicationType::Redis, &policy).expect("redis default");
        assert_eq!(resolved.port(), 6379);
        assert_eq!(resolved.source(), SettingsSource::Default);
    }

    #[test]
    fn override_wins_over_default() {
        let policy = policy();
        let app = app().override_instrumentation(
            ApplicationType::Redis,
            Some(InstrumentationSettings::new(6380)),
        );

        let resolved = resolve(&app, ApplicationType::Redis, &policy).expect("override");
        assert_eq!(resolved.port(), 6380);
        assert_eq!(resolved.source(), SettingsSource::Override);
    }

    #[test]
    fn null_override_falls_back_to_default() {
        let policy = policy();
        let app = app().override_instrumentation(ApplicationType::Redis, None);

        let resolved = resolve(&app, ApplicationType::Redis, &policy).expect("default");
        assert_eq!(resolved.source(), SettingsSource::Default);
    }

    #[test]
    fn type_without_default_or_override_is_not_instrumentable() {
        let policy = policy();
        assert!(resolve(&app(), ApplicationType::Kafka, &policy).is_none());
        assert!(resolve(&app(), ApplicationType::Unknown, &policy).is_none());
    }

    #[test]
    fn disabled_override_yields_nothing() {
        let policy = policy();
        let app = app().override_instrumentation(
            ApplicationType::Redis,
            Some(InstrumentationSettings::new(6379).disabled()),
        );
        assert!(resolve(&app, ApplicationType::Redis, &policy).is_none());
    }

    #[test]
    fn credential_types_require_username_and_password() {
        let policy = policy();
        let cases: Vec<(Option<(&str, &str)>, bool)> = vec![
            (None, false),
            (Some(("", "")), false),
            (Some(("agent", "")), false),
            (Some(("", "secret")), false),
            (Some(("agent", "secret")), true),
        ];

        for t in [ApplicationType::Postgres, ApplicationType::Mysql] {
            // default settings carry no credentials
            assert!(resolve(&app(), t, &policy).is_none());

            for (creds, expected) in &cases {
                let mut settings = InstrumentationSettings::new(1234);
                if let Some((user, pass)) = creds {
                    settings = settings.credentials(user, pass);
                }
                let app = app().override_instrumentation(t, Some(settings));
                assert_eq!(
                    resolve(&app, t, &policy).is_some(),
                    *expected,
                    "{t} with {creds:?}"
                );
            }
        }
    }

    #[test]
    fn credential_rule_is_policy_driven() {
        let mut policy = policy();
        policy.credentials_required.insert(ApplicationType::Redis);
        assert!(resolve(&app(), ApplicationType::Redis, &policy).is_none());

        policy.credentials_required.remove(&ApplicationType::Postgres);
        let app = app();
        let resolved = resolve(&app, ApplicationType::Postgres, &policy);
        assert_eq!(resolved.map(|i| i.port()), Some(5432));
    }

    #[test]
    fn instantiated_entries_do_not_alias_the_template() {
        let policy = policy();
        let app = app().override_instrumentation(
            ApplicationType::Postgres,
            Some(
                InstrumentationSettings::new(5432)
                    .credentials("agent", "secret")
                    .param("sslmode", "disable"),
            ),
        );
        let template = resolve(&app, ApplicationType::Postgres, &policy).expect("resolved");

        let mut first = template.instantiate("10.0.0.1".parse().unwrap());
        let second = template.instantiate("10.0.0.2".parse().unwrap());
        first.host.push_str("-mutated");
        first.params.insert("sslmode".into(), "require".into());

        assert_eq!(second.host, "10.0.0.2");
        assert_eq!(second.params["sslmode"], "disable");
        assert_eq!(template.settings().params["sslmode"], "disable");
    }
}

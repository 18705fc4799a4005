use gatelease_core::{AppError, AppResult};
use gatelease_domain::PortAllowList;

/// Immutable lifecycle configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    grant_duration_minutes: u32,
    allowed_ports: PortAllowList,
}

impl LifecycleConfig {
    /// Creates a validated lifecycle configuration.
    pub fn new(grant_duration_minutes: u32, allowed_ports: PortAllowList) -> AppResult<Self> {
        if grant_duration_minutes == 0 {
            return Err(AppError::Validation(
                "grant duration must be greater than zero minutes".to_owned(),
            ));
        }

        Ok(Self {
            grant_duration_minutes,
            allowed_ports,
        })
    }

    /// Returns the fixed grant duration in minutes.
    #[must_use]
    pub fn grant_duration_minutes(&self) -> u32 {
        self.grant_duration_minutes
    }

    /// Returns the allow-list of permitted ports.
    #[must_use]
    pub fn allowed_ports(&self) -> &PortAllowList {
        &self.allowed_ports
    }
}

#[cfg(test)]
mod tests {
    use gatelease_domain::PortAllowList;

    use super::LifecycleConfig;

    #[test]
    fn zero_duration_is_rejected() {
        let Ok(allow_list) = PortAllowList::new([22]) else {
            panic!("allow-list must build");
        };

        assert!(LifecycleConfig::new(0, allow_list).is_err());
    }

    #[test]
    fn valid_configuration_is_accepted() {
        let Ok(allow_list) = PortAllowList::new([22, 443]) else {
            panic!("allow-list must build");
        };

        let config = LifecycleConfig::new(15, allow_list);
        assert!(config.is_ok_and(|config| config.grant_duration_minutes() == 15));
    }
}

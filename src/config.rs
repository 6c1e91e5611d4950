use anyhow::{Context, Result};
use pytesbms_lib::publish::{Channel, ChannelSet};
use serde::Deserialize;

/// Channel selection file.
///
/// ```yaml
/// summary: [voltage, current, soc, basic_status]
/// batteries:
///   - [voltage, current, temperature, coulomb]
///   - [voltage, current]
/// ```
///
/// Without `batteries` every battery publishes all channels, otherwise a
/// battery beyond the listed ones publishes nothing.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct ChannelConfig {
    summary: Option<Vec<Channel>>,
    batteries: Option<Vec<Vec<Channel>>>,
}

impl ChannelConfig {
    pub fn load(config_file_path: &str) -> Result<Self> {
        log::debug!("Loading channel config from {config_file_path:?}");
        let config_file = std::fs::File::open(config_file_path)
            .with_context(|| format!("Cannot open channel config file {config_file_path:?}"))?;
        let config: Self = serde_yaml::from_reader(&config_file).with_context(|| {
            format!("Cannot read channel config from file: {config_file_path:?}")
        })?;
        Ok(config)
    }

    pub fn summary(&self) -> ChannelSet {
        match &self.summary {
            Some(channels) => channels.iter().copied().collect(),
            None => ChannelSet::summary(),
        }
    }

    /// Channels of battery `index` (1-based).
    pub fn battery(&self, index: usize) -> ChannelSet {
        match &self.batteries {
            Some(batteries) => index
                .checked_sub(1)
                .and_then(|i| batteries.get(i))
                .map(|channels| channels.iter().copied().collect())
                .unwrap_or_default(),
            None => ChannelSet::all(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_with_alias() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "summary: [voltage, basic_status]\nbatteries:\n  - [voltage, coulomb]\n  - [soc_voltage]"
        )
        .unwrap();
        let config = ChannelConfig::load(file.path().to_str().unwrap()).unwrap();

        let summary = config.summary();
        assert!(summary.contains(Channel::Voltage));
        assert!(summary.contains(Channel::BasicStatus));
        assert!(!summary.contains(Channel::Current));

        assert!(config.battery(1).contains(Channel::Soc));
        assert!(!config.battery(1).contains(Channel::Current));
        assert!(config.battery(2).contains(Channel::SocVoltage));
        assert!(config.battery(3).is_empty());
    }

    #[test]
    fn defaults_enable_everything() {
        let config = ChannelConfig::default();
        assert_eq!(config.summary(), ChannelSet::summary());
        assert_eq!(config.battery(5), ChannelSet::all());
    }

    #[test]
    fn unknown_channel_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "summary: [wattage]").unwrap();
        assert!(ChannelConfig::load(file.path().to_str().unwrap()).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(ChannelConfig::load("/nonexistent/channels.yaml").is_err());
    }
}

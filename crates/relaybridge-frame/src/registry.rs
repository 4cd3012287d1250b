use std::collections::HashMap;

use relaybridge_transport::DeliveryMode;
use tracing::debug;

use crate::channel::{channel_name, default_channels, ChannelConfig, ChannelId, DEFAULT};
use crate::error::{FrameError, Result};

/// Immutable mapping from channel id to relay delivery mode.
#[derive(Debug, Clone)]
pub struct ChannelRegistry {
    channels: Vec<ChannelConfig>,
    modes: HashMap<ChannelId, DeliveryMode>,
}

impl ChannelRegistry {
    /// Register `defaults` followed by `user` channels, preserving order.
    ///
    /// Fails if any channel id appears more than once across both lists.
    pub fn build(defaults: &[ChannelConfig], user: &[ChannelConfig]) -> Result<Self> {
        let mut channels = Vec::with_capacity(defaults.len() + user.len());
        let mut modes = HashMap::with_capacity(defaults.len() + user.len());

        for channel in defaults.iter().chain(user) {
            if modes
                .insert(channel.id, channel.policy.delivery_mode())
                .is_some()
            {
                return Err(FrameError::DuplicateChannel(channel.id));
            }
            channels.push(channel.clone());
        }

        debug!(count = channels.len(), "channel registry built");
        Ok(Self { channels, modes })
    }

    /// Built-in channels followed by `user`.
    pub fn with_defaults(user: &[ChannelConfig]) -> Result<Self> {
        Self::build(&default_channels(), user)
    }

    /// Delivery mode of a registered channel.
    pub fn delivery_mode(&self, channel: ChannelId) -> Option<DeliveryMode> {
        self.modes.get(&channel).copied()
    }

    /// Delivery mode for a send on `channel`.
    ///
    /// Unregistered channels fall back to the [`DEFAULT`] channel's mode,
    /// then to reliable delivery.
    pub fn resolve(&self, channel: ChannelId) -> DeliveryMode {
        self.delivery_mode(channel)
            .or_else(|| self.delivery_mode(DEFAULT))
            .unwrap_or(DeliveryMode::Reliable)
    }

    /// Declared name of a registered channel, else the built-in name for
    /// the id.
    pub fn name(&self, channel: ChannelId) -> &str {
        match self.channels.iter().find(|config| config.id == channel) {
            Some(config) => config.display_name(),
            None => channel_name(channel),
        }
    }

    pub fn contains(&self, channel: ChannelId) -> bool {
        self.modes.contains_key(&channel)
    }

    /// Registered channels in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ChannelConfig> {
        self.channels.iter()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        let channels = default_channels();
        let modes = channels
            .iter()
            .map(|channel| (channel.id, channel.policy.delivery_mode()))
            .collect();
        Self { channels, modes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{ChannelPolicy, INTERNAL, TIME_SYNC, USER_CHANNEL_START};

    #[test]
    fn defaults_are_always_present() {
        let registry = ChannelRegistry::with_defaults(&[]).expect("defaults should register");
        assert_eq!(registry.len(), default_channels().len());
        assert!(registry.contains(DEFAULT));
        assert_eq!(registry.delivery_mode(TIME_SYNC), Some(DeliveryMode::Unreliable));
        assert_eq!(registry.delivery_mode(INTERNAL), Some(DeliveryMode::Reliable));
    }

    #[test]
    fn user_channels_follow_defaults_in_order() {
        let user = [
            ChannelConfig::named(USER_CHANNEL_START + 1, "b", ChannelPolicy::Unreliable),
            ChannelConfig::named(USER_CHANNEL_START, "a", ChannelPolicy::Reliable),
        ];
        let registry = ChannelRegistry::with_defaults(&user).expect("channels should register");

        let ids: Vec<ChannelId> = registry.iter().map(|c| c.id).collect();
        let defaults = default_channels().len();
        assert_eq!(ids[defaults], USER_CHANNEL_START + 1);
        assert_eq!(ids[defaults + 1], USER_CHANNEL_START);
        assert_eq!(
            registry.delivery_mode(USER_CHANNEL_START + 1),
            Some(DeliveryMode::Unreliable)
        );
    }

    #[test]
    fn names_prefer_declared_channel_names() {
        let user = [
            ChannelConfig::named(USER_CHANNEL_START, "chat", ChannelPolicy::Reliable),
            ChannelConfig::new(USER_CHANNEL_START + 1, ChannelPolicy::Unreliable),
        ];
        let registry = ChannelRegistry::with_defaults(&user).expect("channels should register");

        assert_eq!(registry.name(USER_CHANNEL_START), "chat");
        assert_eq!(registry.name(USER_CHANNEL_START + 1), "USER");
        assert_eq!(registry.name(DEFAULT), "DEFAULT");
        assert_eq!(registry.name(200), "USER");
    }

    #[test]
    fn duplicate_channel_is_rejected() {
        let user = [ChannelConfig::new(DEFAULT, ChannelPolicy::Unreliable)];
        let err = ChannelRegistry::with_defaults(&user).expect_err("duplicate should fail");
        assert!(matches!(err, FrameError::DuplicateChannel(DEFAULT)));
    }

    #[test]
    fn unknown_channel_resolves_through_default() {
        let registry = ChannelRegistry::with_defaults(&[]).expect("defaults should register");
        assert_eq!(registry.resolve(200), DeliveryMode::Reliable);

        let unreliable_default = [ChannelConfig::new(DEFAULT, ChannelPolicy::Unreliable)];
        let registry = ChannelRegistry::build(&unreliable_default, &[])
            .expect("single channel should register");
        assert_eq!(registry.resolve(200), DeliveryMode::Unreliable);

        let registry = ChannelRegistry::build(&[], &[]).expect("empty registry should build");
        assert_eq!(registry.resolve(200), DeliveryMode::Reliable);
    }

    #[test]
    fn default_impl_matches_with_defaults() {
        let built = ChannelRegistry::with_defaults(&[]).expect("defaults should register");
        let default = ChannelRegistry::default();
        assert_eq!(built.len(), default.len());
        for channel in built.iter() {
            assert_eq!(
                built.delivery_mode(channel.id),
                default.delivery_mode(channel.id)
            );
        }
    }
}

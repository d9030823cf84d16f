use serde::Serialize;

use crate::detection::region::Channel;

/// Caller-owned smoothing state for confidences across successive scans.
///
/// A fresh tracker passes the first confidence through unchanged; later scans
/// are averaged 50/50 with the previous value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct HeatTracker {
    pub notifications: f64,
    pub messages: f64,
}

impl HeatTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Notifications => self.notifications,
            Channel::Messages => self.messages,
        }
    }

    /// Blends `latest` into the channel's heat and returns the new value.
    pub fn update(&mut self, channel: Channel, latest: f64) -> f64 {
        let slot = match channel {
            Channel::Notifications => &mut self.notifications,
            Channel::Messages => &mut self.messages,
        };
        *slot = blend(*slot, latest);
        *slot
    }
}

pub fn blend(previous: f64, latest: f64) -> f64 {
    if previous == 0.0 {
        latest
    } else {
        previous * 0.5 + latest * 0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_tracker_passes_latest_through() {
        assert_eq!(blend(0.0, 0.42), 0.42);
        let mut heat = HeatTracker::new();
        assert_eq!(heat.update(Channel::Messages, 0.8), 0.8);
        assert_eq!(heat.get(Channel::Notifications), 0.0);
    }

    #[test]
    fn repeated_updates_average() {
        let mut heat = HeatTracker::new();
        heat.update(Channel::Notifications, 0.9);
        assert!((heat.update(Channel::Notifications, 0.35) - 0.625).abs() < 1e-12);
        assert!((heat.update(Channel::Notifications, 0.35) - 0.4875).abs() < 1e-12);
    }
}

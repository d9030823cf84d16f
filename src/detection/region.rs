use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::MonitorConfig;
use crate::error::MonitorError;

/// The two badge kinds tracked on the top bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Notifications,
    Messages,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Notifications, Channel::Messages];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Notifications => "notifications",
            Channel::Messages => "messages",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized fractional rectangle sampled from the screen for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BadgeRegion {
    pub channel: Channel,
    pub x_start: f64,
    pub x_end: f64,
    pub y_start: f64,
    pub y_end: f64,
}

/// Pixel rectangle resolved from a [`BadgeRegion`] against a concrete image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBounds {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl PixelBounds {
    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }

    pub fn area(&self) -> u32 {
        self.width() * self.height()
    }
}

impl BadgeRegion {
    pub fn new(channel: Channel, x_start: f64, x_end: f64, y_start: f64, y_end: f64) -> Self {
        Self {
            channel,
            x_start,
            x_end,
            y_start,
            y_end,
        }
    }

    /// Clips every bound into [0, 1] independently. Start/end are never swapped,
    /// so an inverted region stays inverted and is rejected later.
    pub fn clamp(&self) -> Self {
        Self {
            channel: self.channel,
            x_start: self.x_start.clamp(0.0, 1.0),
            x_end: self.x_end.clamp(0.0, 1.0),
            y_start: self.y_start.clamp(0.0, 1.0),
            y_end: self.y_end.clamp(0.0, 1.0),
        }
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.x_start < self.x_end && self.y_start < self.y_end)
    }

    pub fn ensure_valid(&self) -> Result<(), MonitorError> {
        if self.is_degenerate() {
            return Err(self.invalid());
        }
        Ok(())
    }

    /// Resolves the fractions against an image size. Fails when the resulting
    /// rectangle has no pixels.
    pub fn pixel_bounds(&self, width: u32, height: u32) -> Result<PixelBounds, MonitorError> {
        let left = scale(self.x_start, width);
        let right = scale(self.x_end, width).min(width);
        let top = scale(self.y_start, height);
        let bottom = scale(self.y_end, height).min(height);

        if right <= left || bottom <= top {
            return Err(self.invalid());
        }

        Ok(PixelBounds {
            left,
            top,
            right,
            bottom,
        })
    }

    pub fn bounds(&self) -> [f64; 4] {
        [self.x_start, self.y_start, self.x_end, self.y_end]
    }

    fn invalid(&self) -> MonitorError {
        MonitorError::InvalidRegion {
            channel: self.channel,
            bounds: self.bounds(),
        }
    }
}

fn scale(fraction: f64, extent: u32) -> u32 {
    (extent as f64 * fraction).floor().max(0.0) as u32
}

/// Redundant candidate regions per channel, all sharing the top-bar band.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionSet {
    pub notifications: Vec<BadgeRegion>,
    pub messages: Vec<BadgeRegion>,
}

impl RegionSet {
    pub fn get(&self, channel: Channel) -> &[BadgeRegion] {
        match channel {
            Channel::Notifications => &self.notifications,
            Channel::Messages => &self.messages,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &BadgeRegion> {
        self.notifications.iter().chain(self.messages.iter())
    }

    /// Fail-fast check of every region after clamping.
    pub fn validate(&self) -> Result<(), MonitorError> {
        self.iter().try_for_each(BadgeRegion::ensure_valid)
    }
}

/// Expands the configured column bands into clamped regions per channel.
pub fn as_regions(config: &MonitorConfig) -> RegionSet {
    let expand = |channel: Channel, bands: &[(f64, f64)]| -> Vec<BadgeRegion> {
        bands
            .iter()
            .map(|&(start, end)| {
                BadgeRegion::new(
                    channel,
                    start,
                    end,
                    config.top_bar_y_start,
                    config.top_bar_y_end,
                )
                .clamp()
            })
            .collect()
    };

    RegionSet {
        notifications: expand(Channel::Notifications, &config.notification_regions),
        messages: expand(Channel::Messages, &config.message_regions),
    }
}

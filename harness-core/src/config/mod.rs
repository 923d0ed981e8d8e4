//! Harness timing and feature parameters.

use core::time::Duration;

use crate::radio::PeriodicIntervalBounds;

/// How long scanning runs before timing out.
pub const DEFAULT_SCAN_DURATION: Duration = Duration::from_secs(10);
/// How long advertising runs before timing out.
pub const DEFAULT_ADVERTISE_DURATION: Duration = Duration::from_secs(10);
/// How long a central connection or periodic sync is held before teardown.
pub const DEFAULT_HOLD_DURATION: Duration = Duration::from_secs(10);
/// Nominal periodic advertising interval.
pub const DEFAULT_PERIODIC_INTERVAL: Duration = Duration::from_secs(1);
/// Supervision timeout requested when creating a periodic sync.
pub const DEFAULT_SYNC_TIMEOUT: Duration = Duration::from_secs(5);

/// Parameters consumed by the coordinator. Values are taken as given.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct HarnessConfig {
    pub scan_duration: Duration,
    pub advertise_duration: Duration,
    pub hold_duration: Duration,
    pub periodic_interval: Duration,
    pub sync_timeout: Duration,
    /// Whether the periodic toggle may be enabled at all.
    pub periodic_sync_supported: bool,
    /// Print every report received while scanning.
    pub list_scanned_devices: bool,
}

impl HarnessConfig {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            scan_duration: DEFAULT_SCAN_DURATION,
            advertise_duration: DEFAULT_ADVERTISE_DURATION,
            hold_duration: DEFAULT_HOLD_DURATION,
            periodic_interval: DEFAULT_PERIODIC_INTERVAL,
            sync_timeout: DEFAULT_SYNC_TIMEOUT,
            periodic_sync_supported: true,
            list_scanned_devices: false,
        }
    }

    #[must_use]
    pub const fn with_scan_duration(mut self, duration: Duration) -> Self {
        self.scan_duration = duration;
        self
    }

    #[must_use]
    pub const fn with_advertise_duration(mut self, duration: Duration) -> Self {
        self.advertise_duration = duration;
        self
    }

    #[must_use]
    pub const fn with_hold_duration(mut self, duration: Duration) -> Self {
        self.hold_duration = duration;
        self
    }

    #[must_use]
    pub const fn with_periodic_interval(mut self, interval: Duration) -> Self {
        self.periodic_interval = interval;
        self
    }

    #[must_use]
    pub const fn with_sync_timeout(mut self, timeout: Duration) -> Self {
        self.sync_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_periodic_sync_supported(mut self, supported: bool) -> Self {
        self.periodic_sync_supported = supported;
        self
    }

    #[must_use]
    pub const fn with_scanned_device_listing(mut self, enabled: bool) -> Self {
        self.list_scanned_devices = enabled;
        self
    }

    /// Interval bounds requested for periodic advertising.
    #[must_use]
    pub fn periodic_bounds(&self) -> PeriodicIntervalBounds {
        PeriodicIntervalBounds::around(self.periodic_interval)
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self::new()
    }
}

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use sysinfo::{Components, Disks, System};
use tracing::{info, warn};

use crate::broker::Publisher;
use crate::config::LifeConfig;
use crate::topic::AgentIdentity;

/// A point-in-time snapshot of the host's resources.
pub struct HostMetrics {
    /// Percent.
    pub cpu: f64,
    /// Percent of physical memory in use.
    pub memory: f64,
    /// Percent of the root filesystem in use.
    pub diskspace: f64,
    /// Degrees Celsius of the first thermal component, 0 if none.
    pub temperature: f64,
}

impl HostMetrics {
    /// One-shot sample for callers without a long-lived sampler.
    ///
    /// CPU usage needs two refreshes separated by sysinfo's minimum
    /// interval, so this blocks for ~200 ms and belongs on a blocking
    /// thread, not an async handler.
    pub fn sample_blocking() -> Self {
        let mut sampler = MetricsSampler::new();
        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        sampler.sample()
    }
}

/// Samples host resources against a long-lived system handle, so each
/// CPU figure is measured across the interval since the previous
/// sample rather than a fresh sub-millisecond window.
pub struct MetricsSampler {
    system: System,
}

impl MetricsSampler {
    pub fn new() -> Self {
        let mut system = System::new_all();
        system.refresh_all();
        Self { system }
    }

    pub fn sample(&mut self) -> HostMetrics {
        self.system.refresh_cpu();
        self.system.refresh_memory();

        let cpu = f64::from(self.system.global_cpu_info().cpu_usage());

        let total_memory = self.system.total_memory();
        let memory = if total_memory > 0 {
            self.system.used_memory() as f64 / total_memory as f64 * 100.0
        } else {
            0.0
        };

        let disks = Disks::new_with_refreshed_list();
        let diskspace = disks
            .first()
            .map(|disk| {
                let total = disk.total_space();
                if total > 0 {
                    (total - disk.available_space()) as f64 / total as f64 * 100.0
                } else {
                    0.0
                }
            })
            .unwrap_or(0.0);

        let components = Components::new_with_refreshed_list();
        let temperature = components
            .first()
            .map(|c| f64::from(c.temperature()))
            .unwrap_or(0.0);

        HostMetrics {
            cpu,
            memory,
            diskspace,
            temperature,
        }
    }
}

impl Default for MetricsSampler {
    fn default() -> Self {
        Self::new()
    }
}

/// Periodic self-telemetry.
///
/// Publishes the agent's own Life payload on its topic; the message
/// comes back through the wildcard subscription and is ingested by the
/// normal pipeline like any other entity's Life event. Independent of
/// the receive loop, sharing only the publisher handle.
pub async fn run(publisher: Arc<dyn Publisher>, identity: AgentIdentity, config: LifeConfig) {
    let life_topic = identity.life_topic();
    let mut sampler = MetricsSampler::new();

    // short grace period so the first tick lands after the broker is up
    tokio::time::sleep(Duration::from_secs(10)).await;

    loop {
        let metrics = sampler.sample();
        let payload = json!({
            "CPU": metrics.cpu.to_string(),
            "Memory": metrics.memory.to_string(),
            "Diskspace": metrics.diskspace.to_string(),
            "Temperature": metrics.temperature.to_string(),
            "Latitude": config.latitude,
            "Longitude": config.longitude,
        });

        match publisher.publish_json(&life_topic, &payload).await {
            Ok(()) => info!("Life statistics published"),
            Err(e) => warn!(error = %e, "Failed to publish life statistics"),
        }

        tokio::time::sleep(Duration::from_secs(config.interval_secs)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampler_yields_bounded_percentages() {
        let mut sampler = MetricsSampler::new();
        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        let metrics = sampler.sample();

        assert!(metrics.cpu >= 0.0);
        assert!((0.0..=100.0).contains(&metrics.memory));
        assert!((0.0..=100.0).contains(&metrics.diskspace));
        assert!(metrics.temperature >= 0.0);
    }

    #[test]
    fn sampler_survives_repeated_sampling() {
        let mut sampler = MetricsSampler::new();
        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        let first = sampler.sample();
        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        let second = sampler.sample();

        assert!(first.cpu.is_finite());
        assert!(second.cpu.is_finite());
    }
}

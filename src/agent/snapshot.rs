//! One telemetry snapshot of the host, as served on `/api/sysinfo/all`.
//!
//! Collection never fails as a whole. Whatever cannot be read is left at
//! its zero value and reported as a warning next to the snapshot.

use serde::Serialize;
use sysinfo::{Components, Disks, System};

use super::config::SystemRequest;

/// Sensor labels tried, in order, when no sensor is configured.
const CPU_SENSOR_HINTS: [&str; 4] = ["package id 0", "tctl", "coretemp", "cpu"];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SystemInfo {
    pub hostname: String,
    pub platform: String,
    /// Seconds.
    pub uptime: u64,
    /// Unix timestamp.
    pub boot_time: u64,
    pub cpu: CpuInfo,
    pub memory: MemoryInfo,
    pub mountpoints: Vec<MountpointInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CpuInfo {
    pub load1_percent: u8,
    pub load15_percent: u8,
    pub temperature_available: bool,
    pub temperature_c: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MemoryInfo {
    pub total_mb: u64,
    pub used_mb: u64,
    pub used_percent: u8,
    pub swap_total_mb: u64,
    pub swap_used_mb: u64,
    pub swap_used_percent: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MountpointInfo {
    pub path: String,
    pub name: String,
    pub total_mb: u64,
    pub used_mb: u64,
    pub used_percent: u8,
}

// ── Collection ────────────────────────────────────────────────────────────────

pub fn collect(request: &SystemRequest) -> (SystemInfo, Vec<String>) {
    let mut warnings = Vec::new();

    let hostname = System::host_name().unwrap_or_else(|| {
        warnings.push("could not determine hostname".to_string());
        String::new()
    });
    let platform = System::long_os_version().unwrap_or_else(|| {
        warnings.push("could not determine platform".to_string());
        String::new()
    });

    let info = SystemInfo {
        hostname,
        platform,
        uptime: System::uptime(),
        boot_time: System::boot_time(),
        cpu: cpu(request, &mut warnings),
        memory: memory(),
        mountpoints: mountpoints(request),
    };
    (info, warnings)
}

fn cpu(request: &SystemRequest, warnings: &mut Vec<String>) -> CpuInfo {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let load = System::load_average();

    let components = Components::new_with_refreshed_list();
    let readings: Vec<(String, f32)> = components
        .list()
        .iter()
        .map(|c| (c.label().to_string(), c.temperature()))
        .collect();

    let temperature = match cpu_temperature(&readings, &request.cpu_temp_sensor) {
        Some(t) => Some(t),
        None if !request.cpu_temp_sensor.is_empty() => {
            warnings.push(format!(
                "temperature sensor '{}' not found",
                request.cpu_temp_sensor
            ));
            None
        }
        None => None,
    };

    CpuInfo {
        load1_percent: load_percent(load.one, cores),
        load15_percent: load_percent(load.fifteen, cores),
        temperature_available: temperature.is_some(),
        temperature_c: temperature.map(|t| t.round().clamp(0.0, 255.0) as u8).unwrap_or(0),
    }
}

fn memory() -> MemoryInfo {
    let mut sys = System::new();
    sys.refresh_memory();
    MemoryInfo {
        total_mb: mb(sys.total_memory()),
        used_mb: mb(sys.used_memory()),
        used_percent: percent(sys.used_memory(), sys.total_memory()),
        swap_total_mb: mb(sys.total_swap()),
        swap_used_mb: mb(sys.used_swap()),
        swap_used_percent: percent(sys.used_swap(), sys.total_swap()),
    }
}

fn mountpoints(request: &SystemRequest) -> Vec<MountpointInfo> {
    let disks = Disks::new_with_refreshed_list();
    let mut seen = Vec::new();
    let mut out = Vec::new();

    for disk in disks.list() {
        let path = disk.mount_point().to_string_lossy().into_owned();
        if seen.contains(&path) {
            continue;
        }
        seen.push(path.clone());

        let Some(name) = request.visible_name(&path) else {
            continue;
        };
        let total = disk.total_space();
        let used = total.saturating_sub(disk.available_space());
        out.push(MountpointInfo {
            path,
            name,
            total_mb: mb(total),
            used_mb: mb(used),
            used_percent: percent(used, total),
        });
    }
    out
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// The configured sensor by exact label, otherwise the first label matching
/// a known CPU sensor name.
pub fn cpu_temperature(readings: &[(String, f32)], configured: &str) -> Option<f32> {
    if !configured.is_empty() {
        return readings
            .iter()
            .find(|(label, _)| label == configured)
            .map(|(_, t)| *t);
    }

    CPU_SENSOR_HINTS.iter().find_map(|hint| {
        readings
            .iter()
            .find(|(label, _)| label.to_lowercase().contains(hint))
            .map(|(_, t)| *t)
    })
}

fn load_percent(load: f64, cores: usize) -> u8 {
    let pct = load / cores.max(1) as f64 * 100.0;
    pct.round().clamp(0.0, 100.0) as u8
}

fn percent(part: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    ((part as f64 / total as f64) * 100.0).round().clamp(0.0, 100.0) as u8
}

fn mb(bytes: u64) -> u64 {
    bytes / 1024 / 1024
}

#[cfg(test)]
mod tests {
    use super::*;

    fn readings() -> Vec<(String, f32)> {
        vec![
            ("nvme Composite".into(), 38.0),
            ("coretemp Package id 0".into(), 51.5),
            ("acpitz temp1".into(), 27.8),
        ]
    }

    #[test]
    fn configured_sensor_matches_exact_label() {
        assert_eq!(cpu_temperature(&readings(), "acpitz temp1"), Some(27.8));
        assert_eq!(cpu_temperature(&readings(), "acpitz"), None);
    }

    #[test]
    fn unconfigured_sensor_uses_cpu_hints() {
        assert_eq!(cpu_temperature(&readings(), ""), Some(51.5));
        assert_eq!(cpu_temperature(&[("nvme".into(), 30.0)], ""), None);
    }

    #[test]
    fn load_is_relative_to_core_count() {
        assert_eq!(load_percent(2.0, 4), 50);
        assert_eq!(load_percent(9.0, 4), 100);
        assert_eq!(load_percent(0.5, 0), 50);
    }

    #[test]
    fn percent_of_zero_total_is_zero() {
        assert_eq!(percent(5, 0), 0);
        assert_eq!(percent(1, 3), 33);
    }

    #[test]
    fn snapshot_serializes_with_stable_keys() {
        let json = serde_json::to_value(SystemInfo::default()).unwrap();
        for key in ["hostname", "platform", "uptime", "boot_time", "cpu", "memory", "mountpoints"] {
            assert!(json.get(key).is_some(), "{key}");
        }
        assert_eq!(json["cpu"]["temperature_available"], false);
    }
}

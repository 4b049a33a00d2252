//! Host machine snapshot endpoint
//!
//! One-shot OS/CPU/RAM/network report via sysinfo.

use axum::response::Json;
use serde::Serialize;
use sysinfo::{Networks, System};

/// Host snapshot returned by `GET /machine`
#[derive(Debug, Serialize)]
pub struct MachineInfo {
    /// Host name
    pub hostname: Option<String>,
    /// OS name (e.g. "Ubuntu")
    pub os: Option<String>,
    /// OS version
    pub os_version: Option<String>,
    /// Kernel version
    pub kernel_version: Option<String>,
    /// CPU brand string of the first core
    pub cpu_model: String,
    /// Logical core count
    pub cpu_cores: usize,
    /// Total memory in bytes
    pub memory_total_bytes: u64,
    /// Used memory in bytes
    pub memory_used_bytes: u64,
    /// Network interfaces with lifetime byte counters
    pub networks: Vec<NetworkInterface>,
}

/// One network interface entry
#[derive(Debug, Serialize)]
pub struct NetworkInterface {
    /// Interface name
    pub name: String,
    /// MAC address
    pub mac: String,
    /// Total bytes received
    pub total_received: u64,
    /// Total bytes transmitted
    pub total_transmitted: u64,
}

/// Collect the snapshot
pub fn collect() -> MachineInfo {
    let mut sys = System::new_all();
    sys.refresh_all();
    let networks = Networks::new_with_refreshed_list();

    MachineInfo {
        hostname: System::host_name(),
        os: System::name(),
        os_version: System::os_version(),
        kernel_version: System::kernel_version(),
        cpu_model: sys
            .cpus()
            .first()
            .map(|cpu| cpu.brand().to_string())
            .unwrap_or_default(),
        cpu_cores: sys.cpus().len(),
        memory_total_bytes: sys.total_memory(),
        memory_used_bytes: sys.used_memory(),
        networks: networks
            .iter()
            .map(|(name, data)| NetworkInterface {
                name: name.clone(),
                mac: data.mac_address().to_string(),
                total_received: data.total_received(),
                total_transmitted: data.total_transmitted(),
            })
            .collect(),
    }
}

/// GET /machine
pub async fn machine_info() -> Json<MachineInfo> {
    Json(collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_reports_hardware() {
        let info = collect();
        assert!(info.cpu_cores > 0);
        assert!(info.memory_total_bytes > 0);
        assert!(info.memory_used_bytes <= info.memory_total_bytes);
    }
}

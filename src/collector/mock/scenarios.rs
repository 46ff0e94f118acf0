//! Pre-built mock hosts for testing and for running the daemon off Windows.
//!
//! These scenarios provide realistic class layouts, including properties of
//! types that are not exported, singleton classes and empty classes.

use super::automation::{MockAutomation, MockObject};
use crate::collector::variant::Variant;

const CIMV2: &str = r"root\cimv2";
const ROOT_WMI: &str = r"root\wmi";

impl MockAutomation {
    /// Creates a typical Windows host.
    ///
    /// Includes: three processes, two services, the operating system
    /// singleton, an empty `Win32_Tape` class and two thermal zones in
    /// `root\wmi`.
    pub fn typical_host() -> Self {
        let mut wmi = Self::new();

        for (handle, name, threads, working_set, priority) in [
            (0u32, "System Idle Process", 8u32, 8_192u64, 0u32),
            (4, "System", 254, 1_404_928, 8),
            (1234, "svchost.exe", 17, 23_908_352, 8),
        ] {
            wmi.add_instance(
                CIMV2,
                "Win32_Process",
                MockObject::new(format!(r#"Win32_Process.Handle="{}""#, handle))
                    .with_property("Caption", Variant::String(name.to_string()))
                    .with_property("CreationDate", Variant::String("20261018093000.000000+120".to_string()))
                    .with_property("Handle", Variant::String(handle.to_string()))
                    .with_property("HandleCount", Variant::UI4(threads * 31))
                    .with_property("Priority", Variant::UI4(priority))
                    .with_property("ProcessId", Variant::UI4(handle))
                    .with_property("ThreadCount", Variant::UI4(threads))
                    .with_property("WorkingSetSize", Variant::UI8(working_set)),
            );
        }

        for (name, started, pid) in [("Dnscache", true, 1234u32), ("Spooler", false, 0)] {
            wmi.add_instance(
                CIMV2,
                "Win32_Service",
                MockObject::new(format!(r#"Win32_Service.Name="{}""#, name))
                    .with_property("AcceptStop", Variant::Bool(started))
                    .with_property("ExitCode", Variant::UI4(if started { 0 } else { 1077 }))
                    .with_property("Name", Variant::String(name.to_string()))
                    .with_property("ProcessId", Variant::UI4(pid))
                    .with_property("Started", Variant::Bool(started))
                    .with_property("State", Variant::String(if started { "Running" } else { "Stopped" }.to_string())),
            );
        }

        wmi.add_instance(
            CIMV2,
            "Win32_OperatingSystem",
            MockObject::new("Win32_OperatingSystem=@")
                .with_property("FreePhysicalMemory", Variant::UI8(6_291_456))
                .with_property("LastBootUpTime", Variant::String("20261017080000.000000+120".to_string()))
                .with_property("NumberOfProcesses", Variant::UI4(3))
                .with_property("OSLanguage", Variant::UI4(1033))
                .with_property("MUILanguages", Variant::Array(vec![Variant::String("en-US".to_string())])),
        );

        wmi.add_class(CIMV2, "Win32_Tape");

        for (zone, kelvin_tenths) in [("TZ00_0", 3012u32), ("TZ01_0", 3132)] {
            let instance = format!(r"ACPI\ThermalZone\{}", zone);
            wmi.add_instance(
                ROOT_WMI,
                "MSAcpi_ThermalZoneTemperature",
                MockObject::new(format!(
                    r#"MSAcpi_ThermalZoneTemperature.InstanceName="{}""#,
                    instance.replace('\\', r"\\")
                ))
                .with_property("Active", Variant::Bool(true))
                .with_property("CriticalTripPoint", Variant::UI4(3782))
                .with_property("CurrentTemperature", Variant::UI4(kelvin_tenths))
                .with_property("InstanceName", Variant::String(instance)),
            );
        }

        wmi
    }
}

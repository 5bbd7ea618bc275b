use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Cpu,
    Gpu,
    /// Accelerators and custom devices, never selected.
    Other,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeviceKind::Cpu => "CPU",
            DeviceKind::Gpu => "GPU",
            DeviceKind::Other => "other",
        })
    }
}

/// One enumerated device: driver handle plus what the selector looks at.
#[derive(Debug, Clone)]
pub struct DeviceDescriptor<H> {
    pub handle: H,
    pub kind: DeviceKind,
    pub name: String,
    pub platform: usize,
}

/// First GPU in enumeration order, else first CPU.
pub fn select_device<H>(inventory: &[DeviceDescriptor<H>]) -> Option<&DeviceDescriptor<H>> {
    let first_of = move |kind: DeviceKind| inventory.iter().find(|d| d.kind == kind);
    first_of(DeviceKind::Gpu).or_else(|| first_of(DeviceKind::Cpu))
}

//! Host-requirement construction for farm job submission.
//!
//! Turns user-facing min/max resource ranges into the farm service's
//! amount/attribute requirement entries. Entries are sparse by
//! default: a dimension with neither bound configured is omitted
//! entirely, and an unset `min` never manufactures a spurious lower
//! bound above the dimension's default floor.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Capability names
// ---------------------------------------------------------------------------

/// Worker vCPU count amount capability.
pub const AMOUNT_VCPU: &str = "amount.worker.vcpu";
/// Worker memory amount capability (MiB).
pub const AMOUNT_MEMORY_MIB: &str = "amount.worker.memory";
/// Worker GPU count amount capability.
pub const AMOUNT_GPU: &str = "amount.worker.gpu";
/// Worker GPU memory amount capability (MiB).
pub const AMOUNT_GPU_MEMORY_MIB: &str = "amount.worker.gpu.memory";
/// Worker scratch disk amount capability (MiB).
pub const AMOUNT_SCRATCH_MIB: &str = "amount.worker.disk.scratch";

/// Operating system family attribute capability.
pub const ATTR_OS_FAMILY: &str = "attr.worker.os.family";
/// CPU architecture attribute capability.
pub const ATTR_CPU_ARCH: &str = "attr.worker.cpu.arch";

/// Memory-like dimensions are configured in GiB but submitted in MiB.
const MIB_PER_GIB: u64 = 1024;

/// Default floor for the vCPU dimension. A configured `min` at or
/// below the floor is treated as unset.
const VCPU_FLOOR: u64 = 1;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// An inclusive min/max range for one resource dimension. Zero means
/// "not configured" on either end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRange {
    #[serde(default)]
    pub min: u64,
    #[serde(default)]
    pub max: u64,
}

/// User-facing host requirement configuration.
///
/// Memory-like ranges (`memory_gib`, `gpu_memory_gib`, `scratch_gib`)
/// are expressed in GiB and scaled to MiB on output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostConfig {
    /// When set, host requirements are skipped entirely and the job
    /// may run on any worker.
    #[serde(default)]
    pub run_anywhere: bool,
    #[serde(default)]
    pub vcpus: ResourceRange,
    #[serde(default)]
    pub memory_gib: ResourceRange,
    #[serde(default)]
    pub gpus: ResourceRange,
    #[serde(default)]
    pub gpu_memory_gib: ResourceRange,
    #[serde(default)]
    pub scratch_gib: ResourceRange,
    /// Operating system families the job may run on (any of).
    #[serde(default)]
    pub os_families: Vec<String>,
    /// CPU architectures the job may run on (any of).
    #[serde(default)]
    pub cpu_archs: Vec<String>,
    /// Custom amount entries appended verbatim after the structured ones.
    #[serde(default)]
    pub custom_amounts: Vec<AmountRequirement>,
    /// Custom attribute entries appended verbatim after the structured ones.
    #[serde(default)]
    pub custom_attributes: Vec<AttributeRequirement>,
}

// ---------------------------------------------------------------------------
// Output shapes
// ---------------------------------------------------------------------------

/// One named numeric capability range, sparse on both ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountRequirement {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<u64>,
}

/// One named categorical constraint as an "any of" set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeRequirement {
    pub name: String,
    #[serde(rename = "anyOf")]
    pub any_of: Vec<String>,
}

/// Host requirements ready to embed into a create-job request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRequirements {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub amounts: Vec<AmountRequirement>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub attributes: Vec<AttributeRequirement>,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Build host requirements from user configuration.
///
/// Returns `None` when the caller requested "run anywhere" or when no
/// dimension contributed an entry.
pub fn build_host_requirements(config: &HostConfig) -> Option<HostRequirements> {
    if config.run_anywhere {
        return None;
    }

    let mut amounts = Vec::new();
    push_amount(&mut amounts, AMOUNT_VCPU, config.vcpus, VCPU_FLOOR, 1);
    push_amount(&mut amounts, AMOUNT_MEMORY_MIB, config.memory_gib, 0, MIB_PER_GIB);
    push_amount(&mut amounts, AMOUNT_GPU, config.gpus, 0, 1);
    push_amount(
        &mut amounts,
        AMOUNT_GPU_MEMORY_MIB,
        config.gpu_memory_gib,
        0,
        MIB_PER_GIB,
    );
    push_amount(&mut amounts, AMOUNT_SCRATCH_MIB, config.scratch_gib, 0, MIB_PER_GIB);
    amounts.extend(config.custom_amounts.iter().cloned());

    let mut attributes = Vec::new();
    push_attribute(&mut attributes, ATTR_OS_FAMILY, &config.os_families);
    push_attribute(&mut attributes, ATTR_CPU_ARCH, &config.cpu_archs);
    attributes.extend(config.custom_attributes.iter().cloned());

    if amounts.is_empty() && attributes.is_empty() {
        return None;
    }
    Some(HostRequirements { amounts, attributes })
}

/// Append one amount entry if the range has any configured bound.
///
/// `min` is kept only when it exceeds `floor`; `max` only when it is
/// positive. Both are scaled by `scale` (e.g. GiB to MiB).
fn push_amount(
    amounts: &mut Vec<AmountRequirement>,
    name: &str,
    range: ResourceRange,
    floor: u64,
    scale: u64,
) {
    if range.min == 0 && range.max == 0 {
        return;
    }
    amounts.push(AmountRequirement {
        name: name.to_string(),
        min: (range.min > floor).then_some(range.min * scale),
        max: (range.max > 0).then_some(range.max * scale),
    });
}

/// Append one attribute entry if the caller supplied at least one choice.
fn push_attribute(attributes: &mut Vec<AttributeRequirement>, name: &str, any_of: &[String]) {
    if any_of.is_empty() {
        return;
    }
    attributes.push(AttributeRequirement {
        name: name.to_string(),
        any_of: any_of.to_vec(),
    });
}

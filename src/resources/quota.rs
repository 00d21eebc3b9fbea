//! Resource quotas per role.

use serde::{Deserialize, Serialize};

use crate::config::QuotaDecl;
use crate::model::{DesiredState, NoMembers, ResourceKind, ResourceRef, ResourceState};

use super::KindSpec;

/// Quota kind.
#[derive(Debug, Clone, Copy)]
pub struct Quota;

/// Limits enforced for a role. Unset limits are unlimited.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuotaLimits {
    /// CPU shares.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<f64>,
    /// Memory in MiB.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mem: Option<f64>,
    /// Disk in MiB.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk: Option<f64>,
    /// GPU count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu: Option<f64>,
}

impl QuotaLimits {
    /// Returns true if no limit is set.
    #[must_use]
    pub const fn is_unlimited(&self) -> bool {
        self.cpu.is_none() && self.mem.is_none() && self.disk.is_none() && self.gpu.is_none()
    }
}

impl KindSpec for Quota {
    type Payload = QuotaLimits;
    type Member = NoMembers;
    type Decl = QuotaDecl;

    const KIND: ResourceKind = ResourceKind::Quota;

    fn resource_ref(decl: &QuotaDecl) -> ResourceRef {
        ResourceRef::new(Self::KIND, decl.role.clone())
    }

    fn desired(decl: &QuotaDecl) -> DesiredState<QuotaLimits, NoMembers> {
        if decl.state.is_present() {
            ResourceState::Present(QuotaLimits {
                cpu: decl.cpu,
                mem: decl.mem,
                disk: decl.disk,
                gpu: decl.gpu,
            })
        } else {
            ResourceState::Absent
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Presence;

    #[test]
    fn test_desired_limits() {
        let decl = QuotaDecl {
            role: "dev".to_string(),
            cpu: Some(4.0),
            mem: Some(8192.0),
            disk: None,
            gpu: None,
            state: Presence::Present,
        };

        let desired = Quota::desired(&decl);
        let limits = desired.payload().expect("present");
        assert_eq!(limits.cpu, Some(4.0));
        assert!(!limits.is_unlimited());
        assert_eq!(Quota::resource_ref(&decl).to_string(), "quota:dev");
    }

    #[test]
    fn test_limit_change_is_detected() {
        let current = QuotaLimits {
            cpu: Some(2.0),
            ..QuotaLimits::default()
        };
        let wanted = QuotaLimits {
            cpu: Some(4.0),
            ..QuotaLimits::default()
        };
        assert!(!Quota::payload_eq(&wanted, &current));
        assert!(QuotaLimits::default().is_unlimited());
    }
}

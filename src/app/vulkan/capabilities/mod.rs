//! Reconciles the capabilities this application requires against the
//! capabilities the host advertises.
//!
//! Capability names (instance extensions and layers share the same
//! fixed-size string type) are compared byte-for-byte: no case folding,
//! no trimming, no aliasing. Negotiation never fails on its own. A
//! missing capability is a result, and the caller decides whether it is
//! fatal.

use std::collections::HashSet;

use thiserror::Error;
use vulkanalia::vk;

/// Build target classification that decides platform-conditional
/// additions to a [`RequiredSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformTag {
    /// Apple targets run Vulkan through a portability layer (MoltenVK)
    /// and must opt in to enumerating portability-subset devices.
    Apple,
    Generic,
}

impl PlatformTag {
    pub fn detect() -> Self {
        if cfg!(target_os = "macos") {
            Self::Apple
        } else {
            Self::Generic
        }
    }
}

/// The instance extensions this application will not start without,
/// in request order, plus the instance creation flag bits implied by
/// the platform-conditional additions.
///
/// Built once, immutable afterwards. Diagnostics refer to names in the
/// order they were requested here.
#[derive(Debug, Clone)]
pub struct RequiredSet {
    names: Vec<vk::ExtensionName>,
    flags: vk::InstanceCreateFlags,
}

impl RequiredSet {
    /// Assembles the full requirement list: the windowing system's base
    /// extensions first, then the debug-utils extension when validation
    /// is on, then the platform addition (with its creation flag bit)
    /// for Apple targets.
    pub fn build(base: &[vk::ExtensionName], platform: PlatformTag, validation: bool) -> Self {
        let mut names = base.to_vec();
        let mut flags = vk::InstanceCreateFlags::empty();

        if validation {
            names.push(vk::EXT_DEBUG_UTILS_EXTENSION.name);
        }

        if platform == PlatformTag::Apple {
            names.push(vk::KHR_PORTABILITY_ENUMERATION_EXTENSION.name);
            flags |= vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR;
        }

        Self { names, flags }
    }

    /// Requested extension names in request order.
    pub fn names(&self) -> &[vk::ExtensionName] {
        &self.names
    }

    /// Flag bits to pass through to instance creation.
    pub fn flags(&self) -> vk::InstanceCreateFlags {
        self.flags
    }
}

/// Outcome of comparing a requirement list against an availability
/// snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Negotiation {
    Satisfied,
    /// At least one requirement is absent. `missing` preserves the
    /// relative request order, duplicates included.
    Unsatisfied { missing: Vec<vk::ExtensionName> },
}

/// Checks every name in `required`, in order, against `available` and
/// reports all of the absent ones at once rather than stopping at the
/// first miss, so the caller can print a complete diagnostic in one go.
///
/// Pure: same inputs, same outcome, no side effects.
pub fn negotiate(
    required: &[vk::ExtensionName],
    available: &HashSet<vk::ExtensionName>,
) -> Negotiation {
    let missing = required
        .iter()
        .filter(|name| !available.contains(*name))
        .copied()
        .collect::<Vec<_>>();

    if missing.is_empty() {
        Negotiation::Satisfied
    } else {
        Negotiation::Unsatisfied { missing }
    }
}

/// Fatal form of [`Negotiation::Unsatisfied`], produced by callers that
/// treat an unmet requirement as the end of the program.
#[derive(Debug, Error)]
#[error("missing required instance extensions: {}", join_names(.missing))]
pub struct MissingExtensions {
    pub missing: Vec<vk::ExtensionName>,
}

/// Joins names into one comma-separated line for diagnostics.
pub fn join_names(names: &[vk::ExtensionName]) -> String {
    names
        .iter()
        .map(|name| name.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &[u8]) -> vk::ExtensionName {
        vk::ExtensionName::from_bytes(s)
    }

    fn snapshot(names: &[vk::ExtensionName]) -> HashSet<vk::ExtensionName> {
        names.iter().copied().collect()
    }

    #[test]
    fn satisfied_when_every_requirement_is_advertised() {
        let required = [name(b"ext_a"), name(b"ext_b")];
        let available = snapshot(&[name(b"ext_a"), name(b"ext_b"), name(b"ext_c")]);

        assert_eq!(negotiate(&required, &available), Negotiation::Satisfied);
    }

    #[test]
    fn empty_request_is_trivially_satisfied() {
        let available = snapshot(&[name(b"ext_a")]);

        assert_eq!(negotiate(&[], &available), Negotiation::Satisfied);
        assert_eq!(negotiate(&[], &snapshot(&[])), Negotiation::Satisfied);
    }

    #[test]
    fn empty_snapshot_misses_the_entire_request() {
        let required = [name(b"ext_a"), name(b"ext_b")];

        assert_eq!(
            negotiate(&required, &snapshot(&[])),
            Negotiation::Unsatisfied {
                missing: required.to_vec(),
            }
        );
    }

    #[test]
    fn misses_come_back_in_request_order() {
        let required = [name(b"ext_w"), name(b"ext_x"), name(b"ext_y"), name(b"ext_z")];
        let available = snapshot(&[name(b"ext_x"), name(b"ext_z")]);

        assert_eq!(
            negotiate(&required, &available),
            Negotiation::Unsatisfied {
                missing: vec![name(b"ext_w"), name(b"ext_y")],
            }
        );
    }

    #[test]
    fn reports_only_the_absent_half_of_a_surface_pair() {
        let required = [name(b"ext_surface"), name(b"ext_platform_surface")];
        let available = snapshot(&[name(b"ext_surface")]);

        assert_eq!(
            negotiate(&required, &available),
            Negotiation::Unsatisfied {
                missing: vec![name(b"ext_platform_surface")],
            }
        );
    }

    #[test]
    fn duplicate_requests_are_reported_per_occurrence() {
        let required = [name(b"ext_a"), name(b"ext_a")];

        assert_eq!(
            negotiate(&required, &snapshot(&[])),
            Negotiation::Unsatisfied {
                missing: vec![name(b"ext_a"), name(b"ext_a")],
            }
        );
    }

    #[test]
    fn comparison_is_byte_exact() {
        let required = [name(b"Ext_A")];
        let available = snapshot(&[name(b"ext_a")]);

        assert_eq!(
            negotiate(&required, &available),
            Negotiation::Unsatisfied {
                missing: vec![name(b"Ext_A")],
            }
        );
    }

    #[test]
    fn repeated_negotiation_yields_identical_results() {
        let required = [name(b"ext_a"), name(b"ext_b")];
        let available = snapshot(&[name(b"ext_b")]);

        let first = negotiate(&required, &available);
        let second = negotiate(&required, &available);

        assert_eq!(first, second);
    }

    #[test]
    fn base_order_survives_construction() {
        let base = [name(b"ext_surface"), name(b"ext_platform_surface")];
        let set = RequiredSet::build(&base, PlatformTag::Generic, false);

        assert_eq!(set.names(), &base);
        assert_eq!(set.flags(), vk::InstanceCreateFlags::empty());
    }

    #[test]
    fn apple_appends_portability_and_its_flag() {
        let base = [name(b"ext_surface")];
        let set = RequiredSet::build(&base, PlatformTag::Apple, false);

        assert_eq!(
            set.names(),
            &[
                name(b"ext_surface"),
                vk::KHR_PORTABILITY_ENUMERATION_EXTENSION.name,
            ]
        );
        assert_eq!(
            set.flags(),
            vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR
        );
    }

    #[test]
    fn validation_appends_debug_utils_without_flags() {
        let base = [name(b"ext_surface")];
        let set = RequiredSet::build(&base, PlatformTag::Generic, true);

        assert_eq!(
            set.names(),
            &[name(b"ext_surface"), vk::EXT_DEBUG_UTILS_EXTENSION.name]
        );
        assert_eq!(set.flags(), vk::InstanceCreateFlags::empty());
    }

    #[test]
    fn validation_addition_precedes_the_platform_addition() {
        let set = RequiredSet::build(&[], PlatformTag::Apple, true);

        assert_eq!(
            set.names(),
            &[
                vk::EXT_DEBUG_UTILS_EXTENSION.name,
                vk::KHR_PORTABILITY_ENUMERATION_EXTENSION.name,
            ]
        );
    }

    #[test]
    fn missing_extensions_error_lists_names_in_order() {
        let error = MissingExtensions {
            missing: vec![name(b"ext_a"), name(b"ext_b")],
        };

        assert_eq!(
            error.to_string(),
            "missing required instance extensions: ext_a, ext_b"
        );
    }
}

//! Registry of the delegate hooks known to the host.
//!
//! Extensions may invoke further, unregistered method names through the
//! generic invocation path; this enum only covers the hooks the host core
//! consumes itself.

use std::fmt;
use std::str::FromStr;

/// Well-known delegate hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DelegateMethod {
    Authorize,
    AuthorizeBeforeAccess,
    CustomizeIiif1InformationResponse,
    CustomizeIiif2InformationResponse,
    CustomizeIiif3InformationResponse,
    DeserializeMetaIdentifier,
    FilesystemSourcePathname,
    HttpSourceResourceInfo,
    Metadata,
    Overlay,
    Redactions,
    SerializeMetaIdentifier,
    Source,
}

impl DelegateMethod {
    /// Every registered hook, in declaration order.
    pub const ALL: [DelegateMethod; 13] = [
        DelegateMethod::Authorize,
        DelegateMethod::AuthorizeBeforeAccess,
        DelegateMethod::CustomizeIiif1InformationResponse,
        DelegateMethod::CustomizeIiif2InformationResponse,
        DelegateMethod::CustomizeIiif3InformationResponse,
        DelegateMethod::DeserializeMetaIdentifier,
        DelegateMethod::FilesystemSourcePathname,
        DelegateMethod::HttpSourceResourceInfo,
        DelegateMethod::Metadata,
        DelegateMethod::Overlay,
        DelegateMethod::Redactions,
        DelegateMethod::SerializeMetaIdentifier,
        DelegateMethod::Source,
    ];

    /// Name of the script method implementing this hook.
    pub fn method_name(&self) -> &'static str {
        match self {
            DelegateMethod::Authorize => "authorize",
            DelegateMethod::AuthorizeBeforeAccess => "authorize_before_access",
            DelegateMethod::CustomizeIiif1InformationResponse => {
                "customize_iiif1_information_response"
            }
            DelegateMethod::CustomizeIiif2InformationResponse => {
                "customize_iiif2_information_response"
            }
            DelegateMethod::CustomizeIiif3InformationResponse => {
                "customize_iiif3_information_response"
            }
            DelegateMethod::DeserializeMetaIdentifier => "deserialize_meta_identifier",
            DelegateMethod::FilesystemSourcePathname => "filesystemsource_pathname",
            DelegateMethod::HttpSourceResourceInfo => "httpsource_resource_info",
            DelegateMethod::Metadata => "metadata",
            DelegateMethod::Overlay => "overlay",
            DelegateMethod::Redactions => "redactions",
            DelegateMethod::SerializeMetaIdentifier => "serialize_meta_identifier",
            DelegateMethod::Source => "source",
        }
    }
}

impl fmt::Display for DelegateMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method_name())
    }
}

impl FromStr for DelegateMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DelegateMethod::ALL
            .iter()
            .find(|m| m.method_name() == s)
            .copied()
            .ok_or_else(|| format!("Unknown delegate method: {}", s))
    }
}

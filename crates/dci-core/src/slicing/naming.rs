// Remote object names derived from a slicing name.

use serde::{Deserialize, Serialize};

use crate::config::NamingConfig;
use crate::error::CoreError;
use crate::model::{SlicingKind, SlicingRecord};
use crate::slicing::params::MAX_VPN_INSTANCE_NAME;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlicingNames {
    /// Virtual network name, identical on both controllers.
    pub vn: String,
    pub wan_vpn: String,
    pub access_vpn: String,
}

impl SlicingNames {
    pub fn derive(naming: &NamingConfig, kind: SlicingKind, name: &str) -> Result<Self, CoreError> {
        let names = Self::compose(naming, kind, name);

        // The L3VPN instance on the PE is named after the VN.
        if kind == SlicingKind::L3vpnSrv6 && names.vn.len() > MAX_VPN_INSTANCE_NAME {
            return Err(CoreError::Validation {
                message: format!(
                    "VPN instance name '{}' is {} characters, the limit is {MAX_VPN_INSTANCE_NAME}",
                    names.vn,
                    names.vn.len()
                ),
            });
        }
        Ok(names)
    }

    /// Names of an existing record; the VN name is the one stored on it.
    pub fn for_record(naming: &NamingConfig, record: &SlicingRecord) -> Self {
        let mut names = Self::compose(naming, record.kind(), &record.name);
        names.vn.clone_from(&record.east.vn_name);
        names
    }

    fn compose(naming: &NamingConfig, kind: SlicingKind, name: &str) -> Self {
        let vn_prefix = match kind {
            SlicingKind::EvpnVplsSrv6Be => &naming.vn_prefix,
            SlicingKind::L2EvpnDci => &naming.l2_dci_vn_prefix,
            SlicingKind::L3EvpnDci => &naming.l3_dci_vn_prefix,
            SlicingKind::L3vpnSrv6 => &naming.l3vpn_srv6_vn_prefix,
        };
        Self {
            vn: format!("{vn_prefix}{name}"),
            wan_vpn: format!("{}{name}", naming.wan_vpn_prefix),
            access_vpn: format!("{}{name}", naming.access_vpn_prefix),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_follow_kind() {
        let n = SlicingNames::derive(&NamingConfig::default(), SlicingKind::EvpnVplsSrv6Be, "blue").unwrap();
        assert_eq!(n.vn, "ns-dcn-l2vpn-blue");
        assert_eq!(n.wan_vpn, "ns-wan-l2vpn-blue");
        assert_eq!(n.access_vpn, "ns-an-l2vpn-blue");

        let n = SlicingNames::derive(&NamingConfig::default(), SlicingKind::L2EvpnDci, "blue").unwrap();
        assert_eq!(n.vn, "dci-controller-L2EVPNDCI-blue");
    }

    #[test]
    fn l3vpn_instance_name_limit() {
        let naming = NamingConfig::default();
        // prefix is 17 characters
        assert!(SlicingNames::derive(&naming, SlicingKind::L3vpnSrv6, &"a".repeat(14)).is_ok());
        assert!(SlicingNames::derive(&naming, SlicingKind::L3vpnSrv6, &"a".repeat(15)).is_err());
        assert!(SlicingNames::derive(&naming, SlicingKind::L3EvpnDci, &"a".repeat(40)).is_ok());
    }
}

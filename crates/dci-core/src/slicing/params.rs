// ── Create requests ──

use std::net::Ipv4Addr;

use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;
use crate::model::{RoutingType, SlicingKind};

/// Longest VPN instance name a NetEngine accepts.
pub const MAX_VPN_INSTANCE_NAME: usize = 31;

/// What one site contributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegParams {
    pub subnet_cidr: String,
    /// `"start,end"` inside `subnet_cidr`.
    #[serde(default)]
    pub allocation_pool: Option<String>,
    /// WAN node to configure; the site's first node when unset.
    #[serde(default)]
    pub wan_node: Option<Uuid>,
}

/// Kind-specific request fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum KindParams {
    EvpnVplsSrv6Be,
    L2EvpnDci,
    L3EvpnDci,
    /// East is the ingress PE, west the egress PE.
    L3vpnSrv6 {
        routing_type: RoutingType,
        /// Operator-chosen `A:N`, shared by both PEs.
        route_target: String,
    },
}

impl KindParams {
    pub fn kind(&self) -> SlicingKind {
        match self {
            Self::EvpnVplsSrv6Be => SlicingKind::EvpnVplsSrv6Be,
            Self::L2EvpnDci => SlicingKind::L2EvpnDci,
            Self::L3EvpnDci => SlicingKind::L3EvpnDci,
            Self::L3vpnSrv6 { .. } => SlicingKind::L3vpnSrv6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSlicingParams {
    pub name: String,
    #[serde(flatten)]
    pub kind: KindParams,
    pub east: LegParams,
    pub west: LegParams,
}

fn invalid(message: impl Into<String>) -> CoreError {
    CoreError::Validation {
        message: message.into(),
    }
}

impl CreateSlicingParams {
    /// Shape checks that need no remote state.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.name.is_empty() {
            return Err(invalid("slicing name must not be empty"));
        }
        if !self
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(invalid(format!(
                "slicing name '{}' may only contain letters, digits, '-' and '_'",
                self.name
            )));
        }

        for (side, leg) in [("east", &self.east), ("west", &self.west)] {
            leg.validate().map_err(|e| match e {
                CoreError::Validation { message } => invalid(format!("{side}: {message}")),
                other => other,
            })?;
        }

        if let KindParams::L3vpnSrv6 {
            routing_type,
            route_target,
        } = &self.kind
        {
            if *routing_type == RoutingType::Te {
                return Err(CoreError::UnsupportedCapability {
                    device: "L3VPN over SRv6".into(),
                    capability: "traffic-engineered routing (te)".into(),
                });
            }
            validate_route_target(route_target)?;
        }
        Ok(())
    }
}

impl LegParams {
    pub fn subnet(&self) -> Result<Ipv4Net, CoreError> {
        self.subnet_cidr
            .trim()
            .parse::<Ipv4Net>()
            .map_err(|_| invalid(format!("invalid subnet CIDR '{}'", self.subnet_cidr)))
    }

    fn validate(&self) -> Result<(), CoreError> {
        let subnet = self.subnet()?;
        let Some(pool) = &self.allocation_pool else {
            return Ok(());
        };

        let (start, end) = pool
            .split_once(',')
            .ok_or_else(|| invalid(format!("allocation pool must be 'start,end', got '{pool}'")))?;
        let parse = |s: &str| {
            s.trim()
                .parse::<Ipv4Addr>()
                .map_err(|_| invalid(format!("invalid pool address '{}'", s.trim())))
        };
        let (start, end) = (parse(start)?, parse(end)?);
        if start > end {
            return Err(invalid(format!("allocation pool '{pool}' is reversed")));
        }
        if !subnet.contains(&start) || !subnet.contains(&end) {
            return Err(invalid(format!(
                "allocation pool '{pool}' is outside {subnet}"
            )));
        }
        Ok(())
    }
}

/// `A:N` with numeric parts.
fn validate_route_target(rt: &str) -> Result<(), CoreError> {
    let ok = rt
        .split_once(':')
        .is_some_and(|(a, n)| a.parse::<u32>().is_ok() && n.parse::<u32>().is_ok());
    if ok {
        Ok(())
    } else {
        Err(invalid(format!("route target must be 'A:N', got '{rt}'")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn leg(cidr: &str, pool: Option<&str>) -> LegParams {
        LegParams {
            subnet_cidr: cidr.into(),
            allocation_pool: pool.map(str::to_owned),
            wan_node: None,
        }
    }

    fn params(kind: KindParams) -> CreateSlicingParams {
        CreateSlicingParams {
            name: "blue".into(),
            kind,
            east: leg("10.0.1.0/24", Some("10.0.1.10,10.0.1.50")),
            west: leg("10.0.2.0/24", None),
        }
    }

    #[test]
    fn accepts_well_formed_requests() {
        params(KindParams::EvpnVplsSrv6Be).validate().unwrap();
        params(KindParams::L3vpnSrv6 {
            routing_type: RoutingType::Be,
            route_target: "100:1".into(),
        })
        .validate()
        .unwrap();
    }

    #[test]
    fn rejects_bad_legs_with_side() {
        let mut p = params(KindParams::L2EvpnDci);
        p.west = leg("10.0.2.0/24", Some("10.0.3.1,10.0.3.9"));
        let err = p.validate().unwrap_err();
        assert!(matches!(err, CoreError::Validation { ref message } if message.starts_with("west:")));

        p.west = leg("10.0.2.0/33", None);
        assert!(p.validate().is_err());
    }

    #[test]
    fn te_routing_is_unsupported() {
        let err = params(KindParams::L3vpnSrv6 {
            routing_type: RoutingType::Te,
            route_target: "100:1".into(),
        })
        .validate()
        .unwrap_err();
        assert!(matches!(err, CoreError::UnsupportedCapability { .. }));
    }

    #[test]
    fn kind_is_flattened_in_requests() {
        let p: CreateSlicingParams = serde_json::from_value(serde_json::json!({
            "name": "red",
            "kind": "l3vpn-srv6",
            "routing_type": "be",
            "route_target": "65000:7",
            "east": { "subnet_cidr": "10.1.0.0/24" },
            "west": { "subnet_cidr": "10.2.0.0/24" }
        }))
        .unwrap();
        assert_eq!(p.kind.kind(), SlicingKind::L3vpnSrv6);
    }
}

//! Network boundary: VPC, public/private subnets per availability zone,
//! internet gateway and NAT gateways.

use std::net::Ipv4Addr;

use ecsforge_common::{Expr, Resource};
use serde::{Deserialize, Serialize};

use crate::domain::error::{CompositionError, ConfigError};
use crate::domain::handles::{FoundationId, NetworkHandle};
use crate::domain::stack::Stack;

const MIN_VPC_PREFIX: u8 = 16;
const MAX_VPC_PREFIX: u8 = 28;
const MAX_AZS: u32 = 6;

/// Network settings of the foundation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkConfig {
    /// VPC CIDR block, `/16` to `/28`.
    pub cidr: String,
    /// Number of availability zones to spread subnets over.
    pub max_azs: u32,
    /// NAT gateways; `None` means one per availability zone. With zero NAT
    /// gateways workloads run in the public subnets with public IPs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nat_gateways: Option<u32>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            cidr: "10.0.0.0/16".to_string(),
            max_azs: 2,
            nat_gateways: None,
        }
    }
}

impl NetworkConfig {
    #[must_use]
    pub fn nat_gateway_count(&self) -> u32 {
        self.nat_gateways.unwrap_or(self.max_azs)
    }

    /// Validates the network settings and returns the subnet CIDR plan.
    ///
    /// # Errors
    ///
    /// Returns an error if the CIDR is malformed, the AZ or NAT count is out
    /// of range, or the VPC is too small for the subnets.
    pub fn subnet_plan(&self) -> Result<SubnetPlan, ConfigError> {
        if self.max_azs == 0 || self.max_azs > MAX_AZS {
            return Err(ConfigError::invalid(
                "network.max_azs",
                self.max_azs,
                format!("1..={MAX_AZS}"),
            ));
        }
        let nat = self.nat_gateway_count();
        if nat > self.max_azs {
            return Err(ConfigError::invalid(
                "network.nat_gateways",
                nat,
                format!("0..={}", self.max_azs),
            ));
        }

        let (base, prefix) = parse_cidr(&self.cidr)?;
        if !(MIN_VPC_PREFIX..=MAX_VPC_PREFIX).contains(&prefix) {
            return Err(ConfigError::InvalidCidr {
                value: self.cidr.clone(),
                reason: format!("VPC prefix must be /{MIN_VPC_PREFIX} to /{MAX_VPC_PREFIX}"),
            });
        }

        let subnets = self.max_azs * 2;
        let extra_bits = u8::try_from(subnets.next_power_of_two().trailing_zeros())
            .unwrap_or(u8::MAX);
        let subnet_prefix = prefix.saturating_add(extra_bits);
        if subnet_prefix > MAX_VPC_PREFIX {
            return Err(ConfigError::InvalidCidr {
                value: self.cidr.clone(),
                reason: format!("too small for {subnets} subnets"),
            });
        }

        let step = 1u32 << (32 - u32::from(subnet_prefix));
        let block = |i: u32| format!("{}/{subnet_prefix}", Ipv4Addr::from(base + i * step));
        Ok(SubnetPlan {
            public: (0..self.max_azs).map(block).collect(),
            private: (self.max_azs..subnets).map(block).collect(),
            nat_gateways: nat,
        })
    }
}

/// CIDR blocks of every subnet, public ones first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetPlan {
    pub public: Vec<String>,
    pub private: Vec<String>,
    pub nat_gateways: u32,
}

fn parse_cidr(value: &str) -> Result<(u32, u8), ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidCidr {
        value: value.to_string(),
        reason: reason.to_string(),
    };
    let (addr, prefix) = value
        .split_once('/')
        .ok_or_else(|| invalid("expected a.b.c.d/prefix"))?;
    let addr: Ipv4Addr = addr.parse().map_err(|_| invalid("bad IPv4 address"))?;
    let prefix: u8 = prefix.parse().map_err(|_| invalid("bad prefix length"))?;
    if prefix > 32 {
        return Err(invalid("prefix length above 32"));
    }
    let base = u32::from(addr);
    let host_bits = 32 - u32::from(prefix);
    let host_mask = if host_bits == 32 { u32::MAX } else { (1u32 << host_bits) - 1 };
    if base & host_mask != 0 {
        return Err(invalid("address has host bits set"));
    }
    Ok((base, prefix))
}

/// The built network: its handle plus what sibling constructs in the same
/// stack need to order themselves after.
pub struct Network {
    pub handle: NetworkHandle,
    /// Logical IDs of the public default routes; internet-facing resources
    /// depend on them so they are not created before the VPC is reachable.
    pub internet_routes: Vec<String>,
}

fn tags(name: &str, extra: &[(&str, &str)]) -> Expr {
    let mut list = vec![Expr::object([("Key", "Name".into()), ("Value", name.into())])];
    list.extend(
        extra
            .iter()
            .map(|(k, v)| Expr::object([("Key", (*k).into()), ("Value", (*v).into())])),
    );
    Expr::List(list)
}

/// Declare the network in `stack` under construct `id`.
pub(crate) fn build(
    stack: &mut Stack,
    id: &str,
    config: &NetworkConfig,
    foundation: &FoundationId,
) -> Result<Network, CompositionError> {
    let plan = config.subnet_plan()?;
    let prefix = format!("{}/{id}", stack.name());

    let vpc = stack.add(
        &[id],
        Resource::new("AWS::EC2::VPC")
            .property("CidrBlock", config.cidr.as_str())
            .property("EnableDnsHostnames", true)
            .property("EnableDnsSupport", true)
            .property("InstanceTenancy", "default")
            .property("Tags", tags(&prefix, &[])),
    )?;
    let igw = stack.add(
        &[id, "IGW"],
        Resource::new("AWS::EC2::InternetGateway").property("Tags", tags(&prefix, &[])),
    )?;
    let attachment = stack.add(
        &[id, "VPCGW"],
        Resource::new("AWS::EC2::VPCGatewayAttachment")
            .property("VpcId", stack.reference(&vpc))
            .property("InternetGatewayId", stack.reference(&igw)),
    )?;

    let mut public_subnets = Vec::new();
    let mut internet_routes = Vec::new();
    let mut nat_gateways = Vec::new();

    for (az, cidr) in (0u32..).zip(&plan.public) {
        let name = format!("PublicSubnet{}", az + 1);
        let subnet = add_subnet(stack, id, &name, &vpc, cidr, az, true, &prefix)?;
        let (table, association) = add_route_table(stack, id, &name, &vpc, &subnet, &prefix)?;
        let route = stack.add(
            &[id, &name, "DefaultRoute"],
            Resource::new("AWS::EC2::Route")
                .property("RouteTableId", stack.reference(&table))
                .property("DestinationCidrBlock", "0.0.0.0/0")
                .property("GatewayId", stack.reference(&igw))
                .depends_on(&attachment),
        )?;

        if az < plan.nat_gateways {
            let eip = stack.add(
                &[id, &name, "EIP"],
                Resource::new("AWS::EC2::EIP")
                    .property("Domain", "vpc")
                    .property("Tags", tags(&format!("{prefix}/{name}"), &[])),
            )?;
            let nat = stack.add(
                &[id, &name, "NATGateway"],
                Resource::new("AWS::EC2::NatGateway")
                    .property("SubnetId", stack.reference(&subnet))
                    .property("AllocationId", stack.attribute(&eip, "AllocationId"))
                    .property("Tags", tags(&format!("{prefix}/{name}"), &[]))
                    .depends_on(&route)
                    .depends_on(&association),
            )?;
            nat_gateways.push(nat);
        }

        public_subnets.push(stack.reference(&subnet));
        internet_routes.push(route);
    }

    let mut private_subnets = Vec::new();
    for (az, cidr) in (0u32..).zip(&plan.private) {
        let name = format!("PrivateSubnet{}", az + 1);
        let subnet = add_subnet(stack, id, &name, &vpc, cidr, az, false, &prefix)?;
        let (table, _) = add_route_table(stack, id, &name, &vpc, &subnet, &prefix)?;
        if !nat_gateways.is_empty() {
            let nat = &nat_gateways[az as usize % nat_gateways.len()];
            stack.add(
                &[id, &name, "DefaultRoute"],
                Resource::new("AWS::EC2::Route")
                    .property("RouteTableId", stack.reference(&table))
                    .property("DestinationCidrBlock", "0.0.0.0/0")
                    .property("NatGatewayId", stack.reference(nat)),
            )?;
        }
        private_subnets.push(stack.reference(&subnet));
    }

    tracing::debug!(
        stack = %stack.name(),
        azs = config.max_azs,
        nat_gateways = plan.nat_gateways,
        "network declared"
    );

    Ok(Network {
        handle: NetworkHandle::new(
            foundation.clone(),
            stack.reference(&vpc),
            public_subnets,
            private_subnets,
            plan.nat_gateways > 0,
        ),
        internet_routes,
    })
}

#[allow(clippy::too_many_arguments)]
fn add_subnet(
    stack: &mut Stack,
    id: &str,
    name: &str,
    vpc: &str,
    cidr: &str,
    az: u32,
    public: bool,
    prefix: &str,
) -> Result<String, CompositionError> {
    let kind = if public { "Public" } else { "Private" };
    stack.add(
        &[id, name, "Subnet"],
        Resource::new("AWS::EC2::Subnet")
            .property("VpcId", stack.reference(vpc))
            .property("CidrBlock", cidr)
            .property("AvailabilityZone", Expr::availability_zone(az))
            .property("MapPublicIpOnLaunch", public)
            .property(
                "Tags",
                tags(&format!("{prefix}/{name}"), &[("ecsforge:subnet-type", kind)]),
            ),
    )
}

fn add_route_table(
    stack: &mut Stack,
    id: &str,
    name: &str,
    vpc: &str,
    subnet: &str,
    prefix: &str,
) -> Result<(String, String), CompositionError> {
    let table = stack.add(
        &[id, name, "RouteTable"],
        Resource::new("AWS::EC2::RouteTable")
            .property("VpcId", stack.reference(vpc))
            .property("Tags", tags(&format!("{prefix}/{name}"), &[])),
    )?;
    let association = stack.add(
        &[id, name, "RouteTableAssociation"],
        Resource::new("AWS::EC2::SubnetRouteTableAssociation")
            .property("RouteTableId", stack.reference(&table))
            .property("SubnetId", stack.reference(subnet)),
    )?;
    Ok((table, association))
}

use async_trait::async_trait;
use aws_sdk_ec2::types::{
    Filter, FlowLog, InternetGateway, IpPermission, NatGateway, NetworkAcl, RouteTable,
    SecurityGroup, Subnet, Tag, TransitGateway, TransitGatewayAttachment,
    TransitGatewayVpcAttachment, Vpc, VpcEndpoint,
};
use infracheck_core::{LookupError, LookupRequest, ResourceCategory, ResourceDescription};
use infracheck_provider::{ResourceFetcher, unsupported_resource_type};
use serde_json::{Value, json};
use tracing::{debug, instrument};

use crate::auth::build_sdk_config;
use crate::config::AwsBaseConfig;
use crate::error::{AwsFetchError, sdk_error};
use crate::json::{non_empty, require_key, strings, timestamp};

const CATEGORY: ResourceCategory = ResourceCategory::Ec2;

const RESOURCE_TYPES: &[&str] = &[
    "vpc",
    "vpcs",
    "flow_logs",
    "internet_gateways",
    "route_tables",
    "subnets",
    "nat_gateways",
    "network_acl",
    "vpc_endpoints",
    "security_group",
    "transit_gateways",
    "transit_gateway_attachments",
    "transit_gateway_vpc_attachment",
];

/// Describes VPC networking resources.
///
/// Descriptions mirror the `Describe*` responses (`{"Vpcs": [...]}`,
/// `{"RouteTables": [...]}`). Every tagged element also carries a `Name`
/// field copied from its `Name` tag, so expectations can address it
/// directly.
///
/// | resource type | key | optional params |
/// |---|---|---|
/// | `vpc` | VPC id | |
/// | `vpcs` | unscoped | |
/// | `flow_logs`, `route_tables` | VPC id | |
/// | `internet_gateways`, `subnets`, `nat_gateways` | VPC id or unscoped | |
/// | `network_acl` | `Name` tag | |
/// | `vpc_endpoints` | VPC id | `service_name` |
/// | `security_group` | group name | `vpc_id` |
/// | `transit_gateways`, `transit_gateway_attachments` | unscoped | |
/// | `transit_gateway_vpc_attachment` | attachment id | |
pub struct Ec2Fetcher {
    client: aws_sdk_ec2::Client,
}

impl Ec2Fetcher {
    pub async fn new(config: &AwsBaseConfig) -> Self {
        let sdk_config = build_sdk_config(config).await;
        Self::from_sdk_config(&sdk_config)
    }

    pub fn from_sdk_config(sdk_config: &aws_config::SdkConfig) -> Self {
        Self::with_client(aws_sdk_ec2::Client::new(sdk_config))
    }

    /// Create a fetcher around a pre-built client (for testing).
    pub fn with_client(client: aws_sdk_ec2::Client) -> Self {
        Self { client }
    }

    async fn describe(&self, request: &LookupRequest) -> Result<Value, AwsFetchError> {
        match request.resource_type.as_str() {
            "vpc" => self.vpc(require_key(request, "a VPC id")?).await,
            "vpcs" => self.vpcs().await,
            "flow_logs" => self.flow_logs(require_key(request, "a VPC id")?).await,
            "internet_gateways" => self.internet_gateways(request.key.value()).await,
            "route_tables" => self.route_tables(require_key(request, "a VPC id")?).await,
            "subnets" => self.subnets(request.key.value()).await,
            "nat_gateways" => self.nat_gateways(request.key.value()).await,
            "network_acl" => self.network_acl(require_key(request, "a Name tag")?).await,
            "vpc_endpoints" => {
                self.vpc_endpoints(require_key(request, "a VPC id")?, request.get_param("service_name"))
                    .await
            }
            "security_group" => {
                self.security_group(require_key(request, "a group name")?, request.get_param("vpc_id"))
                    .await
            }
            "transit_gateways" => self.transit_gateways().await,
            "transit_gateway_attachments" => self.transit_gateway_attachments().await,
            "transit_gateway_vpc_attachment" => {
                self.transit_gateway_vpc_attachment(require_key(request, "an attachment id")?)
                    .await
            }
            _ => Err(AwsFetchError::InvalidInput(
                unsupported_resource_type(request).message,
            )),
        }
    }

    async fn vpc(&self, vpc_id: &str) -> Result<Value, AwsFetchError> {
        let output = self
            .client
            .describe_vpcs()
            .vpc_ids(vpc_id)
            .send()
            .await
            .map_err(|e| sdk_error(CATEGORY, "describe_vpcs", &e))?;
        non_empty(output.vpcs(), || format!("VPC {vpc_id}"))?;
        Ok(json!({ "Vpcs": output.vpcs().iter().map(vpc_json).collect::<Vec<_>>() }))
    }

    async fn vpcs(&self) -> Result<Value, AwsFetchError> {
        let output = self
            .client
            .describe_vpcs()
            .send()
            .await
            .map_err(|e| sdk_error(CATEGORY, "describe_vpcs", &e))?;
        Ok(json!({ "Vpcs": output.vpcs().iter().map(vpc_json).collect::<Vec<_>>() }))
    }

    async fn flow_logs(&self, vpc_id: &str) -> Result<Value, AwsFetchError> {
        let output = self
            .client
            .describe_flow_logs()
            .filter(filter("resource-id", vpc_id))
            .send()
            .await
            .map_err(|e| sdk_error(CATEGORY, "describe_flow_logs", &e))?;
        non_empty(output.flow_logs(), || format!("flow logs for {vpc_id}"))?;
        Ok(json!({ "FlowLogs": output.flow_logs().iter().map(flow_log_json).collect::<Vec<_>>() }))
    }

    async fn internet_gateways(&self, vpc_id: Option<&str>) -> Result<Value, AwsFetchError> {
        let mut call = self.client.describe_internet_gateways();
        if let Some(vpc_id) = vpc_id {
            call = call.filters(filter("attachment.vpc-id", vpc_id));
        }
        let output = call
            .send()
            .await
            .map_err(|e| sdk_error(CATEGORY, "describe_internet_gateways", &e))?;
        Ok(json!({
            "InternetGateways": output.internet_gateways().iter().map(internet_gateway_json).collect::<Vec<_>>()
        }))
    }

    async fn route_tables(&self, vpc_id: &str) -> Result<Value, AwsFetchError> {
        let output = self
            .client
            .describe_route_tables()
            .filters(filter("vpc-id", vpc_id))
            .send()
            .await
            .map_err(|e| sdk_error(CATEGORY, "describe_route_tables", &e))?;
        non_empty(output.route_tables(), || format!("route tables for {vpc_id}"))?;
        Ok(json!({
            "RouteTables": output.route_tables().iter().map(route_table_json).collect::<Vec<_>>()
        }))
    }

    async fn subnets(&self, vpc_id: Option<&str>) -> Result<Value, AwsFetchError> {
        let mut call = self.client.describe_subnets();
        if let Some(vpc_id) = vpc_id {
            call = call.filters(filter("vpc-id", vpc_id));
        }
        let output = call
            .send()
            .await
            .map_err(|e| sdk_error(CATEGORY, "describe_subnets", &e))?;
        Ok(json!({ "Subnets": output.subnets().iter().map(subnet_json).collect::<Vec<_>>() }))
    }

    async fn nat_gateways(&self, vpc_id: Option<&str>) -> Result<Value, AwsFetchError> {
        let mut call = self.client.describe_nat_gateways();
        if let Some(vpc_id) = vpc_id {
            call = call.filter(filter("vpc-id", vpc_id));
        }
        let output = call
            .send()
            .await
            .map_err(|e| sdk_error(CATEGORY, "describe_nat_gateways", &e))?;
        Ok(json!({
            "NatGateways": output.nat_gateways().iter().map(nat_gateway_json).collect::<Vec<_>>()
        }))
    }

    async fn network_acl(&self, name: &str) -> Result<Value, AwsFetchError> {
        let output = self
            .client
            .describe_network_acls()
            .filters(filter("tag:Name", name))
            .send()
            .await
            .map_err(|e| sdk_error(CATEGORY, "describe_network_acls", &e))?;
        non_empty(output.network_acls(), || format!("network ACL {name}"))?;
        Ok(json!({
            "NetworkAcls": output.network_acls().iter().map(network_acl_json).collect::<Vec<_>>()
        }))
    }

    async fn vpc_endpoints(&self, vpc_id: &str, service_name: Option<&str>) -> Result<Value, AwsFetchError> {
        let mut call = self.client.describe_vpc_endpoints().filters(filter("vpc-id", vpc_id));
        if let Some(service_name) = service_name {
            call = call.filters(filter("service-name", service_name));
        }
        let output = call
            .send()
            .await
            .map_err(|e| sdk_error(CATEGORY, "describe_vpc_endpoints", &e))?;
        non_empty(output.vpc_endpoints(), || format!("VPC endpoints in {vpc_id}"))?;
        Ok(json!({
            "VpcEndpoints": output.vpc_endpoints().iter().map(vpc_endpoint_json).collect::<Vec<_>>()
        }))
    }

    async fn security_group(&self, group_name: &str, vpc_id: Option<&str>) -> Result<Value, AwsFetchError> {
        let mut call = self
            .client
            .describe_security_groups()
            .filters(filter("group-name", group_name));
        if let Some(vpc_id) = vpc_id {
            call = call.filters(filter("vpc-id", vpc_id));
        }
        let output = call
            .send()
            .await
            .map_err(|e| sdk_error(CATEGORY, "describe_security_groups", &e))?;
        non_empty(output.security_groups(), || format!("security group {group_name}"))?;
        Ok(json!({
            "SecurityGroups": output.security_groups().iter().map(security_group_json).collect::<Vec<_>>()
        }))
    }

    async fn transit_gateways(&self) -> Result<Value, AwsFetchError> {
        let output = self
            .client
            .describe_transit_gateways()
            .send()
            .await
            .map_err(|e| sdk_error(CATEGORY, "describe_transit_gateways", &e))?;
        Ok(json!({
            "TransitGateways": output.transit_gateways().iter().map(transit_gateway_json).collect::<Vec<_>>()
        }))
    }

    async fn transit_gateway_attachments(&self) -> Result<Value, AwsFetchError> {
        let output = self
            .client
            .describe_transit_gateway_attachments()
            .send()
            .await
            .map_err(|e| sdk_error(CATEGORY, "describe_transit_gateway_attachments", &e))?;
        Ok(json!({
            "TransitGatewayAttachments": output
                .transit_gateway_attachments()
                .iter()
                .map(transit_gateway_attachment_json)
                .collect::<Vec<_>>()
        }))
    }

    async fn transit_gateway_vpc_attachment(&self, attachment_id: &str) -> Result<Value, AwsFetchError> {
        let output = self
            .client
            .describe_transit_gateway_vpc_attachments()
            .transit_gateway_attachment_ids(attachment_id)
            .send()
            .await
            .map_err(|e| sdk_error(CATEGORY, "describe_transit_gateway_vpc_attachments", &e))?;
        non_empty(output.transit_gateway_vpc_attachments(), || {
            format!("transit gateway attachment {attachment_id}")
        })?;
        Ok(json!({
            "TransitGatewayVpcAttachments": output
                .transit_gateway_vpc_attachments()
                .iter()
                .map(transit_gateway_vpc_attachment_json)
                .collect::<Vec<_>>()
        }))
    }
}

#[async_trait]
impl ResourceFetcher for Ec2Fetcher {
    fn category(&self) -> ResourceCategory {
        CATEGORY
    }

    fn supported_resource_types(&self) -> Vec<String> {
        RESOURCE_TYPES.iter().map(|t| (*t).to_owned()).collect()
    }

    #[instrument(skip_all, fields(resource_type = %request.resource_type, key = %request.key))]
    async fn fetch(&self, request: &LookupRequest) -> Result<ResourceDescription, LookupError> {
        debug!("describing EC2 resource");
        Ok(ResourceDescription::new(self.describe(request).await?))
    }
}

fn filter(name: &str, value: &str) -> Filter {
    Filter::builder().name(name).values(value).build()
}

fn tags_json(tags: &[Tag]) -> Value {
    tags.iter()
        .map(|t| json!({ "Key": t.key(), "Value": t.value() }))
        .collect()
}

fn name_tag(tags: &[Tag]) -> Option<&str> {
    tags.iter()
        .find(|t| t.key() == Some("Name"))
        .and_then(Tag::value)
}

fn vpc_json(vpc: &Vpc) -> Value {
    json!({
        "VpcId": vpc.vpc_id(),
        "Name": name_tag(vpc.tags()),
        "CidrBlock": vpc.cidr_block(),
        "CidrBlockAssociationSet": vpc.cidr_block_association_set().iter().map(|a| json!({
            "AssociationId": a.association_id(),
            "CidrBlock": a.cidr_block(),
            "CidrBlockState": {
                "State": a.cidr_block_state().and_then(|s| s.state()).map(|s| s.as_str()),
            },
        })).collect::<Vec<_>>(),
        "DhcpOptionsId": vpc.dhcp_options_id(),
        "InstanceTenancy": vpc.instance_tenancy().map(|t| t.as_str()),
        "IsDefault": vpc.is_default(),
        "OwnerId": vpc.owner_id(),
        "State": vpc.state().map(|s| s.as_str()),
        "Tags": tags_json(vpc.tags()),
    })
}

fn flow_log_json(flow_log: &FlowLog) -> Value {
    json!({
        "FlowLogId": flow_log.flow_log_id(),
        "ResourceId": flow_log.resource_id(),
        "CreationTime": timestamp(flow_log.creation_time()),
        "DeliverLogsPermissionArn": flow_log.deliver_logs_permission_arn(),
        "DeliverLogsStatus": flow_log.deliver_logs_status(),
        "FlowLogStatus": flow_log.flow_log_status(),
        "LogDestination": flow_log.log_destination(),
        "LogDestinationType": flow_log.log_destination_type().map(|t| t.as_str()),
        "LogFormat": flow_log.log_format(),
        "LogGroupName": flow_log.log_group_name(),
        "MaxAggregationInterval": flow_log.max_aggregation_interval(),
        "TrafficType": flow_log.traffic_type().map(|t| t.as_str()),
        "Tags": tags_json(flow_log.tags()),
    })
}

fn internet_gateway_json(igw: &InternetGateway) -> Value {
    json!({
        "InternetGatewayId": igw.internet_gateway_id(),
        "Name": name_tag(igw.tags()),
        "OwnerId": igw.owner_id(),
        "Attachments": igw.attachments().iter().map(|a| json!({
            "State": a.state().map(|s| s.as_str()),
            "VpcId": a.vpc_id(),
        })).collect::<Vec<_>>(),
        "Tags": tags_json(igw.tags()),
    })
}

fn route_table_json(table: &RouteTable) -> Value {
    json!({
        "RouteTableId": table.route_table_id(),
        "Name": name_tag(table.tags()),
        "VpcId": table.vpc_id(),
        "OwnerId": table.owner_id(),
        "Associations": table.associations().iter().map(|a| json!({
            "RouteTableAssociationId": a.route_table_association_id(),
            "Main": a.main(),
            "SubnetId": a.subnet_id(),
            "GatewayId": a.gateway_id(),
            "AssociationState": {
                "State": a.association_state().and_then(|s| s.state()).map(|s| s.as_str()),
            },
        })).collect::<Vec<_>>(),
        "Routes": table.routes().iter().map(|r| json!({
            "DestinationCidrBlock": r.destination_cidr_block(),
            "DestinationPrefixListId": r.destination_prefix_list_id(),
            "GatewayId": r.gateway_id(),
            "NatGatewayId": r.nat_gateway_id(),
            "TransitGatewayId": r.transit_gateway_id(),
            "VpcPeeringConnectionId": r.vpc_peering_connection_id(),
            "Origin": r.origin().map(|o| o.as_str()),
            "State": r.state().map(|s| s.as_str()),
        })).collect::<Vec<_>>(),
        "Tags": tags_json(table.tags()),
    })
}

fn subnet_json(subnet: &Subnet) -> Value {
    json!({
        "SubnetId": subnet.subnet_id(),
        "Name": name_tag(subnet.tags()),
        "VpcId": subnet.vpc_id(),
        "CidrBlock": subnet.cidr_block(),
        "AvailabilityZone": subnet.availability_zone(),
        "AvailableIpAddressCount": subnet.available_ip_address_count(),
        "AssignIpv6AddressOnCreation": subnet.assign_ipv6_address_on_creation(),
        "DefaultForAz": subnet.default_for_az(),
        "MapPublicIpOnLaunch": subnet.map_public_ip_on_launch(),
        "OwnerId": subnet.owner_id(),
        "State": subnet.state().map(|s| s.as_str()),
        "Tags": tags_json(subnet.tags()),
    })
}

fn nat_gateway_json(nat: &NatGateway) -> Value {
    json!({
        "NatGatewayId": nat.nat_gateway_id(),
        "Name": name_tag(nat.tags()),
        "VpcId": nat.vpc_id(),
        "SubnetId": nat.subnet_id(),
        "ConnectivityType": nat.connectivity_type().map(|t| t.as_str()),
        "State": nat.state().map(|s| s.as_str()),
        "NatGatewayAddresses": nat.nat_gateway_addresses().iter().map(|a| json!({
            "AllocationId": a.allocation_id(),
            "PublicIp": a.public_ip(),
            "PrivateIp": a.private_ip(),
        })).collect::<Vec<_>>(),
        "Tags": tags_json(nat.tags()),
    })
}

fn network_acl_json(acl: &NetworkAcl) -> Value {
    json!({
        "NetworkAclId": acl.network_acl_id(),
        "Name": name_tag(acl.tags()),
        "VpcId": acl.vpc_id(),
        "IsDefault": acl.is_default(),
        "OwnerId": acl.owner_id(),
        "Associations": acl.associations().iter().map(|a| json!({
            "NetworkAclAssociationId": a.network_acl_association_id(),
            "SubnetId": a.subnet_id(),
        })).collect::<Vec<_>>(),
        "Entries": acl.entries().iter().map(|e| json!({
            "RuleNumber": e.rule_number(),
            "Protocol": e.protocol(),
            "RuleAction": e.rule_action().map(|a| a.as_str()),
            "Egress": e.egress(),
            "CidrBlock": e.cidr_block(),
        })).collect::<Vec<_>>(),
        "Tags": tags_json(acl.tags()),
    })
}

fn vpc_endpoint_json(endpoint: &VpcEndpoint) -> Value {
    json!({
        "VpcEndpointId": endpoint.vpc_endpoint_id(),
        "Name": name_tag(endpoint.tags()),
        "VpcEndpointType": endpoint.vpc_endpoint_type().map(|t| t.as_str()),
        "VpcId": endpoint.vpc_id(),
        "ServiceName": endpoint.service_name(),
        "State": endpoint.state().map(|s| s.as_str()),
        "PrivateDnsEnabled": endpoint.private_dns_enabled(),
        "OwnerId": endpoint.owner_id(),
        "PolicyDocument": endpoint.policy_document(),
        "Groups": endpoint.groups().iter().map(|g| json!({
            "GroupId": g.group_id(),
            "GroupName": g.group_name(),
        })).collect::<Vec<_>>(),
        "RouteTableIds": strings(endpoint.route_table_ids()),
        "SubnetIds": strings(endpoint.subnet_ids()),
        "Tags": tags_json(endpoint.tags()),
    })
}

fn permission_json(permission: &IpPermission) -> Value {
    json!({
        "IpProtocol": permission.ip_protocol(),
        "FromPort": permission.from_port(),
        "ToPort": permission.to_port(),
        "IpRanges": permission.ip_ranges().iter().map(|r| json!({
            "CidrIp": r.cidr_ip(),
            "Description": r.description(),
        })).collect::<Vec<_>>(),
        "UserIdGroupPairs": permission.user_id_group_pairs().iter().map(|p| json!({
            "GroupId": p.group_id(),
            "UserId": p.user_id(),
        })).collect::<Vec<_>>(),
    })
}

fn security_group_json(group: &SecurityGroup) -> Value {
    json!({
        "GroupId": group.group_id(),
        "GroupName": group.group_name(),
        "Description": group.description(),
        "VpcId": group.vpc_id(),
        "OwnerId": group.owner_id(),
        "IpPermissions": group.ip_permissions().iter().map(permission_json).collect::<Vec<_>>(),
        "IpPermissionsEgress": group.ip_permissions_egress().iter().map(permission_json).collect::<Vec<_>>(),
        "Tags": tags_json(group.tags()),
    })
}

fn transit_gateway_json(tgw: &TransitGateway) -> Value {
    json!({
        "TransitGatewayId": tgw.transit_gateway_id(),
        "Name": name_tag(tgw.tags()),
        "TransitGatewayArn": tgw.transit_gateway_arn(),
        "State": tgw.state().map(|s| s.as_str()),
        "OwnerId": tgw.owner_id(),
        "Description": tgw.description(),
        "Tags": tags_json(tgw.tags()),
    })
}

fn transit_gateway_attachment_json(attachment: &TransitGatewayAttachment) -> Value {
    json!({
        "TransitGatewayAttachmentId": attachment.transit_gateway_attachment_id(),
        "Name": name_tag(attachment.tags()),
        "TransitGatewayId": attachment.transit_gateway_id(),
        "ResourceType": attachment.resource_type().map(|t| t.as_str()),
        "ResourceId": attachment.resource_id(),
        "ResourceOwnerId": attachment.resource_owner_id(),
        "State": attachment.state().map(|s| s.as_str()),
        "Tags": tags_json(attachment.tags()),
    })
}

fn transit_gateway_vpc_attachment_json(attachment: &TransitGatewayVpcAttachment) -> Value {
    json!({
        "TransitGatewayAttachmentId": attachment.transit_gateway_attachment_id(),
        "Name": name_tag(attachment.tags()),
        "TransitGatewayId": attachment.transit_gateway_id(),
        "VpcId": attachment.vpc_id(),
        "VpcOwnerId": attachment.vpc_owner_id(),
        "State": attachment.state().map(|s| s.as_str()),
        "SubnetIds": strings(attachment.subnet_ids()),
        "Tags": tags_json(attachment.tags()),
    })
}

use async_trait::async_trait;
use aws_sdk_iam::types::{
    AttachedPolicy, Group, InstanceProfile, PasswordPolicy, Policy, PolicyVersion, Role, Tag, User,
};
use infracheck_core::{LookupError, LookupRequest, ResourceCategory, ResourceDescription};
use infracheck_provider::{ResourceFetcher, unsupported_resource_type};
use serde_json::{Value, json};
use tracing::{debug, instrument};

use crate::auth::build_sdk_config;
use crate::config::AwsBaseConfig;
use crate::error::{AwsFetchError, sdk_error};
use crate::json::{require_key, require_param, timestamp};

const CATEGORY: ResourceCategory = ResourceCategory::Iam;

const RESOURCE_TYPES: &[&str] = &[
    "role",
    "user",
    "group",
    "groups_for_user",
    "policy",
    "policy_version",
    "entities_for_policy",
    "attached_role_policies",
    "role_inline_policy",
    "instance_profile",
    "account_aliases",
    "account_password_policy",
    "saml_provider",
];

/// Describes IAM identities and policies.
///
/// Policy documents are returned as the service sends them (URL-encoded
/// JSON); compare them with a `json` check.
pub struct IamFetcher {
    client: aws_sdk_iam::Client,
}

impl IamFetcher {
    pub async fn new(config: &AwsBaseConfig) -> Self {
        let sdk_config = build_sdk_config(config).await;
        Self::from_sdk_config(&sdk_config)
    }

    pub fn from_sdk_config(sdk_config: &aws_config::SdkConfig) -> Self {
        Self::with_client(aws_sdk_iam::Client::new(sdk_config))
    }

    /// Create a fetcher around a pre-built client (for testing).
    pub fn with_client(client: aws_sdk_iam::Client) -> Self {
        Self { client }
    }

    async fn describe(&self, request: &LookupRequest) -> Result<Value, AwsFetchError> {
        match request.resource_type.as_str() {
            "role" => self.role(require_key(request, "a role name")?).await,
            "user" => self.user(require_key(request, "a user name")?).await,
            "group" => self.group(require_key(request, "a group name")?).await,
            "groups_for_user" => self.groups_for_user(require_key(request, "a user name")?).await,
            "policy" => self.policy(require_key(request, "a policy ARN")?).await,
            "policy_version" => self.policy_version(require_key(request, "a policy ARN")?).await,
            "entities_for_policy" => {
                self.entities_for_policy(require_key(request, "a policy ARN")?).await
            }
            "attached_role_policies" => {
                self.attached_role_policies(require_key(request, "a role name")?).await
            }
            "role_inline_policy" => {
                self.role_inline_policy(
                    require_key(request, "a role name")?,
                    require_param(request, "policy_name")?,
                )
                .await
            }
            "instance_profile" => {
                self.instance_profile(require_key(request, "an instance profile name")?).await
            }
            "account_aliases" => self.account_aliases().await,
            "account_password_policy" => self.account_password_policy().await,
            "saml_provider" => self.saml_provider(require_key(request, "a SAML provider ARN")?).await,
            _ => Err(AwsFetchError::InvalidInput(
                unsupported_resource_type(request).message,
            )),
        }
    }

    async fn role(&self, name: &str) -> Result<Value, AwsFetchError> {
        let output = self
            .client
            .get_role()
            .role_name(name)
            .send()
            .await
            .map_err(|e| sdk_error(CATEGORY, "get_role", &e))?;
        let role = output.role().ok_or_else(|| AwsFetchError::Empty(format!("role {name}")))?;
        Ok(json!({ "Role": role_json(role) }))
    }

    async fn user(&self, name: &str) -> Result<Value, AwsFetchError> {
        let output = self
            .client
            .get_user()
            .user_name(name)
            .send()
            .await
            .map_err(|e| sdk_error(CATEGORY, "get_user", &e))?;
        let user = output.user().ok_or_else(|| AwsFetchError::Empty(format!("user {name}")))?;
        Ok(json!({ "User": user_json(user) }))
    }

    async fn group(&self, name: &str) -> Result<Value, AwsFetchError> {
        let output = self
            .client
            .get_group()
            .group_name(name)
            .send()
            .await
            .map_err(|e| sdk_error(CATEGORY, "get_group", &e))?;
        Ok(json!({
            "Group": output.group().map(group_json),
            "Users": output.users().iter().map(user_json).collect::<Vec<_>>(),
        }))
    }

    async fn groups_for_user(&self, name: &str) -> Result<Value, AwsFetchError> {
        let output = self
            .client
            .list_groups_for_user()
            .user_name(name)
            .send()
            .await
            .map_err(|e| sdk_error(CATEGORY, "list_groups_for_user", &e))?;
        Ok(json!({ "Groups": output.groups().iter().map(group_json).collect::<Vec<_>>() }))
    }

    async fn policy(&self, arn: &str) -> Result<Value, AwsFetchError> {
        let output = self
            .client
            .get_policy()
            .policy_arn(arn)
            .send()
            .await
            .map_err(|e| sdk_error(CATEGORY, "get_policy", &e))?;
        let policy = output.policy().ok_or_else(|| AwsFetchError::Empty(format!("policy {arn}")))?;
        Ok(json!({ "Policy": policy_json(policy) }))
    }

    /// Resolve the newest version first, then fetch its document.
    async fn policy_version(&self, arn: &str) -> Result<Value, AwsFetchError> {
        let versions = self
            .client
            .list_policy_versions()
            .policy_arn(arn)
            .send()
            .await
            .map_err(|e| sdk_error(CATEGORY, "list_policy_versions", &e))?;
        let version_id = latest_version_id(versions.versions())
            .ok_or_else(|| AwsFetchError::Empty(format!("versions of policy {arn}")))?;
        debug!(policy_arn = arn, version_id, "resolved policy version");

        let output = self
            .client
            .get_policy_version()
            .policy_arn(arn)
            .version_id(version_id)
            .send()
            .await
            .map_err(|e| sdk_error(CATEGORY, "get_policy_version", &e))?;
        Ok(json!({ "PolicyVersion": output.policy_version().map(policy_version_json) }))
    }

    async fn entities_for_policy(&self, arn: &str) -> Result<Value, AwsFetchError> {
        let output = self
            .client
            .list_entities_for_policy()
            .policy_arn(arn)
            .send()
            .await
            .map_err(|e| sdk_error(CATEGORY, "list_entities_for_policy", &e))?;
        Ok(json!({
            "PolicyGroups": output.policy_groups().iter().map(|g| json!({
                "GroupName": g.group_name(),
                "GroupId": g.group_id(),
            })).collect::<Vec<_>>(),
            "PolicyUsers": output.policy_users().iter().map(|u| json!({
                "UserName": u.user_name(),
                "UserId": u.user_id(),
            })).collect::<Vec<_>>(),
            "PolicyRoles": output.policy_roles().iter().map(|r| json!({
                "RoleName": r.role_name(),
                "RoleId": r.role_id(),
            })).collect::<Vec<_>>(),
        }))
    }

    async fn attached_role_policies(&self, role_name: &str) -> Result<Value, AwsFetchError> {
        let output = self
            .client
            .list_attached_role_policies()
            .role_name(role_name)
            .send()
            .await
            .map_err(|e| sdk_error(CATEGORY, "list_attached_role_policies", &e))?;
        Ok(json!({
            "AttachedPolicies": output.attached_policies().iter().map(attached_policy_json).collect::<Vec<_>>()
        }))
    }

    async fn role_inline_policy(&self, role_name: &str, policy_name: &str) -> Result<Value, AwsFetchError> {
        let output = self
            .client
            .get_role_policy()
            .role_name(role_name)
            .policy_name(policy_name)
            .send()
            .await
            .map_err(|e| sdk_error(CATEGORY, "get_role_policy", &e))?;
        Ok(json!({
            "RoleName": output.role_name(),
            "PolicyName": output.policy_name(),
            "PolicyDocument": output.policy_document(),
        }))
    }

    async fn instance_profile(&self, name: &str) -> Result<Value, AwsFetchError> {
        let output = self
            .client
            .get_instance_profile()
            .instance_profile_name(name)
            .send()
            .await
            .map_err(|e| sdk_error(CATEGORY, "get_instance_profile", &e))?;
        let profile = output
            .instance_profile()
            .ok_or_else(|| AwsFetchError::Empty(format!("instance profile {name}")))?;
        Ok(json!({ "InstanceProfile": instance_profile_json(profile) }))
    }

    async fn account_aliases(&self) -> Result<Value, AwsFetchError> {
        let output = self
            .client
            .list_account_aliases()
            .send()
            .await
            .map_err(|e| sdk_error(CATEGORY, "list_account_aliases", &e))?;
        Ok(json!({ "AccountAliases": output.account_aliases() }))
    }

    async fn account_password_policy(&self) -> Result<Value, AwsFetchError> {
        let output = self
            .client
            .get_account_password_policy()
            .send()
            .await
            .map_err(|e| sdk_error(CATEGORY, "get_account_password_policy", &e))?;
        let policy = output
            .password_policy()
            .ok_or_else(|| AwsFetchError::Empty("account password policy".into()))?;
        Ok(json!({ "PasswordPolicy": password_policy_json(policy) }))
    }

    async fn saml_provider(&self, arn: &str) -> Result<Value, AwsFetchError> {
        let output = self
            .client
            .get_saml_provider()
            .saml_provider_arn(arn)
            .send()
            .await
            .map_err(|e| sdk_error(CATEGORY, "get_saml_provider", &e))?;
        Ok(json!({
            "SAMLMetadataDocument": output.saml_metadata_document(),
            "CreateDate": timestamp(output.create_date()),
            "ValidUntil": timestamp(output.valid_until()),
            "Tags": tags_json(output.tags()),
        }))
    }
}

#[async_trait]
impl ResourceFetcher for IamFetcher {
    fn category(&self) -> ResourceCategory {
        CATEGORY
    }

    fn supported_resource_types(&self) -> Vec<String> {
        RESOURCE_TYPES.iter().map(|t| (*t).to_owned()).collect()
    }

    #[instrument(skip_all, fields(resource_type = %request.resource_type, key = %request.key))]
    async fn fetch(&self, request: &LookupRequest) -> Result<ResourceDescription, LookupError> {
        debug!("describing IAM resource");
        Ok(ResourceDescription::new(self.describe(request).await?))
    }
}

/// The default version when flagged, otherwise the most recently created.
fn latest_version_id(versions: &[PolicyVersion]) -> Option<&str> {
    versions
        .iter()
        .find(|v| v.is_default_version())
        .or_else(|| versions.iter().max_by_key(|v| v.create_date().map(|d| d.secs())))
        .and_then(PolicyVersion::version_id)
}

fn tags_json(tags: &[Tag]) -> Value {
    tags.iter()
        .map(|t| json!({ "Key": t.key(), "Value": t.value() }))
        .collect()
}

fn role_json(role: &Role) -> Value {
    json!({
        "Path": role.path(),
        "RoleName": role.role_name(),
        "RoleId": role.role_id(),
        "Arn": role.arn(),
        "CreateDate": timestamp(role.create_date()),
        "AssumeRolePolicyDocument": role.assume_role_policy_document(),
        "Description": role.description(),
        "MaxSessionDuration": role.max_session_duration(),
        "PermissionsBoundary": role.permissions_boundary().map(|b| json!({
            "PermissionsBoundaryArn": b.permissions_boundary_arn(),
        })),
        "Tags": tags_json(role.tags()),
    })
}

fn user_json(user: &User) -> Value {
    json!({
        "Path": user.path(),
        "UserName": user.user_name(),
        "UserId": user.user_id(),
        "Arn": user.arn(),
        "CreateDate": timestamp(user.create_date()),
        "PasswordLastUsed": timestamp(user.password_last_used()),
        "Tags": tags_json(user.tags()),
    })
}

fn group_json(group: &Group) -> Value {
    json!({
        "Path": group.path(),
        "GroupName": group.group_name(),
        "GroupId": group.group_id(),
        "Arn": group.arn(),
        "CreateDate": timestamp(group.create_date()),
    })
}

fn policy_json(policy: &Policy) -> Value {
    json!({
        "PolicyName": policy.policy_name(),
        "PolicyId": policy.policy_id(),
        "Arn": policy.arn(),
        "Path": policy.path(),
        "DefaultVersionId": policy.default_version_id(),
        "AttachmentCount": policy.attachment_count(),
        "IsAttachable": policy.is_attachable(),
        "Description": policy.description(),
        "CreateDate": timestamp(policy.create_date()),
        "UpdateDate": timestamp(policy.update_date()),
        "Tags": tags_json(policy.tags()),
    })
}

fn policy_version_json(version: &PolicyVersion) -> Value {
    json!({
        "Document": version.document(),
        "VersionId": version.version_id(),
        "IsDefaultVersion": version.is_default_version(),
        "CreateDate": timestamp(version.create_date()),
    })
}

fn attached_policy_json(policy: &AttachedPolicy) -> Value {
    json!({
        "PolicyName": policy.policy_name(),
        "PolicyArn": policy.policy_arn(),
    })
}

fn instance_profile_json(profile: &InstanceProfile) -> Value {
    json!({
        "Path": profile.path(),
        "InstanceProfileName": profile.instance_profile_name(),
        "InstanceProfileId": profile.instance_profile_id(),
        "Arn": profile.arn(),
        "CreateDate": timestamp(profile.create_date()),
        "Roles": profile.roles().iter().map(role_json).collect::<Vec<_>>(),
        "Tags": tags_json(profile.tags()),
    })
}

fn password_policy_json(policy: &PasswordPolicy) -> Value {
    json!({
        "MinimumPasswordLength": policy.minimum_password_length(),
        "RequireSymbols": policy.require_symbols(),
        "RequireNumbers": policy.require_numbers(),
        "RequireUppercaseCharacters": policy.require_uppercase_characters(),
        "RequireLowercaseCharacters": policy.require_lowercase_characters(),
        "AllowUsersToChangePassword": policy.allow_users_to_change_password(),
        "ExpirePasswords": policy.expire_passwords(),
        "MaxPasswordAge": policy.max_password_age(),
        "PasswordReusePrevention": policy.password_reuse_prevention(),
        "HardExpiry": policy.hard_expiry(),
    })
}

#[cfg(test)]
mod tests {
    use aws_smithy_types::DateTime;

    use super::*;

    fn version(id: &str, default: bool, secs: i64) -> PolicyVersion {
        PolicyVersion::builder()
            .version_id(id)
            .is_default_version(default)
            .create_date(DateTime::from_secs(secs))
            .build()
    }

    #[test]
    fn default_version_wins() {
        let versions = [version("v1", false, 100), version("v2", true, 200), version("v3", false, 300)];
        assert_eq!(latest_version_id(&versions), Some("v2"));
    }

    #[test]
    fn newest_version_without_default() {
        let versions = [version("v1", false, 100), version("v3", false, 300), version("v2", false, 200)];
        assert_eq!(latest_version_id(&versions), Some("v3"));
        assert_eq!(latest_version_id(&[]), None);
    }

    #[test]
    fn password_policy_fields() {
        let policy = PasswordPolicy::builder()
            .minimum_password_length(14)
            .require_symbols(true)
            .password_reuse_prevention(24)
            .build();
        let value = password_policy_json(&policy);
        assert_eq!(value["MinimumPasswordLength"], 14);
        assert_eq!(value["RequireSymbols"], true);
        assert_eq!(value["PasswordReusePrevention"], 24);
        assert!(value["MaxPasswordAge"].is_null());
    }

    #[test]
    fn attached_policy_names() {
        let policy = AttachedPolicy::builder()
            .policy_name("ReadOnlyAccess")
            .policy_arn("arn:aws:iam::aws:policy/ReadOnlyAccess")
            .build();
        assert_eq!(
            attached_policy_json(&policy),
            json!({
                "PolicyName": "ReadOnlyAccess",
                "PolicyArn": "arn:aws:iam::aws:policy/ReadOnlyAccess",
            })
        );
    }
}

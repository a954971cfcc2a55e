//! Inventory collector: listing records -> deletion candidates
//!
//! Applies two filters on top of the raw listings: a hard-coded
//! provider-namespace filter (service-linked roles, AWS-managed policies,
//! default VPC groups — deleting these is never a valid operation for
//! this tool, independent of configuration) and the caller-supplied
//! exclusion list, matched by name.

use crate::model::{Resource, ResourceKind};
use crate::provider::{GroupRecord, PolicyRecord, RoleRecord};
use tracing::debug;

/// IAM path prefix of service-linked roles
const SERVICE_ROLE_PATH: &str = "/aws-service-role/";

/// ARN prefix of AWS-managed policies
const AWS_MANAGED_POLICY_ARN: &str = "arn:aws:iam::aws:";

/// Name of the undeletable per-VPC default security group
const DEFAULT_GROUP_NAME: &str = "default";

fn is_excluded(name: &str, exclude: &[String]) -> bool {
    exclude.iter().any(|e| e == name)
}

/// Turn role listings into candidates, dropping provider-owned roles
pub fn collect_roles(records: Vec<RoleRecord>, exclude: &[String]) -> Vec<Resource> {
    records
        .into_iter()
        .filter(|r| {
            if r.path.starts_with(SERVICE_ROLE_PATH) {
                debug!(role = %r.name, "Skipping service-linked role");
                return false;
            }
            true
        })
        .map(|r| Resource {
            excluded: is_excluded(&r.name, exclude),
            id: r.name.clone(),
            name: r.name,
            kind: ResourceKind::Role,
            arn: r.arn,
            created_at: r.created_at,
        })
        .collect()
}

/// Turn policy listings into candidates, dropping AWS-managed policies.
///
/// The listing is already scoped to customer-managed policies; the ARN
/// check stays as a belt against a misconfigured provider call.
pub fn collect_policies(records: Vec<PolicyRecord>, exclude: &[String]) -> Vec<Resource> {
    records
        .into_iter()
        .filter(|p| {
            if p.arn.starts_with(AWS_MANAGED_POLICY_ARN) {
                debug!(policy = %p.name, "Skipping AWS-managed policy");
                return false;
            }
            true
        })
        .map(|p| Resource {
            excluded: is_excluded(&p.name, exclude),
            id: p.arn.clone(),
            name: p.name,
            kind: ResourceKind::Policy,
            arn: p.arn,
            created_at: p.created_at,
        })
        .collect()
}

/// Turn security-group listings into candidates, dropping default groups
pub fn collect_security_groups(records: Vec<GroupRecord>, exclude: &[String]) -> Vec<Resource> {
    records
        .into_iter()
        .filter(|g| {
            if g.name == DEFAULT_GROUP_NAME {
                debug!(group = %g.id, "Skipping default VPC security group");
                return false;
            }
            true
        })
        .map(|g| Resource {
            excluded: is_excluded(&g.name, exclude) || is_excluded(&g.id, exclude),
            id: g.id.clone(),
            name: g.name,
            kind: ResourceKind::SecurityGroup,
            arn: String::new(),
            created_at: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role_record(name: &str, path: &str) -> RoleRecord {
        RoleRecord {
            name: name.to_string(),
            arn: format!("arn:aws:iam::123456789012:role{path}{name}"),
            path: path.to_string(),
            created_at: None,
        }
    }

    #[test]
    fn service_linked_roles_are_never_candidates() {
        let records = vec![
            role_record("app-role", "/"),
            role_record(
                "AWSServiceRoleForAutoScaling",
                "/aws-service-role/autoscaling.amazonaws.com/",
            ),
        ];
        let candidates = collect_roles(records, &[]);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].name, "app-role");
    }

    #[test]
    fn exclusion_list_marks_but_keeps_roles() {
        let records = vec![role_record("keep-me", "/"), role_record("other", "/")];
        let candidates = collect_roles(records, &["keep-me".to_string()]);
        assert_eq!(candidates.len(), 2);
        assert!(candidates.iter().any(|r| r.name == "keep-me" && r.excluded));
        assert!(candidates.iter().any(|r| r.name == "other" && !r.excluded));
    }

    #[test]
    fn aws_managed_policies_are_never_candidates() {
        let records = vec![
            PolicyRecord {
                name: "ReadOnlyAccess".to_string(),
                arn: "arn:aws:iam::aws:policy/ReadOnlyAccess".to_string(),
                path: "/".to_string(),
                attachment_count: 3,
                created_at: None,
            },
            PolicyRecord {
                name: "team-policy".to_string(),
                arn: "arn:aws:iam::123456789012:policy/team-policy".to_string(),
                path: "/".to_string(),
                attachment_count: 0,
                created_at: None,
            },
        ];
        let candidates = collect_policies(records, &[]);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].name, "team-policy");
        assert_eq!(candidates[0].id, candidates[0].arn);
    }

    #[test]
    fn default_vpc_groups_are_never_candidates() {
        let records = vec![
            GroupRecord {
                id: "sg-0default".to_string(),
                name: "default".to_string(),
                description: "default VPC security group".to_string(),
                vpc_id: Some("vpc-1".to_string()),
            },
            GroupRecord {
                id: "sg-0custom".to_string(),
                name: "web".to_string(),
                description: String::new(),
                vpc_id: Some("vpc-1".to_string()),
            },
        ];
        let candidates = collect_security_groups(records, &[]);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, "sg-0custom");
    }

    #[test]
    fn groups_can_be_excluded_by_name_or_id() {
        let records = vec![
            GroupRecord {
                id: "sg-aaa".to_string(),
                name: "web".to_string(),
                description: String::new(),
                vpc_id: None,
            },
            GroupRecord {
                id: "sg-bbb".to_string(),
                name: "db".to_string(),
                description: String::new(),
                vpc_id: None,
            },
        ];
        let candidates =
            collect_security_groups(records, &["web".to_string(), "sg-bbb".to_string()]);
        assert!(candidates.iter().all(|g| g.excluded));
    }
}

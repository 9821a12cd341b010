use std::str::FromStr;

use crate::domain::errors::ValidationError;
use crate::domain::models::CannedAcl;

pub const ALL_USERS_GROUP: &str = "http://acs.amazonaws.com/groups/global/AllUsers";
pub const AUTHENTICATED_USERS_GROUP: &str =
    "http://acs.amazonaws.com/groups/global/AuthenticatedUsers";

/// Owner of an object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
    pub id: String,
    pub display_name: Option<String>,
}

/// Principal a grant applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grantee {
    CanonicalUser {
        id: String,
        display_name: Option<String>,
    },
    Group {
        uri: String,
    },
    Email {
        address: String,
    },
}

impl Grantee {
    pub fn all_users() -> Self {
        Grantee::Group {
            uri: ALL_USERS_GROUP.to_string(),
        }
    }

    pub fn authenticated_users() -> Self {
        Grantee::Group {
            uri: AUTHENTICATED_USERS_GROUP.to_string(),
        }
    }
}

impl std::fmt::Display for Grantee {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Grantee::CanonicalUser {
                id,
                display_name: Some(name),
            } => write!(f, "user {} ({})", name, id),
            Grantee::CanonicalUser { id, .. } => write!(f, "user {}", id),
            Grantee::Group { uri } => {
                let name = uri.rsplit('/').next().unwrap_or(uri.as_str());
                write!(f, "group {}", name)
            }
            Grantee::Email { address } => write!(f, "email {}", address),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    FullControl,
    Read,
    Write,
    ReadAcp,
    WriteAcp,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::FullControl => "FULL_CONTROL",
            Permission::Read => "READ",
            Permission::Write => "WRITE",
            Permission::ReadAcp => "READ_ACP",
            Permission::WriteAcp => "WRITE_ACP",
        }
    }
}

impl FromStr for Permission {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FULL_CONTROL" => Ok(Permission::FullControl),
            "READ" => Ok(Permission::Read),
            "WRITE" => Ok(Permission::Write),
            "READ_ACP" => Ok(Permission::ReadAcp),
            "WRITE_ACP" => Ok(Permission::WriteAcp),
            other => Err(ValidationError::InvalidField {
                field: "permission".to_string(),
                value: other.to_string(),
                expected: "FULL_CONTROL, READ, WRITE, READ_ACP or WRITE_ACP".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub grantee: Grantee,
    pub permission: Permission,
}

impl std::fmt::Display for Grant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.grantee, self.permission.as_str())
    }
}

/// Grant list of an object
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AccessControlList {
    pub owner: Option<Owner>,
    pub grants: Vec<Grant>,
}

impl AccessControlList {
    /// Expand a canned ACL into the grants the provider stores for it
    pub fn from_canned(owner: Owner, acl: CannedAcl) -> Self {
        let mut grants = vec![Grant {
            grantee: Grantee::CanonicalUser {
                id: owner.id.clone(),
                display_name: owner.display_name.clone(),
            },
            permission: Permission::FullControl,
        }];

        match acl {
            CannedAcl::PublicRead => grants.push(Grant {
                grantee: Grantee::all_users(),
                permission: Permission::Read,
            }),
            CannedAcl::PublicReadWrite => {
                grants.push(Grant {
                    grantee: Grantee::all_users(),
                    permission: Permission::Read,
                });
                grants.push(Grant {
                    grantee: Grantee::all_users(),
                    permission: Permission::Write,
                });
            }
            CannedAcl::AuthenticatedRead => grants.push(Grant {
                grantee: Grantee::authenticated_users(),
                permission: Permission::Read,
            }),
            // Single-account fake: the bucket owner is the object owner
            CannedAcl::Private
            | CannedAcl::BucketOwnerRead
            | CannedAcl::BucketOwnerFullControl => {}
        }

        Self {
            owner: Some(owner),
            grants,
        }
    }

    /// Whether anonymous users may read the object
    pub fn is_public_read(&self) -> bool {
        self.grants.iter().any(|grant| {
            grant.grantee == Grantee::all_users()
                && matches!(grant.permission, Permission::Read | Permission::FullControl)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> Owner {
        Owner {
            id: "owner-id".to_string(),
            display_name: Some("demo".to_string()),
        }
    }

    #[test]
    fn test_public_read_grants() {
        let acl = AccessControlList::from_canned(owner(), CannedAcl::PublicRead);
        assert_eq!(acl.grants.len(), 2);
        assert!(acl.is_public_read());
    }

    #[test]
    fn test_private_has_only_owner_grant() {
        let acl = AccessControlList::from_canned(owner(), CannedAcl::Private);
        assert_eq!(acl.grants.len(), 1);
        assert_eq!(acl.grants[0].permission, Permission::FullControl);
        assert!(!acl.is_public_read());
    }

    #[test]
    fn test_grant_display() {
        let grant = Grant {
            grantee: Grantee::all_users(),
            permission: Permission::Read,
        };
        assert_eq!(grant.to_string(), "group AllUsers: READ");
    }
}

//! Groups, group paths and the lookup seam the rule resolves them through.

use std::collections::HashMap;
use std::sync::RwLock;

use groupclaim_core::{DomainError, DomainResult, Entity, GroupId, TenantId, ValueObject};

use crate::subject::SubjectContext;

/// Slash-separated path of a group within its tenant, e.g. `/staff/external`.
///
/// A leading slash is optional on input and always present on display.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupPath(Vec<String>);

impl ValueObject for GroupPath {}

impl GroupPath {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let trimmed = raw.trim();
        let inner = trimmed.strip_prefix('/').unwrap_or(trimmed);
        let inner = inner.strip_suffix('/').unwrap_or(inner);
        if inner.is_empty() {
            return Err(DomainError::validation("group path has no segments"));
        }

        let segments: Vec<String> = inner.split('/').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(DomainError::validation(format!(
                "group path '{trimmed}' contains an empty segment"
            )));
        }
        Ok(Self(segments))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn name(&self) -> &str {
        self.0.last().map(String::as_str).unwrap_or_default()
    }
}

impl core::fmt::Display for GroupPath {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for segment in &self.0 {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

impl core::str::FromStr for GroupPath {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    id: GroupId,
    tenant_id: TenantId,
    name: String,
    parent: Option<GroupId>,
}

impl Group {
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<GroupId> {
        self.parent
    }
}

impl Entity for Group {
    type Id = GroupId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Host-side group lookup used by the rule.
///
/// Implementations must be read-only and fast; they are called once per rule
/// per issued token.
pub trait GroupResolver: Send + Sync {
    /// Resolve `path` within `tenant`. `None` when no group lives at that path.
    fn find_group_by_path(&self, tenant: TenantId, path: &GroupPath) -> Option<Group>;

    /// Whether the subject belongs to `group` itself. Membership of a child
    /// group does not count.
    fn is_direct_member(&self, subject: &SubjectContext, group: &Group) -> bool {
        subject.tenant_id() == group.tenant_id() && subject.is_direct_member_of(group.id())
    }
}

/// In-memory group tree, one forest per tenant.
///
/// Useful for tests and for hosts that cache their group hierarchy.
#[derive(Debug, Default)]
pub struct InMemoryRealm {
    groups: RwLock<HashMap<GroupId, Group>>,
}

impl InMemoryRealm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a group under `parent` (or at the top level).
    ///
    /// Sibling names are unique and names may not contain `/`.
    pub fn add_group(
        &self,
        tenant_id: TenantId,
        name: &str,
        parent: Option<GroupId>,
    ) -> DomainResult<Group> {
        let name = validate_name(name)?;
        let mut groups = self.groups.write().unwrap_or_else(|e| e.into_inner());

        if let Some(parent_id) = parent {
            match groups.get(&parent_id) {
                Some(p) if p.tenant_id == tenant_id => {}
                Some(_) => return Err(DomainError::validation("parent group belongs to another tenant")),
                None => return Err(DomainError::validation(format!("parent group {parent_id} not found"))),
            }
        }
        if sibling_exists(&groups, tenant_id, parent, name, None) {
            return Err(DomainError::validation(format!("sibling group '{name}' already exists")));
        }

        let group = Group {
            id: GroupId::new(),
            tenant_id,
            name: name.to_string(),
            parent,
        };
        groups.insert(group.id, group.clone());
        Ok(group)
    }

    /// Create every missing group along `path` and return the last one.
    pub fn ensure_path(&self, tenant_id: TenantId, path: &GroupPath) -> DomainResult<Group> {
        let mut parent: Option<Group> = None;
        for depth in 1..=path.segments().len() {
            let prefix = GroupPath(path.segments()[..depth].to_vec());
            let group = match self.find_group_by_path(tenant_id, &prefix) {
                Some(existing) => existing,
                None => self.add_group(tenant_id, prefix.name(), parent.as_ref().map(|g| g.id))?,
            };
            parent = Some(group);
        }
        parent.ok_or_else(|| DomainError::validation("group path has no segments"))
    }

    pub fn rename_group(&self, id: GroupId, new_name: &str) -> DomainResult<()> {
        let new_name = validate_name(new_name)?;
        let mut groups = self.groups.write().unwrap_or_else(|e| e.into_inner());
        let (tenant_id, parent) = match groups.get(&id) {
            Some(g) => (g.tenant_id, g.parent),
            None => return Err(DomainError::validation(format!("group {id} not found"))),
        };
        if sibling_exists(&groups, tenant_id, parent, new_name, Some(id)) {
            return Err(DomainError::validation(format!("sibling group '{new_name}' already exists")));
        }
        if let Some(group) = groups.get_mut(&id) {
            group.name = new_name.to_string();
        }
        Ok(())
    }

    /// Remove a group and its whole subtree. Returns how many groups were removed.
    pub fn remove_group(&self, id: GroupId) -> usize {
        let mut groups = self.groups.write().unwrap_or_else(|e| e.into_inner());
        let mut pending = vec![id];
        let mut removed = 0;
        while let Some(next) = pending.pop() {
            if groups.remove(&next).is_some() {
                removed += 1;
                pending.extend(
                    groups
                        .values()
                        .filter(|g| g.parent == Some(next))
                        .map(|g| g.id),
                );
            }
        }
        removed
    }

    /// Full path of a group, if it still exists.
    pub fn path_of(&self, id: GroupId) -> Option<GroupPath> {
        let groups = self.groups.read().unwrap_or_else(|e| e.into_inner());
        let mut segments = Vec::new();
        let mut cursor = groups.get(&id);
        while let Some(group) = cursor {
            segments.push(group.name.clone());
            cursor = group.parent.and_then(|p| groups.get(&p));
        }
        if segments.is_empty() {
            return None;
        }
        segments.reverse();
        Some(GroupPath(segments))
    }
}

impl GroupResolver for InMemoryRealm {
    fn find_group_by_path(&self, tenant: TenantId, path: &GroupPath) -> Option<Group> {
        let groups = self.groups.read().unwrap_or_else(|e| e.into_inner());
        let mut parent: Option<GroupId> = None;
        let mut found: Option<&Group> = None;
        for segment in path.segments() {
            let next = groups
                .values()
                .find(|g| g.tenant_id == tenant && g.parent == parent && g.name == *segment)?;
            parent = Some(next.id);
            found = Some(next);
        }
        found.cloned()
    }
}

fn validate_name(name: &str) -> DomainResult<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("group name is empty"));
    }
    if name.contains('/') {
        return Err(DomainError::validation(format!("group name '{name}' contains '/'")));
    }
    Ok(name)
}

fn sibling_exists(
    groups: &HashMap<GroupId, Group>,
    tenant_id: TenantId,
    parent: Option<GroupId>,
    name: &str,
    except: Option<GroupId>,
) -> bool {
    groups.values().any(|g| {
        g.tenant_id == tenant_id && g.parent == parent && g.name == name && Some(g.id) != except
    })
}

use std::collections::HashSet;

/// The identity invoking an operation, as supplied by the host platform for
/// a single request.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: u64,
    pub role_ids: HashSet<u64>,
}

impl Actor {
    pub fn new(id: u64, role_ids: impl IntoIterator<Item = u64>) -> Self {
        Self {
            id,
            role_ids: role_ids.into_iter().collect(),
        }
    }

    pub fn has_role(&self, role_id: u64) -> bool {
        self.role_ids.contains(&role_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    StaffOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    NoServerContext,
    NotStaff,
}

impl DenyReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoServerContext => "no server context",
            Self::NotStaff => "not staff",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::NoServerContext => "This operation is not available outside a server.",
            Self::NotStaff => "You must be a staff member to use this operation.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        self == Self::Allow
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    pub name: &'static str,
    pub visibility: Visibility,
}

/// Static operation registry; immutable at runtime.
pub const OPERATIONS: &[Operation] = &[
    Operation {
        name: "info",
        visibility: Visibility::Public,
    },
    Operation {
        name: "user",
        visibility: Visibility::Public,
    },
    Operation {
        name: "players",
        visibility: Visibility::StaffOnly,
    },
];

pub fn operation(name: &str) -> Option<Operation> {
    OPERATIONS.iter().copied().find(|op| op.name == name)
}

/// Hard gate evaluated before any operation executes. Missing server
/// context denies before the staff check; public operations are otherwise
/// always allowed; staff-only operations require the configured staff role.
#[derive(Debug, Clone)]
pub struct AuthPolicy {
    staff_role_id: u64,
}

impl AuthPolicy {
    pub fn new(staff_role_id: u64) -> Self {
        Self { staff_role_id }
    }

    pub fn authorize(&self, actor: &Actor, has_server_context: bool, operation: Operation) -> Decision {
        if !has_server_context {
            return Decision::Deny(DenyReason::NoServerContext);
        }

        match operation.visibility {
            Visibility::Public => Decision::Allow,
            Visibility::StaffOnly if actor.has_role(self.staff_role_id) => Decision::Allow,
            Visibility::StaffOnly => Decision::Deny(DenyReason::NotStaff),
        }
    }
}

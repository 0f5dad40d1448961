// src/services/access.rs
//
// Tenant scope filter: who may see which unit, and what they may do there.

use uuid::Uuid;

use crate::{common::error::AppError, models::auth::Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ReadScoped,
    WriteCatalogue,
    Request,
    Review,
    ViewUsers,
    ManageUsers,
    ManageUnits,
}

impl Capability {
    pub fn action(&self) -> &'static str {
        match self {
            Capability::ReadScoped => "read this data",
            Capability::WriteCatalogue => "modify the catalogue",
            Capability::Request => "create or change requisitions",
            Capability::Review => "review requisitions",
            Capability::ViewUsers => "view users",
            Capability::ManageUsers => "manage users",
            Capability::ManageUnits => "manage units",
        }
    }
}

impl Role {
    /// Global roles see every unit regardless of assignments.
    pub fn is_global(&self) -> bool {
        matches!(self, Role::Superuser | Role::Admin)
    }

    pub fn grants(&self, capability: Capability) -> bool {
        use Capability::*;
        match self {
            Role::Superuser | Role::Admin => true,
            Role::Manager => matches!(
                capability,
                ReadScoped | WriteCatalogue | Request | Review | ViewUsers
            ),
            Role::Staff | Role::Viewer => capability == ReadScoped,
        }
    }
}

/// The units a list query may return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitScope {
    All,
    Units(Vec<Uuid>),
}

impl UnitScope {
    /// Bind value for `($1::uuid[] IS NULL OR unit_id = ANY($1))`.
    pub fn as_filter(&self) -> Option<Vec<Uuid>> {
        match self {
            UnitScope::All => None,
            UnitScope::Units(ids) => Some(ids.clone()),
        }
    }

    /// Intersects the scope with an explicit `unitId` filter.
    pub fn narrow(self, unit_id: Option<Uuid>) -> UnitScope {
        match (self, unit_id) {
            (scope, None) => scope,
            (UnitScope::All, Some(id)) => UnitScope::Units(vec![id]),
            (UnitScope::Units(ids), Some(id)) => {
                UnitScope::Units(ids.into_iter().filter(|u| *u == id).collect())
            }
        }
    }
}

/// The authenticated principal as seen by the services.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user_id: Uuid,
    pub role: Role,
    pub unit_ids: Vec<Uuid>,
    pub current_unit: Option<Uuid>,
}

impl Caller {
    pub fn new(user_id: Uuid, role: Role, unit_ids: Vec<Uuid>) -> Self {
        Self { user_id, role, unit_ids, current_unit: None }
    }

    /// Applies the `X-Current-Unit` header. Naming a unit the caller is not
    /// assigned to is rejected, except for global roles.
    pub fn with_current_unit(mut self, unit: Option<Uuid>) -> Result<Self, AppError> {
        if let Some(id) = unit {
            if !self.role.is_global() && !self.unit_ids.contains(&id) {
                return Err(AppError::UnitNotAssigned(id));
            }
        }
        self.current_unit = unit;
        Ok(self)
    }

    pub fn is_global(&self) -> bool {
        self.role.is_global()
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.role.grants(capability)
    }

    pub fn require(&self, capability: Capability) -> Result<(), AppError> {
        if self.can(capability) {
            Ok(())
        } else {
            Err(AppError::Forbidden(capability.action().to_string()))
        }
    }

    pub fn in_scope(&self, unit_id: Uuid) -> bool {
        self.is_global() || self.unit_ids.contains(&unit_id)
    }

    /// Single-entity check. Scope first, so records in foreign units
    /// are indistinguishable from missing ones; then the role.
    pub fn check(
        &self,
        unit_id: Uuid,
        capability: Capability,
        resource: &'static str,
    ) -> Result<(), AppError> {
        if !self.in_scope(unit_id) {
            return Err(AppError::NotFound(resource));
        }
        self.require(capability)
    }

    /// Check for records being created in (or moved to) `unit_id`.
    pub fn check_target_unit(&self, unit_id: Uuid, capability: Capability) -> Result<(), AppError> {
        self.require(capability)?;
        if !self.in_scope(unit_id) {
            return Err(AppError::UnitNotAssigned(unit_id));
        }
        Ok(())
    }

    /// Units a list query may cover.
    pub fn scope(&self) -> UnitScope {
        match (self.current_unit, self.is_global()) {
            (Some(unit), _) => UnitScope::Units(vec![unit]),
            (None, true) => UnitScope::All,
            (None, false) => UnitScope::Units(self.unit_ids.clone()),
        }
    }

    /// The creator of a record, or anyone with a global role.
    pub fn is_owner_or_global(&self, owner: Uuid) -> bool {
        self.user_id == owner || self.is_global()
    }

    /// Only a superuser may create, promote to or modify a superuser.
    pub fn check_role_management(&self, target: Role) -> Result<(), AppError> {
        if target == Role::Superuser && self.role != Role::Superuser {
            return Err(AppError::Forbidden("manage superuser accounts".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(role: Role, units: &[Uuid]) -> Caller {
        Caller::new(Uuid::new_v4(), role, units.to_vec())
    }

    #[test]
    fn capability_table() {
        use Capability::*;
        let all = [ReadScoped, WriteCatalogue, Request, Review, ViewUsers, ManageUsers, ManageUnits];

        for cap in all {
            assert!(Role::Superuser.grants(cap));
            assert!(Role::Admin.grants(cap));
            assert_eq!(Role::Staff.grants(cap), cap == ReadScoped);
            assert_eq!(Role::Viewer.grants(cap), cap == ReadScoped);
        }
        assert!(Role::Manager.grants(Review));
        assert!(Role::Manager.grants(ViewUsers));
        assert!(!Role::Manager.grants(ManageUsers));
        assert!(!Role::Manager.grants(ManageUnits));
    }

    #[test]
    fn foreign_unit_is_not_found_before_forbidden() {
        let unit_a = Uuid::new_v4();
        let unit_b = Uuid::new_v4();

        let manager = caller(Role::Manager, &[unit_a]);
        assert!(matches!(
            manager.check(unit_b, Capability::ReadScoped, "Product"),
            Err(AppError::NotFound("Product"))
        ));
        assert!(manager.check(unit_a, Capability::WriteCatalogue, "Product").is_ok());

        let viewer = caller(Role::Viewer, &[unit_a]);
        assert!(matches!(
            viewer.check(unit_b, Capability::WriteCatalogue, "Product"),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            viewer.check(unit_a, Capability::WriteCatalogue, "Product"),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn global_roles_see_every_unit() {
        let admin = caller(Role::Admin, &[]);
        assert_eq!(admin.scope(), UnitScope::All);
        assert!(admin.check(Uuid::new_v4(), Capability::Review, "Requisition").is_ok());
    }

    #[test]
    fn current_unit_header_narrows_lists() {
        let unit_a = Uuid::new_v4();
        let unit_b = Uuid::new_v4();

        let staff = caller(Role::Staff, &[unit_a, unit_b]);
        assert_eq!(staff.scope(), UnitScope::Units(vec![unit_a, unit_b]));

        let narrowed = staff.clone().with_current_unit(Some(unit_b)).unwrap();
        assert_eq!(narrowed.scope(), UnitScope::Units(vec![unit_b]));

        let stranger = Uuid::new_v4();
        assert!(matches!(
            staff.with_current_unit(Some(stranger)),
            Err(AppError::UnitNotAssigned(id)) if id == stranger
        ));

        let admin = caller(Role::Admin, &[]).with_current_unit(Some(stranger)).unwrap();
        assert_eq!(admin.scope(), UnitScope::Units(vec![stranger]));
    }

    #[test]
    fn narrowing_outside_scope_yields_nothing() {
        let unit_a = Uuid::new_v4();
        let scope = UnitScope::Units(vec![unit_a]).narrow(Some(Uuid::new_v4()));
        assert_eq!(scope.as_filter(), Some(vec![]));
        assert_eq!(UnitScope::All.narrow(None).as_filter(), None);
    }

    #[test]
    fn creating_in_foreign_unit_is_forbidden() {
        let manager = caller(Role::Manager, &[Uuid::new_v4()]);
        let other = Uuid::new_v4();
        assert!(matches!(
            manager.check_target_unit(other, Capability::WriteCatalogue),
            Err(AppError::UnitNotAssigned(_))
        ));
    }

    #[test]
    fn only_superusers_manage_superusers() {
        let admin = caller(Role::Admin, &[]);
        assert!(admin.check_role_management(Role::Superuser).is_err());
        assert!(admin.check_role_management(Role::Manager).is_ok());
        assert!(caller(Role::Superuser, &[]).check_role_management(Role::Superuser).is_ok());
    }
}

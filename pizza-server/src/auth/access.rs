//! Role-based access policy
//!
//! Every handler asks the [`Actor`] instead of inspecting role flags itself.
//!
//! | Role         | Menu          | Orders            | Users                          |
//! |--------------|---------------|-------------------|--------------------------------|
//! | super admin  | all branches  | all branches      | everyone                       |
//! | branch admin | own branch    | own branch        | own branch non-admins + customers |
//! | staff        | read only     | own branch        | customers                      |
//! | customer     | read only     | own (by email)    | forbidden                      |

use shared::error::{AppError, ErrorCode};
use shared::models::{ProfileUpdate, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    SuperAdmin,
    BranchAdmin,
    Staff,
    Customer,
}

impl Role {
    /// Highest flag wins
    pub fn of(user: &User) -> Self {
        if user.super_admin {
            Role::SuperAdmin
        } else if user.is_admin {
            Role::BranchAdmin
        } else if user.is_staff {
            Role::Staff
        } else {
            Role::Customer
        }
    }
}

/// Which branches a menu/category listing covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuScope {
    All,
    Branch(i64),
    Nothing,
}

/// Which orders a listing covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderScope {
    All,
    Branch(i64),
    Customer { email: String, branch_id: Option<i64> },
    Nothing,
}

/// Which users a listing covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserScope {
    All,
    /// Non-admin members of the branch plus customers
    BranchMembers(i64),
    /// Users without a branch and without role flags
    CustomersOnly,
}

impl UserScope {
    pub fn includes(&self, user: &User) -> bool {
        let is_customer =
            user.branch_id.is_none() && !user.super_admin && !user.is_admin && !user.is_staff;
        match self {
            UserScope::All => true,
            UserScope::BranchMembers(branch_id) => {
                is_customer
                    || (user.branch_id == Some(*branch_id) && !user.is_admin && !user.super_admin)
            }
            UserScope::CustomersOnly => is_customer,
        }
    }
}

/// Role flags to write when editing another user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleChange {
    pub is_admin: Option<bool>,
    pub is_staff: Option<bool>,
    /// `Some(None)` clears the branch
    pub branch_id: Option<Option<i64>>,
}

/// The authenticated caller as seen by the access policy
#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id: i64,
    pub email: String,
    pub role: Role,
    pub branch_id: Option<i64>,
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            role: Role::of(user),
            branch_id: user.branch_id,
        }
    }
}

impl Actor {
    pub fn is_super_admin(&self) -> bool {
        self.role == Role::SuperAdmin
    }

    fn own_branch(&self, branch_id: i64) -> bool {
        self.branch_id == Some(branch_id)
    }

    /// May change the branch's menu and categories
    pub fn administers(&self, branch_id: i64) -> bool {
        match self.role {
            Role::SuperAdmin => true,
            Role::BranchAdmin => self.own_branch(branch_id),
            Role::Staff | Role::Customer => false,
        }
    }

    /// May run the branch's orders (status, timers, availability, discounts)
    pub fn manages_orders_of(&self, branch_id: i64) -> bool {
        match self.role {
            Role::SuperAdmin => true,
            Role::BranchAdmin | Role::Staff => self.own_branch(branch_id),
            Role::Customer => false,
        }
    }

    pub fn require_administers(&self, branch_id: i64) -> Result<(), AppError> {
        if self.administers(branch_id) {
            return Ok(());
        }
        self.denied("administer_branch", branch_id);
        Err(AppError::forbidden())
    }

    pub fn require_manages_orders_of(&self, branch_id: i64) -> Result<(), AppError> {
        if self.manages_orders_of(branch_id) {
            return Ok(());
        }
        self.denied("manage_orders", branch_id);
        Err(AppError::forbidden())
    }

    pub fn require_super_admin(&self) -> Result<(), AppError> {
        if self.is_super_admin() {
            return Ok(());
        }
        self.denied("super_admin", 0);
        Err(AppError::new(ErrorCode::SuperAdminRequired))
    }

    /// Super admins and branch admins
    pub fn require_admin(&self) -> Result<(), AppError> {
        if matches!(self.role, Role::SuperAdmin | Role::BranchAdmin) {
            return Ok(());
        }
        self.denied("admin", 0);
        Err(AppError::new(ErrorCode::AdminRequired))
    }

    /// Orders are visible to their customer and to whoever manages the branch
    pub fn can_view_order(&self, branch_id: i64, user_email: &str) -> bool {
        self.email == user_email || self.manages_orders_of(branch_id)
    }

    pub fn order_scope(&self, requested: Option<i64>) -> OrderScope {
        match self.role {
            Role::SuperAdmin => match requested {
                Some(branch_id) => OrderScope::Branch(branch_id),
                None => OrderScope::All,
            },
            Role::BranchAdmin | Role::Staff => match self.branch_id {
                Some(branch_id) => OrderScope::Branch(branch_id),
                None => OrderScope::Nothing,
            },
            Role::Customer => OrderScope::Customer {
                email: self.email.clone(),
                branch_id: requested,
            },
        }
    }

    pub fn user_scope(&self) -> Result<UserScope, AppError> {
        match self.role {
            Role::SuperAdmin => Ok(UserScope::All),
            Role::BranchAdmin => Ok(match self.branch_id {
                Some(branch_id) => UserScope::BranchMembers(branch_id),
                None => UserScope::CustomersOnly,
            }),
            Role::Staff => Ok(UserScope::CustomersOnly),
            Role::Customer => Err(AppError::forbidden()),
        }
    }

    pub fn can_view_user(&self, target: &User) -> bool {
        self.user_id == target.id
            || self
                .user_scope()
                .is_ok_and(|scope| scope.includes(target))
    }

    /// Which role flags this actor may write on `target`
    ///
    /// Super admins grant or revoke branch admin, assigning the requested
    /// branch on grant. Branch admins grant or revoke staff; staff is pinned
    /// to the admin's own branch and revoking clears it.
    pub fn role_change_for(
        &self,
        target: &User,
        update: &ProfileUpdate,
    ) -> Result<RoleChange, AppError> {
        match self.role {
            Role::SuperAdmin => {
                let mut change = RoleChange {
                    is_admin: update.is_admin,
                    ..Default::default()
                };
                if update.is_admin == Some(true) {
                    change.branch_id = Some(update.branch_id);
                }
                Ok(change)
            }
            Role::BranchAdmin => {
                if !self
                    .user_scope()
                    .is_ok_and(|scope| scope.includes(target))
                {
                    self.denied("edit_user", target.id);
                    return Err(AppError::forbidden());
                }
                let mut change = RoleChange {
                    is_staff: update.is_staff,
                    ..Default::default()
                };
                match update.is_staff {
                    Some(true) => change.branch_id = Some(self.branch_id),
                    Some(false) => change.branch_id = Some(None),
                    None => {}
                }
                Ok(change)
            }
            Role::Staff | Role::Customer => {
                self.denied("edit_user", target.id);
                Err(AppError::forbidden())
            }
        }
    }

    fn denied(&self, action: &'static str, resource: i64) {
        tracing::warn!(
            target: "security",
            event = "access_denied",
            user_id = self.user_id,
            role = ?self.role,
            action,
            resource,
        );
    }
}

/// Menu/category listing scope. An explicit branch is always public.
pub fn menu_scope(actor: Option<&Actor>, requested: Option<i64>) -> MenuScope {
    if let Some(branch_id) = requested {
        return MenuScope::Branch(branch_id);
    }
    match actor {
        Some(a) if a.is_super_admin() => MenuScope::All,
        Some(Actor {
            role: Role::BranchAdmin,
            branch_id: Some(branch_id),
            ..
        }) => MenuScope::Branch(*branch_id),
        _ => MenuScope::Nothing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64, flags: (bool, bool, bool), branch_id: Option<i64>) -> User {
        let (super_admin, is_admin, is_staff) = flags;
        User {
            id,
            name: None,
            email: format!("user{id}@example.com"),
            password_hash: None,
            image: None,
            super_admin,
            is_admin,
            is_staff,
            branch_id,
            google_auth: false,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn superadmin() -> User {
        user(1, (true, false, false), None)
    }
    fn admin_of(branch: i64) -> User {
        user(2, (false, true, false), Some(branch))
    }
    fn staff_of(branch: i64) -> User {
        user(3, (false, false, true), Some(branch))
    }
    fn customer() -> User {
        user(4, (false, false, false), None)
    }

    #[test]
    fn role_prefers_highest_flag() {
        assert_eq!(Role::of(&user(9, (true, true, true), None)), Role::SuperAdmin);
        assert_eq!(Role::of(&user(9, (false, true, true), Some(1))), Role::BranchAdmin);
        assert_eq!(Role::of(&staff_of(1)), Role::Staff);
        assert_eq!(Role::of(&customer()), Role::Customer);
    }

    #[test]
    fn administers_only_own_branch() {
        let sa = Actor::from(&superadmin());
        let admin = Actor::from(&admin_of(10));
        let staff = Actor::from(&staff_of(10));

        assert!(sa.administers(10) && sa.administers(99));
        assert!(admin.administers(10));
        assert!(!admin.administers(11));
        assert!(!staff.administers(10));
        assert!(!Actor::from(&customer()).administers(10));
        assert!(admin.require_administers(11).is_err());
    }

    #[test]
    fn staff_manage_orders_of_their_branch() {
        let staff = Actor::from(&staff_of(10));
        assert!(staff.manages_orders_of(10));
        assert!(!staff.manages_orders_of(11));
        assert!(!Actor::from(&customer()).manages_orders_of(10));

        let homeless_admin = Actor::from(&user(5, (false, true, false), None));
        assert!(!homeless_admin.manages_orders_of(10));
    }

    #[test]
    fn order_visibility() {
        let c = customer();
        let owner = Actor::from(&c);
        assert!(owner.can_view_order(10, &c.email));
        assert!(!owner.can_view_order(10, "someone@else.com"));
        assert!(Actor::from(&staff_of(10)).can_view_order(10, "someone@else.com"));
        assert!(!Actor::from(&staff_of(11)).can_view_order(10, "someone@else.com"));
    }

    #[test]
    fn order_scopes() {
        assert_eq!(Actor::from(&superadmin()).order_scope(None), OrderScope::All);
        assert_eq!(
            Actor::from(&superadmin()).order_scope(Some(3)),
            OrderScope::Branch(3)
        );
        assert_eq!(
            Actor::from(&staff_of(7)).order_scope(Some(3)),
            OrderScope::Branch(7)
        );
        assert_eq!(
            Actor::from(&customer()).order_scope(Some(3)),
            OrderScope::Customer {
                email: "user4@example.com".into(),
                branch_id: Some(3)
            }
        );
    }

    #[test]
    fn menu_scopes() {
        let sa = Actor::from(&superadmin());
        let admin = Actor::from(&admin_of(4));
        let staff = Actor::from(&staff_of(4));
        assert_eq!(menu_scope(None, Some(2)), MenuScope::Branch(2));
        assert_eq!(menu_scope(None, None), MenuScope::Nothing);
        assert_eq!(menu_scope(Some(&sa), None), MenuScope::All);
        assert_eq!(menu_scope(Some(&admin), None), MenuScope::Branch(4));
        assert_eq!(menu_scope(Some(&staff), None), MenuScope::Nothing);
    }

    #[test]
    fn user_scopes() {
        let admin = Actor::from(&admin_of(4));
        let scope = admin.user_scope().unwrap();
        assert!(scope.includes(&customer()));
        assert!(scope.includes(&staff_of(4)));
        assert!(!scope.includes(&staff_of(5)));
        assert!(!scope.includes(&admin_of(4)));
        assert!(!scope.includes(&superadmin()));

        let staff_scope = Actor::from(&staff_of(4)).user_scope().unwrap();
        assert!(staff_scope.includes(&customer()));
        assert!(!staff_scope.includes(&staff_of(4)));

        assert!(Actor::from(&customer()).user_scope().is_err());
    }

    #[test]
    fn users_can_always_view_themselves() {
        let c = customer();
        assert!(Actor::from(&c).can_view_user(&c));
        assert!(!Actor::from(&c).can_view_user(&staff_of(1)));
    }

    #[test]
    fn super_admin_grants_admin_with_branch() {
        let sa = Actor::from(&superadmin());
        let update = ProfileUpdate {
            id: Some(4),
            is_admin: Some(true),
            branch_id: Some(8),
            is_staff: Some(true),
            ..Default::default()
        };
        let change = sa.role_change_for(&customer(), &update).unwrap();
        assert_eq!(
            change,
            RoleChange {
                is_admin: Some(true),
                is_staff: None,
                branch_id: Some(Some(8)),
            }
        );

        let revoke = ProfileUpdate {
            is_admin: Some(false),
            branch_id: Some(8),
            ..Default::default()
        };
        let change = sa.role_change_for(&admin_of(8), &revoke).unwrap();
        assert_eq!(change.branch_id, None);
    }

    #[test]
    fn branch_admin_pins_staff_to_own_branch() {
        let admin = Actor::from(&admin_of(4));
        let grant = ProfileUpdate {
            is_staff: Some(true),
            branch_id: Some(99),
            is_admin: Some(true),
            ..Default::default()
        };
        let change = admin.role_change_for(&customer(), &grant).unwrap();
        assert_eq!(change.is_staff, Some(true));
        assert_eq!(change.is_admin, None);
        assert_eq!(change.branch_id, Some(Some(4)));

        let revoke = ProfileUpdate {
            is_staff: Some(false),
            ..Default::default()
        };
        let change = admin.role_change_for(&staff_of(4), &revoke).unwrap();
        assert_eq!(change.branch_id, Some(None));
    }

    #[test]
    fn branch_admin_cannot_touch_other_branches() {
        let admin = Actor::from(&admin_of(4));
        let update = ProfileUpdate {
            is_staff: Some(false),
            ..Default::default()
        };
        assert!(admin.role_change_for(&staff_of(5), &update).is_err());
        assert!(admin.role_change_for(&admin_of(4), &update).is_err());
    }

    #[test]
    fn staff_and_customers_cannot_edit_others() {
        let update = ProfileUpdate::default();
        assert!(Actor::from(&staff_of(4)).role_change_for(&customer(), &update).is_err());
        assert!(Actor::from(&customer()).role_change_for(&staff_of(4), &update).is_err());
    }
}

//! Role-scoped permission predicates over the management tree.
//!
//! - No IO
//! - No panics
//! - Deny is `false`, never an error; callers decide how to surface it

use crate::authorize::{Decision, DenialKind, Operation, deny};
use crate::directory::WalkOutcome;
use crate::{Directory, Role, User};

/// Authorization decisions bound to one directory snapshot.
#[derive(Debug, Clone, Copy)]
pub struct AuthorizationPolicy<'d> {
    directory: &'d Directory,
}

impl<'d> AuthorizationPolicy<'d> {
    pub fn new(directory: &'d Directory) -> Self {
        Self { directory }
    }

    pub fn directory(&self) -> &'d Directory {
        self.directory
    }

    /// Whether `acting` may give `target_role` to a new or existing user.
    pub fn can_manage_role(&self, acting: &User, target_role: Role) -> bool {
        self.decide(acting, &Operation::AssignRole(target_role)).is_ok()
    }

    pub fn can_edit_user(&self, acting: &User, target: &User) -> bool {
        self.decide(acting, &Operation::EditUser(target)).is_ok()
    }

    pub fn can_delete_user(&self, acting: &User, target: &User) -> bool {
        self.decide(acting, &Operation::DeleteUser(target)).is_ok()
    }

    /// Whether `acting` may create a subordinate directly under `host`.
    pub fn can_add_subordinate_to(&self, acting: &User, host: &User) -> bool {
        self.decide(acting, &Operation::AddSubordinate(host)).is_ok()
    }

    /// Whether `acting` may raise inventory adjustment requests.
    pub fn can_request_adjustments(&self, acting: &User) -> bool {
        self.decide(acting, &Operation::RequestAdjustments).is_ok()
    }

    /// Whether `acting` may approve or reject inventory adjustments.
    pub fn can_review_adjustments(&self, acting: &User) -> bool {
        self.decide(acting, &Operation::ReviewAdjustments).is_ok()
    }

    /// Whether `acting` may move `target` under `new_manager`.
    pub fn can_reassign_manager(&self, acting: &User, target: &User, new_manager: &User) -> bool {
        self.decide(
            acting,
            &Operation::ReassignManager {
                target,
                new_manager,
            },
        )
        .is_ok()
    }

    pub(crate) fn decide(&self, acting: &User, operation: &Operation<'_>) -> Decision {
        match *operation {
            Operation::AssignRole(role) => Self::decide_manage_role(acting, role),
            Operation::EditUser(target) => self.decide_edit(acting, target),
            Operation::DeleteUser(target) => self.decide_delete(acting, target),
            Operation::AddSubordinate(host) => Self::decide_add_subordinate(acting, host),
            Operation::RequestAdjustments => Self::decide_request(acting),
            Operation::ReviewAdjustments => Self::decide_review(acting),
            Operation::ReassignManager {
                target,
                new_manager,
            } => self.decide_reassign(acting, target, new_manager),
        }
    }

    fn decide_manage_role(acting: &User, role: Role) -> Decision {
        if acting.role.assignable_roles().contains(&role) {
            Ok("role is within the acting user's grant")
        } else {
            deny(
                DenialKind::RoleNotAssignable,
                format!("a {} cannot assign the {role} role", acting.role),
            )
        }
    }

    fn decide_edit(&self, acting: &User, target: &User) -> Decision {
        if acting.id == target.id {
            return Ok("users may always edit themselves");
        }

        match acting.role {
            Role::Chairman => Ok("chairman may edit anyone"),
            Role::Owner => self.owner_reaches(acting, target),
            Role::Manager => Self::direct_staff_report(acting, target),
            Role::Staff | Role::Customer => deny(
                DenialKind::InsufficientRole,
                format!("a {} cannot edit other users", acting.role),
            ),
        }
    }

    fn decide_delete(&self, acting: &User, target: &User) -> Decision {
        if acting.id == target.id {
            return deny(DenialKind::SelfAction, "users cannot delete themselves");
        }

        // Kept even though no sanctioned path creates a second chairman:
        // seed/import data may contain several.
        if target.role == Role::Chairman && self.directory.chairman_count() <= 1 {
            return deny(DenialKind::LastChairman, "the last chairman cannot be deleted");
        }

        match acting.role {
            Role::Chairman => Ok("chairman may delete anyone but the last chairman"),
            Role::Owner => self.owner_reaches(acting, target),
            Role::Manager => Self::direct_staff_report(acting, target),
            Role::Staff | Role::Customer => deny(
                DenialKind::InsufficientRole,
                format!("a {} cannot delete users", acting.role),
            ),
        }
    }

    fn decide_add_subordinate(acting: &User, host: &User) -> Decision {
        if !host.role.can_have_subordinates() {
            return deny(
                DenialKind::HostCannotManage,
                format!("a {} cannot have subordinates", host.role),
            );
        }

        match acting.role {
            Role::Chairman => Ok("chairman may staff any branch"),
            Role::Owner if host.id == acting.id => Ok("owner adds to their own team"),
            Role::Owner if host.role == Role::Manager && host.is_managed_by(&acting.id) => {
                Ok("owner adds under one of their managers")
            }
            Role::Manager if host.id == acting.id => Ok("manager adds to their own team"),
            Role::Owner | Role::Manager => deny(
                DenialKind::OutsideChain,
                "host is neither the acting user nor one of their direct managers",
            ),
            Role::Staff | Role::Customer => deny(
                DenialKind::InsufficientRole,
                format!("a {} cannot add subordinates", acting.role),
            ),
        }
    }

    fn decide_request(acting: &User) -> Decision {
        if acting.role.in_hierarchy() {
            Ok("staff members may request adjustments")
        } else {
            deny(
                DenialKind::InsufficientRole,
                "customers cannot request inventory adjustments",
            )
        }
    }

    fn decide_review(acting: &User) -> Decision {
        match acting.role {
            Role::Owner | Role::Manager => Ok("owners and managers review adjustments"),
            _ => deny(
                DenialKind::InsufficientRole,
                format!("a {} cannot review inventory adjustments", acting.role),
            ),
        }
    }

    fn decide_reassign(&self, acting: &User, target: &User, new_manager: &User) -> Decision {
        if acting.role != Role::Chairman {
            return deny(
                DenialKind::InsufficientRole,
                "only a chairman may reassign reporting lines",
            );
        }
        if target.id == new_manager.id {
            return deny(DenialKind::InvalidReportingLine, "a user cannot manage themselves");
        }
        if target.role.expected_manager() != Some(new_manager.role) {
            return deny(
                DenialKind::InvalidReportingLine,
                format!("a {} cannot report to a {}", target.role, new_manager.role),
            );
        }
        if self.directory.is_ancestor(&target.id, new_manager) {
            return deny(
                DenialKind::InvalidReportingLine,
                "new manager sits below the user being moved",
            );
        }
        Ok("chairman may reassign reporting lines")
    }

    /// Owner reach: `target` is a manager or staff member and the walk up from it
    /// meets `owner` before any chairman.
    fn owner_reaches(&self, owner: &User, target: &User) -> Decision {
        if !matches!(target.role, Role::Manager | Role::Staff) {
            return deny(
                DenialKind::InsufficientRole,
                format!("an owner cannot act on a {}", target.role),
            );
        }

        match self
            .directory
            .walk_up_to(&owner.id, target, |u| u.role == Role::Chairman)
        {
            WalkOutcome::Reached => Ok("target sits below the owner"),
            WalkOutcome::Blocked => deny(
                DenialKind::OutsideChain,
                "management chain reaches a chairman before the owner",
            ),
            WalkOutcome::Exhausted => deny(
                DenialKind::OutsideChain,
                "owner is not above the target in the management chain",
            ),
            WalkOutcome::Cycle => deny(
                DenialKind::OutsideChain,
                "management chain above the target is cyclic",
            ),
        }
    }

    fn direct_staff_report(manager: &User, target: &User) -> Decision {
        if target.role == Role::Staff && target.is_managed_by(&manager.id) {
            Ok("target is a direct staff report")
        } else {
            deny(
                DenialKind::NotDirectReport,
                "managers may only act on their direct staff reports",
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use laundrydesk_core::UserId;
    use proptest::prelude::*;

    fn user(role: Role, name: &str) -> User {
        User::new(UserId::new(), role, name, name.to_lowercase())
    }

    /// Chairman C, Owner O (C), Manager M (O), Staff S (M).
    struct Chain {
        c: User,
        o: User,
        m: User,
        s: User,
    }

    fn chain() -> Chain {
        let c = user(Role::Chairman, "C");
        let o = user(Role::Owner, "O").with_manager(c.id);
        let m = user(Role::Manager, "M").with_manager(o.id);
        let s = user(Role::Staff, "S").with_manager(m.id);
        Chain { c, o, m, s }
    }

    impl Chain {
        fn directory(&self) -> Directory {
            Directory::from_users([self.c.clone(), self.o.clone(), self.m.clone(), self.s.clone()])
        }
    }

    #[test]
    fn chain_scenario() {
        let t = chain();
        let dir = t.directory();
        let policy = AuthorizationPolicy::new(&dir);

        assert!(policy.can_edit_user(&t.o, &t.s));
        assert!(policy.can_edit_user(&t.m, &t.s));
        assert!(!policy.can_delete_user(&t.s, &t.m));
    }

    #[test]
    fn manage_role_grants() {
        let t = chain();
        let dir = t.directory();
        let policy = AuthorizationPolicy::new(&dir);

        assert!(policy.can_manage_role(&t.c, Role::Owner));
        assert!(policy.can_manage_role(&t.c, Role::Staff));
        assert!(!policy.can_manage_role(&t.c, Role::Chairman));
        assert!(policy.can_manage_role(&t.o, Role::Manager));
        assert!(!policy.can_manage_role(&t.o, Role::Owner));
        assert!(policy.can_manage_role(&t.m, Role::Staff));
        assert!(!policy.can_manage_role(&t.m, Role::Manager));
        assert!(!policy.can_manage_role(&t.s, Role::Staff));
    }

    #[test]
    fn owner_edit_requires_ancestry_and_junior_role() {
        let t = chain();
        let other_owner = user(Role::Owner, "O2").with_manager(t.c.id);
        let other_manager = user(Role::Manager, "M2").with_manager(other_owner.id);
        let foreign_staff = user(Role::Staff, "S2").with_manager(other_manager.id);
        let mut dir_users = vec![t.c.clone(), t.o.clone(), t.m.clone(), t.s.clone()];
        dir_users.extend([other_owner.clone(), other_manager, foreign_staff.clone()]);
        let dir = Directory::from_users(dir_users);
        let policy = AuthorizationPolicy::new(&dir);

        assert!(policy.can_edit_user(&t.o, &t.m));
        assert!(!policy.can_edit_user(&t.o, &foreign_staff));
        assert!(!policy.can_edit_user(&t.o, &other_owner));
        assert!(!policy.can_edit_user(&t.o, &t.c));
    }

    #[test]
    fn owner_walk_stops_at_chairman() {
        // Malformed: a chairman sits between the staff member and the owner.
        let o = user(Role::Owner, "O");
        let c = user(Role::Chairman, "C").with_manager(o.id);
        let m = user(Role::Manager, "M").with_manager(c.id);
        let dir = Directory::from_users([o.clone(), c, m.clone()]);
        let policy = AuthorizationPolicy::new(&dir);

        assert!(!policy.can_edit_user(&o, &m));
        assert!(!policy.can_delete_user(&o, &m));
    }

    #[test]
    fn manager_reach_is_direct_only() {
        let t = chain();
        let peer = user(Role::Manager, "M2").with_manager(t.o.id);
        let mut dir_users = vec![t.c.clone(), t.o.clone(), t.m.clone(), t.s.clone()];
        dir_users.push(peer.clone());
        let dir = Directory::from_users(dir_users);
        let policy = AuthorizationPolicy::new(&dir);

        assert!(policy.can_delete_user(&t.m, &t.s));
        assert!(!policy.can_edit_user(&peer, &t.s));
        assert!(!policy.can_edit_user(&t.m, &peer));
    }

    #[test]
    fn self_delete_and_last_chairman_are_protected() {
        let t = chain();
        let dir = t.directory();
        let policy = AuthorizationPolicy::new(&dir);

        assert!(!policy.can_delete_user(&t.o, &t.o));
        assert!(!policy.can_delete_user(&t.c, &t.c));
        assert!(policy.can_delete_user(&t.c, &t.o));
        assert!(policy.can_delete_user(&t.o, &t.s));
    }

    #[test]
    fn second_chairman_is_deletable_by_a_chairman() {
        let c1 = user(Role::Chairman, "C1");
        let c2 = user(Role::Chairman, "C2");
        let dir = Directory::from_users([c1.clone(), c2.clone()]);
        let policy = AuthorizationPolicy::new(&dir);

        assert!(policy.can_delete_user(&c1, &c2));

        let alone = Directory::from_users([c2.clone()]);
        let policy = AuthorizationPolicy::new(&alone);
        assert!(!policy.can_delete_user(&c1, &c2));
    }

    #[test]
    fn add_subordinate_rules() {
        let t = chain();
        let other_owner = user(Role::Owner, "O2").with_manager(t.c.id);
        let mut dir_users = vec![t.c.clone(), t.o.clone(), t.m.clone(), t.s.clone()];
        dir_users.push(other_owner.clone());
        let dir = Directory::from_users(dir_users);
        let policy = AuthorizationPolicy::new(&dir);

        assert!(policy.can_add_subordinate_to(&t.c, &t.m));
        assert!(policy.can_add_subordinate_to(&t.o, &t.o));
        assert!(policy.can_add_subordinate_to(&t.o, &t.m));
        assert!(!policy.can_add_subordinate_to(&t.o, &other_owner));
        assert!(policy.can_add_subordinate_to(&t.m, &t.m));
        assert!(!policy.can_add_subordinate_to(&t.m, &t.o));
        assert!(!policy.can_add_subordinate_to(&t.c, &t.s));
        assert!(!policy.can_add_subordinate_to(&t.s, &t.m));
    }

    #[test]
    fn review_is_owner_or_manager() {
        let t = chain();
        let dir = t.directory();
        let policy = AuthorizationPolicy::new(&dir);

        assert!(policy.can_review_adjustments(&t.o));
        assert!(policy.can_review_adjustments(&t.m));
        assert!(!policy.can_review_adjustments(&t.s));
        assert!(!policy.can_review_adjustments(&t.c));
        assert!(policy.can_request_adjustments(&t.s));
        assert!(!policy.can_request_adjustments(&user(Role::Customer, "K")));
    }

    #[test]
    fn reassign_requires_chairman_and_valid_line() {
        let t = chain();
        let other_manager = user(Role::Manager, "M2").with_manager(t.o.id);
        let mut dir_users = vec![t.c.clone(), t.o.clone(), t.m.clone(), t.s.clone()];
        dir_users.push(other_manager.clone());
        let dir = Directory::from_users(dir_users);
        let policy = AuthorizationPolicy::new(&dir);

        assert!(policy.can_reassign_manager(&t.c, &t.s, &other_manager));
        assert!(!policy.can_reassign_manager(&t.o, &t.s, &other_manager));
        assert!(!policy.can_reassign_manager(&t.c, &t.s, &t.o));
        assert!(!policy.can_reassign_manager(&t.c, &t.m, &t.m));
    }

    #[test]
    fn cyclic_directory_denies_instead_of_looping() {
        let o = user(Role::Owner, "O");
        let mut m1 = user(Role::Manager, "M1");
        let mut m2 = user(Role::Manager, "M2");
        m1.managed_by = Some(m2.id);
        m2.managed_by = Some(m1.id);
        let s = user(Role::Staff, "S").with_manager(m1.id);
        let dir = Directory::from_users([o.clone(), m1, m2, s.clone()]);
        let policy = AuthorizationPolicy::new(&dir);

        assert!(!policy.can_edit_user(&o, &s));
        assert!(!policy.can_delete_user(&o, &s));
    }

    const ROLES: [Role; 5] = Role::ALL;

    /// Users whose `managed_by` only points at earlier entries (acyclic).
    fn acyclic_directory() -> impl Strategy<Value = Vec<User>> {
        prop::collection::vec(
            (prop::sample::select(ROLES.to_vec()), any::<prop::sample::Index>(), any::<bool>()),
            1..24,
        )
        .prop_map(|specs| {
            let mut users: Vec<User> = Vec::with_capacity(specs.len());
            for (i, (role, parent, has_parent)) in specs.into_iter().enumerate() {
                let mut u = User::new(UserId::new(), role, format!("U{i}"), format!("u{i}"));
                if has_parent && i > 0 {
                    u.managed_by = Some(users[parent.index(i)].id);
                }
                users.push(u);
            }
            users
        })
    }

    /// Users whose `managed_by` may point anywhere, cycles included.
    fn arbitrary_directory() -> impl Strategy<Value = Vec<User>> {
        prop::collection::vec(
            (prop::sample::select(ROLES.to_vec()), any::<prop::sample::Index>()),
            1..24,
        )
        .prop_map(|specs| {
            let len = specs.len();
            let mut users: Vec<User> = (0..len)
                .map(|i| User::new(UserId::new(), specs[i].0, format!("U{i}"), format!("u{i}")))
                .collect();
            let ids: Vec<UserId> = users.iter().map(|u| u.id).collect();
            for (u, (_, parent)) in users.iter_mut().zip(specs.iter()) {
                u.managed_by = Some(ids[parent.index(len)]);
            }
            users
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: self-edit is allowed for every user regardless of role.
        #[test]
        fn self_edit_always_allowed(users in acyclic_directory()) {
            let dir = Directory::from_users(users.clone());
            let policy = AuthorizationPolicy::new(&dir);
            for u in &users {
                prop_assert!(policy.can_edit_user(u, u));
            }
        }

        /// Property: staff can assign no role at all.
        #[test]
        fn staff_manages_no_role(role in prop::sample::select(ROLES.to_vec())) {
            let dir = Directory::default();
            let policy = AuthorizationPolicy::new(&dir);
            let staff = User::new(UserId::new(), Role::Staff, "S", "s");
            prop_assert!(!policy.can_manage_role(&staff, role));
        }

        /// Property: an owner's edit grant implies the owner is an ancestor of a
        /// manager/staff target.
        #[test]
        fn owner_edit_implies_ancestry(users in acyclic_directory()) {
            let dir = Directory::from_users(users.clone());
            let policy = AuthorizationPolicy::new(&dir);
            for owner in users.iter().filter(|u| u.role == Role::Owner) {
                for target in users.iter().filter(|t| t.id != owner.id) {
                    if policy.can_edit_user(owner, target) {
                        prop_assert!(matches!(target.role, Role::Manager | Role::Staff));
                        prop_assert!(dir.is_ancestor(&owner.id, target));
                    }
                }
            }
        }

        /// Property: with at most one chairman, no one may delete a chairman.
        #[test]
        fn lone_chairman_is_never_deletable(users in acyclic_directory()) {
            let dir = Directory::from_users(users.clone());
            prop_assume!(dir.chairman_count() <= 1);
            let policy = AuthorizationPolicy::new(&dir);
            for target in users.iter().filter(|u| u.role == Role::Chairman) {
                for acting in &users {
                    prop_assert!(!policy.can_delete_user(acting, target));
                }
            }
        }

        /// Property: predicates terminate on arbitrary, possibly cyclic, directories.
        #[test]
        fn predicates_terminate_on_cycles(users in arbitrary_directory()) {
            let dir = Directory::from_users(users.clone());
            let policy = AuthorizationPolicy::new(&dir);
            for acting in &users {
                for target in &users {
                    let _ = policy.can_edit_user(acting, target);
                    let _ = policy.can_delete_user(acting, target);
                    let _ = policy.can_add_subordinate_to(acting, target);
                }
            }
        }
    }
}

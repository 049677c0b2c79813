//! Field-level read permissions.

use query_engine_metadata::metadata::{
    FieldInfo, PermissionPredicate, ReadPermission, User, ADMINS_GROUP, GUESTS_GROUP,
    MEMBERS_GROUP,
};

/// Can this user read the field? A field without read permissions is public.
pub fn can_read(field: &FieldInfo, user: Option<&User>) -> bool {
    field.can_read.is_empty()
        || field
            .can_read
            .iter()
            .any(|permission| allows(permission, user))
}

fn allows(permission: &ReadPermission, user: Option<&User>) -> bool {
    match (permission, user) {
        (ReadPermission::Group(group), _) if group == GUESTS_GROUP => true,
        (_, None) => false,
        (ReadPermission::Group(group), Some(_)) if group == MEMBERS_GROUP => true,
        (ReadPermission::Group(group), Some(user)) if group == ADMINS_GROUP => user.is_admin,
        // admins can read anything a group can
        (ReadPermission::Group(group), Some(user)) => {
            user.is_admin || user.groups.iter().any(|g| g == group)
        }
        (
            ReadPermission::Predicate {
                predicate: PermissionPredicate::LoggedIn,
            },
            Some(_),
        ) => true,
        (
            ReadPermission::Predicate {
                predicate: PermissionPredicate::Admin,
            },
            Some(user),
        ) => user.is_admin,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(can_read: serde_json::Value) -> FieldInfo {
        serde_json::from_value(serde_json::json!({
            "kind": "column",
            "type": { "scalar_type": "text" },
            "can_read": can_read
        }))
        .unwrap()
    }

    fn user(groups: &[&str], is_admin: bool) -> User {
        User {
            id: "user".to_string(),
            groups: groups.iter().map(ToString::to_string).collect(),
            is_admin,
        }
    }

    #[test]
    fn test_fields_without_permissions_are_public() {
        assert!(can_read(&field(serde_json::json!([])), None));
    }

    #[test]
    fn test_builtin_groups() {
        let guests = field(serde_json::json!(["guests"]));
        let members = field(serde_json::json!(["members"]));
        let admins = field(serde_json::json!(["admins"]));

        assert!(can_read(&guests, None));
        assert!(!can_read(&members, None));
        assert!(can_read(&members, Some(&user(&[], false))));
        assert!(!can_read(&admins, Some(&user(&[], false))));
        assert!(can_read(&admins, Some(&user(&[], true))));
    }

    #[test]
    fn test_custom_groups_and_predicates() {
        let mods = field(serde_json::json!(["sunshineRegiment", { "predicate": "admin" }]));
        assert!(!can_read(&mods, None));
        assert!(!can_read(&mods, Some(&user(&["alignmentForum"], false))));
        assert!(can_read(&mods, Some(&user(&["sunshineRegiment"], false))));
        assert!(can_read(&mods, Some(&user(&[], true))));

        let logged_in = field(serde_json::json!([{ "predicate": "logged_in" }]));
        assert!(!can_read(&logged_in, None));
        assert!(can_read(&logged_in, Some(&user(&[], false))));
    }
}

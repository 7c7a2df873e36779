use ehtimami::middleware::auth::AuthUser;
use ehtimami::modules::auth::model::Claims;
use ehtimami::modules::users::model::role_names;

fn claims_with_roles(sub: &str, roles: &[&str]) -> Claims {
    Claims {
        sub: sub.to_string(),
        email: "user@example.com".to_string(),
        roles: roles.iter().map(|r| r.to_string()).collect(),
        is_verified: true,
        exp: 2_000_000_000,
        iat: 1_000_000_000,
    }
}

#[test]
fn test_has_role() {
    let user = AuthUser(claims_with_roles("1", &[role_names::TEACHER]));

    assert!(user.has_role(role_names::TEACHER));
    assert!(!user.has_role(role_names::ADMIN));
}

#[test]
fn test_has_any_role() {
    let user = AuthUser(claims_with_roles(
        "1",
        &[role_names::PARENT, role_names::EMPLOYEE],
    ));

    assert!(user.has_any_role(&[role_names::ADMIN, role_names::EMPLOYEE]));
    assert!(!user.has_any_role(&[role_names::ADMIN, role_names::TEACHER]));
}

#[test]
fn test_user_id_parses_sub() {
    let user = AuthUser(claims_with_roles("1234", &[]));

    assert_eq!(user.user_id().unwrap(), 1234);
}

#[test]
fn test_user_id_rejects_non_numeric_sub() {
    let user = AuthUser(claims_with_roles("not-a-number", &[]));

    assert!(user.user_id().is_err());
}

#[test]
fn test_email_accessor() {
    let user = AuthUser(claims_with_roles("1", &[]));

    assert_eq!(user.email(), "user@example.com");
}

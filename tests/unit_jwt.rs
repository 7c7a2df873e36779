use ehtimami::config::jwt::JwtConfig;
use ehtimami::utils::jwt::{create_access_token, verify_token};

fn get_test_jwt_config() -> JwtConfig {
    JwtConfig {
        secret: "test_secret_key_for_testing_purposes".to_string(),
        access_token_expiry: 3600,
    }
}

#[test]
fn test_create_access_token_success() {
    let jwt_config = get_test_jwt_config();

    let result = create_access_token(
        42,
        "test@example.com",
        vec!["teacher".to_string()],
        true,
        &jwt_config,
    );

    assert!(result.is_ok());
    let token = result.unwrap();
    assert!(!token.is_empty());
}

#[test]
fn test_verify_token_round_trip() {
    let jwt_config = get_test_jwt_config();
    let roles = vec!["admin".to_string(), "school_manager".to_string()];

    let token =
        create_access_token(7, "admin@example.com", roles.clone(), false, &jwt_config).unwrap();
    let claims = verify_token(&token, &jwt_config).unwrap();

    assert_eq!(claims.sub, "7");
    assert_eq!(claims.email, "admin@example.com");
    assert_eq!(claims.roles, roles);
    assert!(!claims.is_verified);
    assert!(claims.exp > claims.iat);
}

#[test]
fn test_verify_token_wrong_secret() {
    let jwt_config = get_test_jwt_config();
    let other_config = JwtConfig {
        secret: "a_completely_different_secret".to_string(),
        access_token_expiry: 3600,
    };

    let token = create_access_token(1, "x@example.com", vec![], true, &jwt_config).unwrap();
    assert!(verify_token(&token, &other_config).is_err());
}

#[test]
fn test_verify_token_garbage() {
    let jwt_config = get_test_jwt_config();
    assert!(verify_token("not.a.token", &jwt_config).is_err());
    assert!(verify_token("", &jwt_config).is_err());
}

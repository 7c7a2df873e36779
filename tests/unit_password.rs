use ehtimami::utils::password::{generate_random_password, hash_password, verify_password};

#[test]
fn test_hash_password_success() {
    let password = "testpassword123";
    let result = hash_password(password);

    assert!(result.is_ok());
    let hash = result.unwrap();
    assert!(!hash.is_empty());
    assert_ne!(hash, password);
}

#[test]
fn test_verify_password_correct() {
    let password = "s3cure-Passw0rd";
    let hash = hash_password(password).unwrap();

    assert!(verify_password(password, &hash).unwrap());
}

#[test]
fn test_verify_password_incorrect() {
    let hash = hash_password("rightpassword").unwrap();

    assert!(!verify_password("wrongpassword", &hash).unwrap());
}

#[test]
fn test_verify_password_invalid_hash() {
    assert!(verify_password("anything", "not-a-bcrypt-hash").is_err());
}

#[test]
fn test_generate_random_password_shape() {
    let password = generate_random_password();

    assert_eq!(password.len(), 16);
    assert!(password.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn test_generate_random_password_unique() {
    let a = generate_random_password();
    let b = generate_random_password();

    assert_ne!(a, b);
}

#[test]
fn test_generated_password_hashes_and_verifies() {
    let password = generate_random_password();
    let hash = hash_password(&password).unwrap();

    assert!(verify_password(&password, &hash).unwrap());
}

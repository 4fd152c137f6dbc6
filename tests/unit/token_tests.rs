use crate::test_utils::{test_settings, TEST_SECRET};
use backend_lib::auth::TokenService;
use backend_lib::directory::AccountId;
use std::time::Duration;

#[test]
fn test_tokens_follow_configured_secret() {
    let settings = test_settings();
    let tokens = TokenService::from_settings(&settings.auth);
    let token = tokens.mint(AccountId(9)).unwrap();
    assert_eq!(tokens.verify(&token).unwrap(), AccountId(9));
    assert_eq!(tokens.session_ttl(), Duration::from_secs(604_800));

    let mut rotated = test_settings();
    rotated.auth.jwt_secret = format!("{TEST_SECRET}-rotated");
    let other = TokenService::from_settings(&rotated.auth);
    assert!(other.verify(&token).is_err());
}

#[test]
fn test_session_and_reset_tokens_are_distinct() {
    let tokens = TokenService::from_settings(&test_settings().auth);
    let session = tokens.mint(AccountId(1)).unwrap();
    let reset = tokens.mint_reset_token(AccountId(1), 0).unwrap();

    assert!(tokens.verify(&reset).is_err());
    assert!(tokens.verify_reset_purpose(&session).is_err());
    assert_eq!(
        tokens.verify_reset_purpose(&reset).unwrap().account_id,
        AccountId(1)
    );
}

#[test]
fn test_every_token_is_unique() {
    let tokens = TokenService::from_settings(&test_settings().auth);
    let a = tokens.mint(AccountId(1)).unwrap();
    let b = tokens.mint(AccountId(1)).unwrap();
    assert_ne!(a, b);
}

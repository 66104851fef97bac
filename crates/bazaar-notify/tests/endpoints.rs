mod support;

use bazaar_notify::endpoints::{deregister_endpoint, register_endpoint};
use bazaar_notify::error::EndpointError;
use bazaar_types::models::DeviceClass;

use support::{endpoint_rows, memory_db, seed_user};

#[tokio::test]
async fn reregistration_moves_token_to_new_owner() {
    let db = memory_db();
    let x = seed_user(&db, "x");
    let y = seed_user(&db, "y");
    let token = "ExponentPushToken[shared-phone]";

    register_endpoint(&db, y, token, Some(DeviceClass::Ios)).await.unwrap();
    register_endpoint(&db, x, token, None).await.unwrap();
    register_endpoint(&db, x, token, None).await.unwrap();

    let rows = db.get_active_endpoints(&x.to_string()).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].token, token);
    assert_eq!(rows[0].device_class, "android");
    assert!(db.get_active_endpoints(&y.to_string()).unwrap().is_empty());
    assert_eq!(endpoint_rows(&db, token), 1);
}

#[tokio::test]
async fn rejects_missing_and_malformed_tokens() {
    let db = memory_db();
    let x = seed_user(&db, "x");

    assert!(matches!(
        register_endpoint(&db, x, "  ", None).await,
        Err(EndpointError::MissingToken)
    ));
    assert!(matches!(
        register_endpoint(&db, x, "not-a-token", None).await,
        Err(EndpointError::InvalidToken)
    ));
}

#[tokio::test]
async fn deregister_deactivates_without_deleting() {
    let db = memory_db();
    let x = seed_user(&db, "x");
    let token = "ExponentPushToken[bye]";
    register_endpoint(&db, x, token, None).await.unwrap();

    assert!(deregister_endpoint(&db, x, token).await.unwrap());
    assert!(db.get_active_endpoints(&x.to_string()).unwrap().is_empty());
    assert_eq!(endpoint_rows(&db, token), 1);
}

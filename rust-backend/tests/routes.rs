use actix_web::{test, App};

use tradecopier_backend::routes::health::health_scope;

#[actix_rt::test]
async fn health_check_returns_ok() {
    let app = test::init_service(App::new().service(health_scope())).await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 200);
    let body = test::read_body(resp).await;
    assert_eq!(body, "OK");
}

use api_contract::ApiResponse;

#[test]
fn api_response_success() {
    let response = ApiResponse::success("ok");
    assert!(response.success);
    assert!(response.data.is_some());
    assert!(response.error.is_none());
}

#[test]
fn api_response_error() {
    let response = ApiResponse::<()>::error("RESOURCE.NOT_FOUND", "alarm not found");
    assert!(!response.success);
    assert!(response.data.is_none());
    assert!(response.error.is_some());
}

#[test]
fn api_response_error_keeps_context() {
    let response =
        ApiResponse::error_with_data("CONTROL.INTERLOCK", "Insufficient water level in tank", 5);
    assert!(!response.success);
    assert_eq!(response.data, Some(5));
    let error = response.error.expect("error");
    assert_eq!(error.code, "CONTROL.INTERLOCK");
}

use app_config::AppConfig;
use std::time::Duration;

#[test]
fn test_load_default_config() {
    let cfg = AppConfig::load().unwrap();
    assert_eq!(cfg.db_port, 5432);
    assert_eq!(cfg.default_page, 1);
    assert_eq!(cfg.default_limit, 10);
    assert_eq!(cfg.max_inflight_requests, 500);
    assert_eq!(cfg.jwt_expiry, Duration::from_secs(24 * 3600));
}

// Timezone fallback through the environment. These tests mutate `TZ`.
use serial_test::serial;
use std::env;
use timetable_ics::config::{self, Config, FALLBACK_TIMEZONE};
use timetable_ics::context::{AppContext, TestContext};

fn with_tz<T>(value: Option<&str>, f: impl FnOnce() -> T) -> T {
    let saved = env::var("TZ").ok();
    unsafe {
        match value {
            Some(v) => env::set_var("TZ", v),
            None => env::remove_var("TZ"),
        }
    }
    let result = f();
    unsafe {
        match saved {
            Some(v) => env::set_var("TZ", v),
            None => env::remove_var("TZ"),
        }
    }
    result
}

#[test]
#[serial]
fn test_env_timezone_used_without_config() {
    let tz = with_tz(Some("Europe/Oslo"), || {
        Config::default().resolve_timezone(None).unwrap()
    });
    assert_eq!(tz, "Europe/Oslo");
}

#[test]
#[serial]
fn test_system_zone_used_without_env() {
    let tz = with_tz(None, || Config::default().resolve_timezone(None).unwrap());
    match config::system_timezone() {
        Some(local) => assert_eq!(tz, local),
        None => assert_eq!(tz, FALLBACK_TIMEZONE),
    }
    assert!(config::validate_timezone(&tz).is_ok());
}

#[test]
#[serial]
fn test_env_beats_system_zone() {
    // a zone that is unlikely to be the machine's own
    let tz = with_tz(Some("Pacific/Chatham"), || {
        Config::default().resolve_timezone(None).unwrap()
    });
    assert_eq!(tz, "Pacific/Chatham");
}

#[test]
#[serial]
fn test_config_beats_env() {
    let ctx = TestContext::new();
    std::fs::write(
        ctx.get_config_file_path().unwrap(),
        "timezone = \"Europe/Helsinki\"\n",
    )
    .unwrap();
    let config = Config::load_or_default(&ctx).unwrap();

    let tz = with_tz(Some("Asia/Tokyo"), || config.resolve_timezone(None).unwrap());
    assert_eq!(tz, "Europe/Helsinki");
}

#[test]
#[serial]
fn test_invalid_env_timezone_is_an_error() {
    let result = with_tz(Some("Not/AZone"), || Config::default().resolve_timezone(None));
    assert!(result.is_err());
}

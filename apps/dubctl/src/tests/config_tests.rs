use super::*;

#[test]
fn file_values_override_defaults() {
    let mut settings = Settings::default();
    apply_file(
        &mut settings,
        r#"
api_url = "http://dubbing.internal:9000"
target_language = "German"
lenient = true
poll_interval_secs = 15
"#,
    );

    assert_eq!(settings.api_url, "http://dubbing.internal:9000");
    assert_eq!(settings.source_language, "English - US");
    assert_eq!(settings.target_language, "German");
    assert!(settings.lenient);
    assert_eq!(settings.poll_interval_secs, 15);
}

#[test]
fn unreadable_file_leaves_defaults() {
    let mut settings = Settings::default();
    apply_file(&mut settings, "api_url = [not toml");
    assert_eq!(settings, Settings::default());
}

#[test]
fn env_overrides_use_the_prefix_and_ignore_bad_numbers() {
    let mut settings = Settings::default();
    let env: HashMap<&str, &str> = HashMap::from([
        ("DUBCTL_EMAIL", "fan@example.com"),
        ("DUBCTL_MAX_DURATION_SECS", "not-a-number"),
        ("DUBCTL_OUTPUT_DIR", "/tmp/dubs"),
        ("EMAIL", "ignored@example.com"),
    ]);
    apply_env(&mut settings, |key| env.get(key).map(|v| v.to_string()));

    assert_eq!(settings.email.as_deref(), Some("fan@example.com"));
    assert_eq!(settings.max_duration_secs, 120);
    assert_eq!(settings.output_dir, PathBuf::from("/tmp/dubs"));
}

#[test]
fn blank_email_means_none() {
    let mut settings = Settings::default();
    apply_env(&mut settings, |key| {
        (key == "DUBCTL_EMAIL").then(|| "   ".to_string())
    });
    assert_eq!(settings.email, None);
}

#[test]
fn policy_follows_the_settings() {
    let settings = Settings {
        poll_interval_secs: 5,
        max_duration_secs: 0,
        ..Settings::default()
    };
    let policy = settings.policy();
    assert_eq!(policy.poll_interval, Duration::from_secs(5));
    assert_eq!(policy.max_duration, None);
    assert_eq!(policy.status_errors, StatusErrorPolicy::HardReset);

    let lenient = Settings {
        lenient: true,
        ..Settings::default()
    };
    assert_eq!(lenient.policy().language_collision, LanguageCollision::Reject);
    assert_eq!(
        lenient.describe_policy(),
        "status errors: surface, identical languages: reject"
    );
}

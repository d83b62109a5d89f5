//! Tests for [`ServiceConfig`] and its sections.

use super::*;
use ipn_relay_core::{ListId, ListMapping, SecretValue};
use std::io::Write;

mod defaults_tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ServiceConfig::default().validate().is_ok());
    }

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.max_body_size, 51_200);
        assert_eq!(config.webhook.endpoint_path, "/ipn");
        assert!(!config.webhook.signature.uppercase_keys);
        assert!(!config.webhook.signature.html_decode);
        assert_eq!(config.provider.base_url, "https://api.brevo.com/v3/");
        assert_eq!(config.provider.timeout_seconds, 30);
        assert_eq!(config.provider.connect_timeout_seconds, 10);
    }

    #[test]
    fn test_client_config_carries_timeouts() {
        let provider = ProviderConfig {
            timeout_seconds: 5,
            connect_timeout_seconds: 2,
            ..ProviderConfig::default()
        };

        let client = provider.client_config();

        assert_eq!(client.timeout, Duration::from_secs(5));
        assert_eq!(client.connect_timeout, Duration::from_secs(2));
        assert_eq!(client.base_url, provider.base_url);
    }
}

mod validation_tests {
    use super::*;

    /// Verify that each invalid value is rejected as `ConfigError::Invalid`.
    #[test]
    fn test_invalid_values_are_rejected() {
        let cases: Vec<(&str, Box<dyn Fn(&mut ServiceConfig)>)> = vec![
            ("port 0", Box::new(|c: &mut ServiceConfig| c.server.port = 0)),
            ("body limit 0", Box::new(|c: &mut ServiceConfig| c.server.max_body_size = 0)),
            (
                "relative path",
                Box::new(|c: &mut ServiceConfig| c.webhook.endpoint_path = "ipn".to_string()),
            ),
            (
                "reserved path",
                Box::new(|c: &mut ServiceConfig| c.webhook.endpoint_path = "/health".to_string()),
            ),
            (
                "http base url",
                Box::new(|c: &mut ServiceConfig| c.provider.base_url = "http://api.brevo.com/v3/".to_string()),
            ),
            (
                "unparseable base url",
                Box::new(|c: &mut ServiceConfig| c.provider.base_url = "api.brevo.com".to_string()),
            ),
            ("zero timeout", Box::new(|c: &mut ServiceConfig| c.provider.timeout_seconds = 0)),
            (
                "zero connect timeout",
                Box::new(|c: &mut ServiceConfig| c.provider.connect_timeout_seconds = 0),
            ),
        ];

        for (name, mutate) in cases {
            let mut config = ServiceConfig::default();
            mutate(&mut config);

            let result = config.validate();
            assert!(
                matches!(result, Err(ConfigError::Invalid { .. })),
                "{}: expected Invalid, got {:?}",
                name,
                result
            );
        }
    }

    /// Paths the router would read as captures must not reach `route()`.
    #[test]
    fn test_parameterised_endpoint_paths_are_rejected() {
        for path in ["/ipn/:id", "/ipn/{id}", "/ipn/*rest", "/{*rest}", "/ipn/}"] {
            let mut config = ServiceConfig::default();
            config.webhook.endpoint_path = path.to_string();

            let result = config.validate();
            assert!(
                matches!(result, Err(ConfigError::Invalid { .. })),
                "{}: expected Invalid, got {:?}",
                path,
                result
            );
        }
    }

    #[test]
    fn test_literal_nested_endpoint_path_is_accepted() {
        let mut config = ServiceConfig::default();
        config.webhook.endpoint_path = "/hooks/ipn-v2".to_string();

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_endpoint_path_is_missing() {
        let mut config = ServiceConfig::default();
        config.webhook.endpoint_path = String::new();

        assert!(matches!(
            config.validate(),
            Err(ConfigError::Missing { .. })
        ));
    }

    #[test]
    fn test_zero_list_id_is_rejected() {
        let mut config = ServiceConfig::default();
        config.settings.lists = ListMapping::default().with_product("42", 0);

        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_blank_attribute_name_is_rejected() {
        let mut config = ServiceConfig::default();
        config.settings.attributes.last_name = String::new();

        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_missing_secrets_do_not_fail_validation() {
        let config = ServiceConfig::default();

        assert!(config.settings.signing_secret.is_none());
        assert!(config.validate().is_ok());
    }
}

mod serialization_tests {
    use super::*;

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = r#"
server:
  port: 9090
webhook:
  endpoint_path: /digistore/ipn
  signature:
    uppercase_keys: true
settings:
  signing_secret: passphrase
  lists:
    product_lists:
      "42": 7
    add_to_newsletter: true
"#;

        let config: ServiceConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.max_body_size, 51_200);
        assert_eq!(config.webhook.endpoint_path, "/digistore/ipn");
        assert!(config.webhook.signature.uppercase_keys);
        assert!(!config.webhook.signature.html_decode);
        assert_eq!(
            config
                .settings
                .signing_secret
                .as_ref()
                .map(SecretValue::expose_secret),
            Some("passphrase")
        );
        assert!(config.settings.lists.add_to_newsletter);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_serialized_config_redacts_secrets() {
        let mut config = ServiceConfig::default();
        config.settings.signing_secret = Some(SecretValue::from("passphrase"));
        config.settings.provider_api_key = Some(SecretValue::from("xkeysib-123"));

        let yaml = serde_yaml::to_string(&config).unwrap();

        assert!(!yaml.contains("passphrase"));
        assert!(!yaml.contains("xkeysib-123"));
        assert!(yaml.contains("<REDACTED>"));
    }
}

fn config_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

mod loading_tests {
    use super::*;

    #[test]
    fn test_defaults_without_explicit_file() {
        let config = ServiceConfig::load(None).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.webhook.endpoint_path, "/ipn");
        assert_eq!(config.server.max_body_size, 51_200);
    }

    #[test]
    fn test_empty_explicit_path_is_ignored() {
        assert!(ServiceConfig::load(Some("")).is_ok());
    }

    #[test]
    fn test_explicit_file_is_applied() {
        let file = config_file(
            r#"
server:
  port: 9090
webhook:
  endpoint_path: /hooks/ipn
  signature:
    uppercase_keys: true
settings:
  signing_secret: file-secret
  provider_api_key: file-key
  lists:
    product_lists:
      "42": 7
    add_to_newsletter: true
  attributes:
    first_name: FIRSTNAME
    last_name: LASTNAME
logging:
  json_format: true
  activity_log_path: /var/log/ipn-relay/activity.log
"#,
        );

        let config = ServiceConfig::load(file.path().to_str()).unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.webhook.endpoint_path, "/hooks/ipn");
        assert!(config.webhook.signature.uppercase_keys);
        assert!(!config.webhook.signature.html_decode);
        assert_eq!(
            config.settings.signing_secret.as_ref().map(|s| s.expose_secret()),
            Some("file-secret")
        );
        assert_eq!(
            config.settings.lists.product_lists.get("42"),
            Some(&ListId::new(7))
        );
        assert!(config.settings.lists.add_to_newsletter);
        assert_eq!(config.settings.lists.newsletter_list_id, Some(ListId::new(1)));
        assert_eq!(config.settings.attributes.first_name, "FIRSTNAME");
        assert!(config.logging.json_format);
        assert!(config.settings.missing_secrets().is_empty());
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yaml");

        let result = ServiceConfig::load(path.to_str());

        assert!(matches!(result, Err(ConfigError::Load { .. })));
    }

    #[test]
    fn test_malformed_value_fails() {
        let file = config_file("server:\n  port: not-a-number\n");

        let result = ServiceConfig::load(file.path().to_str());

        assert!(matches!(result, Err(ConfigError::Load { .. })));
    }

    #[test]
    fn test_invalid_value_fails_validation() {
        let file = config_file("provider:\n  base_url: http://api.example.com/v3/\n");

        let result = ServiceConfig::load(file.path().to_str());

        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }
}

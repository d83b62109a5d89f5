//! Tests for the settings module.

use super::*;
use crate::lists::ListId;

mod secret_value_tests {
    use super::*;

    #[test]
    fn test_debug_output_is_redacted() {
        let secret = SecretValue::from("super-secret-passphrase");

        let debug = format!("{:?}", secret);

        assert!(!debug.contains("super-secret-passphrase"));
        assert!(debug.contains("REDACTED"));
        assert!(debug.contains("23"));
    }

    #[test]
    fn test_serializes_as_placeholder() {
        let secret = SecretValue::from("super-secret-passphrase");

        let json = serde_json::to_string(&secret).unwrap();

        assert_eq!(json, "\"<REDACTED>\"");
    }

    #[test]
    fn test_deserializes_plain_string() {
        let secret: SecretValue = serde_json::from_str("\"abc\"").unwrap();

        assert_eq!(secret.expose_secret(), "abc");
        assert_eq!(secret.len(), 3);
    }
}

mod static_settings_tests {
    use super::*;

    fn configured() -> IpnSettings {
        IpnSettings {
            signing_secret: Some(SecretValue::from("sign")),
            provider_api_key: Some(SecretValue::from("key")),
            lists: ListMapping::default().with_product("42", 7),
            attributes: AttributeNames::default(),
        }
    }

    #[test]
    fn test_secrets_are_returned() {
        let settings = StaticSettings::new(configured());

        assert_eq!(
            settings
                .secret(SecretName::SigningSecret)
                .unwrap()
                .expose_secret(),
            "sign"
        );
        assert_eq!(
            settings
                .secret(SecretName::ProviderApiKey)
                .unwrap()
                .expose_secret(),
            "key"
        );
    }

    #[test]
    fn test_empty_secret_is_missing() {
        let settings = StaticSettings::new(IpnSettings {
            provider_api_key: Some(SecretValue::from("")),
            ..configured()
        });

        assert!(settings.secret(SecretName::ProviderApiKey).is_none());
        assert_eq!(
            settings.settings().missing_secrets(),
            vec![SecretName::ProviderApiKey]
        );
    }

    #[test]
    fn test_default_settings_report_both_secrets_missing() {
        let settings = IpnSettings::default();

        assert_eq!(
            settings.missing_secrets(),
            vec![SecretName::SigningSecret, SecretName::ProviderApiKey]
        );
    }

    #[test]
    fn test_newsletter_flag_follows_mapping() {
        let mut settings = configured();
        assert!(!StaticSettings::new(settings.clone()).is_newsletter_enabled());

        settings.lists = settings.lists.with_newsletter(3);
        let provider = StaticSettings::new(settings);

        assert!(provider.is_newsletter_enabled());
        assert_eq!(
            provider.list_mapping().newsletter_list_id,
            Some(ListId::new(3))
        );
    }

    #[test]
    fn test_default_attribute_names() {
        let names = StaticSettings::default().attribute_names();

        assert_eq!(names.first_name, "VORNAME");
        assert_eq!(names.last_name, "NACHNAME");
    }

    #[test]
    fn test_validate_rejects_blank_attribute_name() {
        let settings = IpnSettings {
            attributes: AttributeNames {
                first_name: " ".to_string(),
                last_name: "NACHNAME".to_string(),
            },
            ..configured()
        };

        assert!(matches!(
            settings.validate(),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_deserialize_partial_settings() {
        let json = r#"{
            "signing_secret": "sign",
            "lists": {"product_lists": {"42": 7}},
            "attributes": {"first_name": "FIRSTNAME"}
        }"#;

        let settings: IpnSettings = serde_json::from_str(json).unwrap();

        assert_eq!(
            settings.signing_secret.as_ref().map(SecretValue::expose_secret),
            Some("sign")
        );
        assert!(settings.provider_api_key.is_none());
        assert_eq!(settings.attributes.first_name, "FIRSTNAME");
        assert_eq!(settings.attributes.last_name, "NACHNAME");
        assert_eq!(settings.lists.newsletter_list_id, Some(ListId::new(1)));
    }
}

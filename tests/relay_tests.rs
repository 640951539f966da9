mod support;

use std::sync::Arc;

use hubspot_relay::form::{FormElement, LocalForm};
use hubspot_relay::mapping::{
    ConsentSource, FieldMappingConfig, LegalConsent, MappingStore, MemoryMappingStore,
    SubscriptionRule,
};
use hubspot_relay::relay::{
    RelayOutcome, RelaySettings, RelayState, RequestContext, SubmissionEvent, SubmissionRelay,
};
use indexmap::IndexMap;
use pretty_assertions::assert_eq;
use serde_json::{json, Map, Value};
use wiremock::matchers::{any, body_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use support::{expired_token, fresh_token, session, InMemoryTokenStore, RecordingMailer, PORTAL_ID};

const REMOTE_FORM: &str = "remote-guid-1";
const SUBMIT_PATH: &str = "/submissions/v3/integration/secure/submit/4242/remote-guid-1";

fn contact_form() -> LocalForm {
    LocalForm::new("contact", "Contact us")
        .with_element(FormElement::new("contact_email", "Email", "email"))
        .with_element(
            FormElement::new("address", "Address", "webform_address")
                .with_child(FormElement::new("zip", "Zip", "textfield")),
        )
        .with_element(
            FormElement::new("agree", "I accept the terms", "select")
                .with_option("1", "Yes")
                .with_option("0", "No"),
        )
        .with_element(FormElement::new("newsletter", "Send me news", "checkbox"))
}

fn mapping(entries: &[(&str, &str)]) -> FieldMappingConfig {
    FieldMappingConfig {
        remote_form_id: Some(REMOTE_FORM.to_string()),
        field_mapping: entries
            .iter()
            .map(|(remote, local)| (remote.to_string(), local.to_string()))
            .collect::<IndexMap<_, _>>(),
        ..Default::default()
    }
}

fn event(values: Value) -> SubmissionEvent {
    let values: Map<String, Value> = values.as_object().cloned().unwrap_or_default();
    SubmissionEvent::builder()
        .form(contact_form())
        .values(values)
        .request(RequestContext {
            client_ip: Some("203.0.113.7".to_string()),
            referer: Some("https://site.test/contact".to_string()),
            hutk: None,
        })
        .build()
}

struct Harness {
    server: MockServer,
    store: Arc<InMemoryTokenStore>,
    mappings: Arc<MemoryMappingStore>,
    mailer: Arc<RecordingMailer>,
}

impl Harness {
    async fn new() -> Self {
        Self::with_mailer(RecordingMailer::new()).await
    }

    async fn with_mailer(mailer: RecordingMailer) -> Self {
        Self {
            server: MockServer::start().await,
            store: Arc::new(InMemoryTokenStore::with_token(fresh_token())),
            mappings: Arc::new(MemoryMappingStore::new()),
            mailer: Arc::new(mailer),
        }
    }

    fn relay(&self, settings: RelaySettings) -> SubmissionRelay {
        SubmissionRelay::new(
            Arc::new(session(self.store.clone(), &self.server)),
            self.mappings.clone(),
            self.mailer.clone(),
            settings,
        )
    }

    fn connect(&self, config: FieldMappingConfig) {
        self.mappings.save("contact", &config).expect("save mapping");
    }
}

#[tokio::test]
async fn simple_mapping_posts_renamed_field_with_context() {
    let harness = Harness::new().await;
    harness.connect(mapping(&[("email", "contact_email")]));
    Mock::given(method("POST"))
        .and(path(SUBMIT_PATH))
        .and(header("authorization", "Bearer access-fresh"))
        .and(body_json(json!({
            "fields": [{"name": "email", "value": "a@b.com"}],
            "context": {
                "ipAddress": "203.0.113.7",
                "pageUri": "https://site.test/contact",
                "pageName": "Contact us"
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"inlineMessage":"Thanks"}"#))
        .expect(1)
        .mount(&harness.server)
        .await;

    let outcome = harness
        .relay(RelaySettings::new(PORTAL_ID))
        .relay(&event(json!({"contact_email": "a@b.com"})))
        .await;

    assert_eq!(
        outcome,
        RelayOutcome::Delivered {
            status: 200,
            body: r#"{"inlineMessage":"Thanks"}"#.to_string()
        }
    );
    assert_eq!(outcome.state(), RelayState::LoggedSuccess);
    assert!(harness.mailer.sent().is_empty());
}

#[tokio::test]
async fn composite_path_resolves_nested_value() {
    let harness = Harness::new().await;
    harness.connect(mapping(&[("zip", "address:zip"), ("email", "contact_email")]));
    Mock::given(method("POST"))
        .and(path(SUBMIT_PATH))
        .and(body_string_contains(r#""fields":[{"name":"zip","value":42}]"#))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&harness.server)
        .await;

    let outcome = harness
        .relay(RelaySettings::new(PORTAL_ID))
        .relay(&event(json!({"address": {"zip": 42}, "contact_email": ""})))
        .await;
    assert!(outcome.is_delivered(), "{outcome:?}");
}

#[tokio::test]
async fn page_url_wins_over_referer_and_cookie_is_forwarded() {
    let harness = Harness::new().await;
    harness.connect(mapping(&[("email", "contact_email")]));
    Mock::given(method("POST"))
        .and(path(SUBMIT_PATH))
        .and(body_string_contains(r#""pageUri":"https://site.test/landing""#))
        .and(body_string_contains(r#""hutk":"tracking-123""#))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&harness.server)
        .await;

    let mut event = event(json!({"contact_email": "a@b.com"}));
    event.page_url = Some("https://site.test/landing".to_string());
    event.request.hutk = Some("tracking-123".to_string());
    let outcome = harness.relay(RelaySettings::new(PORTAL_ID)).relay(&event).await;
    assert!(outcome.is_delivered(), "{outcome:?}");
}

#[tokio::test]
async fn conditional_consent_follows_selected_option() {
    let harness = Harness::new().await;
    let mut config = mapping(&[("email", "contact_email")]);
    config.legal_consent = LegalConsent::conditionally(ConsentSource::new("agree", Some("1")));
    harness.connect(config);

    Mock::given(method("POST"))
        .and(path(SUBMIT_PATH))
        .and(body_string_contains(r#""consentToProcess":true"#))
        .and(body_string_contains(r#""text":"I accept the terms""#))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&harness.server)
        .await;
    Mock::given(method("POST"))
        .and(path(SUBMIT_PATH))
        .and(body_json(json!({
            "fields": [{"name": "email", "value": "a@b.com"}],
            "context": {
                "ipAddress": "203.0.113.7",
                "pageUri": "https://site.test/contact",
                "pageName": "Contact us"
            }
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&harness.server)
        .await;

    let relay = harness.relay(RelaySettings::new(PORTAL_ID));
    let agreed = relay
        .relay(&event(json!({"contact_email": "a@b.com", "agree": "1"})))
        .await;
    let declined = relay
        .relay(&event(json!({"contact_email": "a@b.com", "agree": "0"})))
        .await;
    assert!(agreed.is_delivered());
    assert!(declined.is_delivered());
}

#[tokio::test]
async fn subscriptions_attach_communications() {
    let harness = Harness::new().await;
    let mut config = mapping(&[("email", "contact_email")]);
    config.subscriptions = vec![
        SubscriptionRule::always("101"),
        SubscriptionRule::conditionally("202", "newsletter", None),
    ];
    harness.connect(config);
    Mock::given(method("POST"))
        .and(path(SUBMIT_PATH))
        .and(body_string_contains(concat!(
            r#""communications":["#,
            r#"{"value":true,"subscriptionTypeId":101,"text":"I agree"},"#,
            r#"{"value":true,"subscriptionTypeId":202,"text":"Send me news"}]"#,
        )))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&harness.server)
        .await;

    let outcome = harness
        .relay(RelaySettings::new(PORTAL_ID))
        .relay(&event(json!({"contact_email": "a@b.com", "newsletter": "1"})))
        .await;
    assert!(outcome.is_delivered(), "{outcome:?}");
}

#[tokio::test]
async fn unmapped_form_is_not_posted() {
    let harness = Harness::new().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&harness.server)
        .await;

    let relay = harness.relay(RelaySettings::new(PORTAL_ID).with_debug("ops@site.test", None));
    let outcome = relay.relay(&event(json!({"contact_email": "a@b.com"}))).await;
    assert_eq!(outcome, RelayOutcome::NotConnected);
    assert_eq!(outcome.state(), RelayState::Received);

    // consent rules saved without a remote form
    harness.connect(FieldMappingConfig {
        legal_consent: LegalConsent::always(),
        ..Default::default()
    });
    let outcome = relay.relay(&event(json!({"contact_email": "a@b.com"}))).await;
    assert_eq!(outcome, RelayOutcome::NotConnected);
    assert!(harness.mailer.sent().is_empty());
}

#[tokio::test]
async fn rejected_submission_is_a_failed_outcome_and_mailed() {
    let harness = Harness::new().await;
    harness.connect(mapping(&[("email", "contact_email")]));
    Mock::given(method("POST"))
        .and(path(SUBMIT_PATH))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_string(r#"{"status":"error","message":"bad email"}"#),
        )
        .expect(1)
        .mount(&harness.server)
        .await;

    let settings = RelaySettings::new(PORTAL_ID)
        .with_debug("ops@site.test", Some("noreply@site.test".to_string()));
    let outcome = harness
        .relay(settings)
        .relay(&event(json!({"contact_email": "not-an-email"})))
        .await;

    assert_eq!(
        outcome,
        RelayOutcome::Failed {
            status: Some(400),
            error: r#"{"status":"error","message":"bad email"}"#.to_string()
        }
    );
    assert_eq!(outcome.state(), RelayState::LoggedFailure);
    let sent = harness.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "ops@site.test");
    assert_eq!(sent[0].from.as_deref(), Some("noreply@site.test"));
    assert_eq!(sent[0].subject, "HubSpot submission from \"Contact us\"");
    assert!(sent[0].body.contains("bad email"));
}

#[tokio::test]
async fn successful_submission_is_mailed_when_debugging() {
    let harness = Harness::new().await;
    harness.connect(mapping(&[("email", "contact_email")]));
    Mock::given(method("POST"))
        .and(path(SUBMIT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("accepted"))
        .mount(&harness.server)
        .await;

    let outcome = harness
        .relay(RelaySettings::new(PORTAL_ID).with_debug("ops@site.test", None))
        .relay(&event(json!({"contact_email": "a@b.com"})))
        .await;
    assert!(outcome.is_delivered());
    let sent = harness.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].body.contains("accepted"));
}

#[tokio::test]
async fn mail_failure_does_not_change_outcome() {
    let harness = Harness::with_mailer(RecordingMailer::failing()).await;
    harness.connect(mapping(&[("email", "contact_email")]));
    Mock::given(method("POST"))
        .and(path(SUBMIT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&harness.server)
        .await;

    let outcome = harness
        .relay(RelaySettings::new(PORTAL_ID).with_debug("ops@site.test", None))
        .relay(&event(json!({"contact_email": "a@b.com"})))
        .await;
    assert_eq!(
        outcome,
        RelayOutcome::Delivered {
            status: 200,
            body: "ok".to_string()
        }
    );
    assert_eq!(harness.mailer.sent().len(), 1);
}

#[tokio::test]
async fn resubmitted_event_is_posted_twice() {
    let harness = Harness::new().await;
    harness.connect(mapping(&[("email", "contact_email")]));
    Mock::given(method("POST"))
        .and(path(SUBMIT_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&harness.server)
        .await;

    let relay = harness.relay(RelaySettings::new(PORTAL_ID));
    let event = event(json!({"contact_email": "a@b.com"}));
    assert!(relay.relay(&event).await.is_delivered());
    assert!(relay.relay(&event).await.is_delivered());
}

#[tokio::test]
async fn expired_token_is_refreshed_before_posting() {
    let harness = Harness::new().await;
    harness.store.seed(expired_token());
    harness.connect(mapping(&[("email", "contact_email")]));
    Mock::given(method("POST"))
        .and(path("/oauth/v1/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-new",
            "refresh_token": "refresh-new",
            "expires_in": 21600
        })))
        .expect(1)
        .mount(&harness.server)
        .await;
    Mock::given(method("POST"))
        .and(path(SUBMIT_PATH))
        .and(header("authorization", "Bearer access-new"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&harness.server)
        .await;

    let outcome = harness
        .relay(RelaySettings::new(PORTAL_ID))
        .relay(&event(json!({"contact_email": "a@b.com"})))
        .await;
    assert!(outcome.is_delivered(), "{outcome:?}");
    assert_eq!(
        harness.store.get().map(|t| t.access_token),
        Some("access-new".to_string())
    );
}

#[tokio::test]
async fn disconnected_account_fails_without_posting() {
    let harness = Harness::new().await;
    harness.store.clear_token();
    harness.connect(mapping(&[("email", "contact_email")]));
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&harness.server)
        .await;

    let outcome = harness
        .relay(RelaySettings::new(PORTAL_ID))
        .relay(&event(json!({"contact_email": "a@b.com"})))
        .await;
    match outcome {
        RelayOutcome::Failed { status, error } => {
            assert_eq!(status, None);
            assert!(error.contains("not connected"), "{error}");
        }
        other => panic!("expected Failed, got {other:?}"),
    }
}

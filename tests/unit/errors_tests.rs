/*!
 * Tests for error types and their classification
 */

use translatebot::errors::{AppError, ProviderError, TranslateError};
use translatebot::translation::classify;

/// Test that provider errors format with their payload
#[test]
fn test_provider_error_display_shouldIncludeDetails() {
    let error = ProviderError::ApiError {
        status_code: 503,
        message: "overloaded".to_string(),
    };
    assert_eq!(error.to_string(), "API responded with error: 503 - overloaded");

    let error = ProviderError::RateLimitExceeded {
        message: "slow down".to_string(),
        retry_after_secs: Some(3),
    };
    assert_eq!(error.to_string(), "Rate limit exceeded: slow down");
}

#[test]
fn test_translate_error_isJobFatal_shouldOnlyCoverCredentialsAndBilling() {
    assert!(TranslateError::Authentication("bad key".into()).is_job_fatal());
    assert!(TranslateError::InsufficientCredits("empty".into()).is_job_fatal());

    let non_fatal = [
        TranslateError::RateLimit {
            message: "busy".into(),
            retry_after_secs: None,
        },
        TranslateError::TransientProvider("reset".into()),
        TranslateError::RequestRejected("bad".into()),
        TranslateError::MalformedResponse {
            reason: "no array".into(),
            preview: String::new(),
        },
        TranslateError::Reconciliation {
            expected: 2,
            received: 1,
        },
    ];
    for error in non_fatal {
        assert!(!error.is_job_fatal(), "{} should not be fatal", error.kind());
    }
}

#[test]
fn test_translate_error_authentication_shouldExplainRemedy() {
    let message = TranslateError::Authentication("invalid x-api-key".into()).to_string();
    assert!(message.contains("invalid x-api-key"));
    assert!(message.contains("TRANSLATEBOT_API_KEY"));
}

#[test]
fn test_translate_error_reconciliation_shouldReportCounts() {
    let error = TranslateError::Reconciliation {
        expected: 3,
        received: 2,
    };
    assert_eq!(error.kind(), "reconciliation");
    assert_eq!(
        error.to_string(),
        "Reconciliation failed: expected 3 translations, received 2"
    );
}

/// Test the status code mapping of API errors
#[test]
fn test_classify_withApiStatusCodes_shouldPickKind() {
    let api = |status_code: u16, message: &str| ProviderError::ApiError {
        status_code,
        message: message.to_string(),
    };

    assert_eq!(classify(api(401, "no")).kind(), "authentication");
    assert_eq!(classify(api(403, "no")).kind(), "authentication");
    assert_eq!(classify(api(402, "pay")).kind(), "insufficient_credits");
    assert_eq!(
        classify(api(400, "Your credit balance is too low")).kind(),
        "insufficient_credits"
    );
    assert_eq!(classify(api(429, "You exceeded your current quota")).kind(), "rate_limit");
    assert_eq!(classify(api(500, "boom")).kind(), "transient_provider");
    assert_eq!(classify(api(529, "overloaded")).kind(), "transient_provider");
    assert_eq!(classify(api(400, "max_tokens too large")).kind(), "request_rejected");
}

#[test]
fn test_classify_withTransportErrors_shouldBeTransientOrMalformed() {
    assert_eq!(
        classify(ProviderError::ConnectionError("reset".into())).kind(),
        "transient_provider"
    );
    assert_eq!(
        classify(ProviderError::RequestFailed("timeout".into())).kind(),
        "transient_provider"
    );
    assert_eq!(
        classify(ProviderError::ParseError("missing field `content`".into())).kind(),
        "malformed_response"
    );
}

/// Test conversions into the application error
#[test]
fn test_app_error_from_shouldWrapSources() {
    let error: AppError = TranslateError::TransientProvider("reset".into()).into();
    assert!(matches!(error, AppError::Translation(_)));
    assert!(error.to_string().starts_with("Translation error:"));

    let error: AppError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
    assert!(matches!(error, AppError::File(_)));

    let error: AppError = anyhow::anyhow!("something odd").into();
    assert_eq!(error.to_string(), "Unknown error: something odd");

    let error: AppError = ProviderError::AuthenticationError("bad".into()).into();
    assert!(matches!(error, AppError::Provider(_)));
}

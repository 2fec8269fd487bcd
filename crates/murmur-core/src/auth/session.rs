use super::model::{AuthPhase, AuthView, ChallengeStatus, Feedback, OtpChallenge};
use super::validation::{validate_country_code, validate_otp_shape, validate_phone};
use crate::config::AuthConfig;
use crate::error::{Result, SessionError};
use chrono::{DateTime, Utc};

pub const OTP_SENT: &str = "OTP sent";
pub const OTP_VERIFIED: &str = "OTP verified";

/// Volatile sign-in state for one process.
///
/// `AuthSession` holds the transitions of the OTP handshake without any
/// notion of time: the async controller decides when a `complete_*` call
/// happens and whether it is still current. Never persisted.
///
/// Invariant: `is_authenticated` implies `challenge` is `None`.
///
/// A send and a verify may be in flight at the same time, so each keeps its
/// own loading flag; the view reports loading while either is set.
#[derive(Debug, Clone)]
pub struct AuthSession {
    phone: String,
    country_code: String,
    credentials_submitted: bool,
    challenge: Option<OtpChallenge>,
    phase: AuthPhase,
    is_authenticated: bool,
    otp_sent: bool,
    otp_verified: bool,
    sending: bool,
    verifying: bool,
    feedback: Option<Feedback>,
    rules: AuthConfig,
}

impl AuthSession {
    pub fn new(rules: AuthConfig) -> Self {
        Self {
            phone: String::new(),
            country_code: rules.default_country_code.clone(),
            credentials_submitted: false,
            challenge: None,
            phase: AuthPhase::Anonymous,
            is_authenticated: false,
            otp_sent: false,
            otp_verified: false,
            sending: false,
            verifying: false,
            feedback: None,
            rules,
        }
    }

    pub fn phase(&self) -> AuthPhase {
        self.phase
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn country_code(&self) -> &str {
        &self.country_code
    }

    pub fn challenge(&self) -> Option<&OtpChallenge> {
        self.challenge.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    pub fn is_loading(&self) -> bool {
        self.sending || self.verifying
    }

    pub fn feedback(&self) -> Option<&Feedback> {
        self.feedback.as_ref()
    }

    pub fn rules(&self) -> &AuthConfig {
        &self.rules
    }

    /// Records an error in the message slot and hands it back for `?`.
    fn reject(&mut self, err: SessionError) -> SessionError {
        if let Some(message) = err.user_message() {
            self.feedback = Some(Feedback::Error(message));
        }
        err
    }

    fn ensure_signed_out(&mut self) -> Result<()> {
        if self.is_authenticated {
            return Err(self.reject(SessionError::validation("Already signed in")));
        }
        Ok(())
    }

    /// Stores phone and country code after validating them. No phase change.
    pub fn submit_credentials(&mut self, phone: &str, country_code: &str) -> Result<()> {
        self.feedback = None;
        self.ensure_signed_out()?;

        let phone = validate_phone(phone, self.rules.min_phone_digits)
            .map_err(|e| self.reject(e))?;
        let country_code = validate_country_code(country_code).map_err(|e| self.reject(e))?;

        self.phone = phone;
        self.country_code = country_code;
        self.credentials_submitted = true;
        Ok(())
    }

    /// Enters the loading sub-state of a (re)send.
    pub fn begin_send(&mut self) -> Result<()> {
        self.feedback = None;
        self.ensure_signed_out()?;
        if !self.credentials_submitted {
            return Err(self.reject(SessionError::validation(
                "Enter a valid phone number and country code first.",
            )));
        }
        self.sending = true;
        Ok(())
    }

    /// Issues a fresh challenge, replacing any previous one.
    ///
    /// A send that lands after sign-in is stale: no challenge is issued.
    /// A verify still in flight keeps the session in `OtpVerifying`.
    pub fn complete_send(
        &mut self,
        code: String,
        issued_at: DateTime<Utc>,
    ) -> Result<&OtpChallenge> {
        self.sending = false;
        if self.is_authenticated {
            return Err(SessionError::stale("send_otp"));
        }

        self.otp_sent = true;
        self.phase = if self.verifying {
            AuthPhase::OtpVerifying
        } else {
            AuthPhase::OtpPending
        };
        self.feedback = Some(Feedback::Success(OTP_SENT.to_string()));
        Ok(self.challenge.insert(OtpChallenge::issue(code, issued_at)))
    }

    /// Enters `OtpVerifying` after checking the candidate's shape.
    pub fn begin_verify(&mut self, candidate: &str) -> Result<()> {
        self.feedback = None;
        self.ensure_signed_out()?;
        validate_otp_shape(candidate, self.rules.otp_length).map_err(|e| self.reject(e))?;

        let verifiable = matches!(self.phase, AuthPhase::OtpPending | AuthPhase::OtpVerifying);
        if !verifiable || self.challenge.is_none() {
            return Err(self.reject(SessionError::validation("Request an OTP first")));
        }

        self.phase = AuthPhase::OtpVerifying;
        self.verifying = true;
        Ok(())
    }

    /// Compares `candidate` with the live challenge.
    ///
    /// Exact string equality. A mismatch leaves the challenge live so the
    /// user can retry without a resend. A match also ends any send still in
    /// flight; its result must be discarded by the caller.
    pub fn complete_verify(&mut self, candidate: &str) -> Result<()> {
        self.verifying = false;

        let Some(challenge) = self.challenge.as_mut() else {
            return Err(SessionError::stale("verify_otp"));
        };

        if challenge.code == candidate {
            challenge.status = ChallengeStatus::Verified;
            self.challenge = None;
            self.is_authenticated = true;
            self.otp_verified = true;
            self.sending = false;
            self.phase = AuthPhase::Authenticated;
            self.feedback = Some(Feedback::Success(OTP_VERIFIED.to_string()));
            Ok(())
        } else {
            challenge.status = ChallengeStatus::Failed;
            self.phase = AuthPhase::OtpPending;
            Err(self.reject(SessionError::ChallengeMismatch))
        }
    }

    /// Back to `Anonymous`. Entered phone and country code are kept for the
    /// next attempt; everything transient is dropped.
    pub fn logout(&mut self) {
        self.challenge = None;
        self.phase = AuthPhase::Anonymous;
        self.is_authenticated = false;
        self.otp_sent = false;
        self.otp_verified = false;
        self.sending = false;
        self.verifying = false;
        self.feedback = None;
    }

    pub fn view(&self) -> AuthView {
        let (error, success) = match &self.feedback {
            Some(Feedback::Error(message)) => (Some(message.clone()), None),
            Some(Feedback::Success(message)) => (None, Some(message.clone())),
            None => (None, None),
        };

        AuthView {
            phase: self.phase,
            phone: self.phone.clone(),
            country_code: self.country_code.clone(),
            is_authenticated: self.is_authenticated,
            otp_sent: self.otp_sent,
            otp_verified: self.otp_verified,
            is_loading: self.is_loading(),
            error,
            success,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_with_credentials() -> AuthSession {
        let mut session = AuthSession::new(AuthConfig::default());
        session.submit_credentials("9876543210", "+91").unwrap();
        session
    }

    fn issue(session: &mut AuthSession, code: &str) {
        session.begin_send().unwrap();
        session.complete_send(code.to_string(), Utc::now()).unwrap();
    }

    #[test]
    fn test_new_session_is_anonymous() {
        let session = AuthSession::new(AuthConfig::default());
        let view = session.view();
        assert_eq!(view.phase, AuthPhase::Anonymous);
        assert_eq!(view.country_code, "+91");
        assert!(!view.otp_sent);
        assert!(session.challenge().is_none());
    }

    #[test]
    fn test_invalid_credentials_fill_error_slot() {
        let mut session = AuthSession::new(AuthConfig::default());
        let err = session.submit_credentials("123", "+91").unwrap_err();
        assert!(err.is_validation());
        assert_eq!(
            session.view().error.as_deref(),
            Some("Phone number must be at least 10 digits")
        );
        assert_eq!(session.phase(), AuthPhase::Anonymous);
    }

    #[test]
    fn test_send_requires_credentials() {
        let mut session = AuthSession::new(AuthConfig::default());
        assert!(session.begin_send().unwrap_err().is_validation());
        assert!(!session.is_loading());
    }

    #[test]
    fn test_send_issues_single_challenge() {
        let mut session = session_with_credentials();
        session.begin_send().unwrap();
        assert!(session.view().is_loading);

        session.complete_send("123456".to_string(), Utc::now()).unwrap();

        let view = session.view();
        assert_eq!(view.phase, AuthPhase::OtpPending);
        assert!(view.otp_sent);
        assert!(!view.is_loading);
        assert_eq!(view.success.as_deref(), Some(OTP_SENT));
        assert_eq!(session.challenge().unwrap().status, ChallengeStatus::Pending);
    }

    #[test]
    fn test_resend_replaces_challenge() {
        let mut session = session_with_credentials();
        issue(&mut session, "111111");
        issue(&mut session, "222222");

        session.begin_verify("111111").unwrap();
        let err = session.complete_verify("111111").unwrap_err();
        assert!(err.is_challenge_mismatch());

        session.begin_verify("222222").unwrap();
        session.complete_verify("222222").unwrap();
        assert!(session.is_authenticated());
    }

    #[test]
    fn test_verify_success_clears_challenge() {
        let mut session = session_with_credentials();
        issue(&mut session, "654321");

        session.begin_verify("654321").unwrap();
        assert_eq!(session.phase(), AuthPhase::OtpVerifying);
        session.complete_verify("654321").unwrap();

        let view = session.view();
        assert!(view.is_authenticated);
        assert!(view.otp_verified);
        assert_eq!(view.phase, AuthPhase::Authenticated);
        assert_eq!(view.success.as_deref(), Some(OTP_VERIFIED));
        assert!(view.error.is_none());
        assert!(session.challenge().is_none());
    }

    #[test]
    fn test_mismatch_keeps_challenge_live() {
        let mut session = session_with_credentials();
        issue(&mut session, "654321");

        session.begin_verify("000000").unwrap();
        assert!(session.complete_verify("000000").is_err());

        let view = session.view();
        assert_eq!(view.phase, AuthPhase::OtpPending);
        assert!(view.otp_sent);
        assert_eq!(view.error.as_deref(), Some("Invalid OTP"));
        assert!(view.success.is_none());
        assert_eq!(session.challenge().unwrap().status, ChallengeStatus::Failed);

        session.begin_verify("654321").unwrap();
        assert!(session.complete_verify("654321").is_ok());
    }

    #[test]
    fn test_verify_before_send_is_rejected() {
        let mut session = session_with_credentials();
        let err = session.begin_verify("123456").unwrap_err();
        assert!(err.is_validation());
        assert_eq!(session.phase(), AuthPhase::Anonymous);
    }

    #[test]
    fn test_verify_shape_checked_before_transition() {
        let mut session = session_with_credentials();
        issue(&mut session, "123456");
        assert!(session.begin_verify("12345").is_err());
        assert_eq!(session.phase(), AuthPhase::OtpPending);
        assert_eq!(session.view().error.as_deref(), Some("Enter 6-digit OTP"));
    }

    #[test]
    fn test_new_operation_clears_message_slot() {
        let mut session = session_with_credentials();
        issue(&mut session, "123456");
        assert!(session.view().success.is_some());

        session.begin_verify("123456").unwrap();
        let view = session.view();
        assert!(view.success.is_none());
        assert!(view.error.is_none());
    }

    #[test]
    fn test_logout_resets_to_anonymous() {
        let mut session = session_with_credentials();
        issue(&mut session, "123456");
        session.begin_verify("123456").unwrap();
        session.complete_verify("123456").unwrap();

        session.logout();

        let view = session.view();
        assert_eq!(view.phase, AuthPhase::Anonymous);
        assert!(!view.is_authenticated);
        assert!(!view.otp_sent);
        assert!(!view.otp_verified);
        assert!(view.error.is_none() && view.success.is_none());
        assert_eq!(view.phone, "9876543210");
    }

    #[test]
    fn test_authenticated_session_rejects_send() {
        let mut session = session_with_credentials();
        issue(&mut session, "123456");
        session.begin_verify("123456").unwrap();
        session.complete_verify("123456").unwrap();

        assert!(session.begin_send().is_err());
        assert!(session.challenge().is_none());
    }

    #[test]
    fn test_send_landing_after_sign_in_is_stale() {
        let mut session = session_with_credentials();
        issue(&mut session, "111111");
        session.begin_send().unwrap();
        session.begin_verify("111111").unwrap();
        session.complete_verify("111111").unwrap();
        assert!(!session.is_loading());

        let err = session
            .complete_send("222222".to_string(), Utc::now())
            .unwrap_err();
        assert!(err.is_stale());

        let view = session.view();
        assert!(view.is_authenticated);
        assert_eq!(view.phase, AuthPhase::Authenticated);
        assert_eq!(view.success.as_deref(), Some(OTP_VERIFIED));
        assert!(session.challenge().is_none());
    }

    #[test]
    fn test_loading_holds_while_either_operation_runs() {
        let mut session = session_with_credentials();
        issue(&mut session, "111111");
        session.begin_verify("111111").unwrap();
        session.begin_send().unwrap();

        session.complete_send("222222".to_string(), Utc::now()).unwrap();
        assert!(session.is_loading());
        assert_eq!(session.phase(), AuthPhase::OtpVerifying);

        assert!(session.complete_verify("111111").is_err());
        assert!(!session.is_loading());
        assert_eq!(session.phase(), AuthPhase::OtpPending);
    }
}

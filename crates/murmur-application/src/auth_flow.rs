//! OTP sign-in flow with simulated latency.
//!
//! [`AuthSession`] holds the state machine; this controller adds the send and
//! verify delays and makes sure a superseded call never applies its result.

use chrono::Utc;
use murmur_core::Result;
use murmur_core::auth::{AuthSession, AuthView, OtpGenerator};
use murmur_core::config::AuthConfig;
use murmur_core::event::SessionNotice;
use murmur_execution::Generation;
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast, watch};

pub struct AuthFlowController {
    session: Mutex<AuthSession>,
    view_tx: watch::Sender<AuthView>,
    notices: broadcast::Sender<SessionNotice>,
    otp: Arc<dyn OtpGenerator>,
    sends: Generation,
    verifies: Generation,
}

impl AuthFlowController {
    pub fn new(
        config: AuthConfig,
        otp: Arc<dyn OtpGenerator>,
        notices: broadcast::Sender<SessionNotice>,
    ) -> Self {
        let session = AuthSession::new(config);
        let (view_tx, _) = watch::channel(session.view());
        Self {
            session: Mutex::new(session),
            view_tx,
            notices,
            otp,
            sends: Generation::new(),
            verifies: Generation::new(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthView> {
        self.view_tx.subscribe()
    }

    pub fn view(&self) -> AuthView {
        self.view_tx.borrow().clone()
    }

    /// Runs `f` against the session and publishes the resulting view.
    async fn apply<R>(&self, f: impl FnOnce(&mut AuthSession) -> R) -> R {
        let mut session = self.session.lock().await;
        let result = f(&mut session);
        self.view_tx.send_replace(session.view());
        result
    }

    pub async fn submit_credentials(&self, phone: &str, country_code: &str) -> Result<()> {
        self.apply(|session| session.submit_credentials(phone, country_code))
            .await
    }

    /// Issues a challenge after the send delay. Calling again (resend)
    /// supersedes any send still in flight and replaces the live challenge.
    /// A send still in flight when sign-in succeeds issues nothing.
    pub async fn send_otp(&self) -> Result<()> {
        let (ticket, delay) = self
            .apply(|session| {
                session.begin_send()?;
                Ok::<_, murmur_core::SessionError>((self.sends.begin(), session.rules().send_delay()))
            })
            .await?;

        tokio::time::sleep(delay).await;

        let issued = {
            let mut session = self.session.lock().await;
            if !self.sends.is_current(ticket) {
                tracing::debug!(target: "auth_flow", "Superseded OTP send discarded");
                return Ok(());
            }

            let code = self.otp.generate(session.rules().otp_length);
            let outcome = session.complete_send(code.clone(), Utc::now()).map(|_| ());
            self.view_tx.send_replace(session.view());
            if let Err(err) = outcome {
                tracing::debug!(target: "auth_flow", error = %err, "Dropped");
                return Ok(());
            }

            SessionNotice::OtpIssued {
                phone: session.phone().to_string(),
                country_code: session.country_code().to_string(),
                code,
            }
        };

        tracing::info!(target: "auth_flow", "OTP issued");
        let _ = self.notices.send(issued);
        Ok(())
    }

    /// Checks `candidate` against the live challenge after the verify delay.
    ///
    /// Returns `SessionError::ChallengeMismatch` on a wrong code; the
    /// challenge stays live for another attempt.
    pub async fn verify_otp(&self, candidate: &str) -> Result<()> {
        let (ticket, delay) = self
            .apply(|session| {
                session.begin_verify(candidate)?;
                Ok::<_, murmur_core::SessionError>((
                    self.verifies.begin(),
                    session.rules().verify_delay(),
                ))
            })
            .await?;

        tokio::time::sleep(delay).await;

        let mut session = self.session.lock().await;
        if !self.verifies.is_current(ticket) {
            tracing::debug!(target: "auth_flow", "Superseded OTP verification discarded");
            return Ok(());
        }

        let outcome = session.complete_verify(candidate);
        self.view_tx.send_replace(session.view());

        match outcome {
            Ok(()) => {
                self.sends.invalidate();
                tracing::info!(target: "auth_flow", "Signed in");
                Ok(())
            }
            Err(err) if err.is_stale() => {
                tracing::debug!(target: "auth_flow", error = %err, "Dropped");
                Ok(())
            }
            Err(err) => {
                tracing::info!(target: "auth_flow", "OTP mismatch");
                Err(err)
            }
        }
    }

    /// Signs out and retires every send or verify still in flight.
    pub async fn logout(&self) {
        self.apply(|session| {
            self.sends.invalidate();
            self.verifies.invalidate();
            session.logout();
        })
        .await;
        tracing::info!(target: "auth_flow", "Signed out");
    }
}

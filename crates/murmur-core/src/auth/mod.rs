//! Phone-number OTP sign-in domain.
//!
//! - `model`: challenge, phase and observable view types
//! - `session`: the `AuthSession` state machine (no timers)
//! - `validation`: input shape checks
//! - `otp`: the `OtpGenerator` port

mod model;
mod otp;
mod session;
mod validation;

pub use model::{AuthPhase, AuthView, ChallengeStatus, Feedback, OtpChallenge};
pub use otp::OtpGenerator;
pub use session::{AuthSession, OTP_SENT, OTP_VERIFIED};
pub use validation::{validate_country_code, validate_otp_shape, validate_phone};

//! Simulated collaborators for the session engines.
//!
//! Nothing here talks to a network: replies come from a template table,
//! OTP codes are generated locally and country codes come from an
//! in-process directory.

pub mod country;
pub mod otp;
pub mod responder;

pub use country::{
    CountryCodeLookup, CountryDirectory, CountryOption, CountryRecord, StaticCountryDirectory,
    default_options,
};
pub use otp::RandomOtpGenerator;
pub use responder::{RESPONSE_TEMPLATES, SimulatedResponder};

/// Source of one-time passcodes.
///
/// Stands in for a real verification service: the code is generated and
/// compared locally.
pub trait OtpGenerator: Send + Sync {
    /// Returns a numeric code of exactly `length` digits.
    fn generate(&self, length: usize) -> String;
}

use murmur_core::auth::OtpGenerator;
use rand::Rng;

/// Draws codes uniformly from `10^(n-1)..=10^n - 1`, so they never start
/// with a zero. For the default length that is 100000..=999999.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomOtpGenerator;

impl OtpGenerator for RandomOtpGenerator {
    fn generate(&self, length: usize) -> String {
        let length = length.clamp(1, 18) as u32;
        let low = 10u64.pow(length - 1);
        let high = 10u64.pow(length) - 1;
        rand::thread_rng().gen_range(low..=high).to_string()
    }
}

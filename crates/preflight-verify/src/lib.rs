pub mod expectation;
pub mod verifier;

pub use expectation::{expectations, ScreenExpectation};
pub use verifier::{verify, ScreenMismatch, Verification, VerificationIssue};

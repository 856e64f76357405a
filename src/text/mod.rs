pub mod length;
pub mod normalize;

pub use length::{AppliedLengthMode, LengthMode, LengthPolicyResult, apply_length_policy};
pub use normalize::{basic_cleanup, normalize_text, normalize_transcript};

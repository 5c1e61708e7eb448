//! Parameter validation gate.
//!
//! The cache asks a [`ParameterValidator`] whether its required arguments
//! are present before touching the store. What "present" means beyond
//! "non-empty" belongs to the validator, not the cache.

/// Capability that checks required parameters.
pub trait ParameterValidator: Send + Sync {
    /// Returns true when every value is present.
    fn validate_required(&self, values: &[&str]) -> bool;
}

/// Default validator: every value must be non-empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequiredFieldValidator;

impl RequiredFieldValidator {
    pub fn new() -> Self {
        Self
    }
}

impl ParameterValidator for RequiredFieldValidator {
    fn validate_required(&self, values: &[&str]) -> bool {
        values.iter().all(|v| !v.is_empty())
    }
}

impl<F> ParameterValidator for F
where
    F: Fn(&[&str]) -> bool + Send + Sync,
{
    fn validate_required(&self, values: &[&str]) -> bool {
        self(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_required_field_validator() {
        let v = RequiredFieldValidator::new();
        assert!(v.validate_required(&["seq"]));
        assert!(v.validate_required(&["seq", "member"]));
        assert!(!v.validate_required(&[""]));
        assert!(!v.validate_required(&["seq", ""]));
        // Whitespace is not trimmed.
        assert!(v.validate_required(&[" "]));
    }

    #[test]
    fn test_closure_validator() {
        let reject_blank = |values: &[&str]| values.iter().all(|v| !v.trim().is_empty());
        assert!(!reject_blank.validate_required(&["  "]));
        assert!(reject_blank.validate_required(&["a"]));
    }

    proptest! {
        #[test]
        fn prop_nonempty_values_pass(values in prop::collection::vec("[a-z0-9]{1,8}", 0..5)) {
            let refs: Vec<&str> = values.iter().map(String::as_str).collect();
            prop_assert!(RequiredFieldValidator.validate_required(&refs));
        }
    }
}

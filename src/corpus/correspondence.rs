//! Key-set correspondence between the input and output image sets.

use std::collections::BTreeSet;

use crate::corpus::ImageKey;
use crate::error::{Error, Result};

/// Check that two key sets are exactly equal.
///
/// On mismatch the error carries the symmetric difference, each side sorted:
/// keys only in `input` are reported as missing from the output, and keys
/// only in `output` as missing from the input. Two empty sets are equal.
pub fn validate(input: &BTreeSet<ImageKey>, output: &BTreeSet<ImageKey>) -> Result<()> {
    if input == output {
        return Ok(());
    }

    let missing_from_output: Vec<ImageKey> = input.difference(output).cloned().collect();
    let missing_from_input: Vec<ImageKey> = output.difference(input).cloned().collect();

    Err(Error::Correspondence {
        missing_from_output,
        missing_from_input,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(names: &[&str]) -> BTreeSet<ImageKey> {
        names.iter().map(|n| ImageKey::from(*n)).collect()
    }

    #[test]
    fn test_equal_sets_pass() {
        let a = keys(&["low_001", "low_002"]);
        assert!(validate(&a, &a.clone()).is_ok());
    }

    #[test]
    fn test_empty_sets_pass() {
        assert!(validate(&BTreeSet::new(), &BTreeSet::new()).is_ok());
    }

    #[test]
    fn test_strict_subset_reports_exactly_missing_keys() {
        let input = keys(&["a_1", "b_2", "c_3", "d_4"]);
        let output = keys(&["a_1", "c_3"]);

        match validate(&input, &output) {
            Err(Error::Correspondence {
                missing_from_output,
                missing_from_input,
            }) => {
                assert_eq!(missing_from_output, vec![ImageKey::from("b_2"), ImageKey::from("d_4")]);
                assert!(missing_from_input.is_empty());
            }
            other => panic!("expected correspondence error, got {other:?}"),
        }
    }

    #[test]
    fn test_symmetric_difference_both_sides() {
        let input = keys(&["a_1", "b_2"]);
        let output = keys(&["b_2", "z_9"]);

        match validate(&input, &output) {
            Err(Error::Correspondence {
                missing_from_output,
                missing_from_input,
            }) => {
                assert_eq!(missing_from_output, vec![ImageKey::from("a_1")]);
                assert_eq!(missing_from_input, vec![ImageKey::from("z_9")]);
            }
            other => panic!("expected correspondence error, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_output_reports_all_input_keys() {
        let input = keys(&["a_1", "b_2"]);
        let err = validate(&input, &BTreeSet::new()).unwrap_err();
        assert!(err.to_string().contains("[a_1, b_2]"));
    }
}

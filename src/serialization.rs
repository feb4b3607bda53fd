// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::errors::ProtocolError;

pub(crate) fn serialize(input: &[u8], max_bytes: usize) -> Vec<u8> {
    let mut output: Vec<u8> = Vec::new();
    output.extend_from_slice(&input.len().to_be_bytes()[8 - max_bytes..]);
    output.extend_from_slice(input);
    output
}

pub(crate) fn tokenize(input: &[u8], size_bytes: usize) -> Result<(Vec<u8>, Vec<u8>), ProtocolError> {
    if size_bytes > 8 || input.len() < size_bytes {
        return Err(ProtocolError::SerializationError);
    }

    let mut size_array = [0u8; 8];
    size_array[8 - size_bytes..].copy_from_slice(&input[..size_bytes]);
    let size = usize::from_be_bytes(size_array);

    if size_bytes + size > input.len() {
        return Err(ProtocolError::SerializationError);
    }

    Ok((
        input[size_bytes..size_bytes + size].to_vec(),
        input[size_bytes + size..].to_vec(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn serialize_tokenize_round_trip(
            first in prop::collection::vec(any::<u8>(), 0..200),
            second in prop::collection::vec(any::<u8>(), 0..200),
        ) {
            let bytes = [serialize(&first, 2), serialize(&second, 2)].concat();
            let (token, remainder) = tokenize(&bytes, 2).unwrap();
            prop_assert_eq!(token, first);
            let (token, remainder) = tokenize(&remainder, 2).unwrap();
            prop_assert_eq!(token, second);
            prop_assert!(remainder.is_empty());
        }
    }

    #[test]
    fn tokenize_rejects_truncated_input() {
        assert!(tokenize(&[], 2).is_err());
        assert!(tokenize(&[0], 2).is_err());
        // Length prefix promises more bytes than are present
        assert!(tokenize(&[0, 5, 1, 2], 2).is_err());
    }
}

//! Proptest generators for property-based testing.

use proptest::prelude::*;

use bitsign_core::layout::{BLOCK0_RESERVED_HIGH, BLOCK0_RESERVED_LOW, BLOCK1_RESERVED};

/// Content types of the built-in `PAC_CARD` family.
pub const PAC_CARD_TYPES: [&str; 3] = ["BBS", "BMC_FW", "GBS"];

/// Payload of 1 to `max_blocks` whole 128-byte blocks.
pub fn aligned_payload(max_blocks: usize) -> impl Strategy<Value = Vec<u8>> {
    (1..=max_blocks).prop_flat_map(|blocks| prop::collection::vec(any::<u8>(), blocks * 128))
}

/// Raw payload of 1 to `max_len` bytes, not necessarily aligned.
pub fn raw_payload(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..=max_len)
}

/// A `PAC_CARD` content type, in upper or lower case.
pub fn pac_card_type() -> impl Strategy<Value = String> {
    (prop::sample::select(PAC_CARD_TYPES.to_vec()), any::<bool>()).prop_map(|(name, lower)| {
        if lower {
            name.to_ascii_lowercase()
        } else {
            name.to_string()
        }
    })
}

/// Header offset inside one of the `PAC_CARD` reserved ranges.
pub fn reserved_offset() -> impl Strategy<Value = usize> {
    prop_oneof![BLOCK0_RESERVED_LOW, BLOCK0_RESERVED_HIGH, BLOCK1_RESERVED]
}

/// A byte that is never zero.
pub fn nonzero_byte() -> impl Strategy<Value = u8> {
    1u8..=255u8
}

/// Inputs for framing one bitstream.
#[derive(Debug, Clone)]
pub struct BitstreamParams {
    pub payload: Vec<u8>,
    pub content_type: String,
}

impl Arbitrary for BitstreamParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (aligned_payload(8), pac_card_type())
            .prop_map(|(payload, content_type)| BitstreamParams {
                payload,
                content_type,
            })
            .boxed()
    }
}

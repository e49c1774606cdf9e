use core::iter::zip;

use md5::{Digest, Md5};

use super::HeaderInfo;

/// MD5 hash output size, in bytes.
const MD5_OUTPUT_SIZE: usize = 16;

fn xor_slices(output: &mut [u8], pseudo_pad: &[u8]) {
    for (out, pad) in zip(output, pseudo_pad) {
        *out ^= pad;
    }
}

/// (Un)obfuscates a packet body in place, as specified in [RFC8907 section 4.5].
///
/// The operation is its own inverse, so the same function is used in both directions.
///
/// [RFC8907 section 4.5]: https://www.rfc-editor.org/rfc/rfc8907.html#name-data-obfuscation
pub(super) fn xor_pseudo_pad(header: &HeaderInfo, secret: &[u8], body: &mut [u8]) {
    // prehash common prefix for all hash invocations
    // prefix: session id -> key -> version -> sequence number
    let mut prefix_hasher = Md5::new();
    prefix_hasher.update(header.session_id().to_be_bytes());
    prefix_hasher.update(secret);
    prefix_hasher.update([u8::from(header.version()), header.sequence_number()]);

    let mut pseudo_pad = [0; MD5_OUTPUT_SIZE];

    for (index, chunk) in body.chunks_mut(MD5_OUTPUT_SIZE).enumerate() {
        let mut hasher = prefix_hasher.clone();

        // every chunk after the first also hashes the previous pad chunk
        if index > 0 {
            hasher.update(pseudo_pad);
        }

        hasher.finalize_into((&mut pseudo_pad).into());
        xor_slices(chunk, &pseudo_pad);
    }
}

//! Row-stride copy between pixel buffers
//!
//! Every sub-rectangle extraction in the copy engine funnels through
//! [`copy_rows`]: copy `row_bytes` from each source row into each
//! destination row, then step past `src_skew` and `dst_skew` extra bytes.

/// Copies `rows` rows of `row_bytes` bytes from `src` into `dst`
///
/// After each row the source advances by `row_bytes + src_skew` bytes and the
/// destination by `row_bytes + dst_skew`. Both slices start at the first byte
/// to copy.
pub fn copy_rows(
    dst: &mut [u8],
    src: &[u8],
    rows: usize,
    row_bytes: usize,
    dst_skew: usize,
    src_skew: usize,
) {
    let dst_stride = row_bytes + dst_skew;
    let src_stride = row_bytes + src_skew;

    for row in 0..rows {
        let d = row * dst_stride;
        let s = row * src_stride;
        dst[d..d + row_bytes].copy_from_slice(&src[s..s + row_bytes]);
    }
}

/// Byte span of `count` pixels starting at pixel `first`
pub fn pixel_span(first: u32, count: u32, pixel_bytes: usize) -> (usize, usize) {
    (first as usize * pixel_bytes, count as usize * pixel_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_sub_rectangle_with_skews() {
        // 4x3 source of 2-byte pixels, copy the 2x2 block at (1,1)
        let src: Vec<u8> = (0..24).collect();
        let mut dst = vec![0u8; 3 * 2 * 2];
        let (start, len) = pixel_span(1, 2, 2);

        copy_rows(&mut dst, &src[8 + start..], 2, len, 2, 8 - len);

        assert_eq!(dst, vec![10, 11, 12, 13, 0, 0, 18, 19, 20, 21, 0, 0]);
    }

    #[test]
    fn test_zero_rows_is_a_no_op() {
        let mut dst = vec![7u8; 4];
        copy_rows(&mut dst, &[], 0, 4, 0, 0);
        assert_eq!(dst, vec![7u8; 4]);
    }
}

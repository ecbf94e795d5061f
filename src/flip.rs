use crate::error::VolumeError;

/// Reverse the row order of every slice of a packed volume, in place.
///
/// `buffer` must hold exactly `slices` slices of `rows` rows of
/// `bytes_per_row` bytes. Row `i` is swapped with row `rows - 1 - i`
/// through one scratch row; the middle row of an odd row count stays put.
///
/// # Errors
///
/// [`VolumeError::GeometryInconsistency`] if the buffer length does not
/// match the layout
pub fn flip_rows_in_place(
    buffer: &mut [u8],
    bytes_per_row: usize,
    rows: usize,
    slices: usize,
) -> Result<(), VolumeError> {
    let expected = bytes_per_row
        .checked_mul(rows)
        .and_then(|len| len.checked_mul(slices));
    if expected != Some(buffer.len()) {
        return Err(VolumeError::GeometryInconsistency(format!(
            "buffer of {} bytes does not hold {slices} slices of {rows} rows of {bytes_per_row} bytes",
            buffer.len()
        )));
    }
    if rows < 2 || bytes_per_row == 0 {
        return Ok(());
    }

    let half = rows / 2;
    let middle = (rows - 2 * half) * bytes_per_row;
    let mut scratch = vec![0u8; bytes_per_row];

    for slice in buffer.chunks_exact_mut(bytes_per_row * rows) {
        let (top, rest) = slice.split_at_mut(half * bytes_per_row);
        let bottom = &mut rest[middle..];
        for (upper, lower) in top
            .chunks_exact_mut(bytes_per_row)
            .zip(bottom.rchunks_exact_mut(bytes_per_row))
        {
            scratch.copy_from_slice(lower);
            lower.copy_from_slice(upper);
            upper.copy_from_slice(&scratch);
        }
    }
    Ok(())
}

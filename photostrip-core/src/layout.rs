use crate::error::{CollageError, CollageResult};

/// A horizontal slice of the canvas assigned to one source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Band {
    /// Position of the owning image in the input sequence.
    pub index: usize,
    /// First canvas row covered by this band.
    pub top: u32,
    pub height: u32,
}

impl Band {
    /// One past the last canvas row covered by this band.
    pub fn bottom(&self) -> u32 {
        self.top + self.height
    }
}

/// Split a canvas of `side` rows into `count` stacked bands.
///
/// Every band is `side / count` rows high except the last one, which absorbs the
/// remainder of the division so the heights always add up to `side`.
pub fn band_layout(side: u32, count: usize) -> CollageResult<Vec<Band>> {
    if count == 0 {
        return Err(CollageError::EmptyInput);
    }

    let n = match u32::try_from(count) {
        Ok(n) if n <= side => n,
        _ => return Err(CollageError::TooManyImages { count, side }),
    };

    let base = side / n;
    let bands = (0..n)
        .map(|i| {
            let height = if i == n - 1 { side - base * (n - 1) } else { base };
            Band {
                index: i as usize,
                top: base * i,
                height,
            }
        })
        .collect();

    Ok(bands)
}

/// Check that `bands` tile `side` rows exactly, in order, without gaps.
pub(crate) fn check_layout(side: u32, bands: &[Band]) -> CollageResult<()> {
    let mut cursor = 0u32;
    for (i, band) in bands.iter().enumerate() {
        if band.index != i {
            return Err(CollageError::invariant(format!(
                "band {} is stored at position {}",
                band.index, i
            )));
        }
        if band.top != cursor {
            return Err(CollageError::invariant(format!(
                "band {} starts at row {}, expected {}",
                i, band.top, cursor
            )));
        }
        if band.height == 0 {
            return Err(CollageError::invariant(format!("band {} is empty", i)));
        }
        cursor = band.bottom();
    }

    if cursor != side {
        return Err(CollageError::invariant(format!(
            "bands cover {} rows of a {} row canvas",
            cursor, side
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heights(bands: &[Band]) -> Vec<u32> {
        bands.iter().map(|b| b.height).collect()
    }

    fn tops(bands: &[Band]) -> Vec<u32> {
        bands.iter().map(|b| b.top).collect()
    }

    #[test]
    fn three_bands_on_1080() {
        let bands = band_layout(1080, 3).unwrap();
        assert_eq!(tops(&bands), vec![0, 360, 720]);
        assert_eq!(heights(&bands), vec![360, 360, 360]);
    }

    #[test]
    fn two_bands_on_1080() {
        let bands = band_layout(1080, 2).unwrap();
        assert_eq!(tops(&bands), vec![0, 540]);
        assert_eq!(heights(&bands), vec![540, 540]);
    }

    #[test]
    fn four_bands_on_1080() {
        let bands = band_layout(1080, 4).unwrap();
        assert_eq!(tops(&bands), vec![0, 270, 540, 810]);
        assert_eq!(heights(&bands), vec![270, 270, 270, 270]);
    }

    #[test]
    fn last_band_absorbs_remainder() {
        let bands = band_layout(100, 3).unwrap();
        assert_eq!(tops(&bands), vec![0, 33, 66]);
        assert_eq!(heights(&bands), vec![33, 33, 34]);

        let bands = band_layout(1080, 7).unwrap();
        assert_eq!(bands[..6].iter().map(|b| b.height).sum::<u32>(), 6 * 154);
        assert_eq!(bands[6].height, 1080 - 154 * 6);
    }

    #[test]
    fn single_band_covers_the_canvas() {
        let bands = band_layout(1080, 1).unwrap();
        assert_eq!(
            bands,
            vec![Band {
                index: 0,
                top: 0,
                height: 1080
            }]
        );
    }

    #[test]
    fn heights_always_sum_to_side() {
        for side in 1..=96u32 {
            for count in 1..=side as usize {
                let bands = band_layout(side, count).unwrap();
                assert_eq!(bands.len(), count);
                assert_eq!(heights(&bands).iter().sum::<u32>(), side);
                check_layout(side, &bands).unwrap();
            }
        }
    }

    #[test]
    fn empty_input_is_rejected_before_dividing() {
        assert!(matches!(band_layout(1080, 0), Err(CollageError::EmptyInput)));
        assert!(matches!(band_layout(0, 0), Err(CollageError::EmptyInput)));
    }

    #[test]
    fn more_images_than_rows_is_rejected() {
        let err = band_layout(4, 5).unwrap_err();
        assert!(matches!(
            err,
            CollageError::TooManyImages { count: 5, side: 4 }
        ));
        assert!(band_layout(0, 1).is_err());
    }

    #[test]
    fn check_layout_flags_gaps_and_short_coverage() {
        let gap = vec![
            Band { index: 0, top: 0, height: 4 },
            Band { index: 1, top: 5, height: 5 },
        ];
        assert!(matches!(
            check_layout(10, &gap),
            Err(CollageError::InvariantViolation(_))
        ));

        let short = vec![Band { index: 0, top: 0, height: 9 }];
        assert!(matches!(
            check_layout(10, &short),
            Err(CollageError::InvariantViolation(_))
        ));
    }
}

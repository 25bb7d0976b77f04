//! Global binarization.

/// Intensity histogram of an 8-bit image or sample set.
#[derive(Clone, Debug)]
pub struct Histogram {
    bins: [u32; 256],
    total: u64,
}

impl Histogram {
    pub fn from_samples(samples: &[u8]) -> Self {
        let mut bins = [0u32; 256];
        for &v in samples {
            bins[v as usize] += 1;
        }
        Self {
            bins,
            total: samples.len() as u64,
        }
    }

    pub fn count(&self, value: u8) -> u32 {
        self.bins[value as usize]
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Lowest and highest populated levels.
    pub fn range(&self) -> Option<(u8, u8)> {
        let lo = self.bins.iter().position(|&c| c > 0)?;
        let hi = self.bins.iter().rposition(|&c| c > 0)?;
        Some((lo as u8, hi as u8))
    }

    /// Otsu split: levels `<= t` form the dark class.
    ///
    /// Empty histograms give 127, a single level gives that level and two
    /// levels give their midpoint.
    pub fn otsu_threshold(&self) -> u8 {
        let Some((lo, hi)) = self.range() else {
            return 127;
        };
        if lo == hi {
            return lo;
        }
        if self.bins.iter().filter(|&&c| c > 0).count() == 2 {
            return ((lo as u16 + hi as u16) / 2) as u8;
        }

        let n = self.total as f64;
        let weighted_total: u64 = self
            .bins
            .iter()
            .enumerate()
            .map(|(v, &c)| v as u64 * c as u64)
            .sum();

        // between-class variance, up to the constant factor 1/n^2:
        // (n * S_dark - S * N_dark)^2 / (N_dark * N_light)
        let mut dark_count = 0u64;
        let mut dark_weighted = 0u64;
        let mut best = (lo, f64::MIN);
        for t in lo..hi {
            let c = self.bins[t as usize] as u64;
            dark_count += c;
            dark_weighted += t as u64 * c;
            let light_count = self.total - dark_count;

            let spread = n * dark_weighted as f64 - weighted_total as f64 * dark_count as f64;
            let score = spread * spread / (dark_count as f64 * light_count as f64);
            if score > best.1 {
                best = (t, score);
            }
        }
        best.0
    }
}

/// Otsu threshold over a set of 8-bit samples; see [`Histogram::otsu_threshold`].
pub fn otsu_threshold(samples: &[u8]) -> u8 {
    Histogram::from_samples(samples).otsu_threshold()
}

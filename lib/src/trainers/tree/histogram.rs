//! Quantile binning and histogram split search.
//!
//! Each feature is cut into at most `max_bin` bins before boosting starts.
//! A bin is described by the largest raw value it holds, so a split after
//! bin `b` is the raw-value test `x <= upper[b]` and the grower can partition
//! rows without looking at bins at all.

use ndarray::{ArrayView1, ArrayView2};

use super::boosting::{split_gain, SplitCandidate, SplitFinder};

/// Bin boundaries of one feature.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct BinMapper {
    /// Inclusive upper bound of every bin except the last, ascending.
    upper: Vec<f32>,
}

impl BinMapper {
    /// Cut `values` into at most `max_bin` bins of roughly equal counts.
    pub(crate) fn fit(values: ArrayView1<'_, f32>, max_bin: usize) -> Self {
        let mut sorted: Vec<f32> = values.iter().copied().filter(|v| v.is_finite()).collect();
        sorted.sort_by(f32::total_cmp);

        let mut distinct = sorted.clone();
        distinct.dedup();

        let mut upper = if distinct.len() <= max_bin {
            distinct
        } else {
            let n = sorted.len();
            let mut cuts: Vec<f32> = (1..max_bin).map(|b| sorted[b * n / max_bin - 1]).collect();
            cuts.dedup();
            cuts
        };
        // the largest value belongs to the last, unbounded bin
        if let (Some(&last), Some(&max)) = (upper.last(), sorted.last()) {
            if last >= max {
                upper.pop();
            }
        }
        Self { upper }
    }

    pub(crate) fn n_bins(&self) -> usize {
        self.upper.len() + 1
    }

    pub(crate) fn bin(&self, value: f32) -> usize {
        if value.is_nan() {
            return self.upper.len();
        }
        self.upper.partition_point(|&u| u < value)
    }

    pub(crate) fn upper_bound(&self, bin: usize) -> f32 {
        self.upper[bin]
    }
}

/// Pre-binned features, column-major.
pub(crate) struct HistogramSplitFinder {
    mappers: Vec<BinMapper>,
    bins: Vec<Vec<u32>>,
}

impl HistogramSplitFinder {
    pub(crate) fn new(features: ArrayView2<'_, f32>, max_bin: usize) -> Self {
        let (mappers, bins): (Vec<BinMapper>, Vec<Vec<u32>>) = features
            .columns()
            .into_iter()
            .map(|column| {
                let mapper = BinMapper::fit(column, max_bin);
                let bins: Vec<u32> = column.iter().map(|&v| mapper.bin(v) as u32).collect();
                (mapper, bins)
            })
            .unzip();
        Self { mappers, bins }
    }
}

impl SplitFinder for HistogramSplitFinder {
    fn find(&self, rows: &[usize], residuals: &[f64], min_leaf: usize) -> Option<SplitCandidate> {
        let n = rows.len();
        if n < 2 * min_leaf {
            return None;
        }
        let total: f64 = rows.iter().map(|&r| residuals[r]).sum();
        let mut best: Option<SplitCandidate> = None;

        for (feature, (mapper, bins)) in self.mappers.iter().zip(&self.bins).enumerate() {
            let n_bins = mapper.n_bins();
            if n_bins < 2 {
                continue;
            }
            let mut sums = vec![0.0f64; n_bins];
            let mut counts = vec![0usize; n_bins];
            for &r in rows {
                let b = bins[r] as usize;
                sums[b] += residuals[r];
                counts[b] += 1;
            }

            let mut left = 0.0;
            let mut n_left = 0;
            for b in 0..n_bins - 1 {
                left += sums[b];
                n_left += counts[b];
                if counts[b] == 0 || n_left < min_leaf || n - n_left < min_leaf {
                    continue;
                }
                let gain = split_gain(left, n_left, total, n);
                if best.map_or(true, |c| gain > c.gain) {
                    best = Some(SplitCandidate {
                        feature,
                        threshold: mapper.upper_bound(b),
                        gain,
                    });
                }
            }
        }
        best.filter(|b| b.gain > 0.0)
    }
}

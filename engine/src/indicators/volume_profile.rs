// Volume profile over close prices and its point of control (POC)

#[derive(Debug, Clone, PartialEq)]
pub struct VolumeProfileResult {
    pub min_price: f64,
    pub max_price: f64,
    pub bin_volumes: Vec<f64>,
    pub poc_bin: usize,
    pub poc: f64,
}

pub struct VolumeProfile {
    bins: usize,
}

impl VolumeProfile {
    pub fn new(bins: usize) -> Self {
        Self { bins }
    }

    /// Buckets every close into one of `bins` equal-width price bins over
    /// `[min, max]` and accumulates its volume there. The POC is the midpoint
    /// price of the heaviest bin (lowest bin wins ties). Only the common prefix
    /// of `values` and `volumes` is used.
    pub fn compute(&self, values: &[f64], volumes: &[f64]) -> Option<VolumeProfileResult> {
        let n = values.len().min(volumes.len());
        if n == 0 || self.bins == 0 {
            return None;
        }
        let closes = &values[..n];

        let min_price = closes.iter().copied().fold(f64::INFINITY, f64::min);
        let max_price = closes.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let width = (max_price - min_price) / self.bins as f64;

        let mut bin_volumes = vec![0.0; self.bins];
        for (close, volume) in closes.iter().zip(volumes.iter()) {
            let bin = if width > 0.0 {
                (((close - min_price) / width) as usize).min(self.bins - 1)
            } else {
                0
            };
            bin_volumes[bin] += volume;
        }

        let mut poc_bin = 0;
        for (i, volume) in bin_volumes.iter().enumerate() {
            if *volume > bin_volumes[poc_bin] {
                poc_bin = i;
            }
        }
        let poc = if width > 0.0 {
            min_price + (poc_bin as f64 + 0.5) * width
        } else {
            min_price
        };

        Some(VolumeProfileResult {
            min_price,
            max_price,
            bin_volumes,
            poc_bin,
            poc,
        })
    }
}

impl Default for VolumeProfile {
    fn default() -> Self {
        Self::new(20)
    }
}

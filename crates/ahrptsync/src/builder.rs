use crate::sync::ViterbiSync;

/// Builds a Viterbi synchronizer
///
/// The builder comes with a sensible set of default options.
/// The defaults were chosen for the rate 3/4 punctured
/// downlink at moderate signal levels, and you may wish to
/// tweak some of these values.
///
/// ```
/// use ahrptsync::ViterbiSyncBuilder;
///
/// let sync = ViterbiSyncBuilder::new()
///     .with_ber_threshold(0.15)     // lock when BER falls below this
///     .with_outsync_after(3)        // bad measurements before re-acquiring
///     .build();
/// assert_eq!(sync.ber_threshold(), 0.15);
/// ```
///
/// The API specified by the builder is part of this crate's
/// API. The actual default values are *not*, however, and
/// are subject to revision in any minor release. If you
/// care very strongly about a setting, be sure to configure
/// it here.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct ViterbiSyncBuilder {
    sync_check: bool,
    ber_threshold: f32,
    insync_after: u32,
    outsync_after: u32,
    reset_after: u32,
    code_rate: f32,
    ebn0_db: f32,
}

impl ViterbiSyncBuilder {
    /// New synchronizer with "sensible" defaults
    pub fn new() -> Self {
        Self {
            sync_check: true,
            ber_threshold: 0.17f32,
            insync_after: 1,
            outsync_after: 5,
            reset_after: 50,
            code_rate: 0.75f32,
            ebn0_db: 5.0f32,
        }
    }

    /// Build a synchronizer
    ///
    /// Once built, the synchronizer is idle and immediately
    /// ready to process samples.
    pub fn build(&self) -> ViterbiSync {
        ViterbiSync::from(self)
    }

    /// Monitor the sync while decoding
    ///
    /// When enabled, the bit error rate of the locked
    /// hypothesis is re-measured on every chunk, and too many
    /// consecutive bad measurements drop the sync. When
    /// disabled, the synchronizer never leaves sync once it
    /// has acquired it.
    pub fn with_sync_check(&mut self, enable: bool) -> &mut Self {
        self.sync_check = enable;
        self
    }

    /// Bit error rate threshold
    ///
    /// A hypothesis whose re-encoded bit error rate is below
    /// `ber` is accepted during acquisition. While in sync,
    /// measurements above `ber` count against the sync.
    ///
    /// A wrong hypothesis produces a bit error rate of
    /// roughly 0.2 to 0.25, and a correct one scales with the
    /// channel error rate. Values are clamped to
    /// `[0.0, 0.5]`. A NaN restores the default.
    pub fn with_ber_threshold(&mut self, ber: f32) -> &mut Self {
        self.ber_threshold = if ber.is_nan() {
            Self::new().ber_threshold
        } else {
            f32::clamp(ber, 0.0, 0.5)
        };
        self
    }

    /// Good measurements before sync is declared
    ///
    /// This value is reported but does not presently affect
    /// acquisition, which locks on the first good
    /// measurement.
    pub fn with_insync_after(&mut self, count: u32) -> &mut Self {
        self.insync_after = count;
        self
    }

    /// Bad measurements before sync is dropped
    ///
    /// While in sync, the synchronizer returns to acquisition
    /// after more than `count` consecutive chunks with a bit
    /// error rate above the threshold. A single good chunk
    /// clears the count.
    pub fn with_outsync_after(&mut self, count: u32) -> &mut Self {
        self.outsync_after = count;
        self
    }

    /// Reset interval
    ///
    /// This value is reported but does not presently affect
    /// the synchronizer.
    pub fn with_reset_after(&mut self, count: u32) -> &mut Self {
        self.reset_after = count;
        self
    }

    /// Channel model for the branch metrics
    ///
    /// The soft-decision metrics are designed for a channel
    /// with the given `code_rate` and Eb/N0, in dB. The
    /// defaults match the punctured downlink. Code rates are
    /// clamped to `[0.01, 1.0]`.
    pub fn with_channel_model(&mut self, code_rate: f32, ebn0_db: f32) -> &mut Self {
        self.code_rate = f32::clamp(code_rate, 0.01, 1.0);
        self.ebn0_db = ebn0_db;
        self
    }

    /// Monitor the sync while decoding
    pub fn sync_check(&self) -> bool {
        self.sync_check
    }

    /// Bit error rate threshold
    pub fn ber_threshold(&self) -> f32 {
        self.ber_threshold
    }

    /// Good measurements before sync is declared
    pub fn insync_after(&self) -> u32 {
        self.insync_after
    }

    /// Bad measurements before sync is dropped
    pub fn outsync_after(&self) -> u32 {
        self.outsync_after
    }

    /// Reset interval
    pub fn reset_after(&self) -> u32 {
        self.reset_after
    }

    /// Channel model
    ///
    /// Returns the `(code_rate, ebn0_db)` for which the
    /// branch metrics are designed.
    pub fn channel_model(&self) -> (f32, f32) {
        (self.code_rate, self.ebn0_db)
    }
}

impl std::default::Default for ViterbiSyncBuilder {
    fn default() -> Self {
        Self::new()
    }
}

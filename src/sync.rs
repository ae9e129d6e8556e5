//! AW/EAW timing: the local notion of "current AW", corrected against
//! master advertisements.

/// Exactly 1024 microseconds, the IEEE 802.11 Time Unit.
pub const TU_US: u64 = 1024;

pub fn usec_to_tu(us: u64) -> u64 {
    us / TU_US
}

pub fn tu_to_usec(tu: u64) -> u64 {
    tu * TU_US
}

/// `{aw_counter, last_update, aw_period (TU), presence_mode}` plus running
/// sync-quality counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncState {
    pub aw_counter: u16,
    pub last_update_us: u64,
    pub aw_period_tu: u16,
    pub presence_mode: u16,
    pub meas_err: u64,
    pub meas_total: u64,
}

/// Sync-error readings whose absolute value exceeds this many TU count as
/// a miss against `meas_err`.
pub const SYNC_ERROR_THRESHOLD_TU: i64 = 3;

impl SyncState {
    pub fn new() -> Self {
        SyncState {
            aw_counter: 0,
            last_update_us: 0,
            aw_period_tu: 16,
            presence_mode: 4,
            meas_err: 0,
            meas_total: 0,
        }
    }

    /// Length of one Extended AW, in TU.
    pub fn eaw_len_tu(&self) -> u64 {
        self.presence_mode as u64 * self.aw_period_tu as u64
    }

    fn delta_tu(&self, now_us: u64) -> u64 {
        usec_to_tu(now_us.saturating_sub(self.last_update_us))
    }

    /// TU remaining until the next AW boundary. Always in `(0, E]`.
    pub fn next_aw_tu(&self, now_us: u64) -> u64 {
        let e = self.eaw_len_tu();
        e - (self.delta_tu(now_us) % e)
    }

    /// Microsecond equivalent of [`Self::next_aw_tu`].
    pub fn next_aw_us(&self, now_us: u64) -> u64 {
        tu_to_usec(self.next_aw_tu(now_us))
    }

    /// The current AW index, truncated to `u16` as on the wire.
    pub fn current_aw(&self, now_us: u64) -> u16 {
        let e = self.eaw_len_tu();
        let a = self.aw_period_tu as u64;
        let p = self.presence_mode as u64;
        let delta = self.delta_tu(now_us);
        let v = self.aw_counter as u64 + ((delta % e) / a) + p * (delta / e);
        v as u16
    }

    /// The current Extended AW index.
    pub fn current_eaw(&self, now_us: u64) -> u16 {
        self.current_aw(now_us) / self.presence_mode
    }

    /// Signed sync error, in TU, between our notion of the schedule and a
    /// master's advertised `(time_to_next_aw, aw_counter)`.
    pub fn sync_error_tu(&self, now_us: u64, master_ttna_tu: u64, master_ctr: u16) -> i64 {
        let e = self.eaw_len_tu() as i64;
        let p = self.presence_mode as i64;
        let current_eaw = self.current_eaw(now_us) as i64;
        let next = self.next_aw_tu(now_us) as i64;
        ((master_ctr as i64 / p - current_eaw) * e) - (master_ttna_tu as i64 - next)
    }

    /// Re-anchor local timing to a master's advertised schedule, bumping
    /// the running sync-quality counters.
    pub fn update_last(&mut self, now_us: u64, master_ttna_tu: u64, master_ctr: u16) {
        let err = self.sync_error_tu(now_us, master_ttna_tu, master_ctr);
        self.meas_total += 1;
        if err.abs() > SYNC_ERROR_THRESHOLD_TU {
            self.meas_err += 1;
        }

        let e = self.eaw_len_tu();
        self.last_update_us = now_us - tu_to_usec(e - master_ttna_tu);
        self.aw_counter = master_ctr & 0xFFFC;
    }
}

impl Default for SyncState {
    fn default() -> Self {
        Self::new()
    }
}

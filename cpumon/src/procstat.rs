// Copyright (C) 2025 Category Labs, Inc.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! `/proc/stat` line classification and usage arithmetic.

/// Number of time counters on a `cpuN` line.
pub const CPU_FIELDS: usize = 10;

/// Jiffy counters of one core, in `/proc/stat` column order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
    pub guest: u64,
    pub guest_nice: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcLine {
    /// The aggregate `cpu` line.
    Summary,
    /// A `cpuN` line.
    Core(CpuTimes),
    /// Any line that does not start with `cpu`.
    Unrelated,
    /// A `cpuN` line without a single readable counter.
    Malformed,
}

impl From<[u64; CPU_FIELDS]> for CpuTimes {
    fn from(fields: [u64; CPU_FIELDS]) -> Self {
        let [user, nice, system, idle, iowait, irq, softirq, steal, guest, guest_nice] = fields;
        CpuTimes {
            user,
            nice,
            system,
            idle,
            iowait,
            irq,
            softirq,
            steal,
            guest,
            guest_nice,
        }
    }
}

impl CpuTimes {
    /// `(busy, idle)` jiffies. Guest time is already part of `user`.
    pub fn busy_idle(&self) -> (u64, u64) {
        let idle = self.idle.saturating_add(self.iowait);
        let busy = [self.nice, self.system, self.irq, self.softirq, self.steal]
            .into_iter()
            .fold(self.user, u64::saturating_add);
        (busy, idle)
    }

    pub fn total(&self) -> u64 {
        let (busy, idle) = self.busy_idle();
        busy.saturating_add(idle)
    }
}

/// Usage in percent between two samples of the same core.
///
/// Counters that went backwards count as no progress; an interval without
/// progress reports 0.
pub fn usage(previous: &CpuTimes, current: &CpuTimes) -> f64 {
    let (_, previous_idle) = previous.busy_idle();
    let (_, current_idle) = current.busy_idle();

    let total = current.total().saturating_sub(previous.total());
    let idle = current_idle.saturating_sub(previous_idle).min(total);
    if total == 0 {
        return 0.0;
    }
    100.0 * (total - idle) as f64 / total as f64
}

pub fn parse_line(line: &str) -> ProcLine {
    let Some(rest) = line.strip_prefix("cpu") else {
        return ProcLine::Unrelated;
    };
    if !rest.starts_with(|c: char| c.is_ascii_digit()) {
        return ProcLine::Summary;
    }

    let mut fields = [0u64; CPU_FIELDS];
    let mut parsed = 0;
    for (slot, token) in fields.iter_mut().zip(rest.split_ascii_whitespace().skip(1)) {
        match token.parse() {
            Ok(value) => {
                *slot = value;
                parsed += 1;
            }
            Err(_) => break,
        }
    }

    if parsed == 0 {
        return ProcLine::Malformed;
    }
    ProcLine::Core(CpuTimes::from(fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    const CORE_LINE: &str = "cpu3 4705 356 584 3699176 23060 0 277 0 0 0";

    #[rstest]
    #[case("intr 114930548 113199788 3 0 5 263 0 4 [...]", ProcLine::Unrelated)]
    #[case("ctxt 1990473", ProcLine::Unrelated)]
    #[case("", ProcLine::Unrelated)]
    #[case("cpu  2255 34 2290 22625563 6290 127 456 0 0 0", ProcLine::Summary)]
    #[case("cpu", ProcLine::Summary)]
    #[case("cpu0", ProcLine::Malformed)]
    #[case("cpu0 abc 1 2", ProcLine::Malformed)]
    fn test_line_classification(#[case] line: &str, #[case] expected: ProcLine) {
        assert_eq!(parse_line(line), expected);
    }

    #[rstest]
    fn test_core_line_fields() {
        let ProcLine::Core(times) = parse_line(CORE_LINE) else {
            panic!("expected a core line");
        };

        assert_eq!(times.user, 4705);
        assert_eq!(times.idle, 3699176);
        assert_eq!(times.softirq, 277);
        assert_eq!(times.guest_nice, 0);
    }

    #[rstest]
    fn test_missing_trailing_fields_are_zero() {
        let ProcLine::Core(times) = parse_line("cpu12 10 20 30 40") else {
            panic!("expected a core line");
        };

        assert_eq!(times.idle, 40);
        assert_eq!(times.iowait, 0);
        assert_eq!(times.steal, 0);
    }

    #[rstest]
    fn test_busy_idle_split() {
        let times = CpuTimes::from([1, 2, 3, 4, 5, 6, 7, 8, 100, 100]);

        assert_eq!(times.busy_idle(), (1 + 2 + 3 + 6 + 7 + 8, 4 + 5));
        assert_eq!(times.total(), 36);
    }

    #[rstest]
    #[case([100, 0, 100, 800, 0, 0, 0, 0, 0, 0], [150, 0, 150, 900, 0, 0, 0, 0, 0, 0], 50.0)]
    #[case([0, 0, 0, 100, 0, 0, 0, 0, 0, 0], [0, 0, 0, 200, 0, 0, 0, 0, 0, 0], 0.0)]
    #[case([0, 0, 0, 100, 0, 0, 0, 0, 0, 0], [100, 0, 0, 100, 0, 0, 0, 0, 0, 0], 100.0)]
    #[case([5, 5, 5, 5, 5, 5, 5, 5, 0, 0], [5, 5, 5, 5, 5, 5, 5, 5, 0, 0], 0.0)]
    fn test_usage(
        #[case] previous: [u64; CPU_FIELDS],
        #[case] current: [u64; CPU_FIELDS],
        #[case] expected: f64,
    ) {
        let usage = usage(&CpuTimes::from(previous), &CpuTimes::from(current));

        assert!((usage - expected).abs() < 1e-9, "usage {usage}");
    }

    #[rstest]
    fn test_usage_survives_counter_reset() {
        let previous = CpuTimes::from([500, 0, 0, 500, 0, 0, 0, 0, 0, 0]);
        let current = CpuTimes::from([10, 0, 0, 10, 0, 0, 0, 0, 0, 0]);

        assert_eq!(usage(&previous, &current), 0.0);
    }

    #[rstest]
    fn test_huge_counters_saturate() {
        let half = u64::MAX / 2 + 1;
        let line = format!("cpu0 {} {} 0 10 0 0 0 0 0 0", half, half);
        let ProcLine::Core(times) = parse_line(&line) else {
            panic!("expected a core line");
        };

        assert_eq!(times.total(), u64::MAX);
        assert_eq!(usage(&times, &times), 0.0);

        let previous = CpuTimes::from([0, 0, 0, 10, 0, 0, 0, 0, 0, 0]);
        let usage = usage(&previous, &times);
        assert!((0.0..=100.0).contains(&usage), "usage {usage}");
    }
}

//! Wall-clock accounting for the passes of one regeneration.

use std::fmt;
use std::time::{Duration, Instant};

/// The passes `TerrainMap::regenerate` runs, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Height field sampled at every triangle centroid, seeds collected
    Elevation,
    /// Drainage forest built by the biased search
    Routing,
    /// Region means, water flags and moisture
    Regions,
    /// Flow accumulation and elevation repair
    Flow,
}

impl Phase {
    pub const ALL: [Phase; 4] = [Phase::Elevation, Phase::Routing, Phase::Regions, Phase::Flow];

    pub fn name(self) -> &'static str {
        match self {
            Phase::Elevation => "elevation",
            Phase::Routing => "routing",
            Phase::Regions => "regions",
            Phase::Flow => "flow",
        }
    }
}

/// Time spent in each pass of a regeneration.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PhaseTimings {
    pub elevation: Duration,
    pub routing: Duration,
    pub regions: Duration,
    pub flow: Duration,
}

impl PhaseTimings {
    pub fn get(&self, phase: Phase) -> Duration {
        match phase {
            Phase::Elevation => self.elevation,
            Phase::Routing => self.routing,
            Phase::Regions => self.regions,
            Phase::Flow => self.flow,
        }
    }

    fn slot_mut(&mut self, phase: Phase) -> &mut Duration {
        match phase {
            Phase::Elevation => &mut self.elevation,
            Phase::Routing => &mut self.routing,
            Phase::Regions => &mut self.regions,
            Phase::Flow => &mut self.flow,
        }
    }

    pub fn total(&self) -> Duration {
        Phase::ALL.iter().map(|&p| self.get(p)).sum()
    }
}

impl fmt::Display for PhaseTimings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, &phase) in Phase::ALL.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} {:.3?}", phase.name(), self.get(phase))?;
        }
        Ok(())
    }
}

/// Lap timer: each `lap` charges the time since the previous one to a phase.
pub struct PhaseClock {
    mark: Instant,
    timings: PhaseTimings,
}

impl PhaseClock {
    pub fn start() -> Self {
        Self { mark: Instant::now(), timings: PhaseTimings::default() }
    }

    pub fn lap(&mut self, phase: Phase) -> Duration {
        let now = Instant::now();
        let spent = now.duration_since(self.mark);
        *self.timings.slot_mut(phase) += spent;
        self.mark = now;
        log::debug!("{}: {:.3?}", phase.name(), spent);
        spent
    }

    pub fn finish(self) -> PhaseTimings {
        self.timings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_laps_add_up_to_total() {
        let mut clock = PhaseClock::start();
        std::thread::sleep(Duration::from_millis(2));
        let elevation = clock.lap(Phase::Elevation);
        let routing = clock.lap(Phase::Routing);
        let timings = clock.finish();

        assert!(elevation >= Duration::from_millis(2));
        assert_eq!(timings.elevation, elevation);
        assert_eq!(timings.routing, routing);
        assert_eq!(timings.regions, Duration::ZERO);
        assert_eq!(timings.total(), elevation + routing);
    }

    #[test]
    fn test_repeated_phase_accumulates() {
        let mut clock = PhaseClock::start();
        let a = clock.lap(Phase::Flow);
        let b = clock.lap(Phase::Flow);
        assert_eq!(clock.finish().flow, a + b);
    }

    #[test]
    fn test_display_lists_every_phase() {
        let timings = PhaseTimings { routing: Duration::from_millis(3), ..PhaseTimings::default() };
        let text = timings.to_string();
        for phase in Phase::ALL {
            assert!(text.contains(phase.name()));
        }
        assert!(text.contains("routing 3.000ms"));
    }
}

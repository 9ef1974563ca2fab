use rand::rngs::StdRng;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::{
    aggregate::CloudData,
    config::PhysicsParams,
    core::{Simulation, StartError},
    types::{Extent, ParticleSnapshot},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CloudStatus {
    /// No term survived aggregation.
    Empty,
    /// Terms exist but no measurable extent has been seen yet.
    AwaitingLayout,
    Running,
    Stopped,
}

/// Owns one word-cloud view: its records, the current aggregation and the
/// running simulation. Any change of input discards the simulation; the
/// next `measure` starts a fresh one.
pub struct CloudSession {
    records: Vec<Value>,
    data: CloudData,
    params: PhysicsParams,
    rng: StdRng,
    sim: Option<Simulation>,
    last_extent: Option<Extent>,
    stopped: bool,
}

impl CloudSession {
    pub fn new(records: Vec<Value>, params: PhysicsParams, mut rng: StdRng) -> Self {
        let data = CloudData::build(&records, &mut rng);
        Self {
            records,
            data,
            params,
            rng,
            sim: None,
            last_extent: None,
            stopped: false,
        }
    }

    pub fn data(&self) -> &CloudData {
        &self.data
    }

    pub fn simulation(&self) -> Option<&Simulation> {
        self.sim.as_ref()
    }

    pub fn status(&self) -> CloudStatus {
        if self.stopped {
            CloudStatus::Stopped
        } else if self.sim.is_some() {
            CloudStatus::Running
        } else if self.data.is_empty() {
            CloudStatus::Empty
        } else {
            CloudStatus::AwaitingLayout
        }
    }

    /// Reports the current size of the hosting view. Starts the simulation
    /// on the first measurable extent and resizes it afterwards.
    pub fn measure(&mut self, extent: Extent) {
        if self.stopped {
            return;
        }
        self.last_extent = Some(extent);
        if let Some(sim) = self.sim.as_mut() {
            sim.set_extent(extent);
            return;
        }
        self.try_start(extent);
    }

    pub fn set_records(&mut self, records: Vec<Value>) {
        self.records = records;
        self.reinitialize();
    }

    /// Drops the running simulation and spawns the same terms again. The
    /// palette map only changes with new records.
    pub fn restart(&mut self) {
        if self.stopped {
            return;
        }
        self.sim = None;
        info!(terms = self.data.terms.len(), "word cloud respawned");
        if let Some(extent) = self.last_extent {
            self.try_start(extent);
        }
    }

    pub fn stop(&mut self) {
        if !self.stopped {
            info!("word cloud stopped");
        }
        self.stopped = true;
        self.sim = None;
    }

    /// Advances one frame. Returns whether a step ran.
    pub fn tick(&mut self) -> bool {
        if self.stopped {
            return false;
        }
        match self.sim.as_mut() {
            Some(sim) => {
                sim.tick();
                true
            }
            None => false,
        }
    }

    pub fn snapshot(&self, out: &mut Vec<ParticleSnapshot>) {
        match &self.sim {
            Some(sim) => sim.snapshot(out),
            None => out.clear(),
        }
    }

    fn reinitialize(&mut self) {
        if self.stopped {
            return;
        }
        self.sim = None;
        self.data = CloudData::build(&self.records, &mut self.rng);
        info!(terms = self.data.terms.len(), "word cloud reinitialized");
        if let Some(extent) = self.last_extent {
            self.try_start(extent);
        }
    }

    fn try_start(&mut self, extent: Extent) {
        match Simulation::start(&self.data, extent, self.params, &mut self.rng) {
            Ok(sim) => self.sim = Some(sim),
            Err(StartError::NoTerms) => {}
            Err(err @ StartError::Unmeasured { .. }) => {
                debug!(%err, "deferring word cloud start");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use serde_json::json;

    fn session(labels: &[&str]) -> CloudSession {
        let records = labels.iter().map(|l| json!({ "module": l })).collect();
        CloudSession::new(records, PhysicsParams::default(), StdRng::seed_from_u64(17))
    }

    mod status {
        use super::*;

        #[test]
        fn empty_input_is_empty() {
            let s = session(&["N/A", "x"]);
            assert_eq!(s.status(), CloudStatus::Empty);
        }

        #[test]
        fn waits_for_layout_until_measured() {
            let s = session(&["Search"]);
            assert_eq!(s.status(), CloudStatus::AwaitingLayout);
        }
    }

    mod measure {
        use super::*;

        #[test]
        fn starts_on_measurable_extent() {
            let mut s = session(&["Search", "Checkout"]);
            s.measure(Extent::new(800.0, 600.0));
            assert_eq!(s.status(), CloudStatus::Running);
        }

        #[test]
        fn retries_after_unmeasurable_extent() {
            let mut s = session(&["Search"]);
            s.measure(Extent::new(0.0, 0.0));
            assert_eq!(s.status(), CloudStatus::AwaitingLayout);
            assert!(!s.tick());
            s.measure(Extent::new(800.0, 600.0));
            assert_eq!(s.status(), CloudStatus::Running);
        }

        #[test]
        fn empty_cloud_never_starts() {
            let mut s = session(&[]);
            s.measure(Extent::new(800.0, 600.0));
            assert_eq!(s.status(), CloudStatus::Empty);
            assert!(!s.tick());
            let mut out = Vec::new();
            s.snapshot(&mut out);
            assert!(out.is_empty());
        }

        #[test]
        fn resizes_running_simulation() {
            let mut s = session(&["Search"]);
            s.measure(Extent::new(800.0, 600.0));
            s.measure(Extent::new(400.0, 300.0));
            let sim = s.simulation().unwrap();
            assert_eq!(sim.extent(), Extent::new(400.0, 300.0));
        }
    }

    mod tick {
        use super::*;

        #[test]
        fn advances_running_simulation() {
            let mut s = session(&["Search"]);
            s.measure(Extent::new(800.0, 600.0));
            assert!(s.tick());
            assert!(s.tick());
            assert_eq!(s.simulation().unwrap().ticks(), 2);
        }
    }

    mod set_records {
        use super::*;

        #[test]
        fn discards_previous_particles() {
            let mut s = session(&["Search"]);
            s.measure(Extent::new(800.0, 600.0));
            for _ in 0..10 {
                s.tick();
            }
            s.set_records(vec![json!({ "module": "Checkout" }), json!({ "label": "Profile" })]);
            assert_eq!(s.simulation().unwrap().ticks(), 0);
            let mut out = Vec::new();
            s.snapshot(&mut out);
            let texts: Vec<&str> = out.iter().map(|p| p.text.as_str()).collect();
            assert_eq!(texts, vec!["Checkout", "Profile"]);
        }

        #[test]
        fn empty_records_clear_the_view() {
            let mut s = session(&["Search"]);
            s.measure(Extent::new(800.0, 600.0));
            s.set_records(Vec::new());
            assert_eq!(s.status(), CloudStatus::Empty);
        }
    }

    mod restart {
        use super::*;

        #[test]
        fn keeps_terms_and_resets_ticks() {
            let mut s = session(&["Search", "Search", "Cart"]);
            s.measure(Extent::new(800.0, 600.0));
            s.tick();
            let before = s.data().terms.clone();
            s.restart();
            assert_eq!(s.data().terms, before);
            assert_eq!(s.simulation().unwrap().ticks(), 0);
        }

        #[test]
        fn keeps_palette_assignment() {
            let labels: Vec<String> = (b'A'..b'M')
                .map(|c| format!("Module{}", c as char))
                .collect();
            let labels: Vec<&str> = labels.iter().map(String::as_str).collect();
            let mut s = session(&labels);
            s.measure(Extent::new(800.0, 600.0));
            let before = s.data().palettes.clone();
            for _ in 0..8 {
                s.restart();
                assert_eq!(s.data().palettes, before);
            }
        }
    }

    mod stop {
        use super::*;

        #[test]
        fn halts_all_further_mutation() {
            let mut s = session(&["Search"]);
            s.measure(Extent::new(800.0, 600.0));
            s.stop();
            assert_eq!(s.status(), CloudStatus::Stopped);
            assert!(!s.tick());
            s.measure(Extent::new(800.0, 600.0));
            s.restart();
            assert!(s.simulation().is_none());
        }
    }
}

//! Beatworm headless driver
//!
//! Usage: `beatworm [analysis.json] [settings.json]`
//!
//! Runs the worm field at the fixed timestep for the length of the song with
//! an automatic gunner and logs the resulting score ledger.

use glam::Vec2;

use beatworm::consts::{MAX_SUBSTEPS, SIM_DT, SIM_HZ};
use beatworm::sim::{
    FieldState, Projectile, ScoreLedger, ScoreReason, Services, TickInput, VisualQueue,
    tick,
};
use beatworm::{Settings, SongAnalysis};

/// Ticks between gunner shots
const FIRE_INTERVAL: u64 = 30;
/// Every n-th shot is an energy shot
const ENERGY_EVERY: u32 = 5;
/// Simulated display refresh
const FRAME_DT: f32 = 1.0 / 60.0;
/// Placeholder song length when no analysis is given
const PLACEHOLDER_SECS: f32 = 60.0;

/// Fires at the leftmost live head, leading it by one tick of travel
struct AutoGunner {
    shots: u32,
}

impl AutoGunner {
    fn aim(&mut self, state: &FieldState) -> Option<Projectile> {
        if state.time_ticks % FIRE_INTERVAL != 0 {
            return None;
        }
        let lead = Vec2::new(-state.settings.effective_speed() * SIM_DT, 0.0);
        let target = state
            .worms
            .iter()
            .filter(|w| w.region.is_some())
            .filter_map(|w| w.anchor())
            .min_by(|a, b| a.x.total_cmp(&b.x))?;

        self.shots += 1;
        let pos = target + lead;
        if self.shots % ENERGY_EVERY == 0 {
            Some(Projectile::energy(pos))
        } else {
            Some(Projectile::normal(pos))
        }
    }
}

struct Driver {
    state: FieldState,
    analysis: SongAnalysis,
    ledger: ScoreLedger,
    visuals: VisualQueue,
    gunner: AutoGunner,
    accumulator: f32,
    spawned: usize,
    destroyed: usize,
}

impl Driver {
    fn new(analysis: SongAnalysis, settings: Settings, seed: u64) -> Self {
        let notes = analysis.note_sequence();
        Self {
            state: FieldState::new(seed, settings, notes),
            analysis,
            ledger: ScoreLedger::new(),
            visuals: VisualQueue::new(),
            gunner: AutoGunner { shots: 0 },
            accumulator: 0.0,
            spawned: 0,
            destroyed: 0,
        }
    }

    /// Advance one display frame worth of fixed ticks
    fn frame(&mut self, dt: f32) {
        self.accumulator += dt.min(0.1);

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            let input = TickInput {
                projectiles: self.gunner.aim(&self.state).into_iter().collect(),
                force_destroy_all: false,
            };
            let mut services = Services::new(&mut self.ledger, &mut self.visuals, &self.analysis);
            let report = tick(&mut self.state, &input, SIM_DT, &mut services);
            self.spawned += report.spawned.len();
            for (id, cause) in &report.destroyed {
                log::debug!("{} gone ({:?})", id, cause);
            }
            self.destroyed += report.destroyed.len();
            self.accumulator -= SIM_DT;
            substeps += 1;
        }

        // Nothing draws these headless
        self.visuals.drain();
    }

    /// Clear the field at the end of the song
    fn finish(&mut self) {
        let input = TickInput {
            force_destroy_all: true,
            ..Default::default()
        };
        let mut services = Services::new(&mut self.ledger, &mut self.visuals, &self.analysis);
        let report = tick(&mut self.state, &input, SIM_DT, &mut services);
        self.destroyed += report.destroyed.len();
    }

    fn log_summary(&self) {
        log::info!(
            "Song over after {:.1}s: {} worms spawned, {} removed",
            self.state.song_time(),
            self.spawned,
            self.destroyed
        );
        for reason in [
            ScoreReason::NormalHit,
            ScoreReason::CompletionBonus,
            ScoreReason::EnergyCascade,
            ScoreReason::EscapePenalty,
        ] {
            log::info!(
                "  {:<18} x{:<4} {:+}",
                reason.as_str(),
                self.ledger.count(reason),
                self.ledger.total_for(reason)
            );
        }
        log::info!("Final score: {}", self.ledger.total);
    }
}

fn load_inputs(args: &[String]) -> (SongAnalysis, Settings) {
    let analysis = match args.first() {
        Some(path) => SongAnalysis::load(path).unwrap_or_else(|e| {
            log::warn!("Could not load analysis {}: {}; using placeholder", path, e);
            SongAnalysis::placeholder(0, PLACEHOLDER_SECS)
        }),
        None => {
            log::warn!("No analysis given; using placeholder song");
            SongAnalysis::placeholder(0, PLACEHOLDER_SECS)
        }
    };

    let settings = match args.get(1) {
        Some(path) => Settings::load(path).unwrap_or_else(|e| {
            log::warn!("Could not load settings {}: {}; using defaults", path, e);
            Settings::default()
        }),
        None => Settings::default(),
    };

    (analysis, settings)
}

fn main() {
    #[cfg(not(target_arch = "wasm32"))]
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (analysis, settings) = load_inputs(&args);
    log::info!(
        "Beatworm starting: {} at {} Hz, difficulty {}",
        analysis.metadata.filename,
        SIM_HZ,
        settings.difficulty.as_str()
    );

    let duration = analysis.metadata.duration.max(0.0);
    let mut driver = Driver::new(analysis, settings, 0xBEA7);

    let mut hits_seen = 0;
    while driver.state.song_time() < duration {
        driver.frame(FRAME_DT);
        let hits = driver.ledger.count(ScoreReason::NormalHit);
        if hits != hits_seen && hits % 10 == 0 {
            log::info!(
                "t={:.1}s score {} ({} worms alive)",
                driver.state.song_time(),
                driver.ledger.total,
                driver.state.active_count()
            );
        }
        hits_seen = hits;
    }
    driver.finish();

    driver.log_summary();
}

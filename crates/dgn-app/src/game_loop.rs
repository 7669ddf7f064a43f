//! Fixed-timestep loop.
//!
//! Simulation steps run at [`FIXED_DT`] out of an accumulator fed by wall
//! time; rendering happens once per frame at whatever rate the surface
//! presents.

use std::time::Instant;

use tracing::warn;

/// Simulation step: 60 Hz.
pub const FIXED_DT: f64 = 1.0 / 60.0;

/// Longest frame fed to the accumulator. A stall (debugger, window drag)
/// slows the simulation down instead of replaying seconds of steps.
pub const MAX_FRAME_TIME: f64 = 0.25;

/// Accumulator state for the fixed-timestep loop.
#[derive(Debug)]
pub struct GameLoop {
    previous_time: Instant,
    accumulator: f64,
    sim_time: f64,
    frames: u64,
    steps: u64,
}

impl GameLoop {
    pub fn new() -> Self {
        Self {
            previous_time: Instant::now(),
            accumulator: 0.0,
            sim_time: 0.0,
            frames: 0,
            steps: 0,
        }
    }

    /// Measure the time since the previous call and [`advance`](Self::advance)
    /// by it.
    pub fn tick(&mut self, step: impl FnMut(f64, f64), render: impl FnMut(f64)) {
        let now = Instant::now();
        let frame_time = now.duration_since(self.previous_time).as_secs_f64();
        self.previous_time = now;
        self.advance(frame_time, step, render);
    }

    /// Feed `frame_time` seconds into the accumulator.
    ///
    /// `step(dt, sim_time)` runs once per whole [`FIXED_DT`] accumulated;
    /// `render(alpha)` runs exactly once afterwards, `alpha` in `[0, 1)`
    /// being how far the leftover time reaches into the next step.
    pub fn advance(
        &mut self,
        frame_time: f64,
        mut step: impl FnMut(f64, f64),
        mut render: impl FnMut(f64),
    ) {
        let frame_time = if frame_time > MAX_FRAME_TIME {
            warn!(
                "Frame took {:.1}ms, clamping to {:.1}ms",
                frame_time * 1000.0,
                MAX_FRAME_TIME * 1000.0
            );
            MAX_FRAME_TIME
        } else {
            frame_time.max(0.0)
        };

        self.accumulator += frame_time;
        while self.accumulator >= FIXED_DT {
            step(FIXED_DT, self.sim_time);
            self.sim_time += FIXED_DT;
            self.accumulator -= FIXED_DT;
            self.steps += 1;
        }

        render(self.alpha());
        self.frames += 1;
    }

    pub fn alpha(&self) -> f64 {
        self.accumulator / FIXED_DT
    }

    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    pub fn step_count(&self) -> u64 {
        self.steps
    }

    /// Simulated seconds; drives the sun animation.
    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }
}

impl Default for GameLoop {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_step_per_fixed_dt() {
        let mut game_loop = GameLoop::new();
        let mut steps = 0;
        game_loop.advance(3.0 * FIXED_DT + 1e-9, |_, _| steps += 1, |_| {});
        assert_eq!(steps, 3);
        assert!((game_loop.sim_time() - 3.0 * FIXED_DT).abs() < 1e-12);
    }

    #[test]
    fn test_partial_frame_only_renders() {
        let mut game_loop = GameLoop::new();
        let mut steps = 0;
        let mut alpha = -1.0;
        game_loop.advance(0.25 * FIXED_DT, |_, _| steps += 1, |a| alpha = a);
        assert_eq!(steps, 0);
        assert!((alpha - 0.25).abs() < 1e-10);
    }

    #[test]
    fn test_leftover_carries_to_next_frame() {
        let mut game_loop = GameLoop::new();
        let mut steps = 0;
        game_loop.advance(0.6 * FIXED_DT, |_, _| steps += 1, |_| {});
        game_loop.advance(0.6 * FIXED_DT, |_, _| steps += 1, |_| {});
        assert_eq!(steps, 1);
        assert!((game_loop.alpha() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_long_frame_is_clamped() {
        let mut game_loop = GameLoop::new();
        let mut steps = 0u32;
        game_loop.advance(5.0, |_, _| steps += 1, |_| {});
        assert!(steps <= (MAX_FRAME_TIME / FIXED_DT).ceil() as u32);
        assert!(steps > 0);
    }

    #[test]
    fn test_negative_frame_time_ignored() {
        let mut game_loop = GameLoop::new();
        let mut alpha = -1.0;
        game_loop.advance(-1.0, |_, _| panic!("no steps expected"), |a| alpha = a);
        assert_eq!(alpha, 0.0);
    }

    #[test]
    fn test_sim_time_passed_to_steps() {
        let mut game_loop = GameLoop::new();
        let mut seen = Vec::new();
        game_loop.advance(2.0 * FIXED_DT + 1e-9, |_, t| seen.push(t), |_| {});
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], 0.0);
        assert!((seen[1] - FIXED_DT).abs() < 1e-12);
        assert_eq!(game_loop.frame_count(), 1);
        assert_eq!(game_loop.step_count(), 2);
    }
}

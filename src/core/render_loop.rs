//! Per-frame render loop
//!
//! The loop itself knows nothing about windows: it reads a [`Clock`], moves
//! the scene forward, hands the scene to a [`FramePresenter`] and answers
//! when the next tick should happen. The engine turns that answer into winit
//! control flow; headless callers use [`RenderLoop::run_blocking`].

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::{Clock, FrameClock, FrameStats};
use crate::scene::PortalScene;

/// How the next frame is scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum FramePolicy {
    /// Redraw as soon as the previous frame is done; presentation paces it
    #[default]
    Uncapped,
    /// Wait a fixed 1/60 s after each frame before requesting the next
    Capped,
}

impl FramePolicy {
    /// Delay used by [`FramePolicy::Capped`]
    pub const CAPPED_INTERVAL: Duration = Duration::from_nanos(16_666_667);

    /// Scheduling decision after a frame
    pub fn next_tick(self) -> NextTick {
        match self {
            Self::Uncapped => NextTick::Immediately,
            Self::Capped => NextTick::After(Self::CAPPED_INTERVAL),
        }
    }
}

/// When the next tick should run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextTick {
    Immediately,
    After(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
}

/// Which passes a frame goes through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPath {
    /// Scene straight to the surface
    Direct,
    /// Scene into the HDR target, then bloom and composite
    PostProcess,
}

/// Draws one frame of the scene
pub trait FramePresenter {
    type Error: fmt::Display;

    /// Render and present `scene`
    ///
    /// # Errors
    ///
    /// Returns an error if the frame could not be drawn; the loop logs it and
    /// keeps running
    fn present(&mut self, scene: &PortalScene, path: RenderPath) -> Result<(), Self::Error>;
}

/// Drives ticks: time, controls, uniforms, presentation, scheduling
#[derive(Debug)]
pub struct RenderLoop<C: Clock = FrameClock> {
    clock: C,
    policy: FramePolicy,
    state: LoopState,
    stats: FrameStats,
}

impl<C: Clock> RenderLoop<C> {
    /// Create an idle loop
    pub fn new(clock: C, policy: FramePolicy) -> Self {
        Self {
            clock,
            policy,
            state: LoopState::Idle,
            stats: FrameStats::new(),
        }
    }

    /// Enter the running state; later calls do nothing
    pub fn start(&mut self) {
        if self.state == LoopState::Idle {
            log::info!("Render loop started ({:?})", self.policy);
            self.state = LoopState::Running;
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn policy(&self) -> FramePolicy {
        self.policy
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Run one frame and return when the next one should start
    ///
    /// An idle loop does nothing and asks for no further ticks beyond an
    /// immediate retry.
    pub fn tick<P: FramePresenter>(
        &mut self,
        scene: &mut PortalScene,
        presenter: &mut P,
    ) -> NextTick {
        if self.state == LoopState::Idle {
            return NextTick::Immediately;
        }

        self.stats.begin(self.clock.elapsed_seconds());

        let elapsed = self.clock.elapsed_seconds();
        scene.update_controls();
        scene.set_time(elapsed);

        let path = if scene.bloom.is_some() {
            RenderPath::PostProcess
        } else {
            RenderPath::Direct
        };
        if let Err(e) = presenter.present(scene, path) {
            log::error!("Frame failed: {e}");
        }

        let next = self.policy.next_tick();
        self.stats.end(self.clock.elapsed_seconds());
        next
    }

    /// Drive `frames` ticks without a window, calling `sleep` for every
    /// requested delay
    pub fn run_blocking<P, S>(
        &mut self,
        frames: usize,
        scene: &mut PortalScene,
        presenter: &mut P,
        mut sleep: S,
    ) where
        P: FramePresenter,
        S: FnMut(Duration),
    {
        self.start();
        for _ in 0..frames {
            if let NextTick::After(delay) = self.tick(scene, presenter) {
                sleep(delay);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_decisions() {
        assert_eq!(FramePolicy::Uncapped.next_tick(), NextTick::Immediately);
        assert_eq!(
            FramePolicy::Capped.next_tick(),
            NextTick::After(Duration::from_nanos(16_666_667))
        );
    }

    #[test]
    fn test_start_is_one_way() {
        let mut render_loop =
            RenderLoop::new(crate::core::ManualClock::new(), FramePolicy::Uncapped);
        assert_eq!(render_loop.state(), LoopState::Idle);
        render_loop.start();
        render_loop.start();
        assert_eq!(render_loop.state(), LoopState::Running);
    }
}

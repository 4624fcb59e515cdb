//! Render loop behavior without a window

use std::time::{Duration, Instant};

use portal::core::{
    FramePolicy, FramePresenter, FrameClock, ManualClock, NextTick, PortalConfig, RenderLoop,
    RenderPath, SceneVariant,
};
use portal::scene::{PortalScene, Viewport};

/// Records what each presented frame saw
#[derive(Default)]
struct RecordingPresenter {
    times: Vec<f32>,
    paths: Vec<RenderPath>,
    fail_every: Option<usize>,
}

impl FramePresenter for RecordingPresenter {
    type Error = String;

    fn present(&mut self, scene: &PortalScene, path: RenderPath) -> Result<(), String> {
        self.times.push(scene.portal.uniforms.time);
        self.paths.push(path);
        match self.fail_every {
            Some(n) if self.times.len() % n == 0 => Err(String::from("device lost")),
            _ => Ok(()),
        }
    }
}

fn scene(variant: SceneVariant) -> PortalScene {
    let config = PortalConfig {
        variant,
        ..PortalConfig::default()
    };
    PortalScene::new(&config, Viewport::new(1280, 720, 1.0))
}

#[test]
fn test_time_uniform_tracks_clock() {
    let clock = ManualClock::new();
    let mut render_loop = RenderLoop::new(clock.clone(), FramePolicy::Uncapped);
    let mut scene = scene(SceneVariant::Basic);
    let mut presenter = RecordingPresenter::default();

    render_loop.start();
    for _ in 0..3 {
        clock.advance(0.5);
        assert_eq!(
            render_loop.tick(&mut scene, &mut presenter),
            NextTick::Immediately
        );
    }

    assert_eq!(presenter.times, [0.5, 1.0, 1.5]);
    assert_eq!(scene.portal.uniforms.time, 1.5);
    assert_eq!(render_loop.stats().total_frames(), 3);
}

#[test]
fn test_idle_loop_presents_nothing() {
    let mut render_loop = RenderLoop::new(ManualClock::new(), FramePolicy::Capped);
    let mut scene = scene(SceneVariant::Room);
    let mut presenter = RecordingPresenter::default();

    assert_eq!(
        render_loop.tick(&mut scene, &mut presenter),
        NextTick::Immediately
    );
    assert!(presenter.times.is_empty());
}

#[test]
fn test_bloom_variant_goes_through_post_processing() {
    let mut presenter = RecordingPresenter::default();
    for variant in [SceneVariant::Basic, SceneVariant::Room, SceneVariant::Extended] {
        let mut render_loop = RenderLoop::new(ManualClock::new(), FramePolicy::Uncapped);
        let mut scene = scene(variant);
        render_loop.run_blocking(1, &mut scene, &mut presenter, |_| {});
    }
    assert_eq!(
        presenter.paths,
        [RenderPath::Direct, RenderPath::Direct, RenderPath::PostProcess]
    );
}

#[test]
fn test_failed_frames_do_not_stop_the_loop() {
    let clock = ManualClock::new();
    let mut render_loop = RenderLoop::new(clock.clone(), FramePolicy::Uncapped);
    let mut scene = scene(SceneVariant::Extended);
    let mut presenter = RecordingPresenter {
        fail_every: Some(2),
        ..RecordingPresenter::default()
    };

    render_loop.start();
    for _ in 0..4 {
        clock.advance(0.1);
        render_loop.tick(&mut scene, &mut presenter);
    }
    assert_eq!(presenter.times.len(), 4);
}

#[test]
fn test_capped_policy_requests_fixed_delays() {
    let mut render_loop = RenderLoop::new(ManualClock::new(), FramePolicy::Capped);
    let mut scene = scene(SceneVariant::Basic);
    let mut presenter = RecordingPresenter::default();
    let mut delays = Vec::new();

    render_loop.run_blocking(5, &mut scene, &mut presenter, |delay| delays.push(delay));

    assert_eq!(delays, vec![FramePolicy::CAPPED_INTERVAL; 5]);
}

#[test]
fn test_capped_run_takes_at_least_two_seconds() {
    let mut render_loop = RenderLoop::new(FrameClock::start(), FramePolicy::Capped);
    let mut scene = scene(SceneVariant::Basic);
    let mut presenter = RecordingPresenter::default();

    let started = Instant::now();
    render_loop.run_blocking(120, &mut scene, &mut presenter, std::thread::sleep);

    assert!(started.elapsed() >= Duration::from_millis(2000));
    assert_eq!(presenter.times.len(), 120);
    assert!(presenter.times.windows(2).all(|w| w[0] <= w[1]));
}

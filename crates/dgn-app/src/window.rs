//! Window creation and event handling via winit.
//!
//! [`AppState`] implements winit's [`ApplicationHandler`]. Each redraw runs
//! the fixed-timestep simulation, fits the shadow cascades to the camera,
//! records one depth pass per cascade and then the lit pass.

use std::path::PathBuf;
use std::sync::Arc;

use dgn_config::Config;
use dgn_input::KeyboardState;
use dgn_lighting::{
    CascadedShadowConfig, Frustum, LightKind, MAX_CASCADES, ShadowCaster, ShadowSystem,
    ShadowUniform,
};
use dgn_render::{
    BufferAllocator, Camera, DepthBuffer, FrameEncoder, LIT_SHADER_SOURCE, LitObject,
    LitPipeline, MeshBuffer, RenderContext, RenderPassBuilder, SHADOW_SHADER_SOURCE,
    ShaderLibrary, ShadowMaps, ShadowPassRecorder, ShadowPipeline, SurfaceError,
    init_render_context_blocking, primitives,
};
use glam::Vec3;
use tracing::{error, info, instrument, warn};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::KeyCode;
use winit::window::{Window, WindowAttributes, WindowId};

use crate::error::AppError;
use crate::fly_camera::FlyCamera;
use crate::game_loop::GameLoop;
use crate::scene::{DemoScene, GROUND_HALF_EXTENT, SceneMesh};

/// Most objects drawn per frame.
pub const MAX_OBJECTS: u32 = 64;

/// Where the camera starts, just above the ground.
pub const START_POSITION: Vec3 = Vec3::new(0.0, 2.0, 2.0);

pub fn window_attributes_from_config(config: &Config) -> WindowAttributes {
    WindowAttributes::default()
        .with_title(config.window.title.clone())
        .with_inner_size(winit::dpi::LogicalSize::new(
            config.window.width as f64,
            config.window.height as f64,
        ))
}

/// Camera frustum for `config` and a surface of `width` x `height`.
pub fn frustum_from_config(config: &Config, width: u32, height: u32) -> Frustum {
    Frustum {
        fov_y: config.camera.fov_degrees.to_radians(),
        near: config.camera.near,
        far: config.camera.far,
        width: width.max(1) as f32,
        height: height.max(1) as f32,
    }
}

/// GPU meshes shared by every scene object.
struct SceneMeshes {
    ground: MeshBuffer,
    cube: MeshBuffer,
    sphere: MeshBuffer,
}

impl SceneMeshes {
    fn upload(device: &wgpu::Device) -> Self {
        let allocator = BufferAllocator::new(device);
        Self {
            ground: allocator.upload("ground", &primitives::plane(GROUND_HALF_EXTENT)),
            cube: allocator.upload("cube", &primitives::cube(0.5)),
            sphere: allocator.upload("sphere", &primitives::uv_sphere(1.0, 32, 16)),
        }
    }

    fn get(&self, mesh: SceneMesh) -> &MeshBuffer {
        match mesh {
            SceneMesh::Ground => &self.ground,
            SceneMesh::Cube => &self.cube,
            SceneMesh::Sphere => &self.sphere,
        }
    }
}

/// Everything that exists only once a window and device do.
struct GpuState {
    context: RenderContext,
    shaders: ShaderLibrary,
    depth: DepthBuffer,
    shadow_maps: ShadowMaps,
    shadow_pipeline: ShadowPipeline,
    lit: LitPipeline,
    meshes: SceneMeshes,
}

impl GpuState {
    fn new(context: RenderContext, shadow_config: &CascadedShadowConfig) -> Result<Self, AppError> {
        let (width, height) = context.size();
        let mut shaders = ShaderLibrary::new();
        let shadow_shader = shaders.load_from_source(&context.device, "shadow", SHADOW_SHADER_SOURCE);
        let lit_shader = shaders.load_from_source(&context.device, "lit", LIT_SHADER_SOURCE);

        let shadow_maps = ShadowMaps::new(
            &context.device,
            LightKind::Directional,
            shadow_config,
            context.clamp_to_border,
        )?;
        let shadow_pipeline = ShadowPipeline::new(
            &context.device,
            &shadow_shader,
            shadow_config,
            MAX_OBJECTS * MAX_CASCADES as u32,
        );
        let mut lit = LitPipeline::new(
            &context.device,
            &lit_shader,
            context.surface_format,
            MAX_OBJECTS,
        );
        lit.bind_shadow_maps(&context.device, &shadow_maps)?;

        Ok(Self {
            depth: DepthBuffer::new(&context.device, width, height),
            meshes: SceneMeshes::upload(&context.device),
            context,
            shaders,
            shadow_maps,
            shadow_pipeline,
            lit,
        })
    }

    /// Reallocate maps and rebuild the depth pipeline for a new shadow
    /// configuration. Nothing changes on error.
    fn rebuild_shadows(&mut self, config: &CascadedShadowConfig) -> Result<(), AppError> {
        let device = &self.context.device;
        let maps = ShadowMaps::new(
            device,
            LightKind::Directional,
            config,
            self.context.clamp_to_border,
        )?;
        self.lit.bind_shadow_maps(device, &maps)?;
        let shader = self
            .shaders
            .get("shadow")
            .unwrap_or_else(|| self.shaders.load_from_source(device, "shadow", SHADOW_SHADER_SOURCE));
        self.shadow_pipeline =
            ShadowPipeline::new(device, &shader, config, MAX_OBJECTS * MAX_CASCADES as u32);
        self.shadow_maps = maps;
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.context.resize(width, height);
        self.depth.resize(&self.context.device, width, height);
    }
}

/// Application state: window, GPU resources, simulation and shadows.
pub struct AppState {
    config: Config,
    /// Directory `config.ron` is reloaded from on F5.
    config_dir: Option<PathBuf>,
    window: Option<Arc<Window>>,
    gpu: Option<GpuState>,
    game_loop: GameLoop,
    keyboard: KeyboardState,
    camera: Camera,
    fly: FlyCamera,
    scene: DemoScene,
    shadows: ShadowSystem,
}

impl AppState {
    pub fn new(config: Config, config_dir: Option<PathBuf>) -> Result<Self, AppError> {
        let frustum = frustum_from_config(&config, config.window.width, config.window.height);
        let shadows = ShadowSystem::new(config.shadow.to_cascaded(), frustum.near, frustum.far)?;
        Ok(Self {
            camera: Camera::new(START_POSITION, frustum),
            fly: FlyCamera::new(config.camera.move_speed, config.camera.look_speed),
            config,
            config_dir,
            window: None,
            gpu: None,
            game_loop: GameLoop::new(),
            keyboard: KeyboardState::new(),
            scene: DemoScene::new(),
            shadows,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn shadows(&self) -> &ShadowSystem {
        &self.shadows
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Switch to `config`. Shadow changes that fail validation are
    /// rejected whole and the running configuration is kept.
    pub fn apply_config(&mut self, config: Config) -> Result<(), AppError> {
        let shadow_config = config.shadow.to_cascaded();
        let frustum = frustum_from_config(
            &config,
            self.camera.frustum.width as u32,
            self.camera.frustum.height as u32,
        );
        frustum.validate()?;

        if shadow_config != *self.shadows.config() {
            shadow_config.validate()?;
            if let Some(gpu) = &mut self.gpu {
                gpu.rebuild_shadows(&shadow_config)?;
            }
            self.shadows.reconfigure(shadow_config)?;
            info!(
                "Shadows reconfigured: {} cascades at {}",
                self.shadows.cascade_count(),
                self.shadows.config().resolution
            );
        }

        self.camera.frustum = frustum;
        self.fly = FlyCamera::new(config.camera.move_speed, config.camera.look_speed);
        self.config = config;
        Ok(())
    }

    fn reload_config(&mut self) {
        let Some(dir) = self.config_dir.clone() else {
            info!("No config directory; nothing to reload");
            return;
        };
        match self.config.reload(&dir) {
            Ok(Some(config)) => {
                if let Err(e) = self.apply_config(config) {
                    warn!("Reloaded config rejected: {e}");
                }
            }
            Ok(None) => info!("Config unchanged"),
            Err(e) => warn!("Config reload failed: {e}"),
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.camera.set_viewport(width, height);
        if let Some(gpu) = &mut self.gpu {
            gpu.resize(width, height);
        }
        info!("Window resized to {width}x{height}");
    }

    /// Advance the simulation by the wall time since the last frame.
    fn simulate(&mut self) -> f32 {
        let scene = &mut self.scene;
        let camera = &mut self.camera;
        let fly = &self.fly;
        let keyboard = &self.keyboard;
        let mut alpha = 0.0;
        self.game_loop.tick(
            |dt, sim_time| {
                fly.update(camera, keyboard, dt as f32);
                scene.step(dt as f32, (sim_time + dt) as f32);
            },
            |a| alpha = a,
        );
        alpha as f32
    }

    fn render_frame(&mut self, event_loop: &ActiveEventLoop, alpha: f32) {
        let Some(gpu) = &self.gpu else {
            return;
        };

        if let Err(e) = self.shadows.update(
            self.camera.inverse_view_matrix(),
            &self.camera.frustum,
            self.scene.sun.direction,
        ) {
            warn!("Shadow cascades kept from last frame: {e}");
        }

        let surface_texture = match gpu.context.get_current_texture() {
            Ok(texture) => texture,
            Err(SurfaceError::Lost) => {
                warn!("Surface lost, skipping frame");
                return;
            }
            Err(SurfaceError::OutOfMemory) => {
                error!("GPU out of memory");
                event_loop.exit();
                return;
            }
            Err(SurfaceError::Timeout) => {
                warn!("Surface timeout, skipping frame");
                return;
            }
        };

        let queue = &gpu.context.queue;
        let mut frame = FrameEncoder::new(&gpu.context.device, queue, surface_texture);
        let objects = self.scene.objects(alpha);

        let casters: Vec<ShadowCaster<'_, MeshBuffer>> = objects
            .iter()
            .map(|object| ShadowCaster {
                mesh: gpu.meshes.get(object.mesh),
                model: object.model,
            })
            .collect();
        let shadowed = {
            let mut recorder = ShadowPassRecorder::new(
                frame.encoder_mut(),
                queue,
                &gpu.shadow_pipeline,
                &gpu.shadow_maps,
            );
            self.shadows.render(&mut recorder, &casters).is_ok()
        };

        // A failed shadow pass leaves the maps half-written; shade unshadowed.
        let shadow_uniform = if shadowed {
            self.shadows.to_uniform()
        } else {
            <ShadowUniform as bytemuck::Zeroable>::zeroed()
        };
        gpu.lit.write_frame(
            queue,
            &self.camera.to_uniform(),
            &self.scene.sun.to_uniform(),
            &shadow_uniform,
        );

        let lit_objects: Vec<LitObject<'_>> = objects
            .iter()
            .map(|object| LitObject {
                mesh: gpu.meshes.get(object.mesh),
                model: object.model,
                color: object.color,
            })
            .collect();
        {
            let builder = RenderPassBuilder::new()
                .depth(gpu.depth.view.clone(), DepthBuffer::CLEAR_VALUE)
                .label("main-pass");
            let mut pass = frame.begin_render_pass(&builder);
            if let Err(e) = gpu.lit.draw(&mut pass, queue, &lit_objects) {
                error!("Lit pass failed: {e}");
            }
        }
        frame.submit();
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let window = match event_loop.create_window(window_attributes_from_config(&self.config)) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                error!("Window creation failed: {e}");
                event_loop.exit();
                return;
            }
        };

        let gpu = init_render_context_blocking(window.clone(), self.config.window.vsync)
            .map_err(AppError::from)
            .and_then(|context| GpuState::new(context, self.shadows.config()));
        match gpu {
            Ok(gpu) => {
                let (width, height) = gpu.context.size();
                self.camera.set_viewport(width, height);
                info!("GPU ready, surface {width}x{height}");
                self.gpu = Some(gpu);
            }
            Err(e) => {
                error!("GPU initialization failed: {e}");
                event_loop.exit();
                return;
            }
        }

        window.request_redraw();
        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested, shutting down");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => self.resize(size.width, size.height),
            WindowEvent::Focused(false) => self.keyboard.release_all(),
            WindowEvent::KeyboardInput { event, .. } => self.keyboard.process_event(&event),
            WindowEvent::RedrawRequested => {
                if self.keyboard.just_pressed(KeyCode::Escape) {
                    info!("Escape pressed, shutting down");
                    event_loop.exit();
                    return;
                }
                if self.keyboard.just_pressed(KeyCode::F5) {
                    self.reload_config();
                }

                let alpha = self.simulate();
                self.render_frame(event_loop, alpha);
                self.keyboard.end_frame();

                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }
}

/// Create the event loop and run the demo until the window closes.
#[instrument(skip_all)]
pub fn run(config: Config, config_dir: Option<PathBuf>) -> Result<(), AppError> {
    let event_loop = EventLoop::new()?;
    let mut app = AppState::new(config, config_dir)?;
    event_loop.run_app(&mut app)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_has_no_window() {
        let state = AppState::new(Config::default(), None).unwrap();
        assert!(state.window.is_none());
        assert!(state.gpu.is_none());
        assert_eq!(state.shadows().cascade_count(), 3);
        assert_eq!(state.camera().position, START_POSITION);
    }

    #[test]
    fn test_frustum_uses_config_degrees() {
        let config = Config::default();
        let frustum = frustum_from_config(&config, 1000, 680);
        assert!((frustum.fov_y - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
        assert_eq!(frustum.near, 0.1);
        assert_eq!(frustum.far, 100.0);
        assert!(frustum_from_config(&config, 0, 0).validate().is_ok());
    }

    #[test]
    fn test_invalid_shadow_config_fails_startup() {
        let mut config = Config::default();
        config.shadow.cascade_count = 9;
        assert!(matches!(
            AppState::new(config, None),
            Err(AppError::Shadow(_))
        ));
    }

    #[test]
    fn test_apply_config_reconfigures_shadows() {
        let mut state = AppState::new(Config::default(), None).unwrap();
        let mut config = Config::default();
        config.shadow.cascade_count = 4;
        config.camera.far = 60.0;
        state.apply_config(config).unwrap();
        assert_eq!(state.shadows().cascade_count(), 4);
        assert_eq!(state.camera().frustum.far, 60.0);
    }

    #[test]
    fn test_rejected_config_keeps_previous() {
        let mut state = AppState::new(Config::default(), None).unwrap();
        let mut config = Config::default();
        config.shadow.split_blend = 2.0;
        assert!(state.apply_config(config).is_err());
        assert_eq!(state.config(), &Config::default());
        assert_eq!(state.shadows().config().split_blend, 0.45);
    }

    #[test]
    fn test_simulation_moves_ball_and_camera() {
        let mut state = AppState::new(Config::default(), None).unwrap();
        state.keyboard.process_raw(dgn_input::RawKeyEvent {
            key: winit::keyboard::PhysicalKey::Code(KeyCode::KeyW),
            state: winit::event::ElementState::Pressed,
            repeat: false,
        });
        let ball_start = state.scene.ball.position;
        std::thread::sleep(std::time::Duration::from_millis(50));
        state.simulate();
        assert_ne!(state.scene.ball.position, ball_start);
        assert!(state.camera.position.z < START_POSITION.z);
    }
}
